use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Unified error taxonomy for the ABDM Integration Core (spec.md §7).
///
/// Every component returns one of these kinds, directly or wrapped via
/// `anyhow` with `.context(...)` and converted at the API boundary. Mapping
/// a kind to an HTTP status happens only at the API surface — internal
/// callers match on the kind itself.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("permission scope exceeded: {0}")]
    PermissionScope(String),

    #[error("gateway authentication failed: {0}")]
    GatewayAuth(String),

    #[error("gateway rejected request: {status} {code}: {message}")]
    GatewayProtocol {
        status: u16,
        code: String,
        message: String,
    },

    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PermissionScope(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::GatewayAuth(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GatewayProtocol { .. } => StatusCode::BAD_GATEWAY,
            AppError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Decryption(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// A short machine-readable code distinct from the HTTP status, carried
    /// in the `{success:false, error}` envelope (spec.md §6.1).
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::PermissionScope(_) => "permission_scope",
            AppError::GatewayAuth(_) => "gateway_auth",
            AppError::GatewayProtocol { .. } => "gateway_protocol",
            AppError::GatewayUnavailable(_) => "gateway_unavailable",
            AppError::Integrity(_) => "integrity",
            AppError::Decryption(_) => "decryption",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Never leak the gateway's raw error body or internal details to callers.
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "internal error".to_string()
            }
            AppError::GatewayProtocol { .. }
            | AppError::GatewayUnavailable(_)
            | AppError::GatewayAuth(_) => {
                tracing::warn!(error = %self, "gateway error surfaced to caller");
                "upstream gateway error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message,
            }
        });

        if let AppError::RateLimited {
            retry_after_secs: Some(secs),
        } = &self
        {
            body["error"]["retryAfterSecs"] = json!(secs);
        }

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
