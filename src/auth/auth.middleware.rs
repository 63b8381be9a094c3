use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::auth_service::{AuthService, AuthenticatedUser};
use crate::core::errors::AppError;
use crate::models::types::UserRole;

/// Extracts and verifies the bearer token, attaching [`AuthenticatedUser`]
/// to request extensions for downstream handlers (spec.md §4.F).
pub async fn authenticate(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(AppError::Unauthenticated);
    };

    let user = auth_service.verify_token(token).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Rejects the request unless the authenticated user holds `role`
/// (spec.md §4.F role-based access: doctor vs admin surfaces).
pub fn require_role(user: &AuthenticatedUser, role: UserRole) -> Result<(), AppError> {
    if user.role == role || user.role == UserRole::Admin {
        Ok(())
    } else {
        Err(AppError::Unauthorized(format!(
            "requires role {role:?}, caller has {:?}",
            user.role
        )))
    }
}

/// §4.F ownership rule: a doctor may only act on resources owned by them;
/// admins bypass the check.
pub fn require_owner_or_admin(user: &AuthenticatedUser, owner_id: Uuid) -> Result<(), AppError> {
    if user.role == UserRole::Admin || user.user_id == owner_id {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "doctors may only act on their own patients' resources".into(),
        ))
    }
}
