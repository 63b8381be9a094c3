use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::config::AbdmConfig;
use crate::core::errors::AppError;
use crate::gateway::backoff::delay_for_attempt;
use crate::gateway::signing::{new_correlation_id, CORRELATION_HEADER, IDEMPOTENCY_HEADER};
use crate::gateway::token_cache::TokenCache;
use crate::gateway::types::{TokenRequest, TokenResponse};
use crate::models::constants::{BACKOFF_BASE, BACKOFF_CAP, BACKOFF_FACTOR, TOKEN_CACHE_SKEW};

/// Thin HTTP client for the ABDM gateway (spec.md §4.A). Owns token
/// acquisition/caching and the retry policy; callers only ever see
/// [`AppError`]'s gateway variants, never a raw `reqwest::Error`.
pub struct GatewayClient {
    http: Client,
    config: AbdmConfig,
    tokens: TokenCache,
}

impl GatewayClient {
    pub fn new(config: AbdmConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            http,
            config,
            tokens: TokenCache::new(TOKEN_CACHE_SKEW),
        })
    }

    pub async fn authenticate(&self) -> Result<String, AppError> {
        self.tokens
            .get_or_refresh(|| async {
                let body = TokenRequest::new(&self.config.client_id, &self.config.client_secret);
                let response = self
                    .http
                    .post(&self.config.auth_url)
                    .json(&body)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    anyhow::bail!("token endpoint returned {}", response.status());
                }

                let parsed: TokenResponse = response.json().await?;
                Ok((parsed.access_token, Duration::from_secs(parsed.expires_in)))
            })
            .await
            .map_err(|e| AppError::GatewayAuth(e.to_string()))
    }

    /// POSTs `body` to `path`. When `idempotency_key` is `Some`, the call
    /// is treated as idempotent and retried on network error or 5xx.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
        idempotency_key: Option<&str>,
    ) -> Result<T, AppError> {
        self.call(Method::POST, path, Some(serde_json::to_value(body).unwrap()), idempotency_key.is_some())
            .await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, AppError> {
        let url = self.url_with_params(path, params);
        self.call_url(Method::GET, &url, None, true).await
    }

    fn url_with_params(&self, path: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        if !params.is_empty() {
            let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        idempotent: bool,
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        self.call_url(method, &url, body, idempotent).await
    }

    async fn call_url<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        idempotent: bool,
    ) -> Result<T, AppError> {
        let correlation_id = new_correlation_id();
        let mut attempt = 0u32;
        let mut forced_reauth = false;

        loop {
            let start = std::time::Instant::now();
            let token = self.authenticate().await?;

            let mut request = self
                .http
                .request(method.clone(), url)
                .bearer_auth(&token)
                .header(CORRELATION_HEADER, &correlation_id);

            if idempotent {
                request = request.header(IDEMPOTENCY_HEADER, &correlation_id);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }

            let result = request.send().await;
            let latency_ms = start.elapsed().as_millis();

            match result {
                Err(e) => {
                    tracing::warn!(%correlation_id, path = %url, %latency_ms, error = %e, "gateway call network error");
                    if idempotent && attempt < self.config.max_retry_attempts {
                        attempt += 1;
                        tokio::time::sleep(delay_for_attempt(attempt, BACKOFF_BASE, BACKOFF_FACTOR, BACKOFF_CAP)).await;
                        continue;
                    }
                    return Err(AppError::GatewayUnavailable(e.to_string()));
                }
                Ok(response) => {
                    let status = response.status();
                    tracing::info!(%correlation_id, path = %url, %latency_ms, %status, "gateway call completed");

                    if status == StatusCode::UNAUTHORIZED && !forced_reauth {
                        forced_reauth = true;
                        self.tokens.invalidate().await;
                        continue;
                    }
                    if status == StatusCode::UNAUTHORIZED {
                        return Err(AppError::GatewayAuth("gateway rejected refreshed token".into()));
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = response
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok());
                        if idempotent && attempt < self.config.max_retry_attempts {
                            attempt += 1;
                            let wait = retry_after
                                .map(Duration::from_secs)
                                .unwrap_or_else(|| delay_for_attempt(attempt, BACKOFF_BASE, BACKOFF_FACTOR, BACKOFF_CAP));
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                        return Err(AppError::RateLimited { retry_after_secs: retry_after });
                    }

                    if status.is_server_error() {
                        if idempotent && attempt < self.config.max_retry_attempts {
                            attempt += 1;
                            tokio::time::sleep(delay_for_attempt(attempt, BACKOFF_BASE, BACKOFF_FACTOR, BACKOFF_CAP)).await;
                            continue;
                        }
                        return Err(AppError::GatewayUnavailable(format!("gateway returned {status}")));
                    }

                    if status.is_client_error() {
                        let body: crate::gateway::types::GatewayErrorBody =
                            response.json().await.unwrap_or(crate::gateway::types::GatewayErrorBody {
                                code: None,
                                message: None,
                            });
                        return Err(AppError::GatewayProtocol {
                            status: status.as_u16(),
                            code: body.code.unwrap_or_else(|| "unknown".into()),
                            message: body.message.unwrap_or_else(|| "gateway rejected request".into()),
                        });
                    }

                    return response
                        .json::<T>()
                        .await
                        .map_err(|e| AppError::GatewayUnavailable(format!("response decode failed: {e}")));
                }
            }
        }
    }
}
