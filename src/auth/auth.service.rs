use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::errors::AppError;
use crate::models::types::UserRole;

/// A caller identity verified against the external auth service
/// (spec.md §4.F — user identity and roles are owned elsewhere; this
/// service only verifies bearer tokens and caches the verdict).
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    user_id: String,
    role: String,
}

struct CacheEntry {
    user: AuthenticatedUser,
    expires_at: Instant,
}

/// Verifies bearer tokens against `AUTH_SERVICE_URL` and caches verdicts
/// for `cache_ttl` so every request doesn't round-trip to the identity
/// provider (spec.md §6.4: `CACHE_TTL_SECONDS`).
pub struct AuthService {
    client: Client,
    base_url: String,
    cache_ttl: Duration,
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl AuthService {
    pub fn new(base_url: String, cache_ttl: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url,
            cache_ttl,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        if let Some(user) = self.cached(token).await {
            return Ok(user);
        }

        let url = format!("{}/verify", self.base_url.trim_end_matches('/'));
        let response = match self.client.post(&url).bearer_auth(token).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "auth service unreachable");
                return Err(AppError::Unauthenticated);
            }
        };

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthenticated);
        }
        if !response.status().is_success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "auth service returned {}",
                response.status()
            )));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .context("failed to decode auth service response")?;

        let role = match body.role.as_str() {
            "doctor" => UserRole::Doctor,
            "admin" => UserRole::Admin,
            other => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "auth service returned unknown role: {other}"
                )))
            }
        };

        let user_id = body
            .user_id
            .parse::<Uuid>()
            .context("auth service returned a non-UUID user_id")?;

        let user = AuthenticatedUser { user_id, role };

        self.cache.write().await.insert(
            token.to_string(),
            CacheEntry {
                user: user.clone(),
                expires_at: Instant::now() + self.cache_ttl,
            },
        );

        Ok(user)
    }

    async fn cached(&self, token: &str) -> Option<AuthenticatedUser> {
        let cache = self.cache.read().await;
        let entry = cache.get(token)?;
        if entry.expires_at > Instant::now() {
            Some(entry.user.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_cache_entry_is_ignored() {
        let service = AuthService::new("http://localhost:9000".into(), Duration::from_millis(0));
        service.cache.write().await.insert(
            "tok".into(),
            CacheEntry {
                user: AuthenticatedUser {
                    user_id: Uuid::new_v4(),
                    role: UserRole::Doctor,
                },
                expires_at: Instant::now() - Duration::from_secs(1),
            },
        );
        assert!(service.cached("tok").await.is_none());
    }
}
