//! Bearer token verification against the external auth service, plus the
//! role/ownership checks API handlers need (spec.md §4.F).

#[path = "auth.middleware.rs"]
pub mod auth_middleware;
#[path = "auth.service.rs"]
pub mod auth_service;

pub use auth_middleware::{authenticate, require_owner_or_admin, require_role};
pub use auth_service::{AuthService, AuthenticatedUser};

use std::sync::Arc;
use std::time::Duration;

pub struct AuthModule {
    pub service: Arc<AuthService>,
}

impl AuthModule {
    pub fn new(auth_service_url: String, cache_ttl: Duration) -> Self {
        Self {
            service: Arc::new(AuthService::new(auth_service_url, cache_ttl)),
        }
    }
}
