//! Webhook replay-resistance verifier (spec.md §4.F): every ABDM-facing
//! callback must carry an HMAC signature over a nonce/timestamp/body
//! triple, and originate from an allowlisted source IP.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::Mutex;

use crate::core::errors::AppError;
use crate::models::constants::WEBHOOK_REPLAY_WINDOW;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "X-Abdm-Signature";
const TIMESTAMP_HEADER: &str = "X-Abdm-Timestamp";
const NONCE_HEADER: &str = "X-Abdm-Nonce";

/// Holds the shared HMAC secret, the source-IP allowlist, and a bounded
/// recently-seen-nonce cache used to reject replays within the window.
pub struct WebhookSecurity {
    secret: String,
    allowed_ips: Vec<IpAddr>,
    seen_nonces: Mutex<HashMap<String, Instant>>,
}

impl WebhookSecurity {
    pub fn new(secret: String, allowed_ips: Vec<String>) -> Self {
        let allowed_ips = allowed_ips
            .iter()
            .filter_map(|ip| ip.parse::<IpAddr>().ok())
            .collect();
        Self {
            secret,
            allowed_ips,
            seen_nonces: Mutex::new(HashMap::new()),
        }
    }

    fn check_source_ip(&self, ip: IpAddr) -> Result<(), AppError> {
        if self.allowed_ips.is_empty() || self.allowed_ips.contains(&ip) {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!("source ip {ip} is not allowlisted")))
        }
    }

    fn check_signature(&self, body: &[u8], timestamp: &str, nonce: &str, signature: &str) -> Result<(), AppError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| AppError::Internal(anyhow::anyhow!("invalid webhook hmac secret length")))?;
        mac.update(timestamp.as_bytes());
        mac.update(nonce.as_bytes());
        mac.update(body);
        let expected = mac.finalize().into_bytes();
        let expected_hex = format!("{expected:x}");

        if expected_hex.as_bytes() != signature.as_bytes() {
            return Err(AppError::Unauthorized("webhook signature mismatch".into()));
        }
        Ok(())
    }

    fn check_timestamp(&self, timestamp: &str) -> Result<(), AppError> {
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| AppError::Validation("invalid webhook timestamp".into()))?;
        let now = chrono::Utc::now().timestamp();
        if (now - ts).unsigned_abs() > WEBHOOK_REPLAY_WINDOW.as_secs() {
            return Err(AppError::Unauthorized("webhook timestamp outside replay window".into()));
        }
        Ok(())
    }

    async fn check_nonce(&self, nonce: &str) -> Result<(), AppError> {
        let mut seen = self.seen_nonces.lock().await;
        let now = Instant::now();
        seen.retain(|_, seen_at| now.duration_since(*seen_at) < WEBHOOK_REPLAY_WINDOW * 2);
        if seen.insert(nonce.to_string(), now).is_some() {
            return Err(AppError::Unauthorized("webhook nonce already used".into()));
        }
        Ok(())
    }
}

fn header_str<'a>(req: &'a Request, name: &str) -> Result<&'a str, AppError> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation(format!("missing {name} header")))
}

/// Axum middleware enforcing the HMAC + replay + allowlist checks on every
/// request it wraps. Buffers the body to verify the signature, then
/// reconstructs the request so downstream `Json` extractors still work.
pub async fn verify_webhook(
    State(security): State<Arc<WebhookSecurity>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    security.check_source_ip(addr.ip())?;

    let timestamp = header_str(&req, TIMESTAMP_HEADER)?.to_string();
    let nonce = header_str(&req, NONCE_HEADER)?.to_string();
    let signature = header_str(&req, SIGNATURE_HEADER)?.to_string();

    security.check_timestamp(&timestamp)?;

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::Validation(format!("failed to read webhook body: {e}")))?;

    security.check_signature(&bytes, &timestamp, &nonce, &signature)?;
    security.check_nonce(&nonce).await?;

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str, nonce: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(nonce.as_bytes());
        mac.update(body);
        format!("{:x}", mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_passes() {
        let security = WebhookSecurity::new("secret".into(), vec![]);
        let body = b"{}";
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign("secret", &timestamp, "n1", body);
        assert!(security.check_signature(body, &timestamp, "n1", &signature).is_ok());
    }

    #[test]
    fn tampered_body_fails() {
        let security = WebhookSecurity::new("secret".into(), vec![]);
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign("secret", &timestamp, "n1", b"{}");
        assert!(security
            .check_signature(b"{\"tampered\":true}", &timestamp, "n1", &signature)
            .is_err());
    }

    #[tokio::test]
    async fn repeated_nonce_is_rejected() {
        let security = WebhookSecurity::new("secret".into(), vec![]);
        security.check_nonce("n1").await.unwrap();
        assert!(security.check_nonce("n1").await.is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let security = WebhookSecurity::new("secret".into(), vec![]);
        let stale = (chrono::Utc::now().timestamp() - Duration::from_secs(3600).as_secs() as i64).to_string();
        assert!(security.check_timestamp(&stale).is_err());
    }
}
