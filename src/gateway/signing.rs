use uuid::Uuid;

/// Header ABDM correlates a request/response/callback triple by
/// (spec.md §4.A, §6.3: "correlation header").
pub const CORRELATION_HEADER: &str = "X-CM-ID";

/// Header carrying the idempotency key for POSTs that should be safely
/// retried (spec.md §4.A).
pub const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
