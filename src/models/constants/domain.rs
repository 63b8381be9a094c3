use std::time::Duration;

/// Token cache skew (spec.md §4.A: "now < acquiredAt + expiresIn − skew").
pub const TOKEN_CACHE_SKEW: Duration = Duration::from_secs(30);

/// Gateway Client retry/backoff defaults (spec.md §4.A).
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
pub const BACKOFF_BASE: Duration = Duration::from_millis(250);
pub const BACKOFF_FACTOR: u32 = 2;
pub const BACKOFF_CAP: Duration = Duration::from_secs(8);

/// HI Fetch Orchestrator worker pool and queue (spec.md §5).
pub const HI_FETCH_WORKER_POOL_SIZE: usize = 8;
pub const HI_FETCH_QUEUE_CAPACITY: usize = 1024;
pub const HI_FETCH_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// `Retry-After` value returned to ABDM when the processing queue is full (spec.md §5).
pub const HI_FETCH_BACKPRESSURE_RETRY_AFTER_SECS: u64 = 5;

/// Expiry scanner cadence (spec.md §4.B: "Runs at most once per minute").
pub const EXPIRY_SCANNER_MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Graceful shutdown drain deadline (spec.md §5).
pub const SHUTDOWN_DRAIN_DEADLINE: Duration = Duration::from_secs(30);

/// Webhook replay window for the HMAC nonce/timestamp verifier (spec.md §4.F).
pub const WEBHOOK_REPLAY_WINDOW: Duration = Duration::from_secs(5 * 60);
