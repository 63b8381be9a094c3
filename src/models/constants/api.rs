/// Pagination (spec.md §6.4 validation table: "pagination limit: 1..100, default 10").
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MIN_PAGE_SIZE: u32 = 1;

/// Timeouts (spec.md §6.4).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DATABASE_TIMEOUT_SECS: u64 = 30;

/// Free-text reason bounds (spec.md §6.4 validation table).
pub const REASON_MIN_LENGTH: usize = 10;
pub const REASON_MAX_LENGTH: usize = 500;
