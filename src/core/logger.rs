use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// Respects `RUST_LOG` if set, otherwise falls back to `log_level` from
/// [`super::config::AppConfig`]. JSON output is used outside local
/// development so log lines are directly ingestible by the regulatory
/// audit pipeline's log shipper (spec.md §7: audit trail must be
/// exportable).
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let subscriber = fmt().with_env_filter(filter).with_target(true);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
