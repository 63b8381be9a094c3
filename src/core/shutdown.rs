use std::time::Duration;

use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Completes on SIGINT or SIGTERM. Used as the root cancellation signal for
/// the server, the worker pool, and both background tasks so a single
/// Ctrl-C (or `kill`) drains everything in step (spec.md §5, §9).
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Root cancellation token plus the drain deadline background tasks and the
/// HI fetch worker pool should respect once shutdown begins.
#[derive(Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
    drain_deadline: Duration,
}

impl ShutdownHandle {
    pub fn new(drain_deadline: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            drain_deadline,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn drain_deadline(&self) -> Duration {
        self.drain_deadline
    }

    /// Spawns a task that cancels the token on SIGINT/SIGTERM.
    pub fn spawn_listener(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received, draining in-flight work");
            token.cancel();
        });
    }
}
