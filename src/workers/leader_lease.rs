use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};

/// Single-leader election via a Postgres advisory lock (spec.md §5: "only
/// one deployed instance runs the expiry scanner and watchdog at a time").
///
/// Holds the connection the lock was taken on for its whole lifetime —
/// advisory locks are session-scoped, so returning the connection to the
/// pool without unlocking first would hand another caller a connection
/// that's silently still holding it.
pub struct LeaderLease {
    conn: PoolConnection<Postgres>,
    key: i64,
}

impl LeaderLease {
    pub async fn try_acquire(pool: &PgPool, key: i64) -> anyhow::Result<Option<Self>> {
        let mut conn = pool.acquire().await?;
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(key)
            .fetch_one(&mut *conn)
            .await?;

        if acquired {
            Ok(Some(Self { conn, key }))
        } else {
            Ok(None)
        }
    }

    pub async fn release(mut self) {
        if let Err(e) = sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(self.key)
            .execute(&mut *self.conn)
            .await
        {
            tracing::warn!(key = self.key, error = %e, "failed to release leader lease advisory lock");
        }
    }
}
