use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[derive(Clone)]
struct CachedToken {
    token: String,
    acquired_at: Instant,
    expires_in: Duration,
}

impl CachedToken {
    fn is_fresh(&self, skew: Duration) -> bool {
        Instant::now() < self.acquired_at + self.expires_in.saturating_sub(skew)
    }
}

/// Singleton bearer-token cache with single-flight acquisition
/// (spec.md §4.A). A `Mutex` held across the whole "check, and if stale,
/// fetch" sequence is the single-flight mechanism: the first caller to see
/// a stale token performs the HTTP call while later callers simply wait
/// for the same lock, rather than duplicating work.
pub struct TokenCache {
    skew: Duration,
    state: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(skew: Duration) -> Self {
        Self {
            skew,
            state: Mutex::new(None),
        }
    }

    /// Returns a fresh token, invoking `fetch` to acquire one if the
    /// cached value is missing or about to expire.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> anyhow::Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<(String, Duration)>>,
    {
        let mut guard = self.state.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.is_fresh(self.skew) {
                return Ok(cached.token.clone());
            }
        }
        let (token, expires_in) = fetch().await?;
        *guard = Some(CachedToken {
            token: token.clone(),
            acquired_at: Instant::now(),
            expires_in,
        });
        Ok(token)
    }

    /// Forces the next call to re-acquire, used after a 401 (spec.md §4.A).
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }
}

pub type SharedTokenCache = Arc<TokenCache>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn concurrent_misses_fetch_once() {
        let cache = Arc::new(TokenCache::new(Duration::from_secs(30)));
        let fetch_count = Arc::new(AtomicU32::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let cache = cache.clone();
            let fetch_count = fetch_count.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_refresh(|| async move {
                        fetch_count.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok(("tok".to_string(), Duration::from_secs(3600)))
                    })
                    .await
            }));
        }

        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(fetch_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let cache = TokenCache::new(Duration::from_secs(30));
        let _ = cache
            .get_or_refresh(|| async { Ok(("a".to_string(), Duration::from_secs(3600))) })
            .await
            .unwrap();
        cache.invalidate().await;
        let token = cache
            .get_or_refresh(|| async { Ok(("b".to_string(), Duration::from_secs(3600))) })
            .await
            .unwrap();
        assert_eq!(token, "b");
    }
}
