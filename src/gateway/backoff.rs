use std::time::Duration;

use rand::Rng;

/// Exponential backoff with jitter (spec.md §4.A: base 250 ms, factor 2,
/// cap 8 s). `attempt` is zero-based.
pub fn delay_for_attempt(attempt: u32, base: Duration, factor: u32, cap: Duration) -> Duration {
    let exp = factor.saturating_pow(attempt);
    let raw = base.saturating_mul(exp).min(cap);
    let jitter_ms = rand::thread_rng().gen_range(0..=(raw.as_millis() as u64 / 4).max(1));
    raw + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_never_exceeds_cap_plus_jitter() {
        let cap = Duration::from_secs(8);
        for attempt in 0..10 {
            let d = delay_for_attempt(attempt, Duration::from_millis(250), 2, cap);
            assert!(d <= cap + cap / 4);
        }
    }

    #[test]
    fn delay_is_at_least_the_unjittered_floor() {
        let base = Duration::from_millis(250);
        let cap = Duration::from_secs(8);
        assert!(delay_for_attempt(0, base, 2, cap) >= base);
        assert!(delay_for_attempt(1, base, 2, cap) >= base * 2);
    }
}
