use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Failed flush attempts after which an event is given up on. `0` disables the limit.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

/// Backoff state for the flush path.
///
/// Tracks consecutive failed flushes and the earliest instant at which the
/// interval task may flush again.
#[derive(Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
    consecutive_failures: u32,
    next_attempt_at: Option<Instant>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
            next_attempt_at: None,
        }
    }

    /// Records a retryable failure and returns the backoff delay it starts.
    pub fn record_failure(&mut self) -> Duration {
        let delay = self.calculate_delay(self.consecutive_failures);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.next_attempt_at = Some(Instant::now() + delay);
        delay
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.next_attempt_at = None;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn remaining_backoff(&self) -> Option<Duration> {
        self.next_attempt_at
            .map(|next| next.saturating_duration_since(Instant::now()))
            .filter(|d| !d.is_zero())
    }

    /// Whether an event that has failed `attempts` times should be given up on.
    pub fn should_give_up(&self, attempts: u32) -> bool {
        self.config.max_attempts != 0 && attempts >= self.config.max_attempts
    }

    /// Exponential backoff from `base_delay`, doubling per attempt.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_millis = self.config.base_delay.as_millis() as u64;
        let multiplier = 2_u64.saturating_pow(attempt);
        let base_delay = Duration::from_millis(base_millis.saturating_mul(multiplier));

        // Apply maximum delay cap
        let capped_delay = std::cmp::min(base_delay, self.config.max_delay);

        if self.config.jitter {
            apply_jitter(capped_delay)
        } else {
            capped_delay
        }
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    let jitter_factor = rng.random_range(0.5..1.5); // ±50% jitter
    let jittered_millis = (delay.as_millis() as f64 * jitter_factor) as u64;
    Duration::from_millis(jittered_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter: false,
        }
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy::new(config());
        assert_eq!(policy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(800));
        assert_eq!(policy.calculate_delay(4), Duration::from_secs(1));
        assert_eq!(policy.calculate_delay(200), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut cfg = config();
        cfg.jitter = true;
        let policy = RetryPolicy::new(cfg);
        for _ in 0..100 {
            let delay = policy.calculate_delay(0);
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_give_up_threshold() {
        let policy = RetryPolicy::new(config());
        assert!(!policy.should_give_up(2));
        assert!(policy.should_give_up(3));

        let policy = RetryPolicy::new(RetryConfig::default());
        assert!(!policy.should_give_up(u32::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_window_until_deadline() {
        let mut policy = RetryPolicy::new(config());
        assert!(policy.remaining_backoff().is_none());

        assert_eq!(policy.record_failure(), Duration::from_millis(100));
        assert!(policy.remaining_backoff().is_some());
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(policy.remaining_backoff().is_none());

        assert_eq!(policy.record_failure(), Duration::from_millis(200));
        assert_eq!(policy.consecutive_failures(), 2);

        policy.record_success();
        assert_eq!(policy.consecutive_failures(), 0);
        assert!(policy.remaining_backoff().is_none());
    }
}
