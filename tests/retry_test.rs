use langfuse_ingest::reliability::{RetryConfig, RetryPolicy};
use std::time::Duration;

fn policy(jitter: bool) -> RetryPolicy {
    RetryPolicy::new(RetryConfig {
        max_attempts: 5,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(30),
        jitter,
    })
}

#[test]
fn test_exponential_backoff_timing() {
    let policy = policy(false);
    let delays: Vec<_> = (0..5).map(|attempt| policy.calculate_delay(attempt)).collect();

    assert_eq!(
        delays,
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400),
            Duration::from_millis(800),
            Duration::from_millis(1600),
        ]
    );
}

#[test]
fn test_jitter_stays_within_half_of_the_delay() {
    let policy = policy(true);
    for _ in 0..100 {
        let delay = policy.calculate_delay(1);
        assert!(delay >= Duration::from_millis(100));
        assert!(delay <= Duration::from_millis(300));
    }
}

#[test]
fn test_max_delay_cap_survives_huge_attempt_counts() {
    let policy = RetryPolicy::new(RetryConfig {
        max_delay: Duration::from_secs(5),
        base_delay: Duration::from_millis(100),
        jitter: false,
        ..RetryConfig::default()
    });

    assert_eq!(policy.calculate_delay(10), Duration::from_secs(5));
    assert_eq!(policy.calculate_delay(u32::MAX), Duration::from_secs(5));
}

#[test]
fn test_give_up_threshold() {
    let policy = policy(false);
    assert!(!policy.should_give_up(4));
    assert!(policy.should_give_up(5));

    let unlimited = RetryPolicy::new(RetryConfig {
        max_attempts: 0,
        ..RetryConfig::default()
    });
    assert!(!unlimited.should_give_up(u32::MAX));
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_failures_grow_the_backoff() {
    let mut policy = policy(false);

    assert_eq!(policy.record_failure(), Duration::from_millis(100));
    assert_eq!(policy.record_failure(), Duration::from_millis(200));
    assert_eq!(policy.consecutive_failures(), 2);
    assert!(policy.remaining_backoff().is_some());

    tokio::time::advance(Duration::from_millis(201)).await;
    assert_eq!(policy.remaining_backoff(), None);

    policy.record_failure();
    policy.record_success();
    assert_eq!(policy.consecutive_failures(), 0);
    assert_eq!(policy.remaining_backoff(), None);
}

#[test]
fn test_default_config_never_gives_up() {
    let policy = RetryPolicy::new(RetryConfig::default());
    assert!(!policy.should_give_up(5));
    assert!(!policy.should_give_up(1_000));
}
