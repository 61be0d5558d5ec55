use core_logic::{is_transient_error, with_retry, with_retry_when, RetryConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_retry_success_first_try() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok("success".to_string())
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_success_after_failures() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if count < 3 {
            Err(anyhow::anyhow!("temporary error"))
        } else {
            Ok("success".to_string())
        }
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_all_failures() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("permanent error"))
    })
    .await;

    assert!(result.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 4);
}

#[test]
fn test_exponential_delay_is_capped() {
    let config = RetryConfig::new(5, 10).without_jitter();
    assert_eq!(config.delay_for(0), Duration::from_millis(10));
    assert_eq!(config.delay_for(2), Duration::from_millis(40));
    assert_eq!(config.delay_for(10), Duration::from_millis(300));
}

#[tokio::test]
async fn test_fixed_config_counts_total_attempts() {
    let config = RetryConfig::fixed(3, 20);
    assert_eq!(config.max_attempts(), 3);
    assert_eq!(config.delay_for(0), Duration::from_millis(20));
    assert_eq!(config.delay_for(5), Duration::from_millis(20));

    let start = tokio::time::Instant::now();
    let outcome = with_retry_when(
        config,
        "fixed_op",
        |attempt| async move {
            if attempt < 3 {
                Err(format!("attempt {} failed", attempt))
            } else {
                Ok(attempt)
            }
        },
        |_| true,
    )
    .await;

    assert_eq!(outcome.result, Ok(3));
    assert_eq!(outcome.attempts, 3);
    // two inter-attempt delays
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn test_retry_when_stops_on_permanent_error() {
    let counter = Arc::new(AtomicUsize::new(0));
    let outcome: core_logic::Retried<(), String> = with_retry_when(
        RetryConfig::fixed(5, 10),
        "gated_op",
        |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("insufficient funds".to_string())
            }
        },
        |e: &String| !e.contains("insufficient"),
    )
    .await;

    assert!(outcome.result.is_err());
    assert_eq!(outcome.attempts, 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_with_delay() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(2, 50).without_jitter();

    let start = tokio::time::Instant::now();
    let _: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        if counter.load(Ordering::SeqCst) < 3 {
            Err(anyhow::anyhow!("temp"))
        } else {
            Ok("done".to_string())
        }
    })
    .await;

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100));
}

#[test]
fn test_transient_error_detection() {
    let timeout_error = anyhow::anyhow!("Request timeout");
    let rate_limit_error = anyhow::anyhow!("429 Too Many Requests");
    let nonce_error = anyhow::anyhow!("nonce too low: next nonce 5");
    let permanent_error = anyhow::anyhow!("Invalid address");

    assert!(is_transient_error(&timeout_error));
    assert!(is_transient_error(&rate_limit_error));
    assert!(is_transient_error(&nonce_error));
    assert!(!is_transient_error(&permanent_error));
}

#[test]
fn test_transient_error_case_insensitive() {
    let timeout_upper = anyhow::anyhow!("TIMEOUT");
    let timeout_mixed = anyhow::anyhow!("TiMeOuT");

    assert!(is_transient_error(&timeout_upper));
    assert!(is_transient_error(&timeout_mixed));
}
