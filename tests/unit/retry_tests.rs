/*!
 * Tests for retry with backoff and the network monitor
 */

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use blogflow::errors::{BackendError, ConsoleError};
use blogflow::polling::{NetworkMonitor, RetryPolicy, load_with_retry, with_slow_notice};

fn unavailable() -> BackendError {
    BackendError::ApiError {
        status_code: 503,
        message: "service unavailable".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_load_with_retry_withPersistentFailure_shouldBackOffExponentially() {
    let monitor = NetworkMonitor::new();
    let attempts: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

    let result: Result<(), ConsoleError> = load_with_retry(
        || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.lock().push(Instant::now());
                Err::<(), _>(unavailable())
            }
        },
        &RetryPolicy::default(),
        &monitor,
    )
    .await;

    let attempts = attempts.lock().clone();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[1] - attempts[0], Duration::from_millis(1000));
    assert_eq!(attempts[2] - attempts[1], Duration::from_millis(2000));
    assert!(matches!(
        result,
        Err(ConsoleError::Backend(BackendError::ApiError { status_code: 503, .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_load_with_retry_withEventualSuccess_shouldReturnValue() {
    let monitor = NetworkMonitor::new();
    let calls = Arc::new(AtomicU32::new(0));

    let result = load_with_retry(
        || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(unavailable())
                } else {
                    Ok(vec!["캠핑"])
                }
            }
        },
        &RetryPolicy::default(),
        &monitor,
    )
    .await;

    assert_eq!(result.unwrap(), vec!["캠핑"]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_load_with_retry_withLastErrorDifferent_shouldSurfaceLastError() {
    let monitor = NetworkMonitor::new();
    let calls = Arc::new(AtomicU32::new(0));

    let result: Result<(), ConsoleError> = load_with_retry(
        || {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(BackendError::ParseError(format!("attempt {}", n + 1)))
            }
        },
        &RetryPolicy::new(2, Duration::from_millis(10)),
        &monitor,
    )
    .await;

    match result {
        Err(ConsoleError::Backend(BackendError::ParseError(message))) => assert_eq!(message, "attempt 2"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_load_with_retry_whenOffline_shouldStopWithoutRetrying() {
    let monitor = NetworkMonitor::new();
    let calls = Arc::new(AtomicU32::new(0));

    let result: Result<(), ConsoleError> = load_with_retry(
        || {
            let calls = Arc::clone(&calls);
            let monitor = monitor.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                monitor.mark_offline();
                Err::<(), _>(BackendError::ConnectionError("connection refused".to_string()))
            }
        },
        &RetryPolicy::default(),
        &monitor,
    )
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(ConsoleError::NetworkUnavailable(_))));
}

#[tokio::test(start_paused = true)]
async fn test_load_with_retry_withZeroRetries_shouldStillAttemptOnce() {
    let monitor = NetworkMonitor::new();
    let calls = Arc::new(AtomicU32::new(0));

    let result = load_with_retry(
        || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BackendError>(42)
            }
        },
        &RetryPolicy::new(0, Duration::from_millis(10)),
        &monitor,
    )
    .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_delay_for_withLargeAttempt_shouldSaturate() {
    let policy = RetryPolicy::new(3, Duration::from_secs(1));
    assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    assert!(policy.delay_for(200) >= Duration::from_secs(1 << 31));
}

#[test]
fn test_network_monitor_withTransitions_shouldShareStateAcrossClones() {
    let monitor = NetworkMonitor::new();
    let observer = monitor.clone();
    assert!(observer.is_online());

    monitor.mark_offline();
    assert!(!observer.is_online());
    monitor.mark_offline();
    assert!(!observer.is_online());

    observer.mark_online();
    assert!(monitor.is_online());
}

#[tokio::test(start_paused = true)]
async fn test_with_slow_notice_withSlowFuture_shouldFireOnceAndStillComplete() {
    let fired = AtomicU32::new(0);
    let started = Instant::now();

    let value = with_slow_notice(
        async {
            tokio::time::sleep(Duration::from_secs(90)).await;
            "images"
        },
        Duration::from_secs(60),
        || {
            fired.fetch_add(1, Ordering::SeqCst);
        },
    )
    .await;

    assert_eq!(value, "images");
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(started.elapsed(), Duration::from_secs(90));
}
