//! End-to-end retry scenarios through the public API.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use backwater::prelude::*;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
enum FetchError {
    Unavailable,
    Timeout,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Unavailable => write!(f, "service unavailable"),
            FetchError::Timeout => write!(f, "request timed out"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Fails `failures` times, then returns the number of calls made.
struct Flaky {
    calls: AtomicU32,
    failures: u32,
}

impl Flaky {
    fn new(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            failures,
        })
    }

    async fn call(&self) -> Result<u32, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            Err(FetchError::Unavailable)
        } else {
            Ok(n)
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[tokio::test(start_paused = true)]
async fn test_fails_three_times_then_succeeds() {
    let flaky = Flaky::new(3);

    let result = retry_with_data(
        {
            let flaky = flaky.clone();
            move || {
                let flaky = flaky.clone();
                async move { flaky.call().await }
            }
        },
        RetryConfig::from_options([RetryOption::MaxAttempts(5)]),
    )
    .await;

    assert_eq!(result, Ok(4));
    assert_eq!(flaky.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_always_fails_with_bound_two() {
    let flaky = Flaky::new(u32::MAX);

    let result = retry(
        {
            let flaky = flaky.clone();
            move || {
                let flaky = flaky.clone();
                async move { flaky.call().await.map(|_| ()) }
            }
        },
        RetryConfig::from_options([RetryOption::MaxAttempts(2)]),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.is_exhausted());
    assert_eq!(flaky.calls(), 3);
    assert_eq!(err.last_error(), Some(&FetchError::Unavailable));

    // The exhaustion error chains the operation's error.
    let source = std::error::Error::source(&err).map(|e| e.to_string());
    assert_eq!(source.as_deref(), Some("service unavailable"));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_beats_slow_operation() {
    let cancel = Cancellation::with_timeout(Duration::from_millis(100));
    let start = Instant::now();

    let result = retry_with_cancel(
        || async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Err::<(), _>(FetchError::Timeout)
        },
        RetryConfig::default(),
        &cancel,
    )
    .await;

    let elapsed = start.elapsed();
    let err = result.unwrap_err();
    assert_eq!(err.cancel_reason(), Some(CancelReason::DeadlineExceeded));
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_windows() {
    let stamps = Arc::new(Mutex::new(Vec::new()));

    let _ = retry(
        {
            let stamps = stamps.clone();
            move || {
                stamps.lock().unwrap().push(Instant::now());
                async { Err::<(), _>(FetchError::Unavailable) }
            }
        },
        RetryConfig::from_options([
            RetryOption::MaxAttempts(3),
            RetryOption::InitialDelay(Duration::from_millis(500)),
            RetryOption::BackoffMultiplier(1.5),
            RetryOption::JitterFraction(0.5),
        ]),
    )
    .await;

    let stamps = stamps.lock().unwrap();
    let gaps: Vec<Duration> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
    assert_eq!(gaps.len(), 3);

    let mut base = Duration::from_millis(500);
    for (i, gap) in gaps.iter().enumerate() {
        let min = base / 2;
        let max = base + base / 2 + Duration::from_millis(1);
        assert!(
            *gap >= min && *gap <= max,
            "gap {} = {:?}, want [{:?}, {:?}]",
            i,
            gap,
            min,
            max
        );
        base = base.mul_f64(1.5);
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_from_another_task_during_long_backoff() {
    let cancel = Cancellation::new();
    let run = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            retry_with_data_and_cancel(
                || async { Err::<u32, _>(FetchError::Unavailable) },
                RetryConfig::default()
                    .with_max_attempts(0)
                    .with_initial_delay(Duration::from_secs(3600)),
                &cancel,
            )
            .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let err = run.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.attempts(), 1);
    assert_eq!(err.into_last_error(), Some(FetchError::Unavailable));
}

#[tokio::test(start_paused = true)]
async fn test_child_cancellation_follows_parent() {
    let parent = Cancellation::new();
    let child = parent.child_with_timeout(Duration::from_secs(60));

    let handle = parent.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
    });

    let result = retry_with_cancel(
        || async { Err::<(), _>(FetchError::Unavailable) },
        RetryConfig::default().with_initial_delay(Duration::from_secs(1)),
        &child,
    )
    .await;

    assert_eq!(
        result.unwrap_err().cancel_reason(),
        Some(CancelReason::Cancelled)
    );
}

#[tokio::test(start_paused = true)]
async fn test_zero_bound_never_stops_on_its_own() {
    let flaky = Flaky::new(50);

    let result = retry_with_data(
        {
            let flaky = flaky.clone();
            move || {
                let flaky = flaky.clone();
                async move { flaky.call().await }
            }
        },
        RetryConfig::default()
            .with_max_attempts(0)
            .with_initial_delay(Duration::from_millis(1))
            .with_backoff_multiplier(1.0),
    )
    .await;

    assert_eq!(result, Ok(51));
}

#[tokio::test(start_paused = true)]
async fn test_hooks_report_growing_delays() {
    let engine = RetryEngine::new(
        RetryConfig::default()
            .with_max_attempts(4)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_jitter_fraction(0.0),
    );
    let mut delays = Vec::new();

    let result = engine
        .run_with_hooks(
            || async { Err::<(), _>(FetchError::Unavailable) },
            &NeverCancel,
            |event: &RetryEvent<'_, FetchError>| delays.push(event.next_delay),
        )
        .await;

    assert_eq!(result.unwrap_err().attempts(), 5);
    assert_eq!(
        delays,
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400),
            Duration::from_millis(800),
        ]
    );
}
