//! The retry loop.
//!
//! A run moves through these states:
//!
//! ```text
//! Invoking --ok--> Succeeded
//!    |
//!   err --> bound passed? --yes--> Exhausted
//!              |
//!              no --> AwaitingBackoff --timer--> Invoking
//!                          |
//!                        signal --> Cancelled
//! ```
//!
//! The cancellation signal is also raced against the in-flight operation,
//! so a slow call does not delay cancellation. The operation is always
//! polled first, which guarantees at least one invocation.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::backoff::Backoff;
use super::cancel::{CancelReason, CancelSignal, NeverCancel};
use super::config::RetryConfig;
use super::error::RetryError;
use super::timer::BackoffTimer;

/// Information about a failed attempt that is about to be retried.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// Delay before the next attempt.
    pub next_delay: Duration,
    /// Total elapsed time since the first attempt.
    pub elapsed: Duration,
}

/// Drives retry runs for one [`RetryConfig`].
///
/// The engine itself holds only the config. Every call to
/// [`run`](RetryEngine::run) creates its own attempt state and timer, so one
/// engine can serve independent runs.
///
/// # Examples
///
/// ```rust
/// use backwater::{Cancellation, RetryConfig, RetryEngine};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let engine = RetryEngine::new(
///     RetryConfig::default().with_initial_delay(Duration::from_millis(1)),
/// );
/// let calls = AtomicU32::new(0);
/// let calls = &calls;
///
/// let result = engine
///     .run(
///         move || async move {
///             if calls.fetch_add(1, Ordering::SeqCst) < 2 {
///                 Err("not yet")
///             } else {
///                 Ok(42)
///             }
///         },
///         &Cancellation::new(),
///     )
///     .await;
///
/// assert_eq!(result, Ok(42));
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryEngine {
    config: RetryConfig,
}

impl RetryEngine {
    /// Create an engine for `config`.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The config this engine runs with.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until it succeeds, the bound is passed, or `cancel` fires.
    pub async fn run<F, Fut, T, E, C>(&self, operation: F, cancel: &C) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: CancelSignal,
    {
        self.run_with_hooks(operation, cancel, |_: &RetryEvent<'_, E>| {})
            .await
    }

    /// Like [`run`](RetryEngine::run), calling `on_retry` before each backoff.
    ///
    /// The hook is not called for the failure that ends the run.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use backwater::{NeverCancel, RetryConfig, RetryEngine, RetryEvent};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let engine = RetryEngine::new(
    ///     RetryConfig::default()
    ///         .with_max_attempts(2)
    ///         .with_initial_delay(Duration::from_millis(1)),
    /// );
    /// let mut seen = Vec::new();
    ///
    /// let result = engine
    ///     .run_with_hooks(
    ///         || async { Err::<(), _>("down") },
    ///         &NeverCancel,
    ///         |event: &RetryEvent<'_, &str>| seen.push(event.attempt),
    ///     )
    ///     .await;
    ///
    /// assert!(result.unwrap_err().is_exhausted());
    /// assert_eq!(seen, vec![1, 2]);
    /// # });
    /// ```
    pub async fn run_with_hooks<F, Fut, T, E, C, H>(
        &self,
        mut operation: F,
        cancel: &C,
        mut on_retry: H,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: CancelSignal,
        H: FnMut(&RetryEvent<'_, E>),
    {
        let start = Instant::now();
        let mut backoff = Backoff::new(&self.config);
        let mut timer = BackoffTimer::new();
        let mut last_error: Option<E> = None;

        loop {
            let outcome = tokio::select! {
                biased;
                result = operation() => Some(result),
                () = cancel.signalled() => None,
            };

            let error = match outcome {
                Some(Ok(value)) => {
                    #[cfg(feature = "tracing")]
                    if backoff.attempt() > 0 {
                        tracing::debug!(
                            attempts = backoff.attempt() + 1,
                            "operation succeeded after retrying"
                        );
                    }
                    return Ok(value);
                }
                Some(Err(error)) => error,
                None => {
                    let attempts = backoff.attempt().saturating_add(1);
                    return Err(cancelled(cancel, last_error, attempts, start));
                }
            };

            let delay = backoff.record_failure(&mut rand::rng());

            if backoff.is_exhausted(self.config.max_attempts()) {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    attempts = backoff.attempt(),
                    "max retry attempts exceeded"
                );
                return Err(RetryError::Exhausted {
                    last_error: error,
                    attempts: backoff.attempt(),
                    elapsed: start.elapsed(),
                });
            }

            on_retry(&RetryEvent {
                attempt: backoff.attempt(),
                error: &error,
                next_delay: delay,
                elapsed: start.elapsed(),
            });
            last_error = Some(error);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempt = backoff.attempt(),
                ?delay,
                "operation failed, backing off"
            );

            timer.arm(delay);
            let signalled = tokio::select! {
                () = cancel.signalled() => true,
                () = timer.elapsed() => false,
            };
            if signalled {
                timer.cancel();
                return Err(cancelled(cancel, last_error, backoff.attempt(), start));
            }
        }
    }
}

fn cancelled<E, C>(
    cancel: &C,
    last_error: Option<E>,
    attempts: u32,
    start: Instant,
) -> RetryError<E>
where
    C: CancelSignal,
{
    let reason = cancel.reason().unwrap_or(CancelReason::Cancelled);

    #[cfg(feature = "tracing")]
    tracing::debug!(%reason, attempts, "retry cancelled");

    RetryError::Cancelled {
        reason,
        last_error,
        attempts,
        elapsed: start.elapsed(),
    }
}

/// Retry `operation` with `config`, without a result value or cancellation.
///
/// The operation runs at least once. With `max_attempts = N > 0` it runs at
/// most `N + 1` times; with `0` it runs until it succeeds.
///
/// # Examples
///
/// ```rust
/// use backwater::{retry, RetryConfig};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let config = RetryConfig::default().with_initial_delay(Duration::from_millis(1));
/// let result = retry(|| async { Ok::<_, String>(()) }, config).await;
/// assert!(result.is_ok());
/// # });
/// ```
pub async fn retry<F, Fut, E>(operation: F, config: RetryConfig) -> Result<(), RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    RetryEngine::new(config).run(operation, &NeverCancel).await
}

/// Retry `operation` with `config`, returning its value on success.
pub async fn retry_with_data<F, Fut, T, E>(
    operation: F,
    config: RetryConfig,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryEngine::new(config).run(operation, &NeverCancel).await
}

/// Retry `operation` until it succeeds, the bound is passed, or `cancel` fires.
///
/// # Examples
///
/// ```rust
/// use backwater::{retry_with_cancel, CancelReason, Cancellation, RetryConfig};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let cancel = Cancellation::new();
/// cancel.cancel();
///
/// let result = retry_with_cancel(
///     || async {
///         tokio::time::sleep(Duration::from_secs(5)).await;
///         Ok::<_, String>(())
///     },
///     RetryConfig::default(),
///     &cancel,
/// )
/// .await;
///
/// assert_eq!(result.unwrap_err().cancel_reason(), Some(CancelReason::Cancelled));
/// # });
/// ```
pub async fn retry_with_cancel<F, Fut, E, C>(
    operation: F,
    config: RetryConfig,
    cancel: &C,
) -> Result<(), RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    C: CancelSignal,
{
    RetryEngine::new(config).run(operation, cancel).await
}

/// Retry `operation` under `cancel`, returning its value on success.
pub async fn retry_with_data_and_cancel<F, Fut, T, E, C>(
    operation: F,
    config: RetryConfig,
    cancel: &C,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: CancelSignal,
{
    RetryEngine::new(config).run(operation, cancel).await
}
