//! Error types for retry runs.

use std::time::Duration;

use super::cancel::CancelReason;

/// Why a retry run failed.
///
/// Only two outcomes end a run in failure: the attempt bound was passed, or
/// the cancellation signal fired. The operation's own error is never
/// inspected; it is carried along so callers can see what went wrong last.
///
/// # Examples
///
/// ```rust
/// use backwater::{retry, RetryConfig, RetryError};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let config = RetryConfig::default()
///     .with_max_attempts(2)
///     .with_initial_delay(Duration::from_millis(1));
///
/// match retry(|| async { Err::<(), _>("always fails") }, config).await {
///     Err(RetryError::Exhausted { last_error, attempts, .. }) => {
///         assert_eq!(last_error, "always fails");
///         assert_eq!(attempts, 3); // 1 initial + 2 retries
///     }
///     other => panic!("Expected exhaustion, got {:?}", other),
/// }
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every permitted attempt failed.
    Exhausted {
        /// The error from the final attempt.
        last_error: E,
        /// Total number of invocations (initial + retries).
        attempts: u32,
        /// Time from the first invocation until the run gave up.
        elapsed: Duration,
    },
    /// The cancellation signal fired before the run could finish.
    Cancelled {
        /// The reason reported by the signal.
        reason: CancelReason,
        /// The most recent operation error, if any attempt had failed.
        last_error: Option<E>,
        /// Number of invocations that were started.
        attempts: u32,
        /// Time from the first invocation until cancellation was observed.
        elapsed: Duration,
    },
}

impl<E> RetryError<E> {
    /// Returns true if the attempt bound was passed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Returns true if the cancellation signal ended the run.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The cancellation reason, if cancelled.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            Self::Cancelled { reason, .. } => Some(*reason),
            Self::Exhausted { .. } => None,
        }
    }

    /// Get a reference to the most recent operation error.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Extract the most recent operation error, discarding metadata.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::Cancelled { last_error, .. } => last_error,
        }
    }

    /// Number of invocations made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Time spent in the run.
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Exhausted { elapsed, .. } | Self::Cancelled { elapsed, .. } => *elapsed,
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted {
                last_error,
                attempts,
                elapsed,
            } => write!(
                f,
                "max retry attempts exceeded after {} attempts ({:?}): {}",
                attempts, elapsed, last_error
            ),
            Self::Cancelled {
                reason,
                last_error: Some(last_error),
                attempts,
                ..
            } => write!(
                f,
                "{} after {} attempts: {}",
                reason, attempts, last_error
            ),
            Self::Cancelled {
                reason, attempts, ..
            } => write!(f, "{} after {} attempts", reason, attempts),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last_error().map(|e| e as &(dyn std::error::Error + 'static))
    }
}
