//! Cancellation signals for retry runs.
//!
//! A retry run races its backoff timer (and the in-flight operation) against
//! a [`CancelSignal`]. The crate ships three signals:
//!
//! - [`Cancellation`]: a cloneable handle with explicit cancel, optional
//!   deadline and parent/child propagation
//! - [`NeverCancel`]: never fires; used by the entry points without a signal
//! - [`CancellationToken`]: a bare `tokio-util` token, reported as
//!   [`CancelReason::Cancelled`]

use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::timer::deadline_after;

/// Why a signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CancelReason {
    /// Cancelled explicitly.
    Cancelled,
    /// A deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// An external signal that can tell a retry run to stop.
pub trait CancelSignal {
    /// Non-blocking check.
    fn is_signalled(&self) -> bool;

    /// Completes once the signal has fired.
    fn signalled(&self) -> impl Future<Output = ()> + Send + '_;

    /// The reason, once signalled. `None` while the signal is still live.
    fn reason(&self) -> Option<CancelReason>;
}

/// A signal that never fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn is_signalled(&self) -> bool {
        false
    }

    fn signalled(&self) -> impl Future<Output = ()> + Send + '_ {
        futures::future::pending()
    }

    fn reason(&self) -> Option<CancelReason> {
        None
    }
}

impl CancelSignal for CancellationToken {
    fn is_signalled(&self) -> bool {
        self.is_cancelled()
    }

    fn signalled(&self) -> impl Future<Output = ()> + Send + '_ {
        self.cancelled()
    }

    fn reason(&self) -> Option<CancelReason> {
        self.is_cancelled().then_some(CancelReason::Cancelled)
    }
}

/// A cloneable cancellation handle with an optional deadline.
///
/// Clones share state: cancelling any clone cancels them all. Children
/// created with [`child`](Cancellation::child) fire when their parent does
/// and report the parent's reason, but cancelling a child leaves the parent
/// untouched.
///
/// # Examples
///
/// ```rust
/// use backwater::{CancelReason, CancelSignal, Cancellation};
///
/// let cancel = Cancellation::new();
/// let handle = cancel.clone();
///
/// assert!(!cancel.is_signalled());
/// handle.cancel();
/// assert!(cancel.is_signalled());
/// assert_eq!(cancel.reason(), Some(CancelReason::Cancelled));
/// ```
#[derive(Debug, Clone)]
pub struct Cancellation {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    deadline: Option<Instant>,
    reason: OnceLock<CancelReason>,
    parent: Option<Cancellation>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    /// A signal that only fires when [`cancel`](Cancellation::cancel) is called.
    pub fn new() -> Self {
        Self::build(CancellationToken::new(), None, None)
    }

    /// A signal that fires on its own once `timeout` has passed.
    ///
    /// Must be called within a tokio runtime context for paused-clock tests
    /// to observe the same clock as the retry loop.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(deadline_after(timeout))
    }

    /// A signal that fires on its own at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(CancellationToken::new(), Some(deadline), None)
    }

    /// A child signal: fires when `self` fires, or when cancelled directly.
    pub fn child(&self) -> Self {
        Self::build(
            self.inner.token.child_token(),
            self.inner.deadline,
            Some(self.clone()),
        )
    }

    /// A child signal with its own timeout, capped by the parent's deadline.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use backwater::Cancellation;
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let parent = Cancellation::with_timeout(Duration::from_millis(50));
    /// let child = parent.child_with_timeout(Duration::from_secs(60));
    ///
    /// assert_eq!(child.deadline(), parent.deadline());
    /// # });
    /// ```
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let own = deadline_after(timeout);
        let deadline = match self.inner.deadline {
            Some(parent) => parent.min(own),
            None => own,
        };
        Self::build(
            self.inner.token.child_token(),
            Some(deadline),
            Some(self.clone()),
        )
    }

    fn build(token: CancellationToken, deadline: Option<Instant>, parent: Option<Self>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token,
                deadline,
                reason: OnceLock::new(),
                parent,
            }),
        }
    }

    /// Fire the signal with [`CancelReason::Cancelled`].
    ///
    /// Has no effect on the reason if the signal already fired, including
    /// through a passed deadline or a fired parent.
    pub fn cancel(&self) {
        let reason = self.reason().unwrap_or(CancelReason::Cancelled);
        let _ = self.inner.reason.set(reason);
        self.inner.token.cancel();
    }

    /// The effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    fn deadline_passed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl CancelSignal for Cancellation {
    fn is_signalled(&self) -> bool {
        self.inner.token.is_cancelled() || self.deadline_passed()
    }

    fn signalled(&self) -> impl Future<Output = ()> + Send + '_ {
        async move {
            match self.inner.deadline {
                Some(deadline) => {
                    tokio::select! {
                        () = self.inner.token.cancelled() => {}
                        () = tokio::time::sleep_until(deadline) => {
                            let _ = self.inner.reason.set(CancelReason::DeadlineExceeded);
                        }
                    }
                }
                None => self.inner.token.cancelled().await,
            }
        }
    }

    fn reason(&self) -> Option<CancelReason> {
        if let Some(reason) = self.inner.reason.get() {
            return Some(*reason);
        }
        if let Some(reason) = self.inner.parent.as_ref().and_then(|p| p.reason()) {
            return Some(reason);
        }
        if self.deadline_passed() {
            return Some(*self.inner.reason.get_or_init(|| CancelReason::DeadlineExceeded));
        }
        None
    }
}
