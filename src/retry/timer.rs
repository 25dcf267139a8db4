//! Restartable one-shot backoff timer.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Upper bound used when `now + duration` does not fit in an [`Instant`].
pub(crate) const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + duration`, capped at [`FAR_FUTURE`] from now.
pub(crate) fn deadline_after(duration: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(duration).unwrap_or_else(|| now + FAR_FUTURE)
}

/// A one-shot timer that can be re-armed and cancelled.
///
/// Each retry run owns its own timer. [`elapsed`](BackoffTimer::elapsed)
/// completes once per call to [`arm`](BackoffTimer::arm); while disarmed it
/// never completes, which makes it safe to put in a `select!` next to other
/// events.
///
/// The underlying sleep is allocated on first use, reset on re-arm and
/// dropped on [`cancel`](BackoffTimer::cancel).
///
/// # Examples
///
/// ```rust
/// use backwater::retry::BackoffTimer;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let mut timer = BackoffTimer::new();
/// timer.arm(Duration::from_millis(5));
/// timer.elapsed().await;
/// assert!(!timer.is_armed());
/// # });
/// ```
#[derive(Debug, Default)]
pub struct BackoffTimer {
    sleep: Option<Pin<Box<Sleep>>>,
    armed: bool,
}

impl BackoffTimer {
    /// Create a disarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the timer to fire `duration` from now.
    ///
    /// Re-arming a pending timer replaces its deadline.
    pub fn arm(&mut self, duration: Duration) {
        let deadline = deadline_after(duration);

        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().reset(deadline),
            None => self.sleep = Some(Box::pin(tokio::time::sleep_until(deadline))),
        }
        self.armed = true;
    }

    /// Stop a pending timer and release its timer-wheel entry.
    ///
    /// Does nothing when the timer is not armed.
    pub fn cancel(&mut self) {
        self.armed = false;
        self.sleep = None;
    }

    /// Returns true while an arming has not yet been observed as elapsed.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Wait until the armed duration has passed.
    ///
    /// Pends forever if the timer is not armed.
    pub async fn elapsed(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) if self.armed => {
                sleep.as_mut().await;
                self.armed = false;
            }
            _ => futures::future::pending::<()>().await,
        }
    }
}
