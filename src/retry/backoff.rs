//! Backoff interval and jitter computation.
//!
//! Everything here is pure: randomness enters only through an explicit draw
//! or a caller-supplied RNG, so delays are reproducible under a seeded RNG.

use std::time::Duration;

use rand::Rng;

use super::config::RetryConfig;

/// Spread `interval` by `±fraction` and pick a point using `draw`.
///
/// `draw` is expected in `[0, 1)`. The upper end of the range is widened by
/// one nanosecond, so a delay can exceed `interval * (1 + fraction)` by at
/// most 1ns. Negative results (only possible with `fraction > 1`) clamp to
/// zero.
///
/// # Examples
///
/// ```rust
/// use backwater::retry::jittered_delay;
/// use std::time::Duration;
///
/// let interval = Duration::from_millis(500);
///
/// assert_eq!(jittered_delay(interval, 0.5, 0.0), Duration::from_millis(250));
/// assert_eq!(jittered_delay(interval, 0.0, 0.7), interval);
/// ```
pub fn jittered_delay(interval: Duration, fraction: f64, draw: f64) -> Duration {
    let base = interval.as_nanos() as f64;
    let spread = fraction * base;
    let low = base - spread;
    let high = base + spread;
    let nanos = low + draw * (high - low + 1.0);

    // `as` saturates: NaN and negatives become 0, overflow becomes u64::MAX.
    Duration::from_nanos(nanos as u64)
}

/// Grow `interval` by `multiplier`, saturating at [`Duration::MAX`].
///
/// # Examples
///
/// ```rust
/// use backwater::retry::next_interval;
/// use std::time::Duration;
///
/// let next = next_interval(Duration::from_millis(500), 1.5);
/// assert_eq!(next, Duration::from_millis(750));
/// ```
pub fn next_interval(interval: Duration, multiplier: f64) -> Duration {
    let grown = interval.as_secs_f64() * multiplier;
    if grown.is_nan() || grown <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f64(grown).unwrap_or(Duration::MAX)
    }
}

/// Attempt state for one retry run.
///
/// Tracks how many failures have been recorded and the interval the next
/// delay is centred on. A fresh `Backoff` is created per run and dropped
/// when the run ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    attempt: u32,
    interval: Duration,
    multiplier: f64,
    jitter_fraction: f64,
}

impl Backoff {
    /// Start a run: no failures yet, interval at the configured initial delay.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            interval: config.initial_delay(),
            multiplier: config.backoff_multiplier(),
            jitter_fraction: config.jitter_fraction(),
        }
    }

    /// Number of failures recorded so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Interval the next delay will be centred on.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a failed attempt and return the delay to wait before the next one.
    ///
    /// The interval grows after every failure, including the one that ends
    /// the run.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use backwater::retry::Backoff;
    /// use backwater::RetryConfig;
    /// use std::time::Duration;
    ///
    /// let config = RetryConfig::default().with_jitter_fraction(0.0);
    /// let mut backoff = Backoff::new(&config);
    /// let mut rng = rand::rng();
    ///
    /// assert_eq!(backoff.record_failure(&mut rng), Duration::from_millis(500));
    /// assert_eq!(backoff.record_failure(&mut rng), Duration::from_millis(750));
    /// assert_eq!(backoff.attempt(), 2);
    /// ```
    pub fn record_failure<R: Rng>(&mut self, rng: &mut R) -> Duration {
        let draw: f64 = rng.random();
        let delay = jittered_delay(self.interval, self.jitter_fraction, draw);
        self.interval = next_interval(self.interval, self.multiplier);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Returns true once the failure count has passed `max_attempts`.
    ///
    /// A bound of `0` is never exhausted.
    pub fn is_exhausted(&self, max_attempts: u32) -> bool {
        max_attempts > 0 && self.attempt > max_attempts
    }
}
