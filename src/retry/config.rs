//! Retry configuration types.

use std::time::Duration;

/// Default bound on retries after the first attempt.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Default factor applied to the interval after each failure.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;

/// Default proportional jitter (±50%).
pub const DEFAULT_JITTER_FRACTION: f64 = 0.5;

/// Configuration for a single retry run.
///
/// A config is plain data: it describes how the retry loop behaves but never
/// runs anything itself. Each call to one of the retry entry points takes its
/// own config by value, so nothing is shared between concurrent runs.
///
/// # Bounds
///
/// `max_attempts` counts retries, not total calls. A value of `N > 0` allows
/// at most `N + 1` invocations of the operation. A value of `0` means
/// "retry until success or cancellation"; the first call always happens.
///
/// # Examples
///
/// ```rust
/// use backwater::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_max_attempts(3)
///     .with_initial_delay(Duration::from_millis(100));
///
/// assert_eq!(config.max_attempts(), 3);
/// assert_eq!(config.initial_delay(), Duration::from_millis(100));
/// assert_eq!(config.backoff_multiplier(), 1.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryConfig {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
    jitter_fraction: f64,
}

/// A single named adjustment to a [`RetryConfig`].
///
/// Options are applied in order over the defaults, so a later option for the
/// same field overrides an earlier one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryOption {
    /// Set the retry bound (`0` = unbounded).
    MaxAttempts(u32),
    /// Set the delay used before the first retry.
    InitialDelay(Duration),
    /// Set the growth factor applied after every failure.
    BackoffMultiplier(f64),
    /// Set the proportional jitter around each delay.
    JitterFraction(f64),
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
        }
    }
}

impl RetryConfig {
    /// Build a config by applying `options` over the defaults, in order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use backwater::{RetryConfig, RetryOption};
    /// use std::time::Duration;
    ///
    /// let config = RetryConfig::from_options([
    ///     RetryOption::MaxAttempts(1),
    ///     RetryOption::InitialDelay(Duration::from_secs(2)),
    ///     RetryOption::MaxAttempts(4),
    /// ]);
    ///
    /// assert_eq!(config.max_attempts(), 4);
    /// assert_eq!(config.initial_delay(), Duration::from_secs(2));
    /// ```
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = RetryOption>,
    {
        options
            .into_iter()
            .fold(Self::default(), |config, option| config.apply(option))
    }

    /// Apply a single adjustment.
    pub fn apply(self, option: RetryOption) -> Self {
        match option {
            RetryOption::MaxAttempts(n) => self.with_max_attempts(n),
            RetryOption::InitialDelay(d) => self.with_initial_delay(d),
            RetryOption::BackoffMultiplier(m) => self.with_backoff_multiplier(m),
            RetryOption::JitterFraction(f) => self.with_jitter_fraction(f),
        }
    }

    /// Set the maximum number of retries after the first attempt.
    ///
    /// `0` disables the bound entirely.
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the multiplier applied to the interval after every failure.
    ///
    /// Delay before retry `k` (0-indexed) is centred on
    /// `initial_delay * multiplier^k`.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the proportional jitter.
    ///
    /// A fraction of `0.25` spreads each delay uniformly over ±25% of the
    /// current interval. Values outside `[0, 1]` are accepted as given; see
    /// [`RetryConfig::validate`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use backwater::RetryConfig;
    ///
    /// let config = RetryConfig::default().with_jitter_fraction(0.25);
    /// assert_eq!(config.jitter_fraction(), 0.25);
    /// ```
    pub fn with_jitter_fraction(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction;
        self
    }

    /// Get the retry bound (`0` = unbounded).
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Get the delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Get the backoff multiplier.
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Get the jitter fraction.
    pub fn jitter_fraction(&self) -> f64 {
        self.jitter_fraction
    }

    /// Returns true if retries are unbounded.
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts == 0
    }

    /// Check the config for values that are accepted but probably unintended.
    ///
    /// The retry engine never calls this; out-of-range values still run.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 0.0 {
            Err("backoff multiplier must be a positive finite number")
        } else if !(0.0..=1.0).contains(&self.jitter_fraction) {
            Err("jitter fraction should be within [0, 1]")
        } else {
            Ok(())
        }
    }
}

impl From<RetryOption> for RetryConfig {
    fn from(option: RetryOption) -> Self {
        Self::default().apply(option)
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RetryConfig::default();

        assert_eq!(config.max_attempts(), 5);
        assert_eq!(config.initial_delay(), Duration::from_millis(500));
        assert_eq!(config.backoff_multiplier(), 1.5);
        assert_eq!(config.jitter_fraction(), 0.5);
        assert!(!config.is_unbounded());
    }

    #[test]
    fn test_each_option_sets_one_field() {
        let base = RetryConfig::default();

        let config = base.clone().apply(RetryOption::MaxAttempts(9));
        assert_eq!(config, base.clone().with_max_attempts(9));

        let config = base.clone().apply(RetryOption::InitialDelay(Duration::from_millis(100)));
        assert_eq!(config.initial_delay(), Duration::from_millis(100));
        assert_eq!(config.max_attempts(), base.max_attempts());

        let config = base.clone().apply(RetryOption::BackoffMultiplier(2.0));
        assert_eq!(config.backoff_multiplier(), 2.0);
        assert_eq!(config.jitter_fraction(), base.jitter_fraction());

        let config = base.apply(RetryOption::JitterFraction(0.25));
        assert_eq!(config.jitter_fraction(), 0.25);
    }

    #[test]
    fn test_later_options_win() {
        let config = RetryConfig::from_options([
            RetryOption::JitterFraction(0.1),
            RetryOption::MaxAttempts(2),
            RetryOption::JitterFraction(0.9),
        ]);

        assert_eq!(config.jitter_fraction(), 0.9);
        assert_eq!(config.max_attempts(), 2);
    }

    #[test]
    fn test_empty_options_is_default() {
        let config = RetryConfig::from_options(Vec::new());
        assert_eq!(config, RetryConfig::default());
    }

    #[test]
    fn test_zero_attempts_is_unbounded() {
        let config = RetryConfig::from(RetryOption::MaxAttempts(0));
        assert!(config.is_unbounded());
    }

    #[test]
    fn test_validate() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(RetryConfig::default()
            .with_backoff_multiplier(0.0)
            .validate()
            .is_err());
        assert!(RetryConfig::default()
            .with_backoff_multiplier(f64::NAN)
            .validate()
            .is_err());
        assert!(RetryConfig::default()
            .with_jitter_fraction(1.5)
            .validate()
            .is_err());
        assert!(RetryConfig::default()
            .with_jitter_fraction(-0.1)
            .validate()
            .is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let config = RetryConfig::default().with_max_attempts(7);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RetryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
