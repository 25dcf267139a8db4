//! Retry with exponential backoff, jitter and cancellation.
//!
//! This module is split the same way a run is:
//!
//! - **Config**: [`RetryConfig`] is plain data built from defaults plus
//!   [`RetryOption`] adjustments
//! - **Backoff**: [`Backoff`] computes jittered delays and grows the interval
//! - **Waiting**: [`BackoffTimer`] races a [`CancelSignal`] in the engine
//! - **Outcome**: [`RetryError`] is either exhaustion or cancellation,
//!   carrying the last operation error
//!
//! # Quick Start
//!
//! ```rust
//! use backwater::{retry_with_data, RetryConfig, RetryOption};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let config = RetryConfig::from_options([
//!     RetryOption::MaxAttempts(3),
//!     RetryOption::InitialDelay(Duration::from_millis(10)),
//! ]);
//!
//! let value = retry_with_data(|| async { Ok::<_, String>(42) }, config).await;
//! assert_eq!(value, Ok(42));
//! # });
//! ```
//!
//! # Delays
//!
//! The delay before retry `k` (0-indexed) is drawn uniformly from
//! `interval * (1 ± jitter_fraction)` where
//! `interval = initial_delay * backoff_multiplier^k`.

mod backoff;
mod cancel;
mod config;
mod engine;
mod error;
mod timer;

pub use backoff::{jittered_delay, next_interval, Backoff};
pub use cancel::{CancelReason, CancelSignal, Cancellation, NeverCancel};
pub use config::{
    RetryConfig, RetryOption, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY,
    DEFAULT_JITTER_FRACTION, DEFAULT_MAX_ATTEMPTS,
};
pub use engine::{
    retry, retry_with_cancel, retry_with_data, retry_with_data_and_cancel, RetryEngine,
    RetryEvent,
};
pub use error::RetryError;
pub use timer::BackoffTimer;
