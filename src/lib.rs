//! # Backwater
//!
//! > *"Still waters run pure; back waters wait and try again"*
//!
//! A small Rust library for retrying fallible async operations with
//! exponential backoff, proportional jitter and cooperative cancellation.
//!
//! ## Philosophy
//!
//! - **Config is data**: a [`RetryConfig`] describes a run and never does I/O
//! - **Errors are opaque**: every failure is retried the same way; the last
//!   one travels with the final [`RetryError`]
//! - **Waiting is cancellable**: the backoff timer is raced against a
//!   [`CancelSignal`]
//!
//! ## Quick Example
//!
//! ```rust
//! use backwater::{retry_with_data_and_cancel, Cancellation, RetryConfig};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let config = RetryConfig::default()
//!     .with_max_attempts(5)
//!     .with_initial_delay(Duration::from_millis(5));
//! let cancel = Cancellation::with_timeout(Duration::from_secs(5));
//!
//! let attempts = AtomicU32::new(0);
//! let attempts = &attempts;
//!
//! let body = retry_with_data_and_cancel(
//!     move || async move {
//!         match attempts.fetch_add(1, Ordering::SeqCst) {
//!             0 | 1 => Err("503 service unavailable"),
//!             _ => Ok("hello"),
//!         }
//!     },
//!     config,
//!     &cancel,
//! )
//! .await;
//!
//! assert_eq!(body, Ok("hello"));
//! # });
//! ```
//!
//! For a runnable program, see `demos/retry_demo.rs`.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod retry;

// Re-exports
pub use retry::{
    retry, retry_with_cancel, retry_with_data, retry_with_data_and_cancel, CancelReason,
    CancelSignal, Cancellation, NeverCancel, RetryConfig, RetryEngine, RetryError, RetryEvent,
    RetryOption,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::retry::{
        retry, retry_with_cancel, retry_with_data, retry_with_data_and_cancel, CancelReason,
        CancelSignal, Cancellation, NeverCancel, RetryConfig, RetryEngine, RetryError,
        RetryEvent, RetryOption,
    };
}
