//! Retry Demo
//!
//! Demonstrates the retry entry points:
//! - Retrying a flaky call with custom options
//! - Inspecting the exhaustion error
//! - Cancelling a run with a deadline
//! - Observing each retry through a hook
//!
//! Run with: cargo run --example retry_demo
//! Add `--features tracing` to see the library's own log lines.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backwater::prelude::*;

/// Pretend HTTP call: the first `outages` calls get a 503.
async fn fetch(calls: &AtomicU32, outages: u32) -> Result<&'static str, String> {
    let n = calls.fetch_add(1, Ordering::SeqCst);
    if n < outages {
        println!("  Request {} failed, will retry", n + 1);
        Err(format!("server error {}", 503))
    } else {
        println!("  Request {} succeeded", n + 1);
        Ok("<html>hello</html>")
    }
}

// ==================== Basic Retry ====================

/// Example 1: a flaky request that recovers.
async fn example_flaky_request() {
    println!("\n=== Example 1: Flaky Request ===");

    let calls = Arc::new(AtomicU32::new(0));
    let options = [
        RetryOption::MaxAttempts(3),
        RetryOption::InitialDelay(Duration::from_millis(200)),
        RetryOption::BackoffMultiplier(2.0),
        RetryOption::JitterFraction(0.2),
    ];

    let result = retry_with_data(
        {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move { fetch(&calls, 2).await }
            }
        },
        RetryConfig::from_options(options),
    )
    .await;

    match result {
        Ok(body) => println!("Operation successful: {}", body),
        Err(e) => println!("Operation failed after retries: {}", e),
    }
}

// ==================== Exhaustion ====================

/// Example 2: the bound is reached and the last error is kept.
async fn example_exhaustion() {
    println!("\n=== Example 2: Exhaustion ===");

    let calls = Arc::new(AtomicU32::new(0));
    let config = RetryConfig::default()
        .with_max_attempts(1)
        .with_initial_delay(Duration::from_millis(100));

    let result = retry(
        {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move { fetch(&calls, u32::MAX).await.map(|_| ()) }
            }
        },
        config,
    )
    .await;

    if let Err(e) = result {
        println!("Gave up: {}", e);
        println!("Last error: {:?}", e.last_error());
    }
}

// ==================== Cancellation ====================

/// Example 3: a deadline cuts a slow run short.
async fn example_deadline() {
    println!("\n=== Example 3: Deadline ===");

    let cancel = Cancellation::with_timeout(Duration::from_millis(300));

    let result = retry_with_cancel(
        || async {
            println!("  Slow request started");
            tokio::time::sleep(Duration::from_secs(1)).await;
            Err::<(), _>("too slow")
        },
        RetryConfig::default(),
        &cancel,
    )
    .await;

    match result {
        Err(e) if e.is_cancelled() => println!("Cancelled: {}", e),
        other => println!("Unexpected: {:?}", other),
    }
}

// ==================== Hooks ====================

/// Example 4: report each retry before backing off.
async fn example_hooks() {
    println!("\n=== Example 4: Retry Hooks ===");

    let calls = Arc::new(AtomicU32::new(0));
    let engine = RetryEngine::new(
        RetryConfig::default()
            .with_max_attempts(4)
            .with_initial_delay(Duration::from_millis(50)),
    );

    let result = engine
        .run_with_hooks(
            {
                let calls = calls.clone();
                move || {
                    let calls = calls.clone();
                    async move { fetch(&calls, 3).await }
                }
            },
            &NeverCancel,
            |event: &RetryEvent<'_, String>| {
                println!(
                    "  Attempt {} failed: {}, next delay: {:?}",
                    event.attempt, event.error, event.next_delay
                );
            },
        )
        .await;

    println!("Result: {:?}", result);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .init();

    println!("======================================");
    println!("            Retry Demo                ");
    println!("======================================");

    example_flaky_request().await;
    example_exhaustion().await;
    example_deadline().await;
    example_hooks().await;

    println!("\n======================================");
    println!("           Demo Complete              ");
    println!("======================================");
}
