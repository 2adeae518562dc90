//! Timing and performance measurement utilities
//!
//! - [`measure_sync`]: Simple synchronous timing wrapper
//! - [`time_async`]: Simple async duration measurement
//! - [`assert_duration_below`]: Assert duration is under threshold
//! - [`assert_duration_above`]: Assert duration exceeds minimum

use std::{
    future::Future,
    time::{Duration, Instant},
};

/// Measure the duration of a synchronous operation
///
/// Simple wrapper for timing sync operations. Returns the result and elapsed duration.
///
/// # Example
///
/// ```ignore
/// use screenshoter_test_utils::timing::measure_sync;
///
/// let (result, duration) = measure_sync("compute", || expensive_computation());
/// println!("Computation took {:.2}ms", duration.as_secs_f64() * 1000.0);
/// ```
pub fn measure_sync<F, T>(name: &str, f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    println!("[TIMING] {}: {:.2}ms", name, elapsed.as_secs_f64() * 1000.0);
    (result, elapsed)
}

/// Measure the duration of an async operation
pub async fn time_async<F, T>(name: &str, future: F) -> (T, Duration)
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let result = future.await;
    let elapsed = start.elapsed();
    println!("[TIMING] {}: {:.2}ms", name, elapsed.as_secs_f64() * 1000.0);
    (result, elapsed)
}

/// Asserts that a duration is below a threshold
///
/// # Example
///
/// ```
/// use screenshoter_test_utils::timing::assert_duration_below;
/// use std::time::Duration;
///
/// assert_duration_below(Duration::from_millis(500), Duration::from_secs(1), "stitch");
/// ```
///
/// # Panics
///
/// Panics if `actual > threshold` with a message showing the excess time.
pub fn assert_duration_below(actual: Duration, threshold: Duration, operation: &str) {
    assert!(
        actual <= threshold,
        "{} took {:.3}s, expected <={:.3}s ({}ms over threshold)",
        operation,
        actual.as_secs_f64(),
        threshold.as_secs_f64(),
        (actual.as_millis() as i128) - (threshold.as_millis() as i128)
    );
}

/// Asserts that a duration is above a minimum (for sanity checks)
///
/// Useful for checking that a configured delay was really applied.
///
/// # Example
///
/// ```
/// use screenshoter_test_utils::timing::assert_duration_above;
/// use std::time::Duration;
///
/// assert_duration_above(Duration::from_millis(100), Duration::from_millis(10), "delayed_capture");
/// ```
///
/// # Panics
///
/// Panics if `actual < minimum` with a message noting the suspiciously fast time.
pub fn assert_duration_above(actual: Duration, minimum: Duration, operation: &str) {
    assert!(
        actual >= minimum,
        "{} took {:.3}s, expected >={:.3}s (suspiciously fast)",
        operation,
        actual.as_secs_f64(),
        minimum.as_secs_f64()
    );
}
