//! Centralized timing, size and configuration constants for capture.
//!
//! # Runtime Configuration
//!
//! The tunable values can be overridden at runtime via environment variables:
//!
//! | Environment Variable | Default | Description |
//! |---------------------|---------|-------------|
//! | `SCREENSHOTER_WAIT_MS` | 100 | Delay before every raw capture |
//! | `SCREENSHOTER_CAPTURE_TIMEOUT_MS` | 120000 | Ceiling for a whole screenshot operation |
//! | `SCREENSHOTER_MAX_STITCH_HEIGHT` | 50000 | Maximum stitched image height |
//! | `SCREENSHOTER_STABILIZATION_ATTEMPTS` | 3 | Raw captures tried while stabilizing |
//! | `SCREENSHOTER_DEBUG_PATH` | unset | Enables debug images in this directory |
//!
//! # Memory Budget
//!
//! Rotation is the only pipeline stage that cannot work one row at a time.
//! It renders output rows in blocks of at most [`ROTATE_BLOCK_BYTES`], so the
//! working set stays bounded regardless of image height.

use std::path::PathBuf;

/// Default delay before each raw screenshot.
///
/// Gives animations, web fonts and scroll-triggered repaints a chance to
/// settle. Callers that drive their own synchronization can set it to zero.
pub const WAIT_MS: u64 = 100;

/// Default wall-clock ceiling for one screenshot operation.
///
/// A full-page stitch of a very long page can take a minute on slow mobile
/// devices, so the ceiling is two minutes. It exists to stop loops whose
/// scroll position never stabilizes.
pub const CAPTURE_TIMEOUT_MS: u64 = 120_000;

/// Default maximum height of a stitched image.
pub const MAX_STITCH_HEIGHT: u32 = 50_000;

/// Default number of raw captures attempted while stabilizing.
pub const STABILIZATION_ATTEMPTS: u32 = 3;

/// Byte budget for one block of rotated output rows.
pub const ROTATE_BLOCK_BYTES: usize = 16 * 1024 * 1024;

/// Default distance scrolled per lazy-load cycle.
pub const LAZY_LOAD_SCROLL_LENGTH: u32 = 300;

/// Default pause after each lazy-load scroll, in milliseconds.
pub const LAZY_LOAD_WAITING_TIME_MS: u64 = 2000;

/// Default scroll position at which lazy loading stops.
pub const LAZY_LOAD_MAX_AMOUNT_TO_SCROLL: u32 = 15_000;

// =============================================================================
// Environment Variable Overrides
// =============================================================================

/// Helper to get a numeric value from an environment variable or fall back.
fn get_from_env<T: std::str::FromStr>(env_var: &str, default: T) -> T {
    std::env::var(env_var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get the pre-capture delay, checking environment variable override.
///
/// Override with: `SCREENSHOTER_WAIT_MS`
///
/// # Example
///
/// ```bash
/// # Disable the settle delay in a fully synchronized test suite
/// export SCREENSHOTER_WAIT_MS=0
/// ```
pub fn wait_ms() -> u64 {
    get_from_env("SCREENSHOTER_WAIT_MS", WAIT_MS)
}

/// Get the screenshot timeout, checking environment variable override.
///
/// Override with: `SCREENSHOTER_CAPTURE_TIMEOUT_MS`
pub fn capture_timeout_ms() -> u64 {
    get_from_env("SCREENSHOTER_CAPTURE_TIMEOUT_MS", CAPTURE_TIMEOUT_MS)
}

/// Get the maximum stitched height, checking environment variable override.
///
/// Override with: `SCREENSHOTER_MAX_STITCH_HEIGHT`
pub fn max_stitch_height() -> u32 {
    get_from_env("SCREENSHOTER_MAX_STITCH_HEIGHT", MAX_STITCH_HEIGHT)
}

/// Get the stabilization attempt count, checking environment variable override.
///
/// Override with: `SCREENSHOTER_STABILIZATION_ATTEMPTS`
pub fn stabilization_attempts() -> u32 {
    get_from_env("SCREENSHOTER_STABILIZATION_ATTEMPTS", STABILIZATION_ATTEMPTS).max(1)
}

/// Get the debug image directory, if debug output is enabled by environment.
///
/// Override with: `SCREENSHOTER_DEBUG_PATH`
pub fn debug_path() -> Option<PathBuf> {
    std::env::var_os("SCREENSHOTER_DEBUG_PATH")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
