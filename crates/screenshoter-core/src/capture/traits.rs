//! Composable capability traits consumed from driver adapters
//!
//! Driver adapters (WebDriver, Playwright, native mobile drivers) live outside
//! this crate and implement the traits below. Each trait covers one capability
//! so an adapter only implements what its protocol supports; script execution
//! in particular is absent for native app sessions.
//!
//! # Trait Hierarchy
//!
//! - [`ScreenshotProvider`]: raw screenshot bytes
//! - [`ViewportMetrics`]: window and viewport dimensions
//! - [`ScrollCapable`]: element scroll positions and client regions
//! - [`ScriptExecutor`]: in-page helper scripts (optional)
//! - [`SessionCapabilities`]: runtime feature queries
//!
//! # Units
//!
//! Sizes, offsets and regions are CSS pixels. Screenshot bytes are in device
//! pixels; the viewport capture normalizes them with the session pixel ratio.

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::CaptureResult,
    model::{ElementId, Offset, Region, Size},
};

// ============================================================================
// Core Capability Traits
// ============================================================================

/// Capability: Driver can capture the current screen.
#[async_trait]
pub trait ScreenshotProvider: Send + Sync {
    /// Captures the visible screen and returns encoded image bytes.
    ///
    /// Browsers return the viewport only; mobile drivers usually include the
    /// status bar and browser chrome, which the viewport capture removes.
    async fn take_screenshot(&self) -> CaptureResult<Vec<u8>>;
}

/// Capability: Driver reports window and viewport dimensions.
#[async_trait]
pub trait ViewportMetrics: Send + Sync {
    /// Outer window size including browser chrome.
    async fn get_window_size(&self) -> CaptureResult<Size>;

    /// Size of the scrollable drawing area of the top-level document.
    async fn get_viewport_size(&self) -> CaptureResult<Size>;
}

/// Capability: Driver can scroll elements and report their geometry.
///
/// Client regions are relative to the viewport of the context that owns the
/// element, i.e. they already account for every scroll position inside that
/// context.
#[async_trait]
pub trait ScrollCapable: Send + Sync {
    /// Scrolls `element` to `offset` and returns the offset actually reached.
    ///
    /// Drivers clamp to the scrollable range and may land elsewhere for
    /// snapping or smooth scrolling; callers must use the returned value.
    async fn scroll_to(&self, element: &ElementId, offset: Offset) -> CaptureResult<Offset>;

    /// Current scroll offset of `element`.
    async fn get_scroll_offset(&self, element: &ElementId) -> CaptureResult<Offset>;

    /// Visible box of `element` in its context's client coordinates.
    async fn get_client_region(&self, element: &ElementId) -> CaptureResult<Region>;

    /// Full scrollable content size of `element`.
    async fn get_content_size(&self, element: &ElementId) -> CaptureResult<Size>;
}

/// Capability: Driver can execute in-page scripts.
///
/// Used for the CSS scrolling mode, lazy-load helpers and the viewport marker.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Runs `script` with JSON arguments and returns its JSON result.
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> CaptureResult<Value>;
}

// ============================================================================
// Capability Query Trait
// ============================================================================

/// Query session feature support at runtime.
pub trait SessionCapabilities: Send + Sync {
    /// Whether in-page scripts can be executed.
    fn supports_script_execution(&self) -> bool;

    /// Whether content can be moved with CSS transforms.
    fn supports_css_scrolling(&self) -> bool {
        self.supports_script_execution()
    }

    /// Whether a device-frame composition is possible.
    fn supports_framed_capture(&self) -> bool {
        false
    }
}
