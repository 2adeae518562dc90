//! Driver capabilities and the capture pipeline
//!
//! This module provides the abstractions driver adapters implement and the
//! capture operations built on top of them.
//!
//! # Architecture
//!
//! Adapters implement only the capability traits their protocol supports:
//!
//! - [`ScreenshotProvider`] - Raw screenshot bytes (all drivers)
//! - [`ViewportMetrics`] - Window and viewport sizes (all drivers)
//! - [`ScrollCapable`] - Element scrolling and geometry (all drivers)
//! - [`ScriptExecutor`] - In-page scripts (web sessions only)
//!
//! A [`DriverSession`] bundles them with the [`DriverInfo`](crate::model::DriverInfo)
//! of the session. The pipeline, leaves first:
//!
//! - [`matching`] - Page marker and device table lookups
//! - [`ContextTree`] - Nested frames and shadow roots
//! - [`Scroller`] and [`scroll_into_viewport`] - Scrolling across contexts
//! - [`take_viewport_screenshot`] - One normalized capture
//! - [`take_stitched_screenshot`] - Full-page and full-element stitching
//! - [`take_screenshot`] - Strategy selection, timeout and scroll restoration
//!
//! ## Recommended Usage
//!
//! ```rust,ignore
//! use screenshoter_core::capture::{ContextTree, ScreenshotTarget, take_screenshot};
//!
//! let tree = ContextTree::new(Some("html".into()));
//! let settings = ScreenshotSettings::builder().fully(true).build();
//! let shot = take_screenshot(&session, &tree, &ScreenshotTarget::context(tree.main()), &settings).await?;
//! let png = shot.image.to_png()?;
//! ```
//!
//! [`MockDriver`] implements every capability over a synthetic page for
//! tests.

pub mod composite;
pub mod constants;
pub mod context;
pub mod matching;
pub mod mock;
pub mod screenshot;
pub mod scripts;
pub mod scroll;
pub mod stitch;
pub mod traits;
pub mod viewport;

pub use composite::{DriverSession, session_from_mock};
pub use context::{ContextId, ContextKind, ContextTree};
pub use matching::{DeviceProfile, Pattern, find_pattern};
pub use mock::{MockDriver, MockElement};
pub use screenshot::{ScreenshotTarget, take_screenshot};
pub use scroll::{ScrollState, Scroller, lazy_load, scroll_into_viewport};
pub use stitch::{calculate_screenshot_region, take_framed_screenshot, take_stitched_screenshot};
pub use traits::{
    ScreenshotProvider, ScriptExecutor, ScrollCapable, SessionCapabilities, ViewportMetrics,
};
pub use viewport::{Screenshot, ViewportRequest, take_viewport_screenshot};
