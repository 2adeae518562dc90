//! Driver session facade holding capability trait objects
//!
//! A [`DriverSession`] bundles the capabilities of one driver session with
//! the [`DriverInfo`] describing it. Optional capabilities are typed optional
//! fields, so callers check for script support without downcasting.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use screenshoter_core::{
//!     capture::{MockDriver, session_from_mock},
//!     model::Size,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mock = Arc::new(MockDriver::new(Size::new(800, 600), Size::new(800, 3000)));
//! let session = session_from_mock(mock);
//!
//! assert!(session.has_scripts());
//! let viewport = session.viewport.get_viewport_size().await?;
//! assert_eq!(viewport, Size::new(800, 600));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::Value;

use super::{ScreenshotProvider, ScriptExecutor, ScrollCapable, SessionCapabilities, ViewportMetrics};
use crate::{
    error::{CaptureError, CaptureResult},
    model::DriverInfo,
};

/// Driver session holding capability trait objects.
///
/// # Capabilities
///
/// - `screenshots`: raw screen capture (all drivers)
/// - `viewport`: window and viewport metrics (all drivers)
/// - `scroll`: element scrolling and geometry (all drivers)
/// - `scripts`: in-page script execution (web sessions only)
pub struct DriverSession {
    /// Raw screenshot capability.
    pub screenshots: Arc<dyn ScreenshotProvider>,

    /// Window and viewport metrics.
    pub viewport: Arc<dyn ViewportMetrics>,

    /// Element scrolling and geometry.
    pub scroll: Arc<dyn ScrollCapable>,

    /// Script execution capability.
    ///
    /// Not present for native app sessions.
    pub scripts: Option<Arc<dyn ScriptExecutor>>,

    /// Environment facts for this session.
    pub info: DriverInfo,

    /// Driver name for diagnostics.
    pub name: &'static str,
}

impl DriverSession {
    /// Creates a new DriverSession with the specified capabilities.
    pub fn new(
        screenshots: Arc<dyn ScreenshotProvider>,
        viewport: Arc<dyn ViewportMetrics>,
        scroll: Arc<dyn ScrollCapable>,
        scripts: Option<Arc<dyn ScriptExecutor>>,
        info: DriverInfo,
        name: &'static str,
    ) -> Self {
        Self {
            screenshots,
            viewport,
            scroll,
            scripts,
            info,
            name,
        }
    }

    /// Returns true if in-page scripts can be executed.
    pub fn has_scripts(&self) -> bool {
        self.scripts.is_some()
    }

    /// Executes a script, failing with [`CaptureError::NotSupported`] when the
    /// session has no script capability.
    pub async fn execute_script(&self, script: &str, args: Vec<Value>) -> CaptureResult<Value> {
        match &self.scripts {
            Some(scripts) => scripts.execute_script(script, args).await,
            None => Err(CaptureError::NotSupported {
                feature: "execute_script".to_string(),
                driver:  self.name.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for DriverSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverSession")
            .field("name", &self.name)
            .field("has_scripts", &self.scripts.is_some())
            .field("info", &self.info)
            .finish()
    }
}

impl SessionCapabilities for DriverSession {
    fn supports_script_execution(&self) -> bool {
        self.scripts.is_some()
    }

    fn supports_framed_capture(&self) -> bool {
        self.info.is_native
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Creates a DriverSession from a MockDriver.
///
/// Script execution is wired unless the mock was built with
/// [`MockDriver::without_scripts`](super::MockDriver::without_scripts), which
/// models a native app session.
pub fn session_from_mock(driver: Arc<super::MockDriver>) -> DriverSession {
    let scripts = driver
        .scripts_enabled()
        .then(|| driver.clone() as Arc<dyn ScriptExecutor>);
    DriverSession::new(
        driver.clone() as Arc<dyn ScreenshotProvider>,
        driver.clone() as Arc<dyn ViewportMetrics>,
        driver.clone() as Arc<dyn ScrollCapable>,
        scripts,
        driver.info().clone(),
        "mock",
    )
}
