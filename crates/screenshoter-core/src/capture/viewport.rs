//! Single viewport capture
//!
//! One capture is: wait, take the raw screenshot, normalize it to the
//! viewport in CSS pixels and optionally crop it to a region of a context.
//!
//! # Normalization
//!
//! Raw screenshots are in device pixels and may include device chrome above
//! the viewport. The viewport origin inside the raw image is taken from the
//! first source that knows it:
//!
//! 1. The status bar height reported by the driver
//! 2. The page marker, painted by script and located with [`find_pattern`]
//! 3. The [`DEVICE_PROFILES`](super::matching::DEVICE_PROFILES) table
//! 4. Zero
//!
//! The image is then cropped to the viewport, scaled by `1 / pixel_ratio`
//! (or the explicit scale ratio) and clipped to the viewport size.

use std::time::Duration;

use tokio::time::sleep;

use super::{
    DriverSession,
    constants,
    context::{ContextId, ContextTree},
    matching::{Pattern, device_id, device_profile, find_pattern},
    scripts,
};
use crate::{
    error::{CaptureError, CaptureResult},
    imaging::Image,
    model::{DebugSettings, Offset, Region, ScreenshotSettings, Size},
};

/// Parameters of one viewport capture
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportRequest {
    /// Context whose client coordinates `region` uses
    pub context:         ContextId,
    /// Part of the context to keep; the whole viewport when absent
    pub region:          Option<Region>,
    /// Delay before the raw capture, in milliseconds
    pub wait_ms:         u64,
    /// Retry until two consecutive captures agree in size
    pub stabilize:       bool,
    /// Overrides the `1 / pixel_ratio` normalization factor
    pub scale_ratio:     Option<f64>,
    /// Known viewport origin in the raw image (device pixels)
    pub viewport_offset: Option<Offset>,
    /// Debug image output
    pub debug:           Option<DebugSettings>,
}

impl ViewportRequest {
    /// Whole-viewport request with default timing
    pub fn new(context: ContextId) -> Self {
        Self {
            context,
            region: None,
            wait_ms: constants::wait_ms(),
            stabilize: false,
            scale_ratio: None,
            viewport_offset: None,
            debug: None,
        }
    }

    /// Request carrying the capture-related fields of `settings`
    pub fn from_settings(context: ContextId, settings: &ScreenshotSettings) -> Self {
        Self {
            context,
            region: None,
            wait_ms: settings.wait_ms,
            stabilize: settings.stabilize,
            scale_ratio: settings.scale_ratio,
            viewport_offset: None,
            debug: settings.debug.clone(),
        }
    }

    /// Restricts the capture to `region`
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }
}

/// Captured image and where it lies
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Captured pixels in CSS pixels
    pub image:  Image,
    /// Viewport region for single captures, document region for stitched ones
    pub region: Region,
}

pub(crate) fn emit_debug(image: &Image, debug: Option<&DebugSettings>, name: &str) {
    if let Some(settings) = debug {
        if let Err(e) = image.debug(settings, name) {
            tracing::warn!("Failed to write debug image '{}': {}", name, e);
        }
    }
}

async fn capture_once(session: &DriverSession) -> CaptureResult<Image> {
    let bytes = session.screenshots.take_screenshot().await?;
    Image::from_bytes(bytes)
}

/// Takes a raw screenshot after waiting `wait_ms`
///
/// With `stabilize`, captures repeat until two consecutive ones have the
/// same dimensions; after the configured number of attempts the latest
/// capture is returned.
pub async fn take_raw_screenshot(
    session: &DriverSession,
    wait_ms: u64,
    stabilize: bool,
) -> CaptureResult<Image> {
    if wait_ms > 0 {
        sleep(Duration::from_millis(wait_ms)).await;
    }
    let mut image = capture_once(session).await?;
    if !stabilize {
        return Ok(image);
    }

    let attempts = constants::stabilization_attempts();
    for attempt in 1..=attempts {
        if wait_ms > 0 {
            sleep(Duration::from_millis(wait_ms)).await;
        }
        let next = capture_once(session).await?;
        if next.size() == image.size() {
            tracing::debug!("Capture stable after {} attempts at {}", attempt, next.size());
            return Ok(next);
        }
        image = next;
    }
    tracing::warn!("Capture did not stabilize after {} attempts", attempts);
    Ok(image)
}

/// Locates the viewport origin inside raw screenshots, in device pixels
pub async fn detect_viewport_offset(session: &DriverSession) -> CaptureResult<Offset> {
    let info = &session.info;
    if info.status_bar_height > 0 {
        return Ok(Offset::new(0, info.status_bar_height as i32));
    }
    if !info.is_mobile || info.is_native {
        return Ok(Offset::zero());
    }

    if session.has_scripts() {
        match locate_page_marker(session).await {
            Ok(Some(offset)) => {
                tracing::debug!("Page marker found at {}", offset);
                return Ok(offset);
            }
            Ok(None) => tracing::warn!("Page marker not found in the screenshot"),
            Err(e) => tracing::warn!("Page marker detection failed: {}", e),
        }
    }

    if let Some(name) = &info.device_name {
        let id = device_id(name, info.orientation);
        if let Some(profile) = device_profile(&id) {
            tracing::debug!("Using device table offset {} for {}", profile.offset, id);
            return Ok(profile.offset);
        }
        tracing::debug!("No device table entry for {}", id);
    }
    Ok(Offset::zero())
}

async fn locate_page_marker(session: &DriverSession) -> CaptureResult<Option<Offset>> {
    let response = session.execute_script(scripts::ADD_PAGE_MARKER, vec![]).await?;
    let pattern = Pattern::from_marker_response(&response, session.info.effective_pixel_ratio());
    let found = match pattern {
        Ok(pattern) => match take_raw_screenshot(session, 0, false).await {
            Ok(raw) => raw.to_object().map(|pixels| find_pattern(&pixels, &pattern)),
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = session.execute_script(scripts::REMOVE_PAGE_MARKER, vec![]).await {
        tracing::warn!("Failed to remove page marker: {}", e);
    }
    found
}

/// Factor turning device pixels into CSS pixels
pub fn normalization_scale(session: &DriverSession, scale_ratio: Option<f64>) -> CaptureResult<f64> {
    match scale_ratio {
        Some(ratio) if ratio.is_finite() && ratio > 0.0 => Ok(ratio),
        Some(ratio) => Err(CaptureError::invalid_parameter(
            "scale_ratio",
            format!("{} is not a positive finite number", ratio),
        )),
        None => Ok(1.0 / session.info.effective_pixel_ratio()),
    }
}

/// Cuts the viewport out of a raw screenshot and scales it to CSS pixels
pub fn normalize(raw: &Image, offset: Offset, scale: f64, viewport: Size) -> CaptureResult<Image> {
    let mut image = raw.clone();
    image
        .crop(Region::from_parts(offset, viewport.scale(1.0 / scale)))?
        .scale(scale)?
        .crop(Region::from_size(viewport))?;
    Ok(image)
}

/// Captures the viewport and optionally crops it to a context region
///
/// A requested region that is not visible fails with
/// [`CaptureError::EmptyRegion`].
pub async fn take_viewport_screenshot(
    session: &DriverSession,
    tree: &ContextTree,
    request: &ViewportRequest,
) -> CaptureResult<Screenshot> {
    let raw = take_raw_screenshot(session, request.wait_ms, request.stabilize).await?;
    emit_debug(&raw, request.debug.as_ref(), "raw");

    let viewport = session.viewport.get_viewport_size().await?;
    let offset = match request.viewport_offset {
        Some(offset) => offset,
        None => detect_viewport_offset(session).await?,
    };
    let scale = normalization_scale(session, request.scale_ratio)?;
    let mut image = normalize(&raw, offset, scale, viewport)?;
    emit_debug(&image, request.debug.as_ref(), "viewport");

    let Some(region) = request.region else {
        let region = Region::from_size(image.size());
        return Ok(Screenshot { image, region });
    };

    let visible = tree.region_in_viewport(session, request.context, region).await?;
    if visible.is_empty() {
        return Err(CaptureError::EmptyRegion {
            region,
            bounds: viewport,
        });
    }
    image.crop(visible)?;
    emit_debug(&image, request.debug.as_ref(), "region");
    tracing::debug!("Captured {} of {} at {}", visible, request.context, image.size());
    Ok(Screenshot {
        image,
        region: visible,
    })
}
