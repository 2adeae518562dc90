//! Mock driver for testing
//!
//! This module provides a `MockDriver` implementing every capability trait
//! without a browser. It simulates a page of known pixels, scrollable
//! elements, iframes and a mobile status bar, so the capture pipeline can be
//! tested pixel-exactly.
//!
//! # Simulated Page
//!
//! - The document pixel at `(x, y)` is [`MockDriver::page_pixel`]
//! - Scrollable panes and frame documents owned by the root element show
//!   [`MockDriver::inner_pixel`] at their own content coordinates
//! - A dark status bar band of configurable CSS height sits above the
//!   viewport
//! - Screenshots are rendered at the configured pixel ratio and include the
//!   page marker while it is enabled
//!
//! # Features
//!
//! - **Geometry:** client regions follow the scroll and translate offsets of
//!   every owning element
//! - **Scroll Bias:** elements can land off target to model scroll snapping
//! - **Scripts:** the helper scripts in [`scripts`](super::scripts) are
//!   interpreted; everything else returns `null`
//! - **Configurable Delay:** simulate slow drivers for timeout tests
//! - **Error Injection:** every capability call fails with a given error
//!
//! # Example
//!
//! ```
//! use screenshoter_core::{
//!     capture::{MockDriver, MockElement, ScrollCapable},
//!     model::{ElementId, Offset, Region, Size},
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let driver = MockDriver::new(Size::new(800, 600), Size::new(800, 3000)).with_element(
//!         "panel",
//!         MockElement::scrollable(Region::new(0, 100, 400, 200), Some("html"), Size::new(400, 900)),
//!     );
//!
//!     let reached = driver
//!         .scroll_to(&ElementId::new("panel"), Offset::new(0, 5000))
//!         .await
//!         .unwrap();
//!     assert_eq!(reached, Offset::new(0, 700));
//! }
//! ```

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::time::sleep;

use super::{
    ScreenshotProvider, ScriptExecutor, ScrollCapable, ViewportMetrics,
    matching::{Pattern, paint_pattern},
    scripts,
};
use crate::{
    error::{CaptureError, CaptureResult},
    model::{DriverInfo, ElementId, Offset, Region, Size},
    util::encode::encode_png,
};

/// Colour of the simulated status bar
pub const STATUS_BAR_COLOUR: [u8; 4] = [20, 20, 20, 255];

/// Identifier of the mock document's scrolling element
pub const ROOT_ELEMENT: &str = "html";

/// Element known to the mock driver
#[derive(Debug, Clone, PartialEq)]
pub struct MockElement {
    /// Box in the owner's content coordinates
    pub region:      Region,
    /// Element whose scrolling moves this one; `None` for document roots
    pub owner:       Option<ElementId>,
    /// Scrollable content size; `None` for fixed elements
    pub content:     Option<Size>,
    /// Added to every scroll request before clamping
    pub scroll_bias: Offset,
    /// Frame document rendered inside this element
    pub document:    Option<ElementId>,
}

impl MockElement {
    /// Non-scrollable element
    pub fn fixed(region: Region, owner: Option<&str>) -> Self {
        Self {
            region,
            owner: owner.map(ElementId::from),
            content: None,
            scroll_bias: Offset::zero(),
            document: None,
        }
    }

    /// Scrollable element with the given content size
    pub fn scrollable(region: Region, owner: Option<&str>, content: Size) -> Self {
        Self {
            content: Some(content),
            ..Self::fixed(region, owner)
        }
    }

    /// Makes scroll requests land `bias` away from the target
    pub fn with_scroll_bias(mut self, bias: Offset) -> Self {
        self.scroll_bias = bias;
        self
    }

    /// Renders the frame document scrolled by `document` inside this element
    pub fn showing(mut self, document: &str) -> Self {
        self.document = Some(ElementId::from(document));
        self
    }

    fn max_scroll(&self) -> Offset {
        let content = self.content.unwrap_or(self.region.size());
        Offset::new(
            content.width as i32 - self.region.width as i32,
            content.height as i32 - self.region.height as i32,
        )
    }
}

#[derive(Debug, Default)]
struct MockState {
    scroll:      HashMap<ElementId, Offset>,
    translate:   HashMap<ElementId, Offset>,
    marker:      bool,
    screenshots: usize,
    scroll_log:  Vec<(ElementId, Offset)>,
    script_log:  Vec<String>,
}

impl MockState {
    fn shift(&self, id: &ElementId) -> Offset {
        self.scroll.get(id).copied().unwrap_or_default()
            + self.translate.get(id).copied().unwrap_or_default()
    }
}

/// Mock driver for testing and development
///
/// Implements [`ScreenshotProvider`], [`ViewportMetrics`], [`ScrollCapable`]
/// and [`ScriptExecutor`]. All state sits behind a mutex so one driver can be
/// shared through `Arc` by several sessions.
#[derive(Debug)]
pub struct MockDriver {
    /// Viewport size in CSS pixels
    viewport:        Size,
    /// Device pixels per CSS pixel in screenshots
    pixel_ratio:     f64,
    /// Status bar height in CSS pixels
    status_bar:      u32,
    /// Scrolling element of the main document
    root:            ElementId,
    /// Known elements
    elements:        HashMap<ElementId, MockElement>,
    /// Scroll positions, marker flag and call logs
    state:           Mutex<MockState>,
    /// Reported session facts
    info:            DriverInfo,
    /// Whether script execution is wired into sessions
    scripts_enabled: bool,
    /// Optional delay to simulate async operation timing
    delay:           Option<Duration>,
    /// Optional error to inject for testing error handling
    error_injection: Option<CaptureError>,
}

impl MockDriver {
    /// Creates a desktop mock with a scrollable root element `html`
    pub fn new(viewport: Size, content: Size) -> Self {
        let root = ElementId::from(ROOT_ELEMENT);
        let mut elements = HashMap::new();
        elements.insert(
            root.clone(),
            MockElement::scrollable(Region::from_size(viewport), None, content),
        );
        Self {
            viewport,
            pixel_ratio: 1.0,
            status_bar: 0,
            root,
            elements,
            state: Mutex::new(MockState::default()),
            info: DriverInfo::desktop(1.0),
            scripts_enabled: true,
            delay: None,
            error_injection: None,
        }
    }

    /// Renders screenshots at `ratio` device pixels per CSS pixel
    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self.info.pixel_ratio = ratio;
        self
    }

    /// Draws a status bar of `height` CSS pixels above the viewport
    pub fn with_status_bar(mut self, height: u32) -> Self {
        self.status_bar = height;
        self
    }

    /// Replaces the reported session facts
    ///
    /// The rendering pixel ratio follows `info`.
    pub fn with_info(mut self, info: DriverInfo) -> Self {
        self.pixel_ratio = info.effective_pixel_ratio();
        self.info = info;
        self
    }

    /// Adds or replaces an element
    pub fn with_element(mut self, id: impl Into<ElementId>, element: MockElement) -> Self {
        self.elements.insert(id.into(), element);
        self
    }

    /// Models a native app session without script execution
    pub fn without_scripts(mut self) -> Self {
        self.scripts_enabled = false;
        self
    }

    /// Sets a configurable delay for all async operations
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Injects an error that will be returned by all operations
    pub fn with_error(mut self, error: CaptureError) -> Self {
        self.error_injection = Some(error);
        self
    }

    /// Reported session facts
    pub fn info(&self) -> &DriverInfo {
        &self.info
    }

    /// Whether sessions built from this mock can execute scripts
    pub fn scripts_enabled(&self) -> bool {
        self.scripts_enabled
    }

    /// Scrolling element of the main document
    pub fn root(&self) -> &ElementId {
        &self.root
    }

    /// Number of screenshots taken so far
    pub fn screenshot_count(&self) -> usize {
        self.state.lock().screenshots
    }

    /// Every `scroll_to` call with the offset actually reached
    pub fn scroll_log(&self) -> Vec<(ElementId, Offset)> {
        self.state.lock().scroll_log.clone()
    }

    /// Every script executed, in order
    pub fn script_log(&self) -> Vec<String> {
        self.state.lock().script_log.clone()
    }

    /// Current native scroll offset of `id`
    pub fn scroll_position(&self, id: impl Into<ElementId>) -> Offset {
        self.state.lock().scroll.get(&id.into()).copied().unwrap_or_default()
    }

    /// Current CSS translate offset of `id`
    pub fn translate_position(&self, id: impl Into<ElementId>) -> Offset {
        self.state.lock().translate.get(&id.into()).copied().unwrap_or_default()
    }

    /// Sets a scroll offset directly, bypassing clamping and bias
    pub fn set_scroll(&self, id: impl Into<ElementId>, offset: Offset) {
        self.state.lock().scroll.insert(id.into(), offset);
    }

    /// Whether the page marker is currently painted
    pub fn marker_visible(&self) -> bool {
        self.state.lock().marker
    }

    /// Colour of the main document at document coordinates `(x, y)`
    pub fn page_pixel(x: i64, y: i64) -> [u8; 4] {
        [
            128 + x.rem_euclid(128) as u8,
            128 + y.rem_euclid(128) as u8,
            128 + (x.div_euclid(128) + 7 * y.div_euclid(128)).rem_euclid(128) as u8,
            255,
        ]
    }

    /// Colour of a pane or frame document at its content coordinates
    pub fn inner_pixel(x: i64, y: i64) -> [u8; 4] {
        [
            255 - x.rem_euclid(128) as u8,
            128 + y.rem_euclid(128) as u8,
            160,
            255,
        ]
    }

    /// Returns the injected error, if any, cloned for this call
    fn check_error_injection(&self) -> CaptureResult<()> {
        if let Some(ref error) = self.error_injection {
            return Err(match error {
                CaptureError::EmptyRegion { region, bounds } => CaptureError::EmptyRegion {
                    region: *region,
                    bounds: *bounds,
                },
                CaptureError::ElementNotFound { element } => CaptureError::ElementNotFound {
                    element: element.clone(),
                },
                CaptureError::ContextNotFound { context } => CaptureError::ContextNotFound {
                    context: *context,
                },
                CaptureError::PatternNotFound { pattern } => CaptureError::PatternNotFound {
                    pattern: pattern.clone(),
                },
                CaptureError::Timeout { duration_ms } => CaptureError::Timeout {
                    duration_ms: *duration_ms,
                },
                CaptureError::InvalidParameter { parameter, reason } => {
                    CaptureError::InvalidParameter {
                        parameter: parameter.clone(),
                        reason:    reason.clone(),
                    }
                }
                CaptureError::DecodeFailed { reason } => CaptureError::DecodeFailed {
                    reason: reason.clone(),
                },
                CaptureError::EncodingFailed { format, reason } => CaptureError::EncodingFailed {
                    format: format.clone(),
                    reason: reason.clone(),
                },
                CaptureError::ScriptFailed { reason } => CaptureError::ScriptFailed {
                    reason: reason.clone(),
                },
                CaptureError::NotSupported { feature, driver } => CaptureError::NotSupported {
                    feature: feature.clone(),
                    driver:  driver.clone(),
                },
                CaptureError::DriverError { operation, reason } => CaptureError::DriverError {
                    operation: operation.clone(),
                    reason:    reason.clone(),
                },
                CaptureError::IoError(e) => {
                    CaptureError::IoError(std::io::Error::new(e.kind(), e.to_string()))
                }
                CaptureError::ImageError(msg) => CaptureError::ImageError(msg.clone()),
            });
        }
        Ok(())
    }

    /// Applies the configured delay
    async fn apply_delay(&self) {
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
    }

    fn element(&self, id: &ElementId) -> CaptureResult<&MockElement> {
        self.elements.get(id).ok_or_else(|| CaptureError::ElementNotFound {
            element: id.to_string(),
        })
    }

    /// Client region of `id`: its box shifted by every owner's scroll
    fn client_region_in(&self, state: &MockState, id: &ElementId) -> CaptureResult<Region> {
        let element = self.element(id)?;
        let mut location = element.region.location();
        let mut owner = element.owner.as_ref();
        let mut depth = 0;
        while let Some(current) = owner {
            depth += 1;
            if depth > self.elements.len() {
                return Err(CaptureError::DriverError {
                    operation: "get_client_region".to_string(),
                    reason:    format!("owner cycle at element {}", id),
                });
            }
            location = location - state.shift(current);
            owner = self.element(current)?.owner.as_ref();
        }
        Ok(Region::from_parts(location, element.region.size()))
    }

    /// Renders the current screen in device pixels
    fn render(&self) -> CaptureResult<RgbaImage> {
        let state = self.state.lock();
        let root_shift = state.shift(&self.root);

        // Panes drawn over the main document: (client box, content shift)
        let mut panes = Vec::new();
        for (id, element) in &self.elements {
            if *id == self.root || element.owner.as_ref() != Some(&self.root) {
                continue;
            }
            let scroller = match (&element.document, element.content) {
                (Some(document), _) => document,
                (None, Some(_)) => id,
                (None, None) => continue,
            };
            let client = self.client_region_in(&state, id)?;
            panes.push((client, state.shift(scroller)));
        }

        let status = self.status_bar;
        let css = RgbaImage::from_fn(self.viewport.width, status + self.viewport.height, |x, y| {
            if y < status {
                return Rgba(STATUS_BAR_COLOUR);
            }
            let (x, y) = (x as i64, (y - status) as i64);
            for (client, shift) in &panes {
                let (left, top) = (client.x as i64, client.y as i64);
                if x >= left && x < client.right() && y >= top && y < client.bottom() {
                    return Rgba(Self::inner_pixel(
                        x - left + shift.x as i64,
                        y - top + shift.y as i64,
                    ));
                }
            }
            Rgba(Self::page_pixel(x + root_shift.x as i64, y + root_shift.y as i64))
        });

        let ratio = self.pixel_ratio;
        let mut device = if ratio == 1.0 {
            css
        } else {
            let width = (css.width() as f64 * ratio).round() as u32;
            let height = (css.height() as f64 * ratio).round() as u32;
            let (max_x, max_y) = (css.width().saturating_sub(1), css.height().saturating_sub(1));
            RgbaImage::from_fn(width, height, |x, y| {
                let sx = ((x as f64 / ratio).floor() as u32).min(max_x);
                let sy = ((y as f64 / ratio).floor() as u32).min(max_y);
                *css.get_pixel(sx, sy)
            })
        };

        if state.marker {
            let origin = Offset::new(0, (status as f64 * ratio).round() as i32);
            paint_pattern(&mut device, origin, &Pattern::page_marker(ratio));
        }
        Ok(device)
    }

    fn element_arg(args: &[Value], index: usize) -> CaptureResult<ElementId> {
        args.get(index)
            .and_then(Value::as_str)
            .map(ElementId::from)
            .ok_or_else(|| CaptureError::ScriptFailed {
                reason: format!("argument {} is not an element reference", index),
            })
    }

    fn number_arg(args: &[Value], index: usize) -> CaptureResult<i32> {
        args.get(index)
            .and_then(Value::as_f64)
            .map(|value| value.round() as i32)
            .ok_or_else(|| CaptureError::ScriptFailed {
                reason: format!("argument {} is not a number", index),
            })
    }
}

#[async_trait]
impl ScreenshotProvider for MockDriver {
    async fn take_screenshot(&self) -> CaptureResult<Vec<u8>> {
        self.apply_delay().await;
        self.check_error_injection()?;

        let image = self.render()?;
        self.state.lock().screenshots += 1;
        encode_png(&image)
    }
}

#[async_trait]
impl ViewportMetrics for MockDriver {
    async fn get_window_size(&self) -> CaptureResult<Size> {
        self.apply_delay().await;
        self.check_error_injection()?;
        Ok(Size::new(self.viewport.width, self.viewport.height + self.status_bar))
    }

    async fn get_viewport_size(&self) -> CaptureResult<Size> {
        self.apply_delay().await;
        self.check_error_injection()?;
        Ok(self.viewport)
    }
}

#[async_trait]
impl ScrollCapable for MockDriver {
    async fn scroll_to(&self, element: &ElementId, offset: Offset) -> CaptureResult<Offset> {
        self.apply_delay().await;
        self.check_error_injection()?;

        let target = self.element(element)?;
        let actual = (offset + target.scroll_bias).clamp(target.max_scroll());
        let mut state = self.state.lock();
        state.scroll.insert(element.clone(), actual);
        state.scroll_log.push((element.clone(), actual));
        Ok(actual)
    }

    async fn get_scroll_offset(&self, element: &ElementId) -> CaptureResult<Offset> {
        self.apply_delay().await;
        self.check_error_injection()?;
        self.element(element)?;
        Ok(self.state.lock().scroll.get(element).copied().unwrap_or_default())
    }

    async fn get_client_region(&self, element: &ElementId) -> CaptureResult<Region> {
        self.apply_delay().await;
        self.check_error_injection()?;
        let state = self.state.lock();
        self.client_region_in(&state, element)
    }

    async fn get_content_size(&self, element: &ElementId) -> CaptureResult<Size> {
        self.apply_delay().await;
        self.check_error_injection()?;
        let target = self.element(element)?;
        Ok(target.content.unwrap_or(target.region.size()))
    }
}

#[async_trait]
impl ScriptExecutor for MockDriver {
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> CaptureResult<Value> {
        self.apply_delay().await;
        self.check_error_injection()?;
        self.state.lock().script_log.push(script.to_string());

        if script == scripts::ADD_PAGE_MARKER {
            self.state.lock().marker = true;
            let size = if self.pixel_ratio < 1.0 { 2 } else { 1 };
            return Ok(json!({ "mask": Pattern::page_marker(1.0).mask, "size": size, "offset": size }));
        }
        if script == scripts::REMOVE_PAGE_MARKER {
            self.state.lock().marker = false;
            return Ok(Value::Null);
        }
        if script == scripts::TRANSLATE_TO {
            let element = Self::element_arg(&args, 0)?;
            self.element(&element)?;
            let offset = Offset::new(Self::number_arg(&args, 1)?, Self::number_arg(&args, 2)?);
            self.state.lock().translate.insert(element, offset);
            return Ok(json!({ "x": offset.x, "y": offset.y }));
        }
        if script == scripts::GET_TRANSLATE {
            let element = Self::element_arg(&args, 0)?;
            self.element(&element)?;
            let offset = self.state.lock().translate.get(&element).copied().unwrap_or_default();
            return Ok(json!({ "x": offset.x, "y": offset.y }));
        }
        Ok(Value::Null)
    }
}
