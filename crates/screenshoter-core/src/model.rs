//! Geometry and configuration types shared across the capture pipeline
//!
//! This module defines the core value types used throughout the library:
//! - Pixel geometry: [`Offset`], [`Size`], [`Region`] and the [`CropRegion`]
//!   boundary type accepting both rectangle shapes
//! - Driver metadata: [`DriverInfo`] and [`ElementId`]
//! - Capture configuration: [`ScreenshotSettings`] and its builder

use std::{
    fmt,
    ops::{Add, Neg, Sub},
    path::PathBuf,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::capture::constants;

// ============================================================================
// Geometry
// ============================================================================

/// Signed pixel displacement
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct Offset {
    /// Horizontal displacement in pixels
    pub x: i32,
    /// Vertical displacement in pixels
    pub y: i32,
}

impl Offset {
    /// Creates a new offset
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The zero offset
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Returns true if both components are zero
    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Multiplies both components by `ratio`, rounding to the nearest pixel
    pub fn scale(&self, ratio: f64) -> Self {
        Self {
            x: (self.x as f64 * ratio).round() as i32,
            y: (self.y as f64 * ratio).round() as i32,
        }
    }

    /// Clamps each component into `[0, max]`
    pub fn clamp(&self, max: Offset) -> Self {
        Self {
            x: self.x.clamp(0, max.x.max(0)),
            y: self.y.clamp(0, max.y.max(0)),
        }
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Offset {
    type Output = Offset;

    fn sub(self, rhs: Offset) -> Offset {
        Offset::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Offset {
    type Output = Offset;

    fn neg(self) -> Offset {
        Offset::new(-self.x, -self.y)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Width and height in pixels
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct Size {
    /// Width in pixels
    pub width:  u32,
    /// Height in pixels
    pub height: u32,
}

impl Size {
    /// Creates a new size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Scales both dimensions by `ratio`, rounding to the nearest pixel
    pub fn scale(&self, ratio: f64) -> Self {
        Self {
            width:  (self.width as f64 * ratio).round().max(0.0) as u32,
            height: (self.height as f64 * ratio).round().max(0.0) as u32,
        }
    }

    /// Number of pixels covered
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer pixel rectangle
///
/// The coordinate space (page, viewport or context-local) is decided by the
/// caller. Width and height are unsigned so a region can never have a
/// negative extent.
///
/// # Examples
///
/// ```
/// use screenshoter_core::model::Region;
///
/// let viewport = Region::new(0, 0, 800, 600);
/// let header = Region::new(-10, -10, 100, 50);
///
/// let visible = viewport.intersect(&header);
/// assert_eq!(visible, Region::new(0, 0, 90, 40));
/// assert!(!viewport.contains(&header));
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct Region {
    /// Left edge
    pub x:      i32,
    /// Top edge
    pub y:      i32,
    /// Width in pixels
    pub width:  u32,
    /// Height in pixels
    pub height: u32,
}

impl Region {
    /// Creates a new region
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a region from a location and a size
    pub const fn from_parts(location: Offset, size: Size) -> Self {
        Self::new(location.x, location.y, size.width, size.height)
    }

    /// Creates a region anchored at the origin
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Top-left corner
    pub fn location(&self) -> Offset {
        Offset::new(self.x, self.y)
    }

    /// Dimensions
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Exclusive right edge
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Returns true if the region covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Translates the region by `offset`
    pub fn offset(&self, offset: Offset) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Translates the region by the negation of `offset`
    pub fn offset_negative(&self, offset: Offset) -> Self {
        self.offset(-offset)
    }

    /// Returns the overlap of two regions
    ///
    /// Disjoint regions produce an empty region located at the far corner of
    /// the overlap computation, so callers should test with
    /// [`Region::is_empty`] rather than compare against a sentinel.
    pub fn intersect(&self, other: &Region) -> Region {
        let left = (self.x as i64).max(other.x as i64);
        let top = (self.y as i64).max(other.y as i64);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        Region::new(
            left as i32,
            top as i32,
            (right - left).max(0) as u32,
            (bottom - top).max(0) as u32,
        )
    }

    /// Returns true if `other` lies entirely inside `self`
    pub fn contains(&self, other: &Region) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns true if the regions share at least one pixel
    pub fn intersects(&self, other: &Region) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Multiplies location and size by `ratio`, rounding each component
    pub fn scale(&self, ratio: f64) -> Self {
        Self::from_parts(self.location().scale(ratio), self.size().scale(ratio))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Region accepted at the image boundary
///
/// Callers may describe a crop either as a rectangle or as insets from the
/// four edges. Both shapes deserialize from JSON without a tag.
///
/// # Examples
///
/// ```
/// use screenshoter_core::model::{CropRegion, Region, Size};
///
/// let inset = CropRegion::Inset { left: 100, top: 120, right: 110, bottom: 130 };
/// let rect = CropRegion::Rect(Region::new(100, 120, 402, 262));
///
/// let bounds = Size::new(612, 512);
/// assert_eq!(inset.resolve(bounds), rect.resolve(bounds));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CropRegion {
    /// Explicit rectangle
    Rect(Region),
    /// Distances to trim from each edge
    Inset {
        /// Pixels trimmed from the left edge
        left:   u32,
        /// Pixels trimmed from the top edge
        top:    u32,
        /// Pixels trimmed from the right edge
        right:  u32,
        /// Pixels trimmed from the bottom edge
        bottom: u32,
    },
}

impl CropRegion {
    /// Normalizes to a rectangle against an image of size `bounds`
    pub fn resolve(&self, bounds: Size) -> Region {
        match *self {
            CropRegion::Rect(region) => region,
            CropRegion::Inset {
                left,
                top,
                right,
                bottom,
            } => Region::new(
                left as i32,
                top as i32,
                bounds.width.saturating_sub(left.saturating_add(right)),
                bounds.height.saturating_sub(top.saturating_add(bottom)),
            ),
        }
    }
}

impl From<Region> for CropRegion {
    fn from(region: Region) -> Self {
        CropRegion::Rect(region)
    }
}

// ============================================================================
// Driver Metadata
// ============================================================================

/// Opaque reference to an element known by the driver
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl ElementId {
    /// Creates a new element reference
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Device orientation as reported by mobile drivers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Taller than wide
    #[default]
    Portrait,
    /// Wider than tall
    Landscape,
}

/// Environment facts parsed from driver capabilities and the user agent
///
/// Heights and insets are expressed in device (physical) pixels, the same
/// unit as the raw screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverInfo {
    /// Native app context (no DOM, no scripts)
    pub is_native:             bool,
    /// Running on a phone or tablet
    pub is_mobile:             bool,
    /// iOS device or simulator
    pub is_ios:                bool,
    /// Android device or emulator
    pub is_android:            bool,
    /// Physical pixels per CSS pixel
    pub pixel_ratio:           f64,
    /// Height of the OS status bar above the viewport
    pub status_bar_height:     u32,
    /// Height of the navigation bar below the viewport
    pub navigation_bar_height: u32,
    /// Safe-area inset applied around the viewport
    pub safe_area:             Option<Region>,
    /// Device model identifier, e.g. `iPhone_SE_portrait`
    pub device_name:           Option<String>,
    /// Screen orientation
    pub orientation:           Orientation,
    /// Browser name, absent for native apps
    pub browser_name:          Option<String>,
    /// Browser major version
    pub browser_version:       Option<String>,
    /// Operating system name
    pub platform_name:         Option<String>,
    /// Operating system version
    pub platform_version:      Option<String>,
    /// Raw user agent string when known
    pub user_agent:            Option<String>,
}

impl Default for DriverInfo {
    fn default() -> Self {
        Self {
            is_native:             false,
            is_mobile:             false,
            is_ios:                false,
            is_android:            false,
            pixel_ratio:           1.0,
            status_bar_height:     0,
            navigation_bar_height: 0,
            safe_area:             None,
            device_name:           None,
            orientation:           Orientation::Portrait,
            browser_name:          None,
            browser_version:       None,
            platform_name:         None,
            platform_version:      None,
            user_agent:            None,
        }
    }
}

impl DriverInfo {
    /// Desktop web session at the given pixel ratio
    pub fn desktop(pixel_ratio: f64) -> Self {
        Self {
            pixel_ratio,
            ..Self::default()
        }
    }

    /// Native mobile app session
    pub fn native(pixel_ratio: f64, status_bar_height: u32) -> Self {
        Self {
            is_native: true,
            is_mobile: true,
            pixel_ratio,
            status_bar_height,
            ..Self::default()
        }
    }

    /// Effective pixel ratio, treating non-positive values as 1
    pub fn effective_pixel_ratio(&self) -> f64 {
        if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 {
            self.pixel_ratio
        } else {
            1.0
        }
    }
}

// ============================================================================
// Capture Settings
// ============================================================================

/// How a scroller moves content into view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScrollingMode {
    /// Native `scrollTo` on the scrolling element
    #[default]
    Scroll,
    /// CSS `transform: translate(...)` applied through script execution
    Css,
}

/// Incremental scroll-and-wait cycles that force deferred content to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LazyLoadSettings {
    /// Distance scrolled per cycle
    pub scroll_length:        u32,
    /// Pause after each scroll in milliseconds
    pub waiting_time:         u64,
    /// Stop once the scroll position reaches this value
    pub max_amount_to_scroll: u32,
}

impl Default for LazyLoadSettings {
    fn default() -> Self {
        Self {
            scroll_length:        constants::LAZY_LOAD_SCROLL_LENGTH,
            waiting_time:         constants::LAZY_LOAD_WAITING_TIME_MS,
            max_amount_to_scroll: constants::LAZY_LOAD_MAX_AMOUNT_TO_SCROLL,
        }
    }
}

/// Where and how debug images are dumped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DebugSettings {
    /// Output directory
    pub path:   PathBuf,
    /// File name prefix
    pub prefix: String,
    /// File name suffix placed before the extension
    pub suffix: String,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            path:   std::env::temp_dir().join("screenshoter"),
            prefix: "screenshot".to_string(),
            suffix: String::new(),
        }
    }
}

/// Settings for a single screenshot operation
///
/// Defaults come from [`constants`], so environment overrides apply to any
/// field the caller does not set explicitly.
///
/// # Examples
///
/// ```
/// use screenshoter_core::model::{ScreenshotSettings, ScrollingMode};
///
/// let settings = ScreenshotSettings::builder()
///     .fully(true)
///     .scrolling_mode(ScrollingMode::Css)
///     .wait_ms(0)
///     .build();
///
/// assert!(settings.fully);
/// assert_eq!(settings.scrolling_mode, ScrollingMode::Css);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenshotSettings {
    /// Delay before every raw capture, in milliseconds
    pub wait_ms:        u64,
    /// Wall-clock ceiling for the whole operation, in milliseconds
    pub timeout_ms:     u64,
    /// Stitch the full scrollable content instead of the visible viewport
    pub fully:          bool,
    /// Combine the capture with the device bezel (native apps)
    pub framed:         bool,
    /// How scrollers move content
    pub scrolling_mode: ScrollingMode,
    /// Rows hidden under sticky headers, skipped on every stitched row but the first
    pub overlap:        u32,
    /// Upper bound for the stitched height
    pub max_height:     u32,
    /// Retry raw captures until two consecutive captures agree in size
    pub stabilize:      bool,
    /// Overrides the `1 / pixel_ratio` normalization factor
    pub scale_ratio:    Option<f64>,
    /// Scroll-and-wait cycles before stitching
    pub lazy_load:      Option<LazyLoadSettings>,
    /// Debug image output
    pub debug:          Option<DebugSettings>,
}

impl Default for ScreenshotSettings {
    fn default() -> Self {
        Self {
            wait_ms:        constants::wait_ms(),
            timeout_ms:     constants::capture_timeout_ms(),
            fully:          false,
            framed:         false,
            scrolling_mode: ScrollingMode::Scroll,
            overlap:        0,
            max_height:     constants::max_stitch_height(),
            stabilize:      false,
            scale_ratio:    None,
            lazy_load:      None,
            debug:          constants::debug_path().map(|path| DebugSettings {
                path,
                ..DebugSettings::default()
            }),
        }
    }
}

impl ScreenshotSettings {
    /// Creates a builder initialized with the defaults
    pub fn builder() -> ScreenshotSettingsBuilder {
        ScreenshotSettingsBuilder::default()
    }
}

/// Builder for [`ScreenshotSettings`]
#[derive(Debug, Clone, Default)]
pub struct ScreenshotSettingsBuilder {
    settings: ScreenshotSettings,
}

impl ScreenshotSettingsBuilder {
    /// Sets the pre-capture delay
    pub fn wait_ms(mut self, wait_ms: u64) -> Self {
        self.settings.wait_ms = wait_ms;
        self
    }

    /// Sets the wall-clock ceiling
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.settings.timeout_ms = timeout_ms;
        self
    }

    /// Enables full-content stitching
    pub fn fully(mut self, fully: bool) -> Self {
        self.settings.fully = fully;
        self
    }

    /// Enables device-frame composition
    pub fn framed(mut self, framed: bool) -> Self {
        self.settings.framed = framed;
        self
    }

    /// Sets the scrolling mode
    pub fn scrolling_mode(mut self, mode: ScrollingMode) -> Self {
        self.settings.scrolling_mode = mode;
        self
    }

    /// Sets the sticky header overlap
    pub fn overlap(mut self, overlap: u32) -> Self {
        self.settings.overlap = overlap;
        self
    }

    /// Sets the maximum stitched height
    pub fn max_height(mut self, max_height: u32) -> Self {
        self.settings.max_height = max_height;
        self
    }

    /// Enables capture stabilization
    pub fn stabilize(mut self, stabilize: bool) -> Self {
        self.settings.stabilize = stabilize;
        self
    }

    /// Overrides the normalization scale
    pub fn scale_ratio(mut self, ratio: f64) -> Self {
        self.settings.scale_ratio = Some(ratio);
        self
    }

    /// Enables lazy-load cycles
    pub fn lazy_load(mut self, lazy_load: LazyLoadSettings) -> Self {
        self.settings.lazy_load = Some(lazy_load);
        self
    }

    /// Enables debug image output
    pub fn debug(mut self, debug: DebugSettings) -> Self {
        self.settings.debug = Some(debug);
        self
    }

    /// Finishes the builder
    pub fn build(self) -> ScreenshotSettings {
        self.settings
    }
}
