//! Fiducial marker detection
//!
//! When a driver does not report where the viewport starts inside a raw
//! screenshot (mobile browsers draw a status bar and an address bar above
//! it), a marker of alternating black and white blocks is painted into the
//! top-left corner of the page and located again in the screenshot.
//!
//! # Matching Rules
//!
//! - Pixels are classified by luminance (`0.299r + 0.587g + 0.114b`):
//!   below 128 is black (`1`), anything else white (`0`)
//! - Each mask element spans `round(size * pixel_ratio)` consecutive pixels
//!   of one row
//! - The scan is row-major from pixel 0 and the first match wins
//! - The reported coordinate is the first matching pixel minus
//!   `round(offset * pixel_ratio)` on both axes
//!
//! # Device Table
//!
//! [`DEVICE_PROFILES`] holds the expected marker location for known
//! device/orientation pairs. It doubles as a fallback when scripts cannot be
//! executed and as a fixture table for tests.

use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::{
    error::{CaptureError, CaptureResult},
    model::{Offset, Orientation},
};

/// Mask painted by the page marker script
pub const PAGE_MARKER_MASK: [u8; 21] = [1, 0, 1, 1, 0, 1, 1, 0, 1, 0, 1, 0, 1, 1, 0, 1, 0, 0, 1, 1, 1];

/// Grey used for the marker padding; classified as white
pub const MARKER_PADDING: [u8; 4] = [128, 128, 128, 255];

/// Alternating block marker description
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// Block colours, `1` for black and `0` for white
    pub mask:        Vec<u8>,
    /// Block edge length in CSS pixels
    pub size:        u32,
    /// Padding around the blocks in CSS pixels
    pub offset:      u32,
    /// Device pixels per CSS pixel of the image being scanned
    pub pixel_ratio: f64,
}

impl Pattern {
    /// The page marker painted by [`ADD_PAGE_MARKER`](super::scripts::ADD_PAGE_MARKER)
    pub fn page_marker(pixel_ratio: f64) -> Self {
        Self {
            mask: PAGE_MARKER_MASK.to_vec(),
            size: 1,
            offset: 1,
            pixel_ratio,
        }
    }

    /// Builds a pattern from the `{mask, size, offset}` object returned by
    /// the marker script
    pub fn from_marker_response(value: &Value, pixel_ratio: f64) -> CaptureResult<Self> {
        let invalid = |what: &str| CaptureError::ScriptFailed {
            reason: format!("marker script returned no valid {}: {}", what, value),
        };

        let mask = value
            .get("mask")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("mask"))?
            .iter()
            .map(|bit| match bit.as_u64() {
                Some(0) => Ok(0),
                Some(1) => Ok(1),
                _ => Err(invalid("mask")),
            })
            .collect::<CaptureResult<Vec<u8>>>()?;
        if mask.is_empty() {
            return Err(invalid("mask"));
        }

        let size = value.get("size").and_then(Value::as_u64).ok_or_else(|| invalid("size"))?;
        let offset = value
            .get("offset")
            .and_then(Value::as_u64)
            .ok_or_else(|| invalid("offset"))?;

        Ok(Self {
            mask,
            size: size as u32,
            offset: offset as u32,
            pixel_ratio,
        })
    }

    /// Width in device pixels of one mask element
    pub fn block_span(&self) -> u32 {
        ((self.size as f64 * self.pixel_ratio).round() as u32).max(1)
    }

    /// Padding in device pixels subtracted from the match position
    pub fn margin(&self) -> u32 {
        (self.offset as f64 * self.pixel_ratio).round() as u32
    }
}

pub(crate) fn is_black(pixel: &Rgba<u8>) -> bool {
    let [r, g, b, _] = pixel.0;
    // Weights scaled by 1000 keep the 128 boundary exact.
    (299 * r as u32 + 587 * g as u32 + 114 * b as u32) < 128_000
}

/// Locates `pattern` in `image`
///
/// Returns the marker origin (first matching pixel minus the margin), or
/// `None` when the pattern does not occur anywhere in the image.
///
/// # Examples
///
/// ```
/// use image::{Rgba, RgbaImage};
/// use screenshoter_core::{
///     capture::matching::{Pattern, find_pattern, paint_pattern},
///     model::Offset,
/// };
///
/// let pattern = Pattern::page_marker(2.0);
/// let mut image = RgbaImage::from_pixel(200, 300, Rgba([255, 255, 255, 255]));
/// assert_eq!(find_pattern(&image, &pattern), None);
///
/// paint_pattern(&mut image, Offset::new(0, 140), &pattern);
/// assert_eq!(find_pattern(&image, &pattern), Some(Offset::new(0, 140)));
/// ```
pub fn find_pattern(image: &RgbaImage, pattern: &Pattern) -> Option<Offset> {
    let span = pattern.block_span() as usize;
    let length = span * pattern.mask.len();
    let width = image.width() as usize;
    if pattern.mask.is_empty() || length > width {
        return None;
    }

    let margin = pattern.margin() as i32;
    let mut bits = vec![0u8; width];

    for (y, row) in image.rows().enumerate() {
        for (bit, pixel) in bits.iter_mut().zip(row) {
            *bit = u8::from(is_black(pixel));
        }

        let found = (0..=width - length).find(|&x| {
            pattern.mask.iter().enumerate().all(|(index, &expected)| {
                let start = x + index * span;
                bits[start..start + span].iter().all(|&bit| bit == expected)
            })
        });

        if let Some(x) = found {
            let origin = Offset::new(x as i32 - margin, y as i32 - margin);
            tracing::debug!("Pattern found at pixel ({}, {}), origin {}", x, y, origin);
            return Some(origin);
        }
    }

    tracing::debug!(
        "Pattern of {} blocks not found in {}x{} image",
        pattern.mask.len(),
        image.width(),
        image.height()
    );
    None
}

/// Paints `pattern` so that [`find_pattern`] reports `origin`
///
/// Draws the grey padding box and the blocks, clipped to the image.
pub fn paint_pattern(image: &mut RgbaImage, origin: Offset, pattern: &Pattern) {
    let span = pattern.block_span() as i64;
    let margin = pattern.margin() as i64;
    let blocks = pattern.mask.len() as i64;
    let box_width = 2 * margin + blocks * span;
    let box_height = 2 * margin + span;

    let mut put = |x: i64, y: i64, colour: [u8; 4]| {
        if x >= 0 && y >= 0 && x < image.width() as i64 && y < image.height() as i64 {
            image.put_pixel(x as u32, y as u32, Rgba(colour));
        }
    };

    for dy in 0..box_height {
        for dx in 0..box_width {
            let inside = dy >= margin && dy < margin + span && dx >= margin && dx < margin + blocks * span;
            let colour = if inside {
                match pattern.mask[((dx - margin) / span) as usize] {
                    1 => [0, 0, 0, 255],
                    _ => [255, 255, 255, 255],
                }
            } else {
                MARKER_PADDING
            };
            put(origin.x as i64 + dx, origin.y as i64 + dy, colour);
        }
    }
}

// ============================================================================
// Device Table
// ============================================================================

/// Expected marker location for one device and orientation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    /// Identifier, `{device}_{orientation}` with spaces replaced by `_`
    pub id:          &'static str,
    /// Device pixels per CSS pixel
    pub pixel_ratio: f64,
    /// Viewport origin inside the raw screenshot, in device pixels
    pub offset:      Offset,
}

impl DeviceProfile {
    /// Marker pattern as painted on this device
    pub fn pattern(&self) -> Pattern {
        Pattern::page_marker(self.pixel_ratio)
    }
}

/// Known devices and the viewport offset their browsers produce
pub static DEVICE_PROFILES: &[DeviceProfile] = &[
    DeviceProfile {
        id:          "iPhone_SE_portrait",
        pixel_ratio: 2.0,
        offset:      Offset::new(0, 140),
    },
    DeviceProfile {
        id:          "iPhone_SE_landscape",
        pixel_ratio: 2.0,
        offset:      Offset::new(0, 100),
    },
    DeviceProfile {
        id:          "iPhone_12_portrait",
        pixel_ratio: 3.0,
        offset:      Offset::new(0, 282),
    },
    DeviceProfile {
        id:          "iPhone_12_landscape",
        pixel_ratio: 3.0,
        offset:      Offset::new(132, 150),
    },
    DeviceProfile {
        id:          "iPad_Air_portrait",
        pixel_ratio: 2.0,
        offset:      Offset::new(0, 148),
    },
    DeviceProfile {
        id:          "Pixel_4_portrait",
        pixel_ratio: 2.75,
        offset:      Offset::new(0, 223),
    },
    DeviceProfile {
        id:          "Galaxy_S10_portrait",
        pixel_ratio: 3.0,
        offset:      Offset::new(0, 252),
    },
];

static DEVICE_INDEX: Lazy<HashMap<String, &'static DeviceProfile>> = Lazy::new(|| {
    DEVICE_PROFILES
        .iter()
        .map(|profile| (profile.id.to_lowercase(), profile))
        .collect()
});

/// Builds the table identifier for a device name and orientation
///
/// # Examples
///
/// ```
/// use screenshoter_core::{capture::matching::device_id, model::Orientation};
///
/// assert_eq!(device_id("iPhone SE", Orientation::Portrait), "iPhone_SE_portrait");
/// ```
pub fn device_id(device_name: &str, orientation: Orientation) -> String {
    let orientation = match orientation {
        Orientation::Portrait => "portrait",
        Orientation::Landscape => "landscape",
    };
    format!("{}_{}", device_name.trim().replace(' ', "_"), orientation)
}

/// Looks up a device profile; identifiers are case-insensitive
pub fn device_profile(id: &str) -> Option<&'static DeviceProfile> {
    DEVICE_INDEX.get(&id.to_lowercase()).copied()
}

/// Finds the page marker in a screenshot taken on a known device
pub fn find_device_offset(image: &RgbaImage, id: &str) -> Option<Offset> {
    let profile = device_profile(id)?;
    find_pattern(image, &profile.pattern())
}
