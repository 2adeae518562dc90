//! Pixel comparison
//!
//! Captures are compared without tolerance: every stage of the pipeline is
//! deterministic, so a single differing pixel is a bug.

use image::RgbaImage;

/// Result of comparing two images of the same size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDiff {
    /// Number of differing pixels
    pub differing: usize,
    /// First differing pixel in row-major order
    pub first:     Option<(u32, u32)>,
}

impl ImageDiff {
    /// True when no pixel differs
    pub fn is_identical(&self) -> bool {
        self.differing == 0
    }
}

/// Compares two images pixel by pixel
///
/// Returns `None` when the dimensions differ.
pub fn diff_images(actual: &RgbaImage, expected: &RgbaImage) -> Option<ImageDiff> {
    if actual.dimensions() != expected.dimensions() {
        return None;
    }
    let mut diff = ImageDiff {
        differing: 0,
        first:     None,
    };
    for (x, y, pixel) in actual.enumerate_pixels() {
        if pixel != expected.get_pixel(x, y) {
            diff.differing += 1;
            diff.first.get_or_insert((x, y));
        }
    }
    Some(diff)
}

/// Asserts that two images are identical
///
/// # Panics
///
/// Panics on a size mismatch or when any pixel differs, naming the first
/// differing pixel and both colours.
pub fn assert_images_equal(actual: &RgbaImage, expected: &RgbaImage, label: &str) {
    let Some(diff) = diff_images(actual, expected) else {
        panic!(
            "{}: size {:?} differs from expected {:?}",
            label,
            actual.dimensions(),
            expected.dimensions()
        );
    };
    if let Some((x, y)) = diff.first {
        panic!(
            "{}: {} pixels differ, first at ({}, {}): {:?} != {:?}",
            label,
            diff.differing,
            x,
            y,
            actual.get_pixel(x, y).0,
            expected.get_pixel(x, y).0
        );
    }
}
