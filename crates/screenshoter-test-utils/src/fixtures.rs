//! Synthetic fixture images
//!
//! Every fixture is computed, never loaded from disk:
//!
//! - [`expected_page`] / [`expected_inner`]: what the mock driver shows for a
//!   document region
//! - [`gradient`]: a pattern where every pixel is distinct enough to catch
//!   off-by-one crops and transposed rotations
//! - [`marker_screenshot`] / [`device_screenshot`]: raw screenshots with the
//!   page marker painted below a status bar

use image::{Rgba, RgbaImage};
use screenshoter_core::{
    capture::{
        MockDriver,
        matching::{DeviceProfile, Pattern, paint_pattern},
        mock::STATUS_BAR_COLOUR,
    },
    model::{Offset, Region},
};

/// Mock page pixels for a region of the main document
pub fn expected_page(region: Region) -> RgbaImage {
    RgbaImage::from_fn(region.width, region.height, |x, y| {
        Rgba(MockDriver::page_pixel(
            region.x as i64 + x as i64,
            region.y as i64 + y as i64,
        ))
    })
}

/// Mock pane pixels for a region of a scrollable pane or frame document
pub fn expected_inner(region: Region) -> RgbaImage {
    RgbaImage::from_fn(region.width, region.height, |x, y| {
        Rgba(MockDriver::inner_pixel(
            region.x as i64 + x as i64,
            region.y as i64 + y as i64,
        ))
    })
}

/// Opaque gradient where `(x, y)` maps to a unique colour for sizes up to 256
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x / 256 + y / 256) % 256) as u8, 255])
    })
}

/// Raw screenshot with a status bar and the page marker at the viewport origin
///
/// `status_bar` is in device pixels; the page below it is the mock page at
/// scroll zero.
pub fn marker_screenshot(width: u32, height: u32, status_bar: u32, pattern: &Pattern) -> RgbaImage {
    let mut image = RgbaImage::from_fn(width, height, |x, y| {
        if y < status_bar {
            Rgba(STATUS_BAR_COLOUR)
        } else {
            Rgba(MockDriver::page_pixel(x as i64, (y - status_bar) as i64))
        }
    });
    paint_pattern(&mut image, Offset::new(0, status_bar as i32), pattern);
    image
}

/// Raw screenshot as taken on a device from the device table
///
/// The marker sits at the profile's expected offset; everything above it is
/// device chrome.
pub fn device_screenshot(profile: &DeviceProfile, width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::from_fn(width, height, |x, y| {
        let origin = profile.offset;
        if (y as i64) < origin.y as i64 || (x as i64) < origin.x as i64 {
            Rgba(STATUS_BAR_COLOUR)
        } else {
            Rgba(MockDriver::page_pixel(
                x as i64 - origin.x as i64,
                y as i64 - origin.y as i64,
            ))
        }
    });
    paint_pattern(&mut image, profile.offset, &profile.pattern());
    image
}

#[cfg(test)]
mod tests {
    use screenshoter_core::capture::{find_pattern, matching::DEVICE_PROFILES};

    use super::*;

    #[test]
    fn test_expected_page_matches_mock_colours() {
        let page = expected_page(Region::new(10, 20, 3, 2));
        assert_eq!(page.dimensions(), (3, 2));
        assert_eq!(page.get_pixel(2, 1).0, MockDriver::page_pixel(12, 21));
    }

    #[test]
    fn test_gradient_is_opaque() {
        let image = gradient(300, 2);
        assert!(image.pixels().all(|p| p.0[3] == 255));
        assert_ne!(image.get_pixel(0, 0), image.get_pixel(256, 0));
    }

    #[test]
    fn test_device_screenshots_locate_their_marker() {
        for profile in DEVICE_PROFILES {
            let image = device_screenshot(profile, 600, profile.offset.y as u32 + 100);
            assert_eq!(
                find_pattern(&image, &profile.pattern()),
                Some(profile.offset),
                "{}",
                profile.id
            );
        }
    }
}
