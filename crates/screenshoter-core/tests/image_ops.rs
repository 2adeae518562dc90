//! Image pipeline integration tests
//!
//! Golden outputs are produced by `image::imageops`, or for halving by a
//! plain 2x2 block mean, from the same source pixels and compared without
//! tolerance.

use image::{Rgba, RgbaImage, imageops};
use screenshoter_core::{
    error::CaptureError,
    imaging::Image,
    model::{CropRegion, Offset, Region, Size},
};
use screenshoter_test_utils::{
    compare::assert_images_equal,
    fixtures::{expected_page, gradient},
    timing::{assert_duration_below, measure_sync},
};

#[test]
fn test_crop_matches_imageops() {
    let source = gradient(300, 200);
    let mut image = Image::from_rgba(source.clone());
    image.crop(Region::new(40, 25, 120, 90)).unwrap();

    let expected = imageops::crop_imm(&source, 40, 25, 120, 90).to_image();
    assert_images_equal(&image.to_object().unwrap(), &expected, "crop");
}

#[test]
fn test_inset_crop_equals_rect_crop() {
    let source = gradient(300, 200);
    let mut inset = Image::from_rgba(source.clone());
    inset
        .crop(CropRegion::Inset {
            left:   40,
            top:    25,
            right:  140,
            bottom: 85,
        })
        .unwrap();
    let mut rect = Image::from_rgba(source);
    rect.crop(Region::new(40, 25, 120, 90)).unwrap();

    assert_images_equal(
        &inset.to_object().unwrap(),
        &rect.to_object().unwrap(),
        "inset crop",
    );
}

#[test]
fn test_rotations_match_imageops() {
    let source = gradient(37, 23);
    let cases = [
        (90, imageops::rotate90(&source)),
        (180, imageops::rotate180(&source)),
        (270, imageops::rotate270(&source)),
        (-90, imageops::rotate270(&source)),
        (450, imageops::rotate90(&source)),
    ];
    for (degrees, expected) in cases {
        let mut image = Image::from_rgba(source.clone());
        image.rotate(degrees).unwrap();
        assert_images_equal(
            &image.to_object().unwrap(),
            &expected,
            &format!("rotate {}", degrees),
        );
    }
}

/// Mean of each 2x2 block, halves rounded up
fn box_halve(source: &RgbaImage) -> RgbaImage {
    RgbaImage::from_fn(source.width() / 2, source.height() / 2, |x, y| {
        let block = [
            source.get_pixel(2 * x, 2 * y),
            source.get_pixel(2 * x + 1, 2 * y),
            source.get_pixel(2 * x, 2 * y + 1),
            source.get_pixel(2 * x + 1, 2 * y + 1),
        ];
        let mut pixel = [0u8; 4];
        for (channel, value) in pixel.iter_mut().enumerate() {
            let sum: u32 = block.iter().map(|p| p[channel] as u32).sum();
            *value = ((sum + 2) / 4) as u8;
        }
        Rgba(pixel)
    })
}

#[test]
fn test_scale_half_matches_box_mean() {
    let source = gradient(612, 512);
    let mut image = Image::from_rgba(source.clone());
    image.scale(0.5).unwrap();

    assert_eq!(image.size(), Size::new(306, 256));
    assert_images_equal(&image.to_object().unwrap(), &box_halve(&source), "scale 0.5");
}

#[test]
fn test_crop_then_scale_matches_box_mean() {
    let source = gradient(612, 512);
    let mut image = Image::from_rgba(source.clone());
    image.crop(Region::new(101, 33, 200, 120)).unwrap();
    image.scale(0.5).unwrap();

    let cropped = imageops::crop_imm(&source, 101, 33, 200, 120).to_image();
    assert_images_equal(&image.to_object().unwrap(), &box_halve(&cropped), "crop then scale");
}

#[test]
fn test_crop_then_rotate_matches_imageops() {
    let source = gradient(120, 80);
    let mut image = Image::from_rgba(source.clone());
    image.crop(Region::new(10, 5, 60, 40)).unwrap().rotate(90).unwrap();

    let cropped = imageops::crop_imm(&source, 10, 5, 60, 40).to_image();
    assert_images_equal(
        &image.to_object().unwrap(),
        &imageops::rotate90(&cropped),
        "crop+rotate",
    );
}

#[test]
fn test_copy_pastes_and_clips() {
    let base = gradient(100, 100);
    let overlay = gradient(30, 30);
    let mut image = Image::from_rgba(base.clone());
    image.copy(&Image::from_rgba(overlay.clone()), Offset::new(85, -10));

    let mut expected = base;
    imageops::replace(&mut expected, &overlay, 85, -10);
    assert_images_equal(&image.to_object().unwrap(), &expected, "copy");
}

#[test]
fn test_two_copies_build_stitched_page() {
    let mut canvas = Image::blank(200, 250);
    canvas
        .copy(&Image::from_rgba(expected_page(Region::new(0, 0, 200, 100))), Offset::new(0, 0))
        .copy(&Image::from_rgba(expected_page(Region::new(0, 60, 200, 190))), Offset::new(0, 60));

    assert_images_equal(
        &canvas.to_object().unwrap(),
        &expected_page(Region::new(0, 0, 200, 250)),
        "stitched",
    );
}

#[test]
fn test_copy_leaves_source_untouched() {
    let overlay = Image::from_rgba(gradient(10, 10));
    let before = overlay.to_object().unwrap();
    let mut canvas = Image::blank(50, 50);
    canvas.copy(&overlay, Offset::new(5, 5));
    canvas.to_object().unwrap();
    assert_images_equal(&overlay.to_object().unwrap(), &before, "source");
}

#[test]
fn test_png_round_trip_keeps_pixels() {
    let source = gradient(64, 48);
    let png = Image::from_rgba(source.clone()).to_png().unwrap();
    let decoded = Image::from_bytes(png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
    assert_images_equal(&decoded.to_object().unwrap(), &source, "png");
}

#[test]
fn test_crop_outside_is_empty_region() {
    let mut image = Image::blank(100, 100);
    let err = image.crop(Region::new(200, 200, 10, 10)).unwrap_err();
    assert!(matches!(err, CaptureError::EmptyRegion { .. }));
    assert_eq!(image.size().width, 100);
}

#[test]
fn test_large_image_streams_with_exact_dimensions() {
    let tile = Image::from_rgba(gradient(256, 256));
    let mut image = Image::blank(1000, 50_000);
    for y in (0..50_000).step_by(7_000) {
        image.copy(&tile, Offset::new((y % 700) as i32, y as i32));
    }
    image
        .crop(Region::new(10, 20, 980, 49_950))
        .unwrap()
        .rotate(90)
        .unwrap();
    assert_eq!((image.width(), image.height()), (49_950, 980));

    let ((rows, width), elapsed) = measure_sync("stream 1000x50000", || {
        let mut rows = 0u32;
        let mut width = 0usize;
        image
            .stream_rows(|_, line| {
                rows += 1;
                width = line.len() / 4;
            })
            .unwrap();
        (rows, width)
    });
    assert_eq!(rows, 980);
    assert_eq!(width, 49_950);
    assert_duration_below(elapsed, std::time::Duration::from_secs(120), "stream 1000x50000");
}

#[test]
fn test_tall_canvas_keeps_pasted_tail() {
    let tile = gradient(16, 16);
    let mut image = Image::blank(40, 20_000);
    image.copy(&Image::from_rgba(tile.clone()), Offset::new(0, 19_984));
    image.crop(Region::new(0, 19_984, 16, 16)).unwrap();
    assert_images_equal(&image.to_object().unwrap(), &tile, "tail tile");
}
