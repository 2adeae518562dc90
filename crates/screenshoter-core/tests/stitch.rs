//! Full-page and full-element stitching against the mock driver
//!
//! The mock page is 200x100 CSS pixels per viewport and 350 rows tall, so
//! every full-page stitch needs several captures and the last one is
//! clamped by the scrollable range.

use std::sync::Arc;

use screenshoter_core::{
    capture::{
        ContextTree, MockDriver, MockElement, Scroller, mock::STATUS_BAR_COLOUR, session_from_mock,
        take_framed_screenshot, take_stitched_screenshot,
    },
    error::CaptureError,
    model::{DriverInfo, ElementId, Offset, Region, ScreenshotSettings, ScrollingMode, Size},
};
use screenshoter_test_utils::{
    compare::assert_images_equal,
    fixtures::{expected_inner, expected_page},
};

fn page() -> MockDriver {
    MockDriver::new(Size::new(200, 100), Size::new(200, 350))
}

fn settings() -> ScreenshotSettings {
    ScreenshotSettings::builder().fully(true).wait_ms(0).timeout_ms(0).build()
}

fn html(mode: ScrollingMode) -> Scroller {
    Scroller::new(ElementId::new("html"), mode)
}

#[tokio::test]
async fn test_full_page_desktop() {
    let driver = Arc::new(page());
    let session = session_from_mock(driver.clone());
    let tree = ContextTree::new(Some(ElementId::new("html")));

    let shot = take_stitched_screenshot(
        &session,
        &tree,
        tree.main(),
        &html(ScrollingMode::Scroll),
        None,
        &settings(),
    )
    .await
    .unwrap();

    assert_eq!(shot.region, Region::new(0, 0, 200, 350));
    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_page(Region::new(0, 0, 200, 350)),
        "full page",
    );
    // 0, 100, 200 and the clamped 250
    assert_eq!(driver.screenshot_count(), 4);
}

#[tokio::test]
async fn test_scroll_position_restored_after_stitching() {
    let driver = Arc::new(page());
    driver.set_scroll("html", Offset::new(0, 123));
    let session = session_from_mock(driver.clone());
    let tree = ContextTree::new(Some(ElementId::new("html")));

    let shot = take_stitched_screenshot(
        &session,
        &tree,
        tree.main(),
        &html(ScrollingMode::Scroll),
        None,
        &settings(),
    )
    .await
    .unwrap();

    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_page(Region::new(0, 0, 200, 350)),
        "full page from 123",
    );
    assert_eq!(driver.scroll_position("html"), Offset::new(0, 123));
    assert_eq!(driver.scroll_log().last(), Some(&(ElementId::new("html"), Offset::new(0, 123))));
}

#[tokio::test]
async fn test_full_page_mobile_with_marker() {
    let info = DriverInfo {
        is_mobile: true,
        pixel_ratio: 2.0,
        ..DriverInfo::default()
    };
    let driver = Arc::new(page().with_status_bar(30).with_info(info));
    let session = session_from_mock(driver.clone());
    let tree = ContextTree::new(Some(ElementId::new("html")));

    let shot = take_stitched_screenshot(
        &session,
        &tree,
        tree.main(),
        &html(ScrollingMode::Scroll),
        None,
        &settings(),
    )
    .await
    .unwrap();

    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_page(Region::new(0, 0, 200, 350)),
        "mobile full page",
    );
    assert!(!driver.marker_visible());
}

#[tokio::test]
async fn test_overlap_skips_header_rows() {
    let driver = Arc::new(page());
    let session = session_from_mock(driver.clone());
    let tree = ContextTree::new(Some(ElementId::new("html")));
    let settings = ScreenshotSettings {
        overlap: 40,
        ..settings()
    };

    let shot = take_stitched_screenshot(
        &session,
        &tree,
        tree.main(),
        &html(ScrollingMode::Scroll),
        None,
        &settings,
    )
    .await
    .unwrap();

    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_page(Region::new(0, 0, 200, 350)),
        "overlap",
    );
    // Rows advance by 60: 0, 60, 120, 180, 240 and the clamped 250
    assert_eq!(driver.screenshot_count(), 6);
}

#[tokio::test]
async fn test_overlap_must_leave_fresh_rows() {
    let session = session_from_mock(Arc::new(page()));
    let tree = ContextTree::new(Some(ElementId::new("html")));
    let settings = ScreenshotSettings {
        overlap: 100,
        ..settings()
    };

    let err = take_stitched_screenshot(
        &session,
        &tree,
        tree.main(),
        &html(ScrollingMode::Scroll),
        None,
        &settings,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CaptureError::InvalidParameter { ref parameter, .. } if parameter == "overlap"));
}

#[tokio::test]
async fn test_max_height_limits_composite() {
    let driver = Arc::new(page());
    let session = session_from_mock(driver.clone());
    let tree = ContextTree::new(Some(ElementId::new("html")));
    let settings = ScreenshotSettings {
        max_height: 250,
        ..settings()
    };

    let shot = take_stitched_screenshot(
        &session,
        &tree,
        tree.main(),
        &html(ScrollingMode::Scroll),
        None,
        &settings,
    )
    .await
    .unwrap();

    assert_eq!(shot.region, Region::new(0, 0, 200, 250));
    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_page(Region::new(0, 0, 200, 250)),
        "max height",
    );
    assert_eq!(driver.screenshot_count(), 3);
}

#[tokio::test]
async fn test_region_of_page() {
    let session = session_from_mock(Arc::new(page()));
    let tree = ContextTree::new(Some(ElementId::new("html")));

    let shot = take_stitched_screenshot(
        &session,
        &tree,
        tree.main(),
        &html(ScrollingMode::Scroll),
        Some(Region::new(30, 120, 100, 400)),
        &settings(),
    )
    .await
    .unwrap();

    // Clipped to the 350 rows of content
    assert_eq!(shot.region, Region::new(30, 120, 100, 230));
    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_page(Region::new(30, 120, 100, 230)),
        "page region",
    );
}

#[tokio::test]
async fn test_region_outside_content() {
    let session = session_from_mock(Arc::new(page()));
    let tree = ContextTree::new(Some(ElementId::new("html")));

    let err = take_stitched_screenshot(
        &session,
        &tree,
        tree.main(),
        &html(ScrollingMode::Scroll),
        Some(Region::new(0, 500, 50, 50)),
        &settings(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        CaptureError::EmptyRegion { region, bounds }
            if region == Region::new(0, 500, 50, 50) && bounds == Size::new(200, 350)
    ));
}

#[tokio::test]
async fn test_scrollable_pane() {
    let driver = Arc::new(page().with_element(
        "panel",
        MockElement::scrollable(Region::new(50, 20, 100, 50), Some("html"), Size::new(100, 300)),
    ));
    let session = session_from_mock(driver.clone());
    let tree = ContextTree::new(Some(ElementId::new("html")));
    let panel = Scroller::new(ElementId::new("panel"), ScrollingMode::Scroll);

    let shot = take_stitched_screenshot(&session, &tree, tree.main(), &panel, None, &settings())
        .await
        .unwrap();

    assert_eq!(shot.region, Region::new(0, 0, 100, 300));
    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_inner(Region::new(0, 0, 100, 300)),
        "pane",
    );
    assert_eq!(driver.scroll_position("html"), Offset::zero());
}

#[tokio::test]
async fn test_frame_document() {
    let driver = Arc::new(
        page()
            .with_element(
                "frame",
                MockElement::fixed(Region::new(10, 20, 150, 60), Some("html")).showing("frame-doc"),
            )
            .with_element(
                "frame-doc",
                MockElement::scrollable(Region::new(0, 0, 150, 60), None, Size::new(150, 400)),
            ),
    );
    let session = session_from_mock(driver.clone());
    let mut tree = ContextTree::new(Some(ElementId::new("html")));
    let frame = tree
        .add_frame(tree.main(), ElementId::new("frame"), Some(ElementId::new("frame-doc")))
        .unwrap();
    let scroller = Scroller::new(ElementId::new("frame-doc"), ScrollingMode::Scroll);

    let shot = take_stitched_screenshot(&session, &tree, frame, &scroller, None, &settings())
        .await
        .unwrap();

    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_inner(Region::new(0, 0, 150, 400)),
        "frame document",
    );
    // 60 row windows: 0, 60, ..., 300 and the clamped 340
    assert_eq!(driver.screenshot_count(), 7);
}

#[tokio::test]
async fn test_css_translate_mode() {
    let driver = Arc::new(page());
    let session = session_from_mock(driver.clone());
    let tree = ContextTree::new(Some(ElementId::new("html")));

    let shot = take_stitched_screenshot(
        &session,
        &tree,
        tree.main(),
        &html(ScrollingMode::Css),
        None,
        &settings(),
    )
    .await
    .unwrap();

    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_page(Region::new(0, 0, 200, 350)),
        "css translate",
    );
    assert!(driver.scroll_log().is_empty());
    assert_eq!(driver.scroll_position("html"), Offset::zero());
}

#[tokio::test]
async fn test_framed_native_capture() {
    let driver = Arc::new(
        MockDriver::new(Size::new(200, 100), Size::new(200, 300))
            .with_status_bar(20)
            .with_info(DriverInfo::native(2.0, 40))
            .without_scripts(),
    );
    let session = session_from_mock(driver);
    let tree = ContextTree::new(Some(ElementId::new("html")));
    let settings = ScreenshotSettings {
        framed: true,
        ..settings()
    };

    let shot = take_framed_screenshot(
        &session,
        &tree,
        tree.main(),
        &html(ScrollingMode::Scroll),
        &settings,
    )
    .await
    .unwrap();

    assert_eq!(shot.image.size(), Size::new(200, 320));
    let pixels = shot.image.to_object().unwrap();
    for y in 0..20 {
        assert_eq!(pixels.get_pixel(100, y).0, STATUS_BAR_COLOUR, "status bar row {}", y);
    }
    let content = image::imageops::crop_imm(&pixels, 0, 20, 200, 300).to_image();
    assert_images_equal(&content, &expected_page(Region::new(0, 0, 200, 300)), "framed content");
}

#[tokio::test]
async fn test_framed_requires_native_session() {
    let session = session_from_mock(Arc::new(page()));
    let tree = ContextTree::new(Some(ElementId::new("html")));

    let err = take_framed_screenshot(
        &session,
        &tree,
        tree.main(),
        &html(ScrollingMode::Scroll),
        &settings(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CaptureError::InvalidParameter { ref parameter, .. } if parameter == "framed"));
}
