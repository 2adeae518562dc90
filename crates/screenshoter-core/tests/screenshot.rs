//! Screenshot orchestration: strategy selection, timeout and scroll
//! restoration

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use screenshoter_core::{
    capture::{ContextTree, MockDriver, MockElement, ScreenshotTarget, session_from_mock, take_screenshot},
    error::CaptureError,
    model::{DriverInfo, ElementId, LazyLoadSettings, Offset, Region, ScreenshotSettings, Size},
};
use screenshoter_test_utils::{
    compare::assert_images_equal,
    fixtures::{expected_inner, expected_page},
    timing::{assert_duration_below, time_async},
};

fn page() -> MockDriver {
    MockDriver::new(Size::new(200, 100), Size::new(200, 1000))
}

fn tree() -> ContextTree {
    ContextTree::new(Some(ElementId::new("html")))
}

fn settings() -> ScreenshotSettings {
    ScreenshotSettings::builder()
        .wait_ms(0)
        .timeout_ms(0)
        .max_height(10_000)
        .build()
}

#[tokio::test]
async fn test_viewport_capture() {
    let driver = Arc::new(page());
    driver.set_scroll("html", Offset::new(0, 40));
    let session = session_from_mock(driver.clone());
    let tree = tree();

    let shot = take_screenshot(&session, &tree, &ScreenshotTarget::context(tree.main()), &settings())
        .await
        .unwrap();

    assert_eq!(shot.region, Region::new(0, 0, 200, 100));
    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_page(Region::new(0, 40, 200, 100)),
        "viewport",
    );
    assert_eq!(driver.screenshot_count(), 1);
}

#[tokio::test]
async fn test_region_scrolled_into_view() {
    let driver = Arc::new(page());
    let session = session_from_mock(driver.clone());
    let tree = tree();
    let target = ScreenshotTarget::context(tree.main()).with_region(Region::new(20, 450, 100, 50));

    let shot = take_screenshot(&session, &tree, &target, &settings()).await.unwrap();

    assert_eq!(shot.region, Region::new(20, 450, 100, 50));
    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_page(Region::new(20, 450, 100, 50)),
        "region",
    );
    // Scrolled to 450 for the capture, then back
    assert_eq!(driver.scroll_position("html"), Offset::zero());
    assert!(
        driver
            .scroll_log()
            .iter()
            .any(|(element, offset)| element.as_str() == "html" && *offset == Offset::new(0, 450))
    );
}

#[tokio::test]
async fn test_region_of_scrollable_pane() {
    let driver = Arc::new(page().with_element(
        "panel",
        MockElement::scrollable(Region::new(50, 20, 100, 50), Some("html"), Size::new(100, 300)),
    ));
    let session = session_from_mock(driver.clone());
    let tree = tree();
    let target = ScreenshotTarget::context(tree.main())
        .with_scroller("panel")
        .with_region(Region::new(10, 200, 40, 30));

    let shot = take_screenshot(&session, &tree, &target, &settings()).await.unwrap();

    assert_eq!(shot.region, Region::new(10, 200, 40, 30));
    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_inner(Region::new(10, 200, 40, 30)),
        "pane region",
    );
    assert_eq!(driver.scroll_position("panel"), Offset::zero());
}

#[tokio::test]
async fn test_full_page_restores_scroll_position() {
    let driver = Arc::new(page());
    driver.set_scroll("html", Offset::new(0, 123));
    let session = session_from_mock(driver.clone());
    let tree = tree();
    let settings = ScreenshotSettings {
        fully: true,
        ..settings()
    };

    let shot = take_screenshot(&session, &tree, &ScreenshotTarget::context(tree.main()), &settings)
        .await
        .unwrap();

    assert_eq!(shot.region, Region::new(0, 0, 200, 1000));
    assert_images_equal(
        &shot.image.to_object().unwrap(),
        &expected_page(Region::new(0, 0, 200, 1000)),
        "full page",
    );
    assert_eq!(driver.scroll_position("html"), Offset::new(0, 123));
}

#[tokio::test]
async fn test_timeout() {
    let driver = Arc::new(page().with_delay(Duration::from_millis(50)));
    let session = session_from_mock(driver);
    let tree = tree();
    let settings = ScreenshotSettings {
        fully: true,
        timeout_ms: 20,
        ..settings()
    };

    let (result, elapsed) = time_async(
        "timed out screenshot",
        take_screenshot(&session, &tree, &ScreenshotTarget::context(tree.main()), &settings),
    )
    .await;

    assert!(matches!(result, Err(CaptureError::Timeout { duration_ms: 20 })));
    // Snapshot and restore run outside the ceiling
    assert_duration_below(elapsed, Duration::from_secs(2), "timed out screenshot");
}

#[tokio::test]
async fn test_lazy_load_runs_before_capture() {
    let driver = Arc::new(page());
    let session = session_from_mock(driver.clone());
    let tree = tree();
    let settings = ScreenshotSettings {
        lazy_load: Some(LazyLoadSettings {
            scroll_length:        300,
            waiting_time:         0,
            max_amount_to_scroll: 15_000,
        }),
        ..settings()
    };

    take_screenshot(&session, &tree, &ScreenshotTarget::context(tree.main()), &settings)
        .await
        .unwrap();

    let offsets: Vec<i32> = driver.scroll_log().iter().map(|(_, offset)| offset.y).collect();
    assert!(offsets.starts_with(&[300, 600, 900, 0]), "scroll log {:?}", offsets);
    assert_eq!(driver.scroll_position("html"), Offset::zero());
}

#[tokio::test]
async fn test_bezel_only_capture() {
    let driver = Arc::new(
        page()
            .with_status_bar(20)
            .with_info(DriverInfo::native(2.0, 40))
            .without_scripts(),
    );
    let session = session_from_mock(driver);
    let tree = tree();
    let settings = ScreenshotSettings {
        framed: true,
        ..settings()
    };

    let shot = take_screenshot(&session, &tree, &ScreenshotTarget::context(tree.main()), &settings)
        .await
        .unwrap();
    assert_eq!(shot.image.size(), Size::new(200, 120));
    assert_eq!(shot.region, Region::new(0, 0, 200, 120));
}

#[tokio::test]
async fn test_missing_scroller() {
    let session = session_from_mock(Arc::new(page()));
    let tree = ContextTree::new(None);

    let err = take_screenshot(&session, &tree, &ScreenshotTarget::context(tree.main()), &settings())
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::InvalidParameter { ref parameter, .. } if parameter == "scroller"));
}

#[tokio::test]
async fn test_region_outside_page_reports_requested_region() {
    let driver = Arc::new(page());
    let session = session_from_mock(driver.clone());
    let tree = tree();

    for region in [Region::new(0, 1000, 50, 50), Region::new(-100, -100, 50, 50)] {
        let target = ScreenshotTarget::context(tree.main()).with_region(region);
        let err = take_screenshot(&session, &tree, &target, &settings()).await.unwrap_err();
        match err {
            CaptureError::EmptyRegion { region: reported, bounds } => {
                assert_eq!(reported, region);
                assert_eq!(bounds, Size::new(200, 100));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(driver.scroll_position("html"), Offset::zero());
    }
}

#[tokio::test]
async fn test_driver_error_propagates() {
    let driver = page().with_error(CaptureError::DriverError {
        operation: "take_screenshot".to_string(),
        reason:    "session closed".to_string(),
    });
    let session = session_from_mock(Arc::new(driver));
    let tree = tree();

    let err = take_screenshot(&session, &tree, &ScreenshotTarget::context(tree.main()), &settings())
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::DriverError { ref reason, .. } if reason == "session closed"));
}

#[tokio::test]
async fn test_parallel_sessions() {
    let drivers: Vec<Arc<MockDriver>> = (0..4)
        .map(|i| {
            let driver = Arc::new(page());
            driver.set_scroll("html", Offset::new(0, 100 * i));
            driver
        })
        .collect();
    let sessions: Vec<_> = drivers.iter().cloned().map(session_from_mock).collect();
    let tree = tree();
    let settings = ScreenshotSettings {
        fully: true,
        ..settings()
    };
    let target = ScreenshotTarget::context(tree.main());

    let results = join_all(
        sessions
            .iter()
            .map(|session| take_screenshot(session, &tree, &target, &settings)),
    )
    .await;

    let expected = expected_page(Region::new(0, 0, 200, 1000));
    for (i, result) in results.into_iter().enumerate() {
        let shot = result.unwrap();
        assert_images_equal(&shot.image.to_object().unwrap(), &expected, "parallel session");
        assert_eq!(drivers[i].scroll_position("html"), Offset::new(0, 100 * i as i32));
    }
}

#[tokio::test]
async fn test_environment_limits_stitch_height() {
    let settings = temp_env::with_vars(
        [
            ("SCREENSHOTER_MAX_STITCH_HEIGHT", Some("150")),
            ("SCREENSHOTER_WAIT_MS", Some("0")),
            ("SCREENSHOTER_CAPTURE_TIMEOUT_MS", Some("0")),
            ("SCREENSHOTER_DEBUG_PATH", None),
        ],
        || ScreenshotSettings {
            fully: true,
            ..ScreenshotSettings::default()
        },
    );
    assert_eq!(settings.max_height, 150);
    assert_eq!(settings.wait_ms, 0);

    let session = session_from_mock(Arc::new(page()));
    let tree = tree();
    let shot = take_screenshot(&session, &tree, &ScreenshotTarget::context(tree.main()), &settings)
        .await
        .unwrap();
    assert_eq!(shot.region, Region::new(0, 0, 200, 150));
}
