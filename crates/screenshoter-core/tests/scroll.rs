//! Scroll coordination across nested frames
//!
//! The fixture nests two iframes inside the main document:
//!
//! ```text
//! main (800x600 viewport, 800x5000 content)
//! └── frame A host at (50, 2000), 700x400, content 700x3000
//!     └── frame B host at (20, 1500), 600x300, content 600x2000
//!         └── target element at (10, 1200), 100x50
//! ```

use std::sync::Arc;

use screenshoter_core::{
    capture::{
        ContextId, ContextTree, MockDriver, MockElement, ScrollCapable, Scroller,
        scroll_into_viewport, session_from_mock,
    },
    model::{ElementId, Offset, Region, ScrollingMode, Size},
};

struct Fixture {
    driver:  Arc<MockDriver>,
    tree:    ContextTree,
    frame_b: ContextId,
}

fn nested_frames(biases: [Offset; 3]) -> Fixture {
    let [main_bias, a_bias, b_bias] = biases;
    let driver = MockDriver::new(Size::new(800, 600), Size::new(800, 5000))
        .with_element(
            "html",
            MockElement::scrollable(Region::new(0, 0, 800, 600), None, Size::new(800, 5000))
                .with_scroll_bias(main_bias),
        )
        .with_element(
            "frame-a",
            MockElement::fixed(Region::new(50, 2000, 700, 400), Some("html")).showing("doc-a"),
        )
        .with_element(
            "doc-a",
            MockElement::scrollable(Region::new(0, 0, 700, 400), None, Size::new(700, 3000))
                .with_scroll_bias(a_bias),
        )
        .with_element(
            "frame-b",
            MockElement::fixed(Region::new(20, 1500, 600, 300), Some("doc-a")).showing("doc-b"),
        )
        .with_element(
            "doc-b",
            MockElement::scrollable(Region::new(0, 0, 600, 300), None, Size::new(600, 2000))
                .with_scroll_bias(b_bias),
        )
        .with_element("target", MockElement::fixed(Region::new(10, 1200, 100, 50), Some("doc-b")));

    let mut tree = ContextTree::new(Some(ElementId::new("html")));
    let frame_a = tree
        .add_frame(tree.main(), ElementId::new("frame-a"), Some(ElementId::new("doc-a")))
        .unwrap();
    let frame_b = tree
        .add_frame(frame_a, ElementId::new("frame-b"), Some(ElementId::new("doc-b")))
        .unwrap();

    Fixture {
        driver: Arc::new(driver),
        tree,
        frame_b,
    }
}

async fn scroll_target(fixture: &Fixture) -> (Offset, Offset) {
    let session = session_from_mock(fixture.driver.clone());
    let target = ElementId::new("target");
    let region = fixture.driver.get_client_region(&target).await.unwrap();
    let scroller = Scroller::new(ElementId::new("doc-b"), ScrollingMode::Scroll);

    let remaining = scroll_into_viewport(
        &session,
        &fixture.tree,
        fixture.frame_b,
        &scroller,
        Some(region),
    )
    .await
    .unwrap();

    let frame_location = fixture
        .tree
        .location_in_viewport(&session, fixture.frame_b)
        .await
        .unwrap();
    let target_location = fixture.driver.get_client_region(&target).await.unwrap().location();
    (remaining, frame_location + target_location)
}

#[tokio::test]
async fn test_residual_in_three_level_fixture() {
    let fixture = nested_frames([Offset::zero(); 3]);
    let (remaining, actual_location) = scroll_target(&fixture).await;

    assert_eq!(remaining, Offset::new(80, 0));
    assert_eq!(remaining, actual_location);
    assert_eq!(fixture.driver.scroll_position("doc-b"), Offset::new(0, 1200));
    assert_eq!(fixture.driver.scroll_position("doc-a"), Offset::new(0, 1500));
    assert_eq!(fixture.driver.scroll_position("html"), Offset::new(0, 2000));
}

#[tokio::test]
async fn test_residual_independent_of_intermediate_scroll_errors() {
    let cases = [
        [Offset::zero(), Offset::new(0, -13), Offset::new(0, 7)],
        [Offset::zero(), Offset::new(0, 25), Offset::new(0, -40)],
        [Offset::zero(), Offset::new(0, 9), Offset::zero()],
    ];
    for biases in cases {
        let fixture = nested_frames(biases);
        let (remaining, actual_location) = scroll_target(&fixture).await;
        assert_eq!(remaining, Offset::new(80, 0), "biases {:?}", biases);
        assert_eq!(remaining, actual_location, "biases {:?}", biases);
    }
}

#[tokio::test]
async fn test_residual_reports_outer_scroll_error() {
    let fixture = nested_frames([Offset::new(0, 30), Offset::zero(), Offset::zero()]);
    let (remaining, actual_location) = scroll_target(&fixture).await;

    // The outermost level overshoots, so the target ends up 30px higher.
    assert_eq!(remaining, Offset::new(80, -30));
    assert_eq!(remaining, actual_location);
}

#[tokio::test]
async fn test_residual_when_main_document_is_clamped() {
    let fixture = nested_frames([Offset::zero(); 3]);
    let session = session_from_mock(fixture.driver.clone());
    let scroller = Scroller::new(ElementId::new("doc-b"), ScrollingMode::Scroll);

    // Frame B's document clamps at 1700; frame A scrolls further to compensate.
    let remaining = scroll_into_viewport(
        &session,
        &fixture.tree,
        fixture.frame_b,
        &scroller,
        Some(Region::new(0, 1990, 10, 10)),
    )
    .await
    .unwrap();

    let location = fixture
        .tree
        .location_in_viewport(&session, fixture.frame_b)
        .await
        .unwrap();
    let scrolled = fixture.driver.scroll_position("doc-b");
    assert_eq!(remaining, location + Offset::new(0, 1990) - scrolled);
    assert_eq!(scrolled, Offset::new(0, 1700));
}
