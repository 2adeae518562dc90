//! Scrolling and coordinate mapping across nested contexts
//!
//! A [`Scroller`] moves the content of one scrolling element, either through
//! the driver's native scroll or through a CSS translate applied by script.
//! [`scroll_into_viewport`] walks the context chain from a target context up
//! to the main document and scrolls every level so the target lands as close
//! to the top-left of the viewport as the scrollable ranges allow.
//!
//! # Residual Offset
//!
//! Every level contributes `position - actual + frame_location` to the
//! remaining offset. When a driver lands somewhere other than requested
//! (clamping, snapping) the difference stays in the remaining offset, so the
//! returned value is always the target's location in the viewport after the
//! walk, independent of how individual levels over- or under-scrolled.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::sleep;

use super::{
    DriverSession,
    context::{ContextId, ContextTree},
    scripts,
};
use crate::{
    error::{CaptureError, CaptureResult},
    model::{ElementId, LazyLoadSettings, Offset, Region, ScrollingMode, Size},
};

/// Parses an `{x, y}` script result
pub fn parse_offset(value: &Value) -> CaptureResult<Offset> {
    let component = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_f64)
            .map(|v| v.round() as i32)
            .ok_or_else(|| CaptureError::ScriptFailed {
                reason: format!("expected {{x, y}} offset, got {}", value),
            })
    };
    Ok(Offset::new(component("x")?, component("y")?))
}

/// Snapshot of a scroller taken before a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    /// Scroll or translate offset
    pub offset:        Offset,
    /// Client region at the time of the snapshot
    pub client_region: Region,
}

/// Moves the content of one scrolling element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scroller {
    element: ElementId,
    mode:    ScrollingMode,
}

impl Scroller {
    /// Creates a scroller for `element`
    pub fn new(element: ElementId, mode: ScrollingMode) -> Self {
        Self { element, mode }
    }

    /// The scrolling element
    pub fn element(&self) -> &ElementId {
        &self.element
    }

    /// How content is moved
    pub fn mode(&self) -> ScrollingMode {
        self.mode
    }

    /// Visible box of the element in its context's client coordinates
    pub async fn client_region(&self, session: &DriverSession) -> CaptureResult<Region> {
        session.scroll.get_client_region(&self.element).await
    }

    /// Full content size of the element
    pub async fn content_size(&self, session: &DriverSession) -> CaptureResult<Size> {
        session.scroll.get_content_size(&self.element).await
    }

    /// Largest reachable offset: content size minus client size, floored at 0
    pub async fn max_offset(&self, session: &DriverSession) -> CaptureResult<Offset> {
        let content = self.content_size(session).await?;
        let client = self.client_region(session).await?;
        Ok(Offset::new(
            (content.width as i64 - client.width as i64).max(0) as i32,
            (content.height as i64 - client.height as i64).max(0) as i32,
        ))
    }

    /// Current offset
    pub async fn position(&self, session: &DriverSession) -> CaptureResult<Offset> {
        match self.mode {
            ScrollingMode::Scroll => session.scroll.get_scroll_offset(&self.element).await,
            ScrollingMode::Css => {
                let result = session
                    .execute_script(scripts::GET_TRANSLATE, vec![json!(self.element)])
                    .await?;
                parse_offset(&result)
            }
        }
    }

    /// Moves to `offset` and returns the offset actually reached
    pub async fn move_to(&self, session: &DriverSession, offset: Offset) -> CaptureResult<Offset> {
        let actual = match self.mode {
            ScrollingMode::Scroll => session.scroll.scroll_to(&self.element, offset).await?,
            ScrollingMode::Css => {
                let target = offset.clamp(self.max_offset(session).await?);
                let result = session
                    .execute_script(
                        scripts::TRANSLATE_TO,
                        vec![json!(self.element), json!(target.x), json!(target.y)],
                    )
                    .await?;
                parse_offset(&result)?
            }
        };
        tracing::trace!("Scroller {} moved to {} (requested {})", self.element, actual, offset);
        Ok(actual)
    }

    /// Captures the current offset and client region
    pub async fn state(&self, session: &DriverSession) -> CaptureResult<ScrollState> {
        Ok(ScrollState {
            offset:        self.position(session).await?,
            client_region: self.client_region(session).await?,
        })
    }

    /// Moves back to a snapshot
    ///
    /// A different landing position is logged, not reported as an error.
    pub async fn restore(&self, session: &DriverSession, state: ScrollState) -> CaptureResult<()> {
        let actual = self.move_to(session, state.offset).await?;
        if actual != state.offset {
            tracing::warn!(
                "Scroller {} restored to {} instead of {}",
                self.element,
                actual,
                state.offset
            );
        }
        Ok(())
    }
}

/// Scrolls every level of the context chain so `region` comes into view
///
/// `region` is in client coordinates of `context`; when absent the client
/// region of `scroller` is used. Levels without a scrolling element only
/// contribute their frame location. Each level uses the mode of `scroller`.
///
/// Returns the remaining offset of the region's top-left corner in the
/// viewport, or zero when nothing had to move.
pub async fn scroll_into_viewport(
    session: &DriverSession,
    tree: &ContextTree,
    context: ContextId,
    scroller: &Scroller,
    region: Option<Region>,
) -> CaptureResult<Offset> {
    if session.info.is_native {
        return Ok(Offset::zero());
    }

    let local = match region {
        Some(region) => region,
        None => scroller.client_region(session).await?,
    };
    let in_viewport = local.offset(tree.location_in_viewport(session, context).await?);
    let viewport = Region::from_size(session.viewport.get_viewport_size().await?);
    if viewport.contains(&in_viewport) {
        tracing::debug!("Region {} already inside viewport {}", in_viewport, viewport);
        return Ok(Offset::zero());
    }

    let mut remaining = local.location();
    for level in tree.path(context)? {
        if let Some(element) = tree.scrolling_element(level)? {
            let level_scroller = Scroller::new(element.clone(), scroller.mode());
            let client = level_scroller.client_region(session).await?;
            let max = level_scroller.max_offset(session).await?;
            let position = level_scroller.position(session).await?;

            let target = remaining - client.location() + position;
            let actual = level_scroller.move_to(session, target.clamp(max)).await?;
            remaining = target - actual + client.location();
            tracing::debug!(
                "Level {}: scroller {} requested {} reached {}, remaining {}",
                level,
                element,
                target.clamp(max),
                actual,
                remaining
            );
        }
        if let Some(host) = tree.frame_host(level)? {
            remaining = remaining + session.scroll.get_client_region(host).await?.location();
        }
    }
    Ok(remaining)
}

/// Scrolls through the content in steps so lazily loaded content appears
///
/// Moves down by `scroll_length` and waits `waiting_time` after each step.
/// Stops at the bottom of the content, at `max_amount_to_scroll` or when a
/// step does not move. The start position is restored afterwards.
pub async fn lazy_load(
    session: &DriverSession,
    scroller: &Scroller,
    settings: &LazyLoadSettings,
) -> CaptureResult<()> {
    if settings.scroll_length == 0 {
        return Err(CaptureError::invalid_parameter(
            "scroll_length",
            "lazy load step must be positive",
        ));
    }

    let start = scroller.state(session).await?;
    let max = scroller.max_offset(session).await?;
    let limit = (settings.max_amount_to_scroll as i64).min(max.y as i64);

    let mut current = start.offset;
    let mut steps = 0;
    while (current.y as i64) < limit {
        let next_y = (current.y as i64 + settings.scroll_length as i64).min(limit) as i32;
        let reached = scroller
            .move_to(session, Offset::new(current.x, next_y))
            .await?;
        steps += 1;
        sleep(Duration::from_millis(settings.waiting_time)).await;
        if reached == current {
            break;
        }
        current = reached;
    }

    tracing::debug!("Lazy load scrolled {} steps down to {}", steps, current);
    scroller.restore(session, start).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::capture::{MockDriver, MockElement, session_from_mock};

    fn page() -> Arc<MockDriver> {
        Arc::new(MockDriver::new(Size::new(400, 300), Size::new(400, 2000)))
    }

    fn html_scroller(mode: ScrollingMode) -> Scroller {
        Scroller::new(ElementId::new("html"), mode)
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset(&json!({"x": 1.6, "y": -2})).unwrap(), Offset::new(2, -2));
        assert!(matches!(
            parse_offset(&json!({"x": 1})),
            Err(CaptureError::ScriptFailed { .. })
        ));
        assert!(parse_offset(&Value::Null).is_err());
    }

    #[tokio::test]
    async fn test_max_offset() {
        let session = session_from_mock(page());
        let scroller = html_scroller(ScrollingMode::Scroll);
        assert_eq!(scroller.max_offset(&session).await.unwrap(), Offset::new(0, 1700));
    }

    #[tokio::test]
    async fn test_css_mode_translates() {
        let driver = page();
        let session = session_from_mock(driver.clone());
        let scroller = html_scroller(ScrollingMode::Css);

        let actual = scroller.move_to(&session, Offset::new(0, 5000)).await.unwrap();
        assert_eq!(actual, Offset::new(0, 1700));
        assert_eq!(driver.translate_position("html"), Offset::new(0, 1700));
        assert_eq!(driver.scroll_position("html"), Offset::zero());
        assert_eq!(scroller.position(&session).await.unwrap(), Offset::new(0, 1700));
    }

    #[tokio::test]
    async fn test_css_mode_requires_scripts() {
        let driver = Arc::new(MockDriver::new(Size::new(400, 300), Size::new(400, 2000)).without_scripts());
        let session = session_from_mock(driver);
        let err = html_scroller(ScrollingMode::Css)
            .position(&session)
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::NotSupported { .. }));
    }

    #[tokio::test]
    async fn test_state_and_restore() {
        let driver = page();
        let session = session_from_mock(driver.clone());
        let scroller = html_scroller(ScrollingMode::Scroll);

        scroller.move_to(&session, Offset::new(0, 120)).await.unwrap();
        let state = scroller.state(&session).await.unwrap();
        scroller.move_to(&session, Offset::new(0, 900)).await.unwrap();
        scroller.restore(&session, state).await.unwrap();

        assert_eq!(driver.scroll_position("html"), Offset::new(0, 120));
    }

    #[tokio::test]
    async fn test_visible_region_needs_no_scroll() {
        let driver = page();
        let session = session_from_mock(driver.clone());
        let tree = ContextTree::new(Some(ElementId::new("html")));

        let remaining = scroll_into_viewport(
            &session,
            &tree,
            tree.main(),
            &html_scroller(ScrollingMode::Scroll),
            Some(Region::new(10, 10, 50, 50)),
        )
        .await
        .unwrap();
        assert_eq!(remaining, Offset::zero());
        assert!(driver.scroll_log().is_empty());
    }

    #[tokio::test]
    async fn test_scroll_region_into_view() {
        let driver = page();
        let session = session_from_mock(driver.clone());
        let tree = ContextTree::new(Some(ElementId::new("html")));

        let remaining = scroll_into_viewport(
            &session,
            &tree,
            tree.main(),
            &html_scroller(ScrollingMode::Scroll),
            Some(Region::new(30, 1900, 50, 50)),
        )
        .await
        .unwrap();
        // Clamped at 1700, so the region stays 200px down.
        assert_eq!(driver.scroll_position("html"), Offset::new(0, 1700));
        assert_eq!(remaining, Offset::new(30, 200));
    }

    #[tokio::test]
    async fn test_native_session_never_scrolls() {
        let driver = Arc::new(
            MockDriver::new(Size::new(400, 300), Size::new(400, 2000)).without_scripts().with_info(
                crate::model::DriverInfo::native(1.0, 0),
            ),
        );
        let session = session_from_mock(driver.clone());
        let tree = ContextTree::new(Some(ElementId::new("html")));

        let remaining = scroll_into_viewport(
            &session,
            &tree,
            tree.main(),
            &html_scroller(ScrollingMode::Scroll),
            Some(Region::new(0, 1500, 10, 10)),
        )
        .await
        .unwrap();
        assert_eq!(remaining, Offset::zero());
        assert!(driver.scroll_log().is_empty());
    }

    #[tokio::test]
    async fn test_lazy_load_steps_and_restores() {
        let driver = page();
        let session = session_from_mock(driver.clone());
        let scroller = html_scroller(ScrollingMode::Scroll);
        let settings = LazyLoadSettings {
            scroll_length:        500,
            waiting_time:         0,
            max_amount_to_scroll: 10_000,
        };

        lazy_load(&session, &scroller, &settings).await.unwrap();

        let positions: Vec<i32> = driver.scroll_log().iter().map(|(_, offset)| offset.y).collect();
        assert_eq!(positions, vec![500, 1000, 1500, 1700, 0]);
        assert_eq!(driver.scroll_position("html"), Offset::zero());
    }

    #[tokio::test]
    async fn test_lazy_load_respects_max_amount() {
        let driver = page();
        let session = session_from_mock(driver.clone());
        let settings = LazyLoadSettings {
            scroll_length:        400,
            waiting_time:         0,
            max_amount_to_scroll: 600,
        };

        lazy_load(&session, &html_scroller(ScrollingMode::Scroll), &settings)
            .await
            .unwrap();

        let positions: Vec<i32> = driver.scroll_log().iter().map(|(_, offset)| offset.y).collect();
        assert_eq!(positions, vec![400, 600, 0]);
    }

    #[tokio::test]
    async fn test_lazy_load_rejects_zero_step() {
        let session = session_from_mock(page());
        let settings = LazyLoadSettings {
            scroll_length:        0,
            waiting_time:         0,
            max_amount_to_scroll: 100,
        };
        let err = lazy_load(&session, &html_scroller(ScrollingMode::Scroll), &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn test_element_inside_scrollable_pane() {
        let driver = Arc::new(
            MockDriver::new(Size::new(400, 300), Size::new(400, 2000)).with_element(
                "panel",
                MockElement::scrollable(Region::new(0, 100, 200, 100), Some("html"), Size::new(200, 800)),
            ),
        );
        let session = session_from_mock(driver.clone());
        let tree = ContextTree::new(Some(ElementId::new("html")));
        let panel = Scroller::new(ElementId::new("panel"), ScrollingMode::Scroll);

        // Panel is fully visible already.
        let remaining = scroll_into_viewport(&session, &tree, tree.main(), &panel, None)
            .await
            .unwrap();
        assert_eq!(remaining, Offset::zero());
    }
}
