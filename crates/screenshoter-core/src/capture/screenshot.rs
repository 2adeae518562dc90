//! Screenshot orchestration
//!
//! [`take_screenshot`] is the entry point used by driver adapters. It picks
//! the capture strategy from [`ScreenshotSettings`], enforces the wall-clock
//! ceiling and always puts every scroller it may touch back where it was.

use std::time::Duration;

use super::{
    DriverSession, SessionCapabilities,
    context::{ContextId, ContextTree},
    scroll::{ScrollState, Scroller, lazy_load, scroll_into_viewport},
    stitch::{take_framed_screenshot, take_stitched_screenshot},
    viewport::{Screenshot, ViewportRequest, take_raw_screenshot, take_viewport_screenshot},
};
use crate::{
    error::{CaptureError, CaptureResult},
    model::{ElementId, Region, ScreenshotSettings},
};

/// What to capture
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotTarget {
    /// Context holding the scroller
    pub context:  ContextId,
    /// Scrolling element; the context's scrolling element when absent
    pub scroller: Option<ElementId>,
    /// Part of the scroller content, in content coordinates
    pub region:   Option<Region>,
}

impl ScreenshotTarget {
    /// The whole scrolling content of `context`
    pub fn context(context: ContextId) -> Self {
        Self {
            context,
            scroller: None,
            region: None,
        }
    }

    /// Uses `element` as the scroller
    pub fn with_scroller(mut self, element: impl Into<ElementId>) -> Self {
        self.scroller = Some(element.into());
        self
    }

    /// Restricts the capture to `region` of the scroller content
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }
}

/// Takes a screenshot of `target` as configured by `settings`
///
/// - `fully` stitches the whole content (or the region) from several
///   captures
/// - `framed` places the capture into the device bezel (native apps only)
/// - otherwise the region is scrolled into view and captured once
///
/// Fails with [`CaptureError::Timeout`] when the capture exceeds
/// `timeout_ms`; `0` disables the ceiling. Scroll positions are restored in
/// every case.
pub async fn take_screenshot(
    session: &DriverSession,
    tree: &ContextTree,
    target: &ScreenshotTarget,
    settings: &ScreenshotSettings,
) -> CaptureResult<Screenshot> {
    let element = match &target.scroller {
        Some(element) => element.clone(),
        None => tree
            .scrolling_element(target.context)?
            .cloned()
            .ok_or_else(|| {
                CaptureError::invalid_parameter(
                    "scroller",
                    format!("{} has no scrolling element", target.context),
                )
            })?,
    };
    let scroller = Scroller::new(element, settings.scrolling_mode);
    let snapshot = snapshot_scrollers(session, tree, target.context, &scroller).await?;

    let operation = capture(session, tree, target, &scroller, settings);
    let result = if settings.timeout_ms == 0 {
        operation.await
    } else {
        match tokio::time::timeout(Duration::from_millis(settings.timeout_ms), operation).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Screenshot timed out after {}ms", settings.timeout_ms);
                Err(CaptureError::Timeout {
                    duration_ms: settings.timeout_ms,
                })
            }
        }
    };

    restore_scrollers(session, snapshot).await;
    result
}

/// Records the state of `target` and of every scrolling element on the
/// path from `context` to the main document
pub(super) async fn snapshot_scrollers(
    session: &DriverSession,
    tree: &ContextTree,
    context: ContextId,
    target: &Scroller,
) -> CaptureResult<Vec<(Scroller, ScrollState)>> {
    let mut scrollers = vec![target.clone()];
    for level in tree.path(context)? {
        if let Some(element) = tree.scrolling_element(level)? {
            let scroller = Scroller::new(element.clone(), target.mode());
            if !scrollers.contains(&scroller) {
                scrollers.push(scroller);
            }
        }
    }

    let mut snapshot = Vec::with_capacity(scrollers.len());
    for scroller in scrollers {
        let state = scroller.state(session).await?;
        snapshot.push((scroller, state));
    }
    Ok(snapshot)
}

/// Puts recorded scrollers back in reverse order; failures are logged
pub(super) async fn restore_scrollers(session: &DriverSession, snapshot: Vec<(Scroller, ScrollState)>) {
    for (scroller, state) in snapshot.into_iter().rev() {
        if let Err(e) = scroller.restore(session, state).await {
            tracing::warn!("Failed to restore scroller {}: {}", scroller.element(), e);
        }
    }
}

async fn capture(
    session: &DriverSession,
    tree: &ContextTree,
    target: &ScreenshotTarget,
    scroller: &Scroller,
    settings: &ScreenshotSettings,
) -> CaptureResult<Screenshot> {
    if let Some(lazy) = &settings.lazy_load {
        lazy_load(session, scroller, lazy).await?;
    }

    if settings.framed {
        if settings.fully {
            return take_framed_screenshot(session, tree, target.context, scroller, settings).await;
        }
        return take_bezel_screenshot(session, settings).await;
    }
    if settings.fully {
        return take_stitched_screenshot(
            session,
            tree,
            target.context,
            scroller,
            target.region,
            settings,
        )
        .await;
    }

    let mut request = ViewportRequest::from_settings(target.context, settings);
    let Some(region) = target.region else {
        return take_viewport_screenshot(session, tree, &request).await;
    };

    let pre = scroller.position(session).await?;
    if tree.scrolling_element(target.context)? != Some(scroller.element()) {
        let max = scroller.max_offset(session).await?;
        scroller.move_to(session, region.location().clamp(max)).await?;
    }

    // Content coordinates to context client coordinates
    let client = scroller.client_region(session).await?;
    let position = scroller.position(session).await?;
    let in_client = region.offset(client.location() - position);
    let remaining = scroll_into_viewport(session, tree, target.context, scroller, Some(in_client)).await?;

    let client = scroller.client_region(session).await?;
    let post = scroller.position(session).await?;
    let in_client = region.offset(client.location() - post).intersect(&client);
    tracing::debug!(
        "Region {} scrolled from {} to {}, remaining {}",
        region,
        pre,
        post,
        remaining
    );

    request.region = Some(in_client);
    let shot = take_viewport_screenshot(session, tree, &request)
        .await
        .map_err(|err| match err {
            CaptureError::EmptyRegion { bounds, .. } => CaptureError::EmptyRegion { region, bounds },
            other => other,
        })?;

    // Viewport coordinates back to content coordinates
    let origin = client.location() + tree.location_in_viewport(session, target.context).await? - post;
    Ok(Screenshot {
        region: shot.region.offset_negative(origin),
        image:  shot.image,
    })
}

async fn take_bezel_screenshot(
    session: &DriverSession,
    settings: &ScreenshotSettings,
) -> CaptureResult<Screenshot> {
    if !session.supports_framed_capture() {
        return Err(CaptureError::invalid_parameter(
            "framed",
            format!("driver {} is not a native app session", session.name),
        ));
    }
    let mut image = take_raw_screenshot(session, settings.wait_ms, settings.stabilize).await?;
    image.scale(1.0 / session.info.effective_pixel_ratio())?;
    Ok(Screenshot {
        region: Region::from_size(image.size()),
        image,
    })
}
