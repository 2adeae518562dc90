//! Full-page and full-element stitching
//!
//! The stitcher scrolls a [`Scroller`] through its content in viewport-sized
//! steps, captures the visible window after every step and pastes the parts
//! into one composite [`Image`]. Positions always come from the offset the
//! scroller actually reached, so clamped or snapped scrolls still land the
//! pixels where they belong.
//!
//! # Termination
//!
//! - the bottom (and right edge) of the target region was captured
//! - the composite reached `max_height`
//! - a scroll step did not move the content any further

use super::{
    DriverSession, SessionCapabilities,
    context::{ContextId, ContextTree},
    screenshot::{restore_scrollers, snapshot_scrollers},
    scroll::{Scroller, scroll_into_viewport},
    viewport::{
        Screenshot, ViewportRequest, detect_viewport_offset, emit_debug, take_raw_screenshot,
        take_viewport_screenshot,
    },
};
use crate::{
    error::{CaptureError, CaptureResult},
    imaging::Image,
    model::{Offset, Region, ScreenshotSettings, Size},
};

/// Where a capture sits relative to its target after scroll compensation
///
/// When the stitched image has exactly the size of the crop region, the
/// region moved together with the scroll that happened between the two
/// offsets. Otherwise the crop location stands.
///
/// # Examples
///
/// ```
/// use screenshoter_core::{
///     capture::calculate_screenshot_region,
///     model::{Offset, Region, Size},
/// };
///
/// let region = calculate_screenshot_region(
///     Offset::new(0, 0),
///     Offset::new(0, 120),
///     Region::new(10, 20, 100, 50),
///     Size::new(100, 50),
/// );
/// assert_eq!(region, Region::new(10, 140, 100, 50));
/// ```
pub fn calculate_screenshot_region(
    pre_move_offset: Offset,
    post_move_offset: Offset,
    crop_region: Region,
    stitched_size: Size,
) -> Region {
    let location = if stitched_size == crop_region.size() {
        crop_region.location() + (post_move_offset - pre_move_offset)
    } else {
        crop_region.location()
    };
    Region::from_parts(location, stitched_size)
}

/// Stitches the content of `scroller` (or `region` of it) into one image
///
/// `region` is in the scroller's content coordinates and is clipped to the
/// content size. The returned region is in the same coordinates. The scroll
/// positions of `scroller` and of the enclosing documents are restored
/// whether or not the capture succeeds.
pub async fn take_stitched_screenshot(
    session: &DriverSession,
    tree: &ContextTree,
    context: ContextId,
    scroller: &Scroller,
    region: Option<Region>,
    settings: &ScreenshotSettings,
) -> CaptureResult<Screenshot> {
    let snapshot = snapshot_scrollers(session, tree, context, scroller).await?;
    let result = stitch(session, tree, context, scroller, region, settings).await;
    restore_scrollers(session, snapshot).await;
    result
}

async fn stitch(
    session: &DriverSession,
    tree: &ContextTree,
    context: ContextId,
    scroller: &Scroller,
    region: Option<Region>,
    settings: &ScreenshotSettings,
) -> CaptureResult<Screenshot> {
    let content = scroller.content_size(session).await?;
    let requested = region.unwrap_or(Region::from_size(content));
    let target = requested.intersect(&Region::from_size(content));
    if target.is_empty() {
        return Err(CaptureError::EmptyRegion {
            region: requested,
            bounds: content,
        });
    }
    if settings.max_height == 0 {
        return Err(CaptureError::invalid_parameter("max_height", "must be positive"));
    }

    scroll_into_viewport(session, tree, context, scroller, None).await?;

    let client = scroller.client_region(session).await?;
    let visible = tree.region_in_viewport(session, context, client).await?;
    if visible.is_empty() {
        let viewport = session.viewport.get_viewport_size().await?;
        return Err(CaptureError::EmptyRegion {
            region: client,
            bounds: viewport,
        });
    }
    if visible.height <= settings.overlap {
        return Err(CaptureError::invalid_parameter(
            "overlap",
            format!("{} rows leave nothing of a {} window", settings.overlap, visible.size()),
        ));
    }
    // Part of the client box hidden behind enclosing frames or the viewport edge
    let origin = client.location() + tree.location_in_viewport(session, context).await?;
    let clip = visible.location() - origin;

    let mut request = ViewportRequest::from_settings(tree.main(), settings);
    request.viewport_offset = Some(detect_viewport_offset(session).await?);

    let max = scroller.max_offset(session).await?;
    let composite_size = Size::new(target.width, target.height.min(settings.max_height));
    let extent = Region::from_parts(target.location(), composite_size);
    let mut composite = Image::blank(composite_size.width, composite_size.height);
    let mut reached = (0u32, 0u32);
    let mut captures = 0;

    let mut y = target.y;
    let mut previous_row: Option<i32> = None;
    'rows: loop {
        let mut x = target.x;
        let mut previous_column: Option<i32> = None;
        let mut row_bottom = None;

        loop {
            let requested = (Offset::new(x, y) - clip).clamp(max);
            let actual = scroller.move_to(session, requested).await?;
            if previous_column.is_none() && previous_row == Some(actual.y) {
                tracing::debug!("Scroll position {} did not advance, stopping", actual);
                break 'rows;
            }
            if previous_column == Some(actual.x) {
                break;
            }
            if previous_column.is_none() {
                previous_row = Some(actual.y);
            }
            previous_column = Some(actual.x);

            let shot = take_viewport_screenshot(session, tree, &request).await?;
            captures += 1;
            let mut window = shot.image;
            window.crop(visible)?;

            let captured = Region::from_parts(actual + clip, window.size());
            let skip = if y == target.y { 0 } else { settings.overlap };
            let fresh = Region::new(
                captured.x,
                captured.y + skip as i32,
                captured.width,
                captured.height - skip,
            );
            let part = fresh.intersect(&target).intersect(&extent);
            row_bottom = Some(captured.bottom());

            if !part.is_empty() {
                window.crop(Region::from_parts(part.location() - captured.location(), part.size()))?;
                let at = part.location() - target.location();
                composite.copy(&window, at);
                reached.0 = reached.0.max((part.right() - target.x as i64) as u32);
                reached.1 = reached.1.max((part.bottom() - target.y as i64) as u32);
            }

            if captured.right() >= target.right() {
                break;
            }
            x = captured.right() as i32;
        }

        let Some(bottom) = row_bottom else {
            break;
        };
        if bottom >= target.bottom() || bottom >= extent.bottom() {
            break;
        }
        y = bottom as i32 - settings.overlap as i32;
    }

    if reached.0 == 0 || reached.1 == 0 {
        return Err(CaptureError::EmptyRegion {
            region: target,
            bounds: content,
        });
    }
    if reached != (composite_size.width, composite_size.height) {
        tracing::debug!("Trimming composite {} to {}x{}", composite_size, reached.0, reached.1);
        composite.crop(Region::new(0, 0, reached.0, reached.1))?;
    }
    if target.height > settings.max_height {
        tracing::warn!(
            "Stitched height limited to {} of {} rows",
            settings.max_height,
            target.height
        );
    }

    emit_debug(&composite, settings.debug.as_ref(), "stitched");
    tracing::info!(
        "Stitched {} from {} captures of {} via {}",
        composite.size(),
        captures,
        visible.size(),
        scroller.element()
    );
    Ok(Screenshot {
        region: Region::from_parts(target.location(), composite.size()),
        image:  composite,
    })
}

/// Places a stitched capture into the device bezel of a native app
///
/// The first raw screenshot provides the bezel. The scroller's visible box
/// is the hole; the bezel is stretched by the extra content height and its
/// lower edge is kept below the content.
pub async fn take_framed_screenshot(
    session: &DriverSession,
    tree: &ContextTree,
    context: ContextId,
    scroller: &Scroller,
    settings: &ScreenshotSettings,
) -> CaptureResult<Screenshot> {
    if !session.supports_framed_capture() {
        return Err(CaptureError::invalid_parameter(
            "framed",
            format!("driver {} is not a native app session", session.name),
        ));
    }

    let ratio = session.info.effective_pixel_ratio();
    let mut bezel = take_raw_screenshot(session, settings.wait_ms, settings.stabilize).await?;
    bezel.scale(1.0 / ratio)?;
    let chrome = detect_viewport_offset(session).await?.scale(1.0 / ratio);

    let client = scroller.client_region(session).await?;
    let visible = tree.region_in_viewport(session, context, client).await?;
    if visible.is_empty() {
        return Err(CaptureError::EmptyRegion {
            region: client,
            bounds: session.viewport.get_viewport_size().await?,
        });
    }
    let hole = visible.offset(chrome);

    let content = take_stitched_screenshot(session, tree, context, scroller, None, settings).await?;
    let extra = content.image.height().saturating_sub(hole.height);

    let mut top = Image::blank(bezel.width(), bezel.height() + extra);
    top.copy(&bezel, Offset::zero());

    let below = (bezel.height() as i64 - hole.bottom()).max(0) as u32;
    let bottom = if below == 0 {
        Image::blank(bezel.width(), 0)
    } else {
        let mut bottom = bezel.clone();
        bottom.crop(Region::new(0, bezel.height() as i32 - below as i32, bezel.width(), below))?;
        bottom
    };

    let framed = content.image.frame(
        &top,
        &bottom,
        Region::new(hole.x, hole.y, hole.width, hole.height + extra),
    )?;
    emit_debug(&framed, settings.debug.as_ref(), "framed");
    tracing::info!("Framed {} content into {} bezel", content.image.size(), framed.size());
    Ok(Screenshot {
        region: Region::from_size(framed.size()),
        image:  framed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_moves_with_scroll_when_size_matches() {
        let region = calculate_screenshot_region(
            Offset::new(0, 0),
            Offset::new(0, 300),
            Region::new(0, 50, 200, 100),
            Size::new(200, 100),
        );
        assert_eq!(region, Region::new(0, 350, 200, 100));
    }

    #[test]
    fn test_region_keeps_location_when_size_differs() {
        let region = calculate_screenshot_region(
            Offset::new(0, 0),
            Offset::new(0, 300),
            Region::new(0, 50, 200, 100),
            Size::new(200, 400),
        );
        assert_eq!(region, Region::new(0, 50, 200, 400));
    }

    #[test]
    fn test_region_without_scroll() {
        let region = calculate_screenshot_region(
            Offset::new(5, 5),
            Offset::new(5, 5),
            Region::new(30, 40, 10, 10),
            Size::new(10, 10),
        );
        assert_eq!(region, Region::new(30, 40, 10, 10));
    }

    #[test]
    fn test_region_scrolled_back() {
        let region = calculate_screenshot_region(
            Offset::new(40, 900),
            Offset::new(0, 600),
            Region::new(100, 100, 50, 50),
            Size::new(50, 50),
        );
        assert_eq!(region, Region::new(60, -200, 50, 50));
    }

    #[test]
    fn test_region_scaled_offsets() {
        // Offsets scaled from 791.5 device pixels at ratio 4
        let post = Offset::new(0, 3166).scale(0.25);
        assert_eq!(post, Offset::new(0, 792));
        let region = calculate_screenshot_region(
            Offset::zero(),
            post,
            Region::new(0, 0, 320, 198),
            Size::new(320, 198),
        );
        assert_eq!(region, Region::new(0, 792, 320, 198));
    }

    #[test]
    fn test_region_narrower_stitch() {
        let region = calculate_screenshot_region(
            Offset::new(0, 0),
            Offset::new(0, 10),
            Region::new(0, 0, 320, 198),
            Size::new(300, 198),
        );
        assert_eq!(region, Region::new(0, 0, 300, 198));
    }
}
