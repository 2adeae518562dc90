//! Row-streaming render stages for deferred image operations
//!
//! Every queued operation on an [`Image`](super::Image) becomes one stage in a
//! chain of [`RowSource`]s. Rendering pulls output rows one at a time from the
//! last stage, and each stage pulls only the parent rows it needs:
//!
//! | Stage | Working set |
//! |-------|-------------|
//! | [`FillRows`] / [`BufferRows`] | none (buffer is the decoded base) |
//! | [`CropRows`] | one parent row |
//! | [`ScaleRows`] | two parent rows |
//! | [`RotateRows`] | one block of output rows, bounded by a byte budget |
//! | [`PasteRows`] | one overlay row |
//!
//! Access is random but optimized for increasing row order, which is what
//! every terminal operation uses.

use std::sync::Arc;

use image::RgbaImage;

use crate::{
    error::{CaptureError, CaptureResult},
    model::{Offset, Region, Size},
};

/// Bytes per RGBA pixel
pub(crate) const CHANNELS: usize = 4;

/// A pull-based producer of RGBA rows
pub(crate) trait RowSource {
    /// Output size of this stage
    fn size(&self) -> Size;

    /// Writes row `y` into `out`, which holds exactly `width * 4` bytes.
    fn read_row(&mut self, y: u32, out: &mut [u8]) -> CaptureResult<()>;

    /// Colour of every pixel when the stage output is a single colour.
    fn uniform(&self) -> Option<[u8; 4]> {
        None
    }
}

pub(crate) type BoxedRows = Box<dyn RowSource>;

fn row_bytes(width: u32) -> usize {
    width as usize * CHANNELS
}

fn check_row(size: Size, y: u32, out: &[u8]) -> CaptureResult<()> {
    if y >= size.height || out.len() != row_bytes(size.width) {
        return Err(CaptureError::ImageError(format!(
            "row {} with {} bytes requested from a {} stage",
            y,
            out.len(),
            size
        )));
    }
    Ok(())
}

// ============================================================================
// Sources
// ============================================================================

/// Single-colour source, used for blank canvases
pub(crate) struct FillRows {
    size:  Size,
    pixel: [u8; 4],
}

impl FillRows {
    pub(crate) fn new(size: Size, pixel: [u8; 4]) -> Self {
        Self { size, pixel }
    }
}

impl RowSource for FillRows {
    fn size(&self) -> Size {
        self.size
    }

    fn read_row(&mut self, y: u32, out: &mut [u8]) -> CaptureResult<()> {
        check_row(self.size, y, out)?;
        if self.pixel == [0; 4] {
            out.fill(0);
        } else {
            for chunk in out.chunks_exact_mut(CHANNELS) {
                chunk.copy_from_slice(&self.pixel);
            }
        }
        Ok(())
    }

    fn uniform(&self) -> Option<[u8; 4]> {
        Some(self.pixel)
    }
}

/// Source backed by a decoded RGBA buffer
pub(crate) struct BufferRows {
    buffer: Arc<RgbaImage>,
}

impl BufferRows {
    pub(crate) fn new(buffer: Arc<RgbaImage>) -> Self {
        Self { buffer }
    }
}

impl RowSource for BufferRows {
    fn size(&self) -> Size {
        Size::new(self.buffer.width(), self.buffer.height())
    }

    fn read_row(&mut self, y: u32, out: &mut [u8]) -> CaptureResult<()> {
        check_row(self.size(), y, out)?;
        let stride = out.len();
        let start = y as usize * stride;
        out.copy_from_slice(&self.buffer.as_raw()[start..start + stride]);
        Ok(())
    }
}

// ============================================================================
// Crop
// ============================================================================

/// Sub-rectangle of the parent; `region` is already clipped to its bounds
pub(crate) struct CropRows {
    inner:   BoxedRows,
    region:  Region,
    scratch: Vec<u8>,
}

impl CropRows {
    pub(crate) fn new(inner: BoxedRows, region: Region) -> Self {
        let scratch = if region.x == 0 && region.width == inner.size().width {
            Vec::new()
        } else {
            vec![0; row_bytes(inner.size().width)]
        };
        Self {
            inner,
            region,
            scratch,
        }
    }
}

impl RowSource for CropRows {
    fn size(&self) -> Size {
        self.region.size()
    }

    fn read_row(&mut self, y: u32, out: &mut [u8]) -> CaptureResult<()> {
        check_row(self.size(), y, out)?;
        let source_y = self.region.y as u32 + y;
        if self.scratch.is_empty() {
            return self.inner.read_row(source_y, out);
        }
        self.inner.read_row(source_y, &mut self.scratch)?;
        let start = self.region.x as usize * CHANNELS;
        out.copy_from_slice(&self.scratch[start..start + out.len()]);
        Ok(())
    }

    fn uniform(&self) -> Option<[u8; 4]> {
        self.inner.uniform()
    }
}

// ============================================================================
// Scale
// ============================================================================

/// Maps an output coordinate to the two nearest source samples (centre aligned)
fn bilinear_tap(dst: u32, scale: f64, src_len: u32) -> (u32, u32, f32) {
    let max = src_len.saturating_sub(1);
    let center = ((dst as f64 + 0.5) * scale - 0.5).clamp(0.0, max as f64);
    let lo = center.floor() as u32;
    let hi = (lo + 1).min(max);
    (lo, hi, (center - lo as f64) as f32)
}

fn lerp(a: u8, b: u8, t: f32) -> f32 {
    a as f32 + (b as f32 - a as f32) * t
}

/// Bilinear resampling keeping at most two parent rows
pub(crate) struct ScaleRows {
    inner:   BoxedRows,
    size:    Size,
    x_taps:  Vec<(usize, usize, f32)>,
    y_scale: f64,
    rows:    [(Option<u32>, Vec<u8>); 2],
}

impl ScaleRows {
    pub(crate) fn new(inner: BoxedRows, size: Size) -> Self {
        let source = inner.size();
        let x_scale = source.width as f64 / size.width.max(1) as f64;
        let x_taps = (0..size.width)
            .map(|x| {
                let (lo, hi, t) = bilinear_tap(x, x_scale, source.width);
                (lo as usize * CHANNELS, hi as usize * CHANNELS, t)
            })
            .collect();
        let stride = row_bytes(source.width);
        Self {
            y_scale: source.height as f64 / size.height.max(1) as f64,
            inner,
            size,
            x_taps,
            rows: [(None, vec![0; stride]), (None, vec![0; stride])],
        }
    }

    /// Loads parent row `y`, never evicting the slot in `keep`.
    fn load(&mut self, y: u32, keep: Option<usize>) -> CaptureResult<usize> {
        if let Some(slot) = self.rows.iter().position(|(index, _)| *index == Some(y)) {
            return Ok(slot);
        }
        let slot = match (keep, self.rows[0].0, self.rows[1].0) {
            (Some(kept), _, _) => 1 - kept,
            (None, None, _) => 0,
            (None, _, None) => 1,
            (None, Some(a), Some(b)) => usize::from(a > b),
        };
        self.inner.read_row(y, &mut self.rows[slot].1)?;
        self.rows[slot].0 = Some(y);
        Ok(slot)
    }
}

impl RowSource for ScaleRows {
    fn size(&self) -> Size {
        self.size
    }

    fn read_row(&mut self, y: u32, out: &mut [u8]) -> CaptureResult<()> {
        check_row(self.size, y, out)?;
        if let Some(pixel) = self.inner.uniform() {
            for chunk in out.chunks_exact_mut(CHANNELS) {
                chunk.copy_from_slice(&pixel);
            }
            return Ok(());
        }

        let (lo, hi, ty) = bilinear_tap(y, self.y_scale, self.inner.size().height);
        let top_slot = self.load(lo, None)?;
        let bottom_slot = self.load(hi, Some(top_slot))?;
        let top = &self.rows[top_slot].1;
        let bottom = &self.rows[bottom_slot].1;

        for (chunk, &(left, right, tx)) in out.chunks_exact_mut(CHANNELS).zip(&self.x_taps) {
            for (channel, value) in chunk.iter_mut().enumerate() {
                let upper = lerp(top[left + channel], top[right + channel], tx);
                let lower = lerp(bottom[left + channel], bottom[right + channel], tx);
                let blended = upper + (lower - upper) * ty;
                *value = (blended + 0.5).clamp(0.0, 255.0) as u8;
            }
        }
        Ok(())
    }

    fn uniform(&self) -> Option<[u8; 4]> {
        self.inner.uniform()
    }
}

// ============================================================================
// Rotate
// ============================================================================

/// Clockwise rotation by 90, 180 or 270 degrees
///
/// 180 degrees maps one parent row to one output row. Quarter turns turn
/// parent columns into output rows, so output rows are produced in blocks:
/// the parent is streamed once per block and the block never exceeds
/// `block_bytes` (but always holds at least one row).
pub(crate) struct RotateRows {
    inner:       BoxedRows,
    degrees:     u16,
    size:        Size,
    block_rows:  u32,
    block_start: Option<u32>,
    block:       Vec<u8>,
    scratch:     Vec<u8>,
}

impl RotateRows {
    pub(crate) fn new(inner: BoxedRows, degrees: u16, block_bytes: usize) -> Self {
        let source = inner.size();
        let size = if degrees == 180 {
            source
        } else {
            Size::new(source.height, source.width)
        };
        let stride = row_bytes(size.width).max(1);
        let block_rows = (block_bytes / stride).clamp(1, size.height.max(1) as usize) as u32;
        Self {
            scratch: vec![0; row_bytes(source.width)],
            inner,
            degrees,
            size,
            block_rows,
            block_start: None,
            block: Vec::new(),
        }
    }

    fn fill_block(&mut self, start: u32) -> CaptureResult<()> {
        let stride = row_bytes(self.size.width);
        let rows = self.block_rows.min(self.size.height - start);
        let source = self.inner.size();
        self.block.resize(rows as usize * stride, 0);

        for source_y in 0..source.height {
            self.inner.read_row(source_y, &mut self.scratch)?;
            for row in 0..rows {
                let out_y = start + row;
                let (source_x, out_x) = match self.degrees {
                    90 => (out_y, source.height - 1 - source_y),
                    _ => (source.width - 1 - out_y, source_y),
                };
                let from = source_x as usize * CHANNELS;
                let to = row as usize * stride + out_x as usize * CHANNELS;
                self.block[to..to + CHANNELS].copy_from_slice(&self.scratch[from..from + CHANNELS]);
            }
        }
        self.block_start = Some(start);
        Ok(())
    }
}

impl RowSource for RotateRows {
    fn size(&self) -> Size {
        self.size
    }

    fn read_row(&mut self, y: u32, out: &mut [u8]) -> CaptureResult<()> {
        check_row(self.size, y, out)?;
        if let Some(pixel) = self.inner.uniform() {
            for chunk in out.chunks_exact_mut(CHANNELS) {
                chunk.copy_from_slice(&pixel);
            }
            return Ok(());
        }

        if self.degrees == 180 {
            self.inner.read_row(self.size.height - 1 - y, &mut self.scratch)?;
            for (dst, src) in out
                .chunks_exact_mut(CHANNELS)
                .zip(self.scratch.chunks_exact(CHANNELS).rev())
            {
                dst.copy_from_slice(src);
            }
            return Ok(());
        }

        let start = (y / self.block_rows) * self.block_rows;
        if self.block_start != Some(start) {
            self.fill_block(start)?;
        }
        let offset = (y - start) as usize * out.len();
        out.copy_from_slice(&self.block[offset..offset + out.len()]);
        Ok(())
    }

    fn uniform(&self) -> Option<[u8; 4]> {
        self.inner.uniform()
    }
}

// ============================================================================
// Paste
// ============================================================================

/// Overlay pasted onto the parent at `at`, clipped to the parent bounds
pub(crate) struct PasteRows {
    base:    BoxedRows,
    overlay: BoxedRows,
    at:      Offset,
    scratch: Vec<u8>,
}

impl PasteRows {
    pub(crate) fn new(base: BoxedRows, overlay: BoxedRows, at: Offset) -> Self {
        let scratch = vec![0; row_bytes(overlay.size().width)];
        Self {
            base,
            overlay,
            at,
            scratch,
        }
    }
}

impl RowSource for PasteRows {
    fn size(&self) -> Size {
        self.base.size()
    }

    fn read_row(&mut self, y: u32, out: &mut [u8]) -> CaptureResult<()> {
        self.base.read_row(y, out)?;

        let overlay = self.overlay.size();
        let overlay_y = y as i64 - self.at.y as i64;
        if overlay_y < 0 || overlay_y >= overlay.height as i64 {
            return Ok(());
        }

        let width = self.base.size().width as i64;
        let dst_start = (self.at.x as i64).max(0);
        let dst_end = (self.at.x as i64 + overlay.width as i64).min(width);
        if dst_start >= dst_end {
            return Ok(());
        }

        self.overlay.read_row(overlay_y as u32, &mut self.scratch)?;
        let src_start = (dst_start - self.at.x as i64) as usize * CHANNELS;
        let len = (dst_end - dst_start) as usize * CHANNELS;
        let dst_start = dst_start as usize * CHANNELS;
        out[dst_start..dst_start + len].copy_from_slice(&self.scratch[src_start..src_start + len]);
        Ok(())
    }
}
