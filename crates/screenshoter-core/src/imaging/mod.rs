//! Lazily rendered images with deferred geometry operations
//!
//! An [`Image`] records crop, scale, rotate and paste operations instead of
//! applying them. Pixels are produced only by the terminal operations
//! ([`Image::to_object`], [`Image::to_png`], [`Image::stream_rows`]), which pull
//! rows through the stages in [`pipeline`]. Dimensions are tracked eagerly, so
//! `width()`/`height()` never touch pixel data.
//!
//! # Examples
//!
//! ```
//! use screenshoter_core::{imaging::Image, model::{Offset, Region}};
//!
//! let mut page = Image::solid(400, 1200, [255, 255, 255, 255]);
//! page.crop(Region::new(0, 100, 400, 600))?.rotate(90)?;
//! assert_eq!((page.width(), page.height()), (600, 400));
//!
//! let mut composite = Image::blank(600, 800);
//! composite.copy(&page, Offset::new(0, 0)).copy(&page, Offset::new(0, 400));
//! let pixels = composite.to_object()?;
//! assert_eq!(pixels.get_pixel(10, 790).0, [255, 255, 255, 255]);
//! # Ok::<(), screenshoter_core::error::CaptureError>(())
//! ```

pub(crate) mod pipeline;

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use image::RgbaImage;
use once_cell::sync::OnceCell;

use crate::{
    capture::constants,
    error::{CaptureError, CaptureResult},
    model::{CropRegion, DebugSettings, Offset, Region, Size},
    util::{debug, encode},
};
use pipeline::{BoxedRows, BufferRows, CHANNELS, CropRows, FillRows, PasteRows, RotateRows, ScaleRows};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Encoded bytes decoded at most once, on first render
struct EncodedSource {
    bytes:   Vec<u8>,
    decoded: OnceCell<Arc<RgbaImage>>,
}

impl EncodedSource {
    fn decode(&self, expected: Size) -> CaptureResult<Arc<RgbaImage>> {
        self.decoded
            .get_or_try_init(|| {
                let buffer = encode::decode_rgba(&self.bytes)?;
                if buffer.dimensions() != (expected.width, expected.height) {
                    return Err(CaptureError::DecodeFailed {
                        reason: format!(
                            "header reports {} but decoded {}x{}",
                            expected,
                            buffer.width(),
                            buffer.height()
                        ),
                    });
                }
                Ok(Arc::new(buffer))
            })
            .cloned()
    }
}

#[derive(Clone)]
enum Source {
    Solid([u8; 4]),
    Pixels(Arc<RgbaImage>),
    Encoded(Arc<EncodedSource>),
}

#[derive(Clone)]
enum Op {
    Crop(Region),
    Scale(Size),
    Rotate(u16),
    Paste { image: Image, at: Offset },
}

/// Lazily rendered RGBA image
///
/// Cloning is cheap: base pixels are shared and only the operation queue is
/// copied. Operations never modify a shared base, so clones and paste sources
/// stay untouched.
#[derive(Clone)]
pub struct Image {
    source: Source,
    base:   Size,
    size:   Size,
    ops:    Vec<Op>,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Solid(_) => "solid",
            Source::Pixels(_) => "pixels",
            Source::Encoded(encoded) if encoded.decoded.get().is_some() => "encoded (decoded)",
            Source::Encoded(_) => "encoded",
        };
        f.debug_struct("Image")
            .field("size", &self.size)
            .field("base", &self.base)
            .field("source", &source)
            .field("pending_ops", &self.ops.len())
            .finish()
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Image {
    fn with_source(source: Source, size: Size) -> Self {
        Self {
            source,
            base: size,
            size,
            ops: Vec::new(),
        }
    }

    /// Transparent canvas; zero-sized canvases are allowed
    pub fn blank(width: u32, height: u32) -> Self {
        Self::solid(width, height, [0, 0, 0, 0])
    }

    /// Canvas filled with one RGBA colour
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::with_source(Source::Solid(rgba), Size::new(width, height))
    }

    /// Wraps an already decoded buffer
    pub fn from_rgba(buffer: RgbaImage) -> Self {
        let size = Size::new(buffer.width(), buffer.height());
        Self::with_source(Source::Pixels(Arc::new(buffer)), size)
    }

    /// Wraps PNG or JPEG bytes; only the header is read until first render
    pub fn from_bytes(bytes: Vec<u8>) -> CaptureResult<Self> {
        let size = encode::read_dimensions(&bytes)?;
        let source = EncodedSource {
            bytes,
            decoded: OnceCell::new(),
        };
        Ok(Self::with_source(Source::Encoded(Arc::new(source)), size))
    }

    /// Wraps base64 encoded image bytes, with or without a `data:` prefix
    pub fn from_base64(data: &str) -> CaptureResult<Self> {
        Self::from_bytes(encode::decode_base64(data)?)
    }

    /// Reads an image file
    pub fn open(path: impl AsRef<Path>) -> CaptureResult<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Current width
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Current height
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Current dimensions
    pub fn size(&self) -> Size {
        self.size
    }

    /// Returns true if the image has no pixels
    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }
}

// ============================================================================
// Deferred Operations
// ============================================================================

impl Image {
    /// Crops to `region` clipped to the current bounds
    ///
    /// Fails with [`CaptureError::EmptyRegion`] when nothing of the region
    /// lies inside the image.
    ///
    /// # Examples
    ///
    /// ```
    /// use screenshoter_core::{imaging::Image, model::{CropRegion, Region}};
    ///
    /// let mut image = Image::blank(612, 512);
    /// image.crop(CropRegion::Inset { left: 100, top: 120, right: 110, bottom: 130 })?;
    /// assert_eq!((image.width(), image.height()), (402, 262));
    ///
    /// assert!(image.crop(Region::new(500, 0, 10, 10)).is_err());
    /// # Ok::<(), screenshoter_core::error::CaptureError>(())
    /// ```
    pub fn crop(&mut self, region: impl Into<CropRegion>) -> CaptureResult<&mut Self> {
        let bounds = Region::from_size(self.size);
        let requested = region.into().resolve(self.size);
        let clipped = requested.intersect(&bounds);

        if clipped.is_empty() {
            return Err(CaptureError::EmptyRegion {
                region: requested,
                bounds: self.size,
            });
        }
        if clipped == bounds {
            return Ok(self);
        }

        match self.ops.last_mut() {
            Some(Op::Crop(previous)) => *previous = clipped.offset(previous.location()),
            _ => self.ops.push(Op::Crop(clipped)),
        }
        self.size = clipped.size();
        Ok(self)
    }

    /// Resamples to `round(width * ratio) x round(height * ratio)` (bilinear)
    pub fn scale(&mut self, ratio: f64) -> CaptureResult<&mut Self> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(CaptureError::invalid_parameter(
                "ratio",
                format!("{} is not a positive finite number", ratio),
            ));
        }

        let size = self.size.scale(ratio);
        if size == self.size {
            return Ok(self);
        }
        if size.is_empty() {
            return Err(CaptureError::invalid_parameter(
                "ratio",
                format!("scaling {} by {} leaves no pixels", self.size, ratio),
            ));
        }

        self.ops.push(Op::Scale(size));
        self.size = size;
        Ok(self)
    }

    /// Rotates clockwise by a multiple of 90 degrees
    ///
    /// Negative angles rotate counter-clockwise. Quarter turns swap width and
    /// height.
    pub fn rotate(&mut self, degrees: i32) -> CaptureResult<&mut Self> {
        let normalized = degrees.rem_euclid(360);
        if normalized % 90 != 0 {
            return Err(CaptureError::invalid_parameter(
                "degrees",
                format!("{} is not a multiple of 90", degrees),
            ));
        }
        if normalized == 0 {
            return Ok(self);
        }

        let normalized = normalized as u16;
        match self.ops.last_mut() {
            Some(Op::Rotate(previous)) => {
                let total = (*previous + normalized) % 360;
                if total == 0 {
                    self.ops.pop();
                } else {
                    *previous = total;
                }
            }
            _ => self.ops.push(Op::Rotate(normalized)),
        }

        if normalized != 180 {
            self.size = Size::new(self.size.height, self.size.width);
        }
        Ok(self)
    }

    /// Pastes `source` at `at`, clipped to this image's bounds
    ///
    /// Pixels of `source` replace the destination pixels, alpha included.
    pub fn copy(&mut self, source: &Image, at: Offset) -> &mut Self {
        let target = Region::from_parts(at, source.size);
        if !Region::from_size(self.size).intersects(&target) {
            tracing::trace!("Skipping copy of {} at {}: outside {}", source.size, at, self.size);
            return self;
        }
        self.ops.push(Op::Paste {
            image: source.clone(),
            at,
        });
        self
    }

    /// Places this image into the hole of a device bezel
    ///
    /// `top` is the bezel and defines the output size. `bottom` is pasted
    /// bottom-aligned over it, so a bezel whose lower part was stretched can
    /// be completed with the original lower edge. This image is cropped to
    /// the hole when larger and leaves the bezel visible where smaller.
    ///
    /// # Examples
    ///
    /// ```
    /// use screenshoter_core::{imaging::Image, model::Region};
    ///
    /// let bezel = Image::solid(100, 200, [0, 0, 0, 255]);
    /// let content = Image::solid(120, 90, [255, 255, 255, 255]);
    ///
    /// let framed = content.frame(&bezel, &bezel, Region::new(10, 20, 80, 150))?;
    /// assert_eq!((framed.width(), framed.height()), (100, 200));
    /// # Ok::<(), screenshoter_core::error::CaptureError>(())
    /// ```
    pub fn frame(&self, top: &Image, bottom: &Image, hole: Region) -> CaptureResult<Image> {
        let bezel = top.size();
        let mut framed = top.clone();
        framed.copy(bottom, Offset::new(0, bezel.height as i32 - bottom.height() as i32));

        let visible = Size::new(self.width().min(hole.width), self.height().min(hole.height));
        if visible.is_empty() {
            tracing::debug!("Frame hole {} leaves no room for {} content", hole, self.size);
            return Ok(framed);
        }

        let mut content = self.clone();
        content.crop(Region::from_size(visible))?;
        framed.copy(&content, hole.location());
        Ok(framed)
    }
}

// ============================================================================
// Rendering
// ============================================================================

impl Image {
    fn rows(&self) -> CaptureResult<BoxedRows> {
        let mut rows: BoxedRows = match &self.source {
            Source::Solid(pixel) => Box::new(FillRows::new(self.base, *pixel)),
            Source::Pixels(buffer) => Box::new(BufferRows::new(buffer.clone())),
            Source::Encoded(encoded) => Box::new(BufferRows::new(encoded.decode(self.base)?)),
        };

        for op in &self.ops {
            rows = match op {
                Op::Crop(region) => Box::new(CropRows::new(rows, *region)),
                Op::Scale(size) => Box::new(ScaleRows::new(rows, *size)),
                Op::Rotate(degrees) => {
                    Box::new(RotateRows::new(rows, *degrees, constants::ROTATE_BLOCK_BYTES))
                }
                Op::Paste { image, at } => Box::new(PasteRows::new(rows, image.rows()?, *at)),
            };
        }
        Ok(rows)
    }

    /// Renders the image one row at a time
    ///
    /// Only the current row and the bounded stage buffers are alive while
    /// `visit` runs, which makes this the way to consume very large images.
    pub fn stream_rows<F>(&self, mut visit: F) -> CaptureResult<()>
    where
        F: FnMut(u32, &[u8]),
    {
        let mut rows = self.rows()?;
        let mut line = vec![0; self.size.width as usize * CHANNELS];
        for y in 0..self.size.height {
            rows.read_row(y, &mut line)?;
            visit(y, &line);
        }
        Ok(())
    }

    /// Materializes the image into an RGBA buffer
    pub fn to_object(&self) -> CaptureResult<RgbaImage> {
        if self.ops.is_empty() {
            match &self.source {
                Source::Pixels(buffer) => return Ok(buffer.as_ref().clone()),
                Source::Encoded(encoded) => return Ok(encoded.decode(self.base)?.as_ref().clone()),
                Source::Solid(pixel) => {
                    return Ok(RgbaImage::from_pixel(
                        self.size.width,
                        self.size.height,
                        image::Rgba(*pixel),
                    ));
                }
            }
        }

        let stride = self.size.width as usize * CHANNELS;
        let mut data = vec![0; stride * self.size.height as usize];
        let mut rows = self.rows()?;
        if stride > 0 {
            for (y, line) in data.chunks_exact_mut(stride).enumerate() {
                rows.read_row(y as u32, line)?;
            }
        }
        RgbaImage::from_raw(self.size.width, self.size.height, data).ok_or_else(|| {
            CaptureError::ImageError(format!("buffer does not match {}", self.size))
        })
    }

    /// Encodes the image as PNG
    ///
    /// Untouched PNG input is returned as is, without a decode/encode cycle.
    pub fn to_png(&self) -> CaptureResult<Vec<u8>> {
        if let (Source::Encoded(encoded), true) = (&self.source, self.ops.is_empty()) {
            if encoded.bytes.starts_with(&PNG_SIGNATURE) {
                return Ok(encoded.bytes.clone());
            }
        }
        encode::encode_png(&self.to_object()?)
    }

    /// Writes the image as a debug artifact and returns its path
    ///
    /// Rendering does not consume the queued operations, so the image is
    /// unchanged afterwards.
    pub fn debug(&self, settings: &DebugSettings, name: &str) -> CaptureResult<PathBuf> {
        debug::write_debug_image(self, settings, name)
    }
}
