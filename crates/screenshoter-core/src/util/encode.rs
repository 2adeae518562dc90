//! Image codec helpers for raw screenshots and produced output
//!
//! Drivers hand back PNG (occasionally JPEG) bytes, sometimes base64 encoded.
//! This module reads dimensions without decoding, decodes to RGBA on demand
//! and encodes final images as PNG.
//!
//! # Examples
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use screenshoter_core::util::encode::{encode_png, read_dimensions};
//!
//! let img = RgbaImage::from_pixel(32, 16, Rgba([255, 0, 0, 255]));
//! let png = encode_png(&img).unwrap();
//!
//! let size = read_dimensions(&png).unwrap();
//! assert_eq!((size.width, size.height), (32, 16));
//! ```

use std::io::Cursor;

use base64::Engine;
use image::{
    ImageEncoder, ImageReader, RgbaImage,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};

use crate::{
    error::{CaptureError, CaptureResult},
    model::Size,
};

fn reader(bytes: &[u8]) -> CaptureResult<ImageReader<Cursor<&[u8]>>> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CaptureError::DecodeFailed {
            reason: e.to_string(),
        })
}

/// Reads image dimensions from the header without decoding pixel data
pub fn read_dimensions(bytes: &[u8]) -> CaptureResult<Size> {
    let (width, height) = reader(bytes)?
        .into_dimensions()
        .map_err(|e| CaptureError::DecodeFailed {
            reason: e.to_string(),
        })?;
    Ok(Size::new(width, height))
}

/// Decodes PNG or JPEG bytes into an RGBA buffer
pub fn decode_rgba(bytes: &[u8]) -> CaptureResult<RgbaImage> {
    let decoded = reader(bytes)?
        .decode()
        .map_err(|e| CaptureError::DecodeFailed {
            reason: e.to_string(),
        })?;
    Ok(decoded.to_rgba8())
}

/// Decodes a base64 screenshot, accepting an optional `data:` URL prefix
///
/// # Examples
///
/// ```
/// use screenshoter_core::util::encode::decode_base64;
///
/// assert_eq!(decode_base64("data:image/png;base64,AAEC").unwrap(), vec![0, 1, 2]);
/// assert_eq!(decode_base64(" AAEC\n").unwrap(), vec![0, 1, 2]);
/// ```
pub fn decode_base64(data: &str) -> CaptureResult<Vec<u8>> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => data,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| CaptureError::DecodeFailed {
            reason: format!("invalid base64: {}", e),
        })
}

/// Encodes an image as PNG with default compression
///
/// Uses default compression level and adaptive filtering for good balance
/// between encoding speed and file size.
pub fn encode_png(image: &RgbaImage) -> CaptureResult<Vec<u8>> {
    encode_png_with_compression(image, CompressionType::Default)
}

/// Encodes an image as PNG with specified compression level
///
/// Debug images use [`CompressionType::Fast`]; produced output uses the
/// default level.
pub fn encode_png_with_compression(
    image: &RgbaImage,
    compression: CompressionType,
) -> CaptureResult<Vec<u8>> {
    let mut output = Vec::new();

    // Use adaptive filter for automatic per-scanline optimization
    let encoder =
        PngEncoder::new_with_quality(Cursor::new(&mut output), compression, FilterType::Adaptive);

    let (width, height) = image.dimensions();

    encoder
        .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .map_err(|e| CaptureError::EncodingFailed {
            format: "png".to_string(),
            reason: e.to_string(),
        })?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn checkerboard(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&checkerboard(16, 16)).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_png_roundtrip_is_lossless() {
        let original = checkerboard(33, 17);
        let png = encode_png(&original).unwrap();
        assert_eq!(decode_rgba(&png).unwrap(), original);
    }

    #[test]
    fn test_read_dimensions_without_decode() {
        let png = encode_png(&checkerboard(612, 512)).unwrap();
        let size = read_dimensions(&png).unwrap();
        assert_eq!(size, Size::new(612, 512));
    }

    #[test]
    fn test_compression_levels_all_decode() {
        let original = checkerboard(64, 64);
        for compression in [CompressionType::Fast, CompressionType::Default, CompressionType::Best]
        {
            let png = encode_png_with_compression(&original, compression).unwrap();
            assert_eq!(decode_rgba(&png).unwrap(), original);
        }
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_rgba(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CaptureError::DecodeFailed { .. }));
        assert!(read_dimensions(&[]).is_err());
    }

    #[test]
    fn test_decode_base64_invalid() {
        let err = decode_base64("***").unwrap_err();
        assert!(err.to_string().contains("invalid base64"));
    }
}
