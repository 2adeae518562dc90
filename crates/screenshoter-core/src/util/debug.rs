//! Debug image output for capture diagnostics
//!
//! Intermediate images (raw capture, normalized viewport, every stitched part)
//! can be dumped to disk while investigating a bad screenshot. Files are named
//! `{prefix}-{name}-{timestamp}{suffix}.png` and written atomically: the PNG
//! is written to a temporary file in the target directory and renamed into
//! place, so a cancelled capture never leaves a partial file behind.
//!
//! Debug output is purely diagnostic. Callers log write failures and carry on.
//!
//! # Examples
//!
//! ```
//! use screenshoter_core::{imaging::Image, model::DebugSettings, util::debug::write_debug_image};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let settings = DebugSettings {
//!     path:   dir.path().to_path_buf(),
//!     prefix: "checkout".to_string(),
//!     suffix: String::new(),
//! };
//!
//! let path = write_debug_image(&Image::blank(4, 4), &settings, "viewport").unwrap();
//! assert!(path.exists());
//! ```

use std::{
    fs,
    io::Write,
    path::PathBuf,
};

use chrono::{DateTime, SecondsFormat, Utc};
use image::codecs::png::CompressionType;
use tempfile::NamedTempFile;

use crate::{
    error::CaptureResult,
    imaging::Image,
    model::DebugSettings,
    util::encode::encode_png_with_compression,
};

/// Builds the file name for a debug image
///
/// The timestamp is an RFC 3339 string with nanosecond precision and special
/// characters replaced for filesystem compatibility.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use screenshoter_core::{model::DebugSettings, util::debug::debug_file_name};
///
/// let settings = DebugSettings {
///     prefix: "shot".to_string(),
///     suffix: "-a".to_string(),
///     ..DebugSettings::default()
/// };
/// let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
///
/// assert_eq!(
///     debug_file_name(&settings, "part-0", timestamp),
///     "shot-part-0-2024-05-01T12-30-00_000000000Z-a.png"
/// );
/// ```
pub fn debug_file_name(settings: &DebugSettings, name: &str, timestamp: DateTime<Utc>) -> String {
    let timestamp_str: String = timestamp
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
        .chars()
        .map(|c| match c {
            ':' => '-',
            '+' | '.' => '_',
            _ => c,
        })
        .collect();

    if settings.prefix.is_empty() {
        format!("{}-{}{}.png", name, timestamp_str, settings.suffix)
    } else {
        format!("{}-{}-{}{}.png", settings.prefix, name, timestamp_str, settings.suffix)
    }
}

/// Renders `image` and writes it atomically into the debug directory
///
/// The directory is created if needed. Returns the final path.
pub fn write_debug_image(
    image: &Image,
    settings: &DebugSettings,
    name: &str,
) -> CaptureResult<PathBuf> {
    fs::create_dir_all(&settings.path)?;

    let png = encode_png_with_compression(&image.to_object()?, CompressionType::Fast)?;
    let path = settings.path.join(debug_file_name(settings, name, Utc::now()));

    let mut file = NamedTempFile::new_in(&settings.path)?;
    file.write_all(&png)?;
    file.as_file().sync_all()?;
    file.persist(&path).map_err(|e| e.error)?;

    tracing::debug!("Wrote debug image {:?} ({} bytes)", path, png.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn settings_in(dir: &std::path::Path) -> DebugSettings {
        DebugSettings {
            path:   dir.to_path_buf(),
            prefix: "test".to_string(),
            suffix: "_x".to_string(),
        }
    }

    #[test]
    fn test_file_name_without_prefix() {
        let settings = DebugSettings {
            prefix: String::new(),
            ..DebugSettings::default()
        };
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            debug_file_name(&settings, "raw", timestamp),
            "raw-2024-01-02T03-04-05_000000000Z.png"
        );
    }

    #[test]
    fn test_write_creates_directory_and_png() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let settings = settings_in(&nested);

        let path = write_debug_image(&Image::solid(3, 2, [9, 8, 7, 255]), &settings, "part").unwrap();

        assert!(path.starts_with(&nested));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("test-part-"));
        assert!(name.ends_with("_x.png"));

        let decoded = crate::util::encode::decode_rgba(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
    }

    #[test]
    fn test_write_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());

        write_debug_image(&Image::blank(2, 2), &settings, "one").unwrap();
        write_debug_image(&Image::blank(2, 2), &settings, "two").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|name| name.ends_with(".png")));
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        // A regular file where the directory should be.
        let settings = settings_in(&blocker);
        assert!(write_debug_image(&Image::blank(1, 1), &settings, "x").is_err());
    }
}
