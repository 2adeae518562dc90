//! screenshoter-core: Pixel-accurate viewport capture and stitching
//!
//! This library turns raw driver screenshots into normalized viewport
//! captures and stitches full-page or full-element images from several of
//! them. It includes a deferred image pipeline, fiducial marker detection,
//! scroll coordination across nested frames, and error handling.

pub mod capture;
pub mod error;
pub mod imaging;
pub mod model;
pub mod util;
