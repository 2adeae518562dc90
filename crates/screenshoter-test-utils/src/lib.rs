//! Test utilities for screenshoter integration tests
//!
//! This crate provides shared fixtures for testing the capture pipeline
//! pixel-exactly. Expected images are generated programmatically from the
//! same colour functions the mock driver renders, so no golden files are
//! stored in the repository.
//!
//! # Usage
//!
//! Add to your crate's dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! screenshoter-test-utils = { path = "../screenshoter-test-utils" }
//! ```
//!
//! # Modules
//!
//! - [`fixtures`]: Synthetic pages, gradients and marker images
//! - [`compare`]: Zero-tolerance pixel comparison
//! - [`timing`]: Timing and performance measurement utilities
//!
//! # Example
//!
//! ```ignore
//! use screenshoter_core::model::Region;
//! use screenshoter_test_utils::{compare::assert_images_equal, fixtures::expected_page};
//!
//! let shot = take_screenshot(&session, &tree, &target, &settings).await?;
//! assert_images_equal(&shot.image.to_object()?, &expected_page(shot.region), "full page");
//! ```

pub mod compare;
pub mod fixtures;
pub mod timing;
