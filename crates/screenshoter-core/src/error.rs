//! Error types for capture and stitching operations
//!
//! This module defines the error taxonomy for the capture pipeline with
//! user-facing messages and actionable remediation hints. Each error provides
//! context about what went wrong and suggests next steps for resolution.
//!
//! # Structured Error Hints
//!
//! In addition to human-readable remediation hints, errors provide structured
//! metadata via [`ErrorHint`] so orchestration layers can decide on recovery
//! (retry, change parameters, give up) without parsing prose.
//!
//! ```rust,ignore
//! let error = CaptureError::Timeout { duration_ms: 30_000 };
//! let hint = error.structured_hint();
//!
//! if hint.is_transient {
//!     // caller may schedule a retry
//! }
//! ```
//!
//! No variant is retried inside this crate; retries are a policy of the
//! caller.

use serde::{Deserialize, Serialize};

use crate::model::{Region, Size};

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Structured error hint for automated recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHint {
    /// Human-readable description of the error and how to fix it
    pub message: String,

    /// Category of recovery action to attempt
    pub recovery_action: RecoveryAction,

    /// Machine-readable context for the failure
    pub details: Option<serde_json::Value>,

    /// Whether the error is likely transient (retry may succeed)
    pub is_transient: bool,

    /// Error category for grouping/filtering
    pub category: ErrorCategory,
}

/// Category of recovery action a caller can attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Retry the same operation
    Retry,
    /// Modify parameters and retry
    ModifyParams,
    /// No automated recovery possible
    None,
}

/// High-level error category for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Target not found (element, context, marker)
    NotFound,
    /// Invalid parameters or geometry
    InvalidInput,
    /// Driver capability not available
    Unavailable,
    /// Operation timed out
    Timeout,
    /// I/O or system error
    SystemError,
    /// Decoding, encoding or pixel processing error
    ProcessingError,
}

/// Error type for capture, geometry and stitching operations
///
/// Each variant includes detailed context and provides remediation hints
/// through the `remediation_hint()` method.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Requested region does not intersect the image or viewport
    #[error("Region {region} is empty or out of viewport (bounds {bounds})")]
    EmptyRegion {
        /// The requested region
        region: Region,
        /// Size of the image or viewport it was clipped against
        bounds: Size,
    },

    /// A referenced element vanished between lookup and use
    #[error("Element not found: {element}")]
    ElementNotFound {
        /// Driver reference of the missing element
        element: String,
    },

    /// A context id does not belong to the context tree
    #[error("Context {context} is not part of the context tree")]
    ContextNotFound {
        /// The unknown context index
        context: usize,
    },

    /// A required fiducial marker was not located
    #[error("Pattern '{pattern}' not found in the captured image")]
    PatternNotFound {
        /// Name of the pattern that was searched for
        pattern: String,
    },

    /// Capture loop exceeded its wall-clock budget
    #[error("Capture operation timed out after {duration_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// Invalid parameter provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// Raw screenshot bytes could not be decoded
    #[error("Failed to decode image: {reason}")]
    DecodeFailed {
        /// Decoder error message
        reason: String,
    },

    /// Image encoding failed
    #[error("Failed to encode image as {format}: {reason}")]
    EncodingFailed {
        /// Image format that failed
        format: String,
        /// Reason for encoding failure
        reason: String,
    },

    /// A helper script failed or returned an unexpected value
    #[error("Script execution failed: {reason}")]
    ScriptFailed {
        /// Reason for the failure
        reason: String,
    },

    /// Requested capability/feature is not supported by this driver
    #[error("Feature '{feature}' is not supported by driver {driver}")]
    NotSupported {
        /// Name of the unsupported feature
        feature: String,
        /// Driver session name
        driver: String,
    },

    /// The driver reported a failure for a capability call
    #[error("Driver {operation} failed: {reason}")]
    DriverError {
        /// Capability call that failed
        operation: String,
        /// Driver-provided reason
        reason: String,
    },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    ImageError(String),
}

impl CaptureError {
    /// Shorthand for [`CaptureError::InvalidParameter`]
    pub fn invalid_parameter(parameter: &str, reason: impl Into<String>) -> Self {
        CaptureError::InvalidParameter {
            parameter: parameter.to_string(),
            reason:    reason.into(),
        }
    }

    /// Returns an actionable remediation hint for this error
    ///
    /// # Examples
    ///
    /// ```
    /// use screenshoter_core::{
    ///     error::CaptureError,
    ///     model::{Region, Size},
    /// };
    ///
    /// let error = CaptureError::EmptyRegion {
    ///     region: Region::new(900, 0, 100, 100),
    ///     bounds: Size::new(800, 600),
    /// };
    ///
    /// assert!(error.remediation_hint().contains("viewport"));
    /// ```
    pub fn remediation_hint(&self) -> &str {
        match self {
            CaptureError::EmptyRegion { .. } => {
                "The requested region never intersects the captured viewport. Check that the \
                 region coordinates are relative to the right context and that the element is \
                 rendered."
            }
            CaptureError::ElementNotFound { .. } => {
                "The element was detached or re-rendered between lookup and use. Look the element \
                 up again right before capturing."
            }
            CaptureError::ContextNotFound { .. } => {
                "Register the frame or shadow root in the context tree before referencing it."
            }
            CaptureError::PatternNotFound { .. } => {
                "The page marker was not visible in the screenshot. Make sure nothing overlays \
                 the top-left corner of the viewport, or provide the status bar height through \
                 driver capabilities."
            }
            CaptureError::Timeout { .. } => {
                "The capture loop took too long. The scroll position may never stabilize; raise \
                 the timeout or cap the stitched height with max_height."
            }
            CaptureError::InvalidParameter { parameter, .. } => match parameter.as_str() {
                "ratio" => "Scale ratio must be a finite number greater than zero.",
                "degrees" => "Rotation must be a multiple of 90 degrees.",
                "framed" => "Framed screenshots are only available for native app sessions.",
                _ => "Check the parameter value against the API documentation.",
            },
            CaptureError::DecodeFailed { .. } => {
                "The driver returned bytes that are not a PNG or JPEG image. Check the driver \
                 screenshot endpoint and any base64 decoding."
            }
            CaptureError::EncodingFailed { .. } => {
                "Image encoding failed. Check available memory and image dimensions."
            }
            CaptureError::ScriptFailed { .. } => {
                "A helper script failed in the page. Content security policies or a navigation \
                 during capture can cause this; switch scrolling_mode to scroll to avoid scripts."
            }
            CaptureError::NotSupported { feature, .. } => match feature.as_str() {
                "execute_script" => {
                    "This driver cannot execute scripts. Use the scroll scrolling mode and provide \
                     status bar metadata through capabilities."
                }
                _ => "This feature is not supported by the current driver.",
            },
            CaptureError::DriverError { .. } => {
                "The driver rejected a capability call. Check that the session is still alive."
            }
            CaptureError::IoError(_) => {
                "An I/O error occurred. Check file permissions, disk space, and system resources."
            }
            CaptureError::ImageError(_) => {
                "Image processing failed. Ensure the image data is valid and the requested \
                 operations are supported."
            }
        }
    }

    /// Returns a structured error hint for automated recovery.
    ///
    /// # Example
    ///
    /// ```
    /// use screenshoter_core::error::{CaptureError, ErrorCategory, RecoveryAction};
    ///
    /// let error = CaptureError::Timeout { duration_ms: 5000 };
    ///
    /// let hint = error.structured_hint();
    /// assert_eq!(hint.recovery_action, RecoveryAction::Retry);
    /// assert_eq!(hint.category, ErrorCategory::Timeout);
    /// assert!(hint.is_transient);
    /// ```
    pub fn structured_hint(&self) -> ErrorHint {
        match self {
            CaptureError::EmptyRegion { region, bounds } => ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action: RecoveryAction::ModifyParams,
                details: Some(serde_json::json!({
                    "region": region,
                    "bounds": bounds,
                })),
                is_transient: false,
                category: ErrorCategory::InvalidInput,
            },
            CaptureError::ElementNotFound { element } => ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action: RecoveryAction::None,
                details: Some(serde_json::json!({ "element": element })),
                is_transient: false,
                category: ErrorCategory::NotFound,
            },
            CaptureError::ContextNotFound { context } => ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action: RecoveryAction::ModifyParams,
                details: Some(serde_json::json!({ "context": context })),
                is_transient: false,
                category: ErrorCategory::NotFound,
            },
            CaptureError::PatternNotFound { pattern } => ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action: RecoveryAction::None,
                details: Some(serde_json::json!({ "pattern": pattern })),
                is_transient: false,
                category: ErrorCategory::NotFound,
            },
            CaptureError::Timeout { duration_ms } => ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action: RecoveryAction::Retry,
                details: Some(serde_json::json!({
                    "suggestion": "Increase timeout or retry",
                    "original_timeout_ms": duration_ms,
                })),
                is_transient: true,
                category: ErrorCategory::Timeout,
            },
            CaptureError::InvalidParameter { parameter, reason } => ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action: RecoveryAction::ModifyParams,
                details: Some(serde_json::json!({
                    "invalid_parameter": parameter,
                    "reason": reason,
                })),
                is_transient: false,
                category: ErrorCategory::InvalidInput,
            },
            CaptureError::DecodeFailed { .. }
            | CaptureError::EncodingFailed { .. }
            | CaptureError::ImageError(_) => ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action: RecoveryAction::None,
                details: None,
                is_transient: false,
                category: ErrorCategory::ProcessingError,
            },
            CaptureError::ScriptFailed { reason } => ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action: RecoveryAction::ModifyParams,
                details: Some(serde_json::json!({
                    "reason": reason,
                    "suggestion": "Use scrolling_mode = scroll",
                })),
                is_transient: false,
                category: ErrorCategory::ProcessingError,
            },
            CaptureError::NotSupported { feature, driver } => ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action: RecoveryAction::ModifyParams,
                details: Some(serde_json::json!({
                    "unsupported_feature": feature,
                    "driver": driver,
                })),
                is_transient: false,
                category: ErrorCategory::Unavailable,
            },
            CaptureError::DriverError { operation, .. } => ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action: RecoveryAction::Retry,
                details: Some(serde_json::json!({ "operation": operation })),
                is_transient: true,
                category: ErrorCategory::Unavailable,
            },
            CaptureError::IoError(_) => ErrorHint {
                message: self.remediation_hint().to_string(),
                recovery_action: RecoveryAction::Retry,
                details: None,
                is_transient: true,
                category: ErrorCategory::SystemError,
            },
        }
    }
}
