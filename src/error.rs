//! Error types for the computer tool
//!
//! Every failure the agent can observe is a [`ToolError`]. Dispatch errors are
//! folded into an `ActionResult`; construction errors are returned directly.

use thiserror::Error;

use crate::adb::AdbError;
use crate::backend::input::InputError;
use crate::display::RegistryError;

/// Errors that can occur while selecting a display or executing an action
#[derive(Error, Debug)]
pub enum ToolError {
    /// Malformed, missing or forbidden field on an action request
    #[error("{message}")]
    Argument {
        field: &'static str,
        message: String,
    },

    /// Logical coordinate outside the bound display
    #[error("Coordinates {x}, {y} are out of bounds")]
    OutOfBounds { x: u32, y: u32 },

    /// Action cannot be represented on the bound backend
    #[error("{action} not supported for ADB devices")]
    Unsupported { action: String },

    /// Display enumeration or selection failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Remote device endpoint unreachable or device absent
    #[error("{0}")]
    DeviceUnavailable(String),

    /// Keyboard or pointer injection failed
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Screen capture failed
    #[error("Failed to take screenshot: {0}")]
    Capture(String),

    /// ADB protocol or transport error
    #[error("ADB error: {0}")]
    Device(#[from] AdbError),

    /// Image processing error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem or process error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Build an argument error for the named request field
    pub fn argument(field: &'static str, message: impl Into<String>) -> Self {
        ToolError::Argument {
            field,
            message: message.into(),
        }
    }

    /// Name of the offending field for argument errors
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ToolError::Argument { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Result type for computer tool operations
pub type ToolResult<T> = Result<T, ToolError>;
