//! Error type definitions for the snapper service

use std::time::Duration;
use thiserror::Error;

/// Top-level application error type
///
/// Every failure is local to a single request; none of these leave the
/// artifact cache partially updated.
#[derive(Error, Debug)]
pub enum AppError {
    /// External renderer or codec failure while producing an artifact
    #[error("Render failed: {0}")]
    RenderFailed(#[from] RenderError),

    /// Device asked for a command this server does not speak
    #[error("Unknown device command: {command}")]
    UnknownCommand { command: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Pixel reduction failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Only 3-channel, 8-bit-per-channel truecolor input is accepted
    #[error("Unsupported bitmap format: expected channels=3 (was {channels}), depth=8 (was {bits_per_channel})")]
    UnsupportedFormat { channels: u8, bits_per_channel: u8 },

    /// A quantized level fell outside the target depth; this is a defect, not bad input
    #[error("Quantized level {level} out of range for {depth}-bit output (gray={gray})")]
    QuantizationRange { level: u32, gray: u32, depth: u8 },

    /// The bitmap does not have the size the rotation asked the renderer for
    #[error("Bitmap is {actual_width}x{actual_height} ({actual_len} bytes), expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
        actual_len: usize,
    },

    /// The packed raster could not be written as an image container
    #[error("Container encoding failed: {0}")]
    Container(String),
}

/// Failures while producing a rendered artifact
#[derive(Error, Debug)]
pub enum RenderError {
    /// The browser exited unsuccessfully or produced no screenshot
    #[error("Capture failed: {message}")]
    Capture { message: String },

    /// The renderer did not finish in time
    #[error("Renderer timed out after {after:?}")]
    Timeout { after: Duration },

    /// Process or filesystem errors around the capture
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The screenshot could not be decoded
    #[error("Screenshot decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// The screenshot could not be reduced to a packed raster
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unknown command error
    pub fn unknown_command<S: Into<String>>(command: S) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }
}

impl RenderError {
    /// Create a capture error
    pub fn capture<S: Into<String>>(message: S) -> Self {
        Self::Capture {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_converts_into_render_failed() {
        let codec = CodecError::UnsupportedFormat {
            channels: 4,
            bits_per_channel: 8,
        };
        let app: AppError = RenderError::from(codec).into();

        assert!(matches!(
            app,
            AppError::RenderFailed(RenderError::Codec(CodecError::UnsupportedFormat { .. }))
        ));
        assert!(app.to_string().contains("channels=3 (was 4)"));
    }

    #[test]
    fn test_unknown_command_message() {
        let err = AppError::unknown_command("reboot");
        assert_eq!(err.to_string(), "Unknown device command: reboot");
    }
}
