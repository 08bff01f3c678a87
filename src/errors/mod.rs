//! Centralized error handling for the snapper service
//!
//! Errors are layered the same way the pipeline is:
//!
//! - **Codec Errors**: the captured bitmap could not be reduced to a packed raster
//! - **Render Errors**: the page could not be captured, or the capture could not be encoded
//! - **App Errors**: what the device protocol and the web layer report to callers
//!
//! # Usage
//!
//! ```rust
//! use trmnl_snapper::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::validation("width must be positive"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for codec Results
pub type CodecResult<T> = Result<T, CodecError>;

/// Convenience type alias for render Results
pub type RenderResult<T> = Result<T, RenderError>;
