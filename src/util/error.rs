//! Error types for yolobox.

use thiserror::Error;

/// Result alias for yolobox operations.
pub type YoloBoxResult<T> = std::result::Result<T, YoloBoxError>;

/// Errors that can occur when post-processing detector outputs.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum YoloBoxError {
    /// A tensor or list does not have the size the configuration implies.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    /// The anchor mask does not partition the anchor list.
    #[error("invalid anchor mask: {reason}")]
    InvalidAnchorMask { reason: &'static str },
    /// A threshold lies outside (0, 1].
    #[error("invalid threshold {name}={value}, expected a value in (0, 1]")]
    InvalidThreshold { name: &'static str, value: f32 },
    /// An image or detector input shape has a zero dimension.
    #[error("invalid shape {height}x{width}")]
    InvalidShape { height: usize, width: usize },
}
