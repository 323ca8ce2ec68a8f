//! Error types for network construction, training and persistence

use thiserror::Error;

/// Errors reported by layers, networks and the model codec.
///
/// Shape and contract violations are reported as values so the host
/// application decides whether to abort. Numerical problems (NaN, overflow)
/// are not intercepted.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("layer is a shared copy of layer {owner}; updates must go through the owner")]
    NotOwner { owner: usize },

    #[error("backward pass requested without a preceding forward pass")]
    MissingForwardPass,

    #[error("expected {expected} parameter deltas (one per owning layer), got {actual}")]
    DeltaCount { expected: usize, actual: usize },

    #[error("malformed model stream: {0}")]
    Format(String),

    #[error("unknown activation code: {0}")]
    UnknownActivation(u8),

    #[error("unknown loss code: {0}")]
    UnknownLoss(u8),

    #[error("unknown ownership tag: {0}")]
    UnknownOwnership(u8),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NetworkError>;

pub(crate) fn check_len(context: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(NetworkError::DimensionMismatch {
            context,
            expected,
            actual,
        });
    }
    Ok(())
}
