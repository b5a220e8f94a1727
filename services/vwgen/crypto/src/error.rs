//! Key handling error types.

use thiserror::Error;

/// Key material errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Secret is not exactly 32 bytes
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    /// Text is not valid base64
    #[error("invalid base64 key: {0}")]
    Encoding(String),
}
