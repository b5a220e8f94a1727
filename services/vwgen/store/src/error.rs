//! Configuration store error types.

use thiserror::Error;
use vwgen_alloc::AllocError;
use vwgen_crypto::KeyError;

/// Configuration store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML or does not match the schema
    #[error("malformed configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Document could not be serialized
    #[error("serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Operation needs a loaded network
    #[error("no network configuration loaded")]
    NotLoaded,

    /// Node is not part of the network
    #[error("node '{0}' not found")]
    NodeNotFound(String),

    /// Node name is already taken
    #[error("node '{0}' already exists")]
    NodeExists(String),

    /// Value failed validation
    #[error("invalid value: {0}")]
    Invalid(String),

    /// Address allocation failed
    #[error(transparent)]
    Alloc(#[from] AllocError),

    /// Key material is unusable
    #[error(transparent)]
    Key(#[from] KeyError),
}
