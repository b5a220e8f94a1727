//! Allocation error types.

use thiserror::Error;

/// Address allocation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// Every usable address in the range is already assigned
    #[error("address pool {pool} is full ({capacity} addresses assigned)")]
    PoolExhausted {
        /// Pool or block that ran out
        pool: String,
        /// Number of usable addresses in it
        capacity: u64,
    },

    /// Pool definition cannot be turned into a host range
    #[error("invalid address pool: {0}")]
    InvalidPool(String),
}
