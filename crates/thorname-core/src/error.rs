//! Error types for THORName Core.

use thiserror::Error;

/// Errors raised while constructing core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid chain identifier: {0:?}")]
    InvalidChain(String),

    #[error("invalid name: {0:?}")]
    InvalidName(String),
}
