//! Error types for the resolver.

use std::time::Duration;

use thiserror::Error;
use thorname_store::StoreError;

/// Errors that can occur during resolver operations.
///
/// An unknown or expired name is not an error: it resolves to `None` or an
/// empty set. Only faults surface here.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The event log failed. Passed through unchanged.
    #[error("event log error: {0}")]
    Store(#[from] StoreError),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The configured query timeout elapsed.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// Rejected configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;
