//! Core domain errors.

use thiserror::Error;

/// Errors raised while constructing domain records.
#[derive(Error, Debug)]
pub enum CoreError {
    /// String does not match the catalog identifier format.
    #[error("Invalid catalog identifier: {0:?}")]
    InvalidIdentifier(String),
}
