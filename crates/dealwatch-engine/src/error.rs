//! Engine error types.

use crate::store::StoreError;
use dealwatch_scrape::FetchError;
use thiserror::Error;

/// Failure surfaced at the engine boundary.
///
/// Inside a cycle, store and fetch failures are isolated and counted;
/// this type exists for the initialization path, where a dead storage
/// collaborator is fatal.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Storage collaborator failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Fetch-layer failure.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}
