//! Error taxonomy for the triage core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by triage components.
///
/// Construction problems (`Configuration`, `IncompatibleDimension` at open)
/// are fatal to the caller. `StorageUnavailable` is recoverable: stages that
/// hit it degrade their output instead of aborting the issue.
/// `SourceUnavailable` aborts the single issue it concerns, never a batch.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum TriageError {
    /// Malformed category, threshold, or store setup, rejected up front.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A vector's length does not match the store's embedding dimension.
    #[error("incompatible embedding dimension: expected {expected}, got {actual}")]
    IncompatibleDimension { expected: usize, actual: usize },

    /// The memory store timed out or errored.
    #[error("memory store unavailable: {0}")]
    StorageUnavailable(String),

    /// The issue tracker could not serve a request.
    #[error("issue source unavailable: {0}")]
    SourceUnavailable(String),
}
