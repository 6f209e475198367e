//! Issue memory.
//!
//! The only component with durable state. Records triaged issues with
//! their embeddings so later triage runs can spot duplicates. Two backends
//! live behind [`MemoryStore`]: a sharded in-memory map and an embedded
//! SQLite database.

pub mod backend;
pub mod sqlite;
pub mod transient;

pub use backend::MemoryStore;
pub use sqlite::SqliteStore;
pub use transient::TransientStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TriageError;

/// A triaged issue as persisted for future duplicate checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub issue_number: u64,
    pub title: String,
    pub body: String,
    /// Embedding of the combined title and body. Length always equals the
    /// store's configured dimension.
    pub embedding: Vec<f32>,
    /// Labels assigned when the issue was last triaged.
    pub labels: Vec<String>,
    pub stored_at: DateTime<Utc>,
}

/// A scored hit from a nearest-neighbor query. Never persisted; similarity
/// is recomputed per query so threshold changes apply retroactively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub issue_number: u64,
    pub score: f32,
}

/// Order matches by descending score, breaking ties by ascending issue
/// number, then cap at `limit`. Both backends rank through here so result
/// ordering stays identical between them.
pub(crate) fn sort_matches(matches: &mut Vec<SimilarityMatch>, limit: usize) {
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.issue_number.cmp(&b.issue_number))
    });
    matches.truncate(limit);
}

/// Reject a vector whose length differs from the store's dimension. Both
/// backends run this on every upsert and query, so the similarity math
/// never sees mismatched lengths.
pub(crate) fn ensure_dimension(expected: usize, actual: usize) -> Result<(), TriageError> {
    if actual != expected {
        return Err(TriageError::IncompatibleDimension { expected, actual });
    }
    Ok(())
}
