//! Store backend dispatch.
//!
//! One concrete type over both backends so the pipeline and the CLI never
//! care which is running. Enum dispatch rather than a trait object keeps
//! the API simple; each backend enforces the dimension invariant itself.

use crate::config::{StoreBackend, StoreConfig};
use crate::error::TriageError;

use super::{IssueRecord, SimilarityMatch, SqliteStore, TransientStore};

#[derive(Debug)]
pub enum MemoryStore {
    Transient(TransientStore),
    Sqlite(SqliteStore),
}

impl MemoryStore {
    /// Open the store selected by configuration.
    ///
    /// Returns `None` when the backend is `Disabled`: the pipeline then
    /// skips duplicate checks and storage instead of degrading per issue.
    pub fn open(config: &StoreConfig, dimension: usize) -> Result<Option<Self>, TriageError> {
        let store = match config.backend {
            StoreBackend::Disabled => return Ok(None),
            StoreBackend::Transient => {
                Self::Transient(TransientStore::new(dimension, config.timeout()))
            }
            StoreBackend::Sqlite => {
                Self::Sqlite(SqliteStore::open(&config.path, dimension, config.timeout())?)
            }
        };
        Ok(Some(store))
    }

    /// Insert or replace a record keyed by its issue number.
    ///
    /// Last write wins; there is no merge. The record's embedding must
    /// match the store dimension.
    pub fn upsert(&self, record: IssueRecord) -> Result<(), TriageError> {
        match self {
            Self::Transient(store) => store.upsert(record),
            Self::Sqlite(store) => store.upsert(record),
        }
    }

    /// Fetch a record by issue number.
    pub fn get(&self, issue_number: u64) -> Result<Option<IssueRecord>, TriageError> {
        match self {
            Self::Transient(store) => store.get(issue_number),
            Self::Sqlite(store) => store.get(issue_number),
        }
    }

    /// The `limit` nearest stored issues by cosine similarity, descending,
    /// ties broken by ascending issue number.
    pub fn query_nearest(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarityMatch>, TriageError> {
        match self {
            Self::Transient(store) => store.query_nearest(query, limit),
            Self::Sqlite(store) => store.query_nearest(query, limit),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize, TriageError> {
        match self {
            Self::Transient(store) => store.len(),
            Self::Sqlite(store) => store.len(),
        }
    }

    pub fn is_empty(&self) -> Result<bool, TriageError> {
        Ok(self.len()? == 0)
    }

    pub fn dimension(&self) -> usize {
        match self {
            Self::Transient(store) => store.dimension(),
            Self::Sqlite(store) => store.dimension(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Sqlite(_) => "sqlite",
        }
    }
}
