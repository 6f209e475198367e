//! In-memory store backend.
//!
//! Sharded so concurrent upserts for different issue numbers usually land
//! on different locks; operations on the same number serialize on one
//! shard. Lock waits are bounded: a shard held past the configured timeout
//! turns into `StorageUnavailable` instead of a hang.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;

use super::{ensure_dimension, sort_matches, IssueRecord, SimilarityMatch};
use crate::embedding::cosine_similarity;
use crate::error::TriageError;

const SHARD_COUNT: u64 = 16;

#[derive(Debug)]
pub struct TransientStore {
    shards: Vec<RwLock<HashMap<u64, IssueRecord>>>,
    dimension: usize,
    timeout: Duration,
}

impl TransientStore {
    pub fn new(dimension: usize, timeout: Duration) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            shards,
            dimension,
            timeout,
        }
    }

    fn shard_for(&self, issue_number: u64) -> &RwLock<HashMap<u64, IssueRecord>> {
        &self.shards[(issue_number % SHARD_COUNT) as usize]
    }

    /// Insert or replace the record for its issue number.
    pub fn upsert(&self, record: IssueRecord) -> Result<(), TriageError> {
        ensure_dimension(self.dimension, record.embedding.len())?;
        let mut shard = self
            .shard_for(record.issue_number)
            .try_write_for(self.timeout)
            .ok_or_else(|| {
                TriageError::StorageUnavailable("timed out waiting for write lock".to_string())
            })?;
        shard.insert(record.issue_number, record);
        Ok(())
    }

    pub fn get(&self, issue_number: u64) -> Result<Option<IssueRecord>, TriageError> {
        let shard = self
            .shard_for(issue_number)
            .try_read_for(self.timeout)
            .ok_or_else(|| {
                TriageError::StorageUnavailable("timed out waiting for read lock".to_string())
            })?;
        Ok(shard.get(&issue_number).cloned())
    }

    /// Rank every stored record by cosine similarity to `query`.
    ///
    /// Shards are read one at a time rather than under a global lock, so a
    /// query racing an upsert sees the old record or the new one, never a
    /// torn state.
    pub fn query_nearest(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarityMatch>, TriageError> {
        ensure_dimension(self.dimension, query.len())?;
        let mut matches = Vec::new();
        for shard in &self.shards {
            let guard = shard.try_read_for(self.timeout).ok_or_else(|| {
                TriageError::StorageUnavailable("timed out waiting for read lock".to_string())
            })?;
            for record in guard.values() {
                matches.push(SimilarityMatch {
                    issue_number: record.issue_number,
                    score: cosine_similarity(query, &record.embedding),
                });
            }
        }
        sort_matches(&mut matches, limit);
        Ok(matches)
    }

    pub fn len(&self) -> Result<usize, TriageError> {
        let mut total = 0;
        for shard in &self.shards {
            let guard = shard.try_read_for(self.timeout).ok_or_else(|| {
                TriageError::StorageUnavailable("timed out waiting for read lock".to_string())
            })?;
            total += guard.len();
        }
        Ok(total)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(issue_number: u64, embedding: Vec<f32>) -> IssueRecord {
        IssueRecord {
            issue_number,
            title: format!("issue {issue_number}"),
            body: String::new(),
            embedding,
            labels: vec!["bug".to_string()],
            stored_at: Utc::now(),
        }
    }

    fn store() -> TransientStore {
        TransientStore::new(3, Duration::from_millis(100))
    }

    #[test]
    fn get_returns_what_was_upserted() {
        let store = store();
        store.upsert(record(7, vec![1.0, 0.0, 0.0])).unwrap();
        let found = store.get(7).unwrap().unwrap();
        assert_eq!(found.issue_number, 7);
        assert_eq!(found.embedding, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn get_missing_returns_none() {
        assert_eq!(store().get(404).unwrap(), None);
    }

    #[test]
    fn upsert_replaces_existing_record() {
        let store = store();
        store.upsert(record(7, vec![1.0, 0.0, 0.0])).unwrap();
        let mut updated = record(7, vec![0.0, 1.0, 0.0]);
        updated.title = "renamed".to_string();
        store.upsert(updated).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let found = store.get(7).unwrap().unwrap();
        assert_eq!(found.title, "renamed");
        assert_eq!(found.embedding, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn query_ranks_by_similarity() {
        let store = store();
        store.upsert(record(1, vec![1.0, 0.0, 0.0])).unwrap();
        store.upsert(record(2, vec![0.0, 1.0, 0.0])).unwrap();
        store.upsert(record(3, vec![0.9, 0.1, 0.0])).unwrap();

        let matches = store.query_nearest(&[1.0, 0.0, 0.0], 10).unwrap();
        let order: Vec<u64> = matches.iter().map(|m| m.issue_number).collect();
        assert_eq!(order, vec![1, 3, 2]);
        assert!(matches[0].score > matches[1].score);
    }

    #[test]
    fn query_respects_limit() {
        let store = store();
        for n in 1..=8 {
            store.upsert(record(n, vec![1.0, 0.0, 0.0])).unwrap();
        }
        assert_eq!(store.query_nearest(&[1.0, 0.0, 0.0], 3).unwrap().len(), 3);
    }

    #[test]
    fn query_on_empty_store_returns_empty() {
        assert!(store().query_nearest(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn upsert_rejects_wrong_dimension() {
        let store = store();
        let err = store.upsert(record(1, vec![1.0, 0.0])).unwrap_err();
        assert_eq!(
            err,
            TriageError::IncompatibleDimension {
                expected: 3,
                actual: 2
            }
        );
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn query_rejects_wrong_dimension() {
        let store = store();
        store.upsert(record(1, vec![1.0, 0.0, 0.0])).unwrap();
        let err = store.query_nearest(&[1.0, 0.0], 5).unwrap_err();
        assert!(matches!(err, TriageError::IncompatibleDimension { .. }));
    }

    #[test]
    fn concurrent_upserts_to_different_numbers_all_land() {
        use std::sync::Arc;

        let store = Arc::new(TransientStore::new(3, Duration::from_millis(500)));
        let handles: Vec<_> = (0..32_u64)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.upsert(record(n, vec![1.0, 0.0, 0.0])))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(store.len().unwrap(), 32);
    }

    #[test]
    fn held_write_lock_times_out_as_storage_unavailable() {
        let store = TransientStore::new(3, Duration::from_millis(20));
        // Hold the shard for issue 0 across the call.
        let _guard = store.shards[0].write();
        let err = store.upsert(record(0, vec![1.0, 0.0, 0.0])).unwrap_err();
        assert!(matches!(err, TriageError::StorageUnavailable(_)));
    }
}
