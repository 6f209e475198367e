//! Duplicate detection.
//!
//! Ranks previously stored issues by embedding similarity to a new one.
//! Stateless: every check embeds the query text and asks the memory store
//! for neighbors, so it inherits the store's consistency guarantees.

use crate::config::DuplicateConfig;
use crate::embedding::EmbeddingEngine;
use crate::error::TriageError;
use crate::memory::{MemoryStore, SimilarityMatch};
use crate::source::Issue;

pub struct DuplicateDetector {
    threshold: f32,
    max_results: usize,
}

impl DuplicateDetector {
    pub fn new(config: &DuplicateConfig) -> Self {
        Self {
            threshold: config.threshold,
            max_results: config.max_results,
        }
    }

    /// Find likely duplicates of `issue` among stored records.
    ///
    /// Results carry similarity at or above the threshold, ordered best
    /// first. An empty result means "no duplicates known", whether the
    /// store is empty or nothing scored high enough.
    pub fn find(
        &self,
        issue: &Issue,
        engine: &dyn EmbeddingEngine,
        store: &MemoryStore,
    ) -> Result<Vec<SimilarityMatch>, TriageError> {
        let query = engine.embed(&issue.combined_text())?;
        self.rank(issue.number, &query, store)
    }

    /// Rank against an already-computed query embedding.
    ///
    /// The issue's own prior record would match itself at 1.0 on retriage,
    /// so the store is asked for one extra candidate and the issue's own
    /// number is dropped before the cap is applied.
    pub fn rank(
        &self,
        issue_number: u64,
        query: &[f32],
        store: &MemoryStore,
    ) -> Result<Vec<SimilarityMatch>, TriageError> {
        let candidates = store.query_nearest(query, self.max_results.saturating_add(1))?;
        let mut matches: Vec<SimilarityMatch> = candidates
            .into_iter()
            .filter(|m| m.issue_number != issue_number && m.score >= self.threshold)
            .collect();
        matches.truncate(self.max_results);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StoreBackend, StoreConfig};
    use crate::embedding::HashEmbedder;
    use crate::memory::IssueRecord;
    use chrono::Utc;

    fn store_with(records: Vec<(u64, Vec<f32>)>) -> MemoryStore {
        let config = StoreConfig {
            backend: StoreBackend::Transient,
            ..StoreConfig::default()
        };
        let store = MemoryStore::open(&config, 3).unwrap().unwrap();
        for (issue_number, embedding) in records {
            store
                .upsert(IssueRecord {
                    issue_number,
                    title: format!("issue {issue_number}"),
                    body: String::new(),
                    embedding,
                    labels: Vec::new(),
                    stored_at: Utc::now(),
                })
                .unwrap();
        }
        store
    }

    fn detector(threshold: f32, max_results: usize) -> DuplicateDetector {
        DuplicateDetector::new(&DuplicateConfig {
            threshold,
            max_results,
        })
    }

    #[test]
    fn reports_only_matches_at_or_above_threshold() {
        let store = store_with(vec![
            (1, vec![1.0, 0.0, 0.0]),
            (2, vec![0.9, 0.1, 0.0]),
            (3, vec![0.0, 1.0, 0.0]),
        ]);
        let matches = detector(0.85, 5)
            .rank(99, &[1.0, 0.0, 0.0], &store)
            .unwrap();
        let numbers: Vec<u64> = matches.iter().map(|m| m.issue_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(matches.iter().all(|m| m.score >= 0.85));
    }

    #[test]
    fn empty_store_yields_no_duplicates() {
        let store = store_with(Vec::new());
        let matches = detector(0.85, 5)
            .rank(99, &[1.0, 0.0, 0.0], &store)
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn own_prior_record_is_excluded_on_retriage() {
        let store = store_with(vec![(42, vec![1.0, 0.0, 0.0])]);
        let matches = detector(0.85, 5)
            .rank(42, &[1.0, 0.0, 0.0], &store)
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn self_exclusion_does_not_cost_a_result_slot() {
        // Six perfect matches plus the issue's own record. With a cap of
        // five, the self-match must not displace a real duplicate.
        let store = store_with(
            (1..=6)
                .map(|n| (n, vec![1.0, 0.0, 0.0]))
                .chain(std::iter::once((42, vec![1.0, 0.0, 0.0])))
                .collect(),
        );
        let matches = detector(0.85, 5)
            .rank(42, &[1.0, 0.0, 0.0], &store)
            .unwrap();
        assert_eq!(matches.len(), 5);
        assert!(matches.iter().all(|m| m.issue_number != 42));
    }

    #[test]
    fn results_are_capped_at_max_results() {
        let store = store_with((1..=10).map(|n| (n, vec![1.0, 0.0, 0.0])).collect());
        let matches = detector(0.5, 3)
            .rank(99, &[1.0, 0.0, 0.0], &store)
            .unwrap();
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn find_embeds_the_combined_text() {
        let engine = HashEmbedder::new(3);
        let issue = Issue::new(7, "Crash on save", "Reproduces every time");
        let embedding = engine.embed(&issue.combined_text()).unwrap();

        let store = store_with(vec![(1, embedding)]);
        let matches = detector(0.99, 5).find(&issue, &engine, &store).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].issue_number, 1);
        assert!(matches[0].score > 0.99);
    }
}
