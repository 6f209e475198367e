//! Bulk retriage.
//!
//! Fans a set of issue numbers out over a worker pool, runs the full
//! pipeline on each, and aggregates per-issue outcomes. One bad issue
//! never takes the batch down: its failure is recorded alongside the
//! other issues' decisions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{Stage, TriageDecision, TriagePipeline};
use crate::error::TriageError;
use crate::source::IssueSource;

/// Cooperative cancellation handle for a running batch.
///
/// Cancelling stops further issues from starting; issues already in
/// flight run to completion, so no decision is ever half-made.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options for a retriage run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Cancellation handle. `None` runs the batch to completion.
    pub cancel: Option<CancelToken>,
}

/// Hard failure of one issue's pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub issue_number: u64,
    /// The stage that gave up on the issue.
    pub stage: Stage,
    pub error: TriageError,
}

/// One issue's outcome within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TriageOutcome {
    Decision(TriageDecision),
    Failed(FailureRecord),
}

impl TriageOutcome {
    pub fn issue_number(&self) -> u64 {
        match self {
            Self::Decision(decision) => decision.issue.number,
            Self::Failed(failure) => failure.issue_number,
        }
    }

    pub fn decision(&self) -> Option<&TriageDecision> {
        match self {
            Self::Decision(decision) => Some(decision),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureRecord> {
        match self {
            Self::Decision(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

/// Aggregated result of a retriage run.
///
/// Outcomes keep the input order regardless of which worker finished
/// first; cancelled issues are counted but carry no outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<TriageOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }

    pub fn decisions(&self) -> impl Iterator<Item = &TriageDecision> {
        self.outcomes.iter().filter_map(TriageOutcome::decision)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FailureRecord> {
        self.outcomes.iter().filter_map(TriageOutcome::failure)
    }
}

impl TriagePipeline {
    /// Retriage a set of issue numbers, fetching each through `source`.
    ///
    /// Runs on the configured worker pool (the global one when `workers`
    /// is zero). The store serializes what must be serialized, so workers
    /// need no coordination beyond the shared pipeline reference.
    pub fn retriage_batch(
        &self,
        numbers: &[u64],
        source: &dyn IssueSource,
        options: &BatchOptions,
    ) -> BatchReport {
        let run = |number: u64| -> Option<TriageOutcome> {
            if let Some(token) = &options.cancel {
                if token.is_cancelled() {
                    return None;
                }
            }
            let outcome = match self.triage_number(number, source) {
                Ok(decision) => TriageOutcome::Decision(decision),
                Err(error) => TriageOutcome::Failed(FailureRecord {
                    issue_number: number,
                    stage: Stage::Fetch,
                    error,
                }),
            };
            Some(outcome)
        };

        let results: Vec<Option<TriageOutcome>> = if self.workers > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
            {
                Ok(pool) => pool.install(|| numbers.par_iter().map(|n| run(*n)).collect()),
                // Pool creation can fail under resource pressure; the
                // global pool still bounds us.
                Err(_) => numbers.par_iter().map(|n| run(*n)).collect(),
            }
        } else {
            numbers.par_iter().map(|n| run(*n)).collect()
        };

        let mut outcomes = Vec::with_capacity(results.len());
        let (mut succeeded, mut failed, mut cancelled) = (0, 0, 0);
        for result in results {
            match result {
                Some(TriageOutcome::Decision(decision)) => {
                    succeeded += 1;
                    outcomes.push(TriageOutcome::Decision(decision));
                }
                Some(TriageOutcome::Failed(failure)) => {
                    failed += 1;
                    outcomes.push(TriageOutcome::Failed(failure));
                }
                None => cancelled += 1,
            }
        }

        BatchReport {
            outcomes,
            succeeded,
            failed,
            cancelled,
        }
    }

    /// Retriage every open issue the source reports.
    ///
    /// Failing to list the backlog is the only way a batch fails as a
    /// whole; after that point every issue stands alone.
    pub fn retriage_open(
        &self,
        source: &dyn IssueSource,
        options: &BatchOptions,
    ) -> Result<BatchReport, TriageError> {
        let issues = source.list_open_issues()?;
        let numbers: Vec<u64> = issues.iter().map(|issue| issue.number).collect();
        Ok(self.retriage_batch(&numbers, source, options))
    }
}
