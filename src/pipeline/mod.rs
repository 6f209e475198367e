//! Triage pipeline.
//!
//! Drives one issue through classify, duplicate check, priority, and store
//! in a fixed order, then hands back a [`TriageDecision`]. Failures of the
//! optional memory stages degrade the decision instead of discarding the
//! work already done; only a missing issue kills a run. Bulk retriage over
//! a worker pool lives in [`batch`].

pub mod batch;

pub use batch::{BatchOptions, BatchReport, CancelToken, FailureRecord, TriageOutcome};

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassificationResult, Classifier};
use crate::config::TriageConfig;
use crate::duplicates::DuplicateDetector;
use crate::embedding::{create_engine, EmbeddingEngine};
use crate::error::TriageError;
use crate::memory::{IssueRecord, MemoryStore, SimilarityMatch};
use crate::priority::{Complexity, Priority, PriorityAssessor};
use crate::source::{Issue, IssueSource};

/// Pipeline stages, used to attribute failures and warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Classify,
    DuplicateCheck,
    AssessPriority,
    Store,
}

/// Progress of one issue through the pipeline.
///
/// `Done` is the only success terminal. `Failed` can be entered from any
/// point and names the stage that gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageState {
    Fetched,
    Classified,
    DuplicateChecked,
    PriorityAssessed,
    Stored,
    Done,
    Failed(Stage),
}

/// A recoverable degradation, recorded on the decision instead of
/// failing the issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageWarning {
    pub stage: Stage,
    pub detail: String,
}

/// The structured output of triaging one issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageDecision {
    pub issue: Issue,
    pub classification: ClassificationResult,
    pub priority: Priority,
    pub complexity: Complexity,
    /// Stored issues that look like the same report, best match first.
    pub duplicates: Vec<SimilarityMatch>,
    /// Whether this decision made it into the memory store.
    pub stored: bool,
    /// Store stages that degraded instead of completing.
    pub warnings: Vec<StageWarning>,
}

impl TriageDecision {
    pub fn is_duplicate(&self) -> bool {
        !self.duplicates.is_empty()
    }

    /// One-paragraph summary suitable for posting back on the issue.
    pub fn summary(&self) -> String {
        let labels = if self.classification.labels.is_empty() {
            "none".to_string()
        } else {
            self.classification.labels.join(", ")
        };
        let mut text = format!(
            "Triage: labels [{}], priority {} ({}), complexity {}.",
            labels,
            self.priority,
            self.priority.label(),
            self.complexity,
        );
        if !self.duplicates.is_empty() {
            let listed: Vec<String> = self
                .duplicates
                .iter()
                .map(|d| format!("#{} ({:.2})", d.issue_number, d.score))
                .collect();
            text.push_str(&format!(" Possible duplicates: {}.", listed.join(", ")));
        }
        if !self.stored {
            text.push_str(" Not recorded in issue memory.");
        }
        text
    }
}

/// Observer hook, called after every state transition.
///
/// Runs inline on the triaging thread, so implementations should do no
/// more than log or count.
pub trait TriageObserver: Send + Sync {
    fn on_transition(&self, issue_number: u64, state: &TriageState);
}

/// The assembled pipeline. Construction validates configuration and opens
/// the store; a value of this type is ready to triage and is shared by
/// reference across batch workers.
pub struct TriagePipeline {
    classifier: Classifier,
    engine: Box<dyn EmbeddingEngine>,
    detector: DuplicateDetector,
    assessor: PriorityAssessor,
    store: Option<MemoryStore>,
    workers: usize,
    observer: Option<Box<dyn TriageObserver>>,
}

impl fmt::Debug for TriagePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriagePipeline")
            .field("workers", &self.workers)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl TriagePipeline {
    /// Build a pipeline from configuration.
    ///
    /// Fails fast on malformed categories or thresholds, an unknown
    /// embedding backend, or a store whose dimension disagrees with the
    /// engine's.
    pub fn new(config: TriageConfig) -> Result<Self, TriageError> {
        config.validate()?;
        let classifier = Classifier::new(&config.categories, config.min_confidence)?;
        let engine = create_engine(&config.embedding)?;
        let store = MemoryStore::open(&config.store, engine.dimension())?;
        let detector = DuplicateDetector::new(&config.duplicates);
        let assessor = PriorityAssessor::new(&config.priority, &config.complexity)?;
        Ok(Self {
            classifier,
            engine,
            detector,
            assessor,
            store,
            workers: config.workers,
            observer: None,
        })
    }

    /// Attach an observer for state transitions.
    pub fn with_observer(mut self, observer: Box<dyn TriageObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Whether a memory store is attached.
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Triage one already-fetched issue.
    pub fn triage(&self, issue: Issue) -> TriageDecision {
        self.triage_with_hint(issue, None)
    }

    /// Triage with a caller-supplied severity override.
    ///
    /// Always produces a decision: store trouble lands in `warnings` with
    /// `stored == false` rather than aborting, so one flaky database never
    /// throws away a finished classification.
    pub fn triage_with_hint(&self, issue: Issue, hint: Option<Priority>) -> TriageDecision {
        self.transition(issue.number, TriageState::Fetched);

        let classification = self.classifier.classify(&issue.title, &issue.body);
        self.transition(issue.number, TriageState::Classified);

        let mut warnings = Vec::new();
        let mut duplicates = Vec::new();
        let mut embedding = None;

        // Both store stages are skipped outright when no store is
        // configured; the embedding is only computed when something
        // downstream will use it.
        if let Some(store) = &self.store {
            match self.engine.embed(&issue.combined_text()) {
                Ok(vector) => {
                    match self.detector.rank(issue.number, &vector, store) {
                        Ok(found) => {
                            duplicates = found;
                            self.transition(issue.number, TriageState::DuplicateChecked);
                        }
                        Err(e) => warnings.push(StageWarning {
                            stage: Stage::DuplicateCheck,
                            detail: e.to_string(),
                        }),
                    }
                    embedding = Some(vector);
                }
                Err(e) => warnings.push(StageWarning {
                    stage: Stage::DuplicateCheck,
                    detail: e.to_string(),
                }),
            }
        }

        let assessment = self
            .assessor
            .assess(&classification, &issue.title, &issue.body, hint);
        self.transition(issue.number, TriageState::PriorityAssessed);

        let mut stored = false;
        if let (Some(store), Some(vector)) = (&self.store, embedding) {
            let record = IssueRecord {
                issue_number: issue.number,
                title: issue.title.clone(),
                body: issue.body.clone(),
                embedding: vector,
                labels: classification.labels.clone(),
                stored_at: Utc::now(),
            };
            match store.upsert(record) {
                Ok(()) => {
                    stored = true;
                    self.transition(issue.number, TriageState::Stored);
                }
                Err(e) => warnings.push(StageWarning {
                    stage: Stage::Store,
                    detail: e.to_string(),
                }),
            }
        }

        self.transition(issue.number, TriageState::Done);
        TriageDecision {
            issue,
            classification,
            priority: assessment.priority,
            complexity: assessment.complexity,
            duplicates,
            stored,
            warnings,
        }
    }

    /// Fetch `number` from the source, then triage it.
    pub fn triage_number(
        &self,
        number: u64,
        source: &dyn IssueSource,
    ) -> Result<TriageDecision, TriageError> {
        match source.fetch_issue(number) {
            Ok(issue) => Ok(self.triage(issue)),
            Err(e) => {
                self.transition(number, TriageState::Failed(Stage::Fetch));
                Err(e)
            }
        }
    }

    fn transition(&self, issue_number: u64, state: TriageState) {
        if let Some(observer) = &self.observer {
            observer.on_transition(issue_number, &state);
        }
    }
}
