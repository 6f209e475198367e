pub mod classifier;
pub mod config;
pub mod duplicates;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod priority;
pub mod source;

// Re-export commonly used types
pub use classifier::{ClassificationResult, Classifier};
pub use config::TriageConfig;
pub use duplicates::DuplicateDetector;
pub use embedding::{cosine_similarity, create_engine, EmbeddingEngine, HashEmbedder};
pub use error::TriageError;
pub use memory::{IssueRecord, MemoryStore, SimilarityMatch};
pub use pipeline::{
    BatchOptions, BatchReport, CancelToken, FailureRecord, Stage, StageWarning, TriageDecision,
    TriageObserver, TriageOutcome, TriagePipeline, TriageState,
};
pub use priority::{Assessment, Complexity, Priority, PriorityAssessor};
pub use source::{Issue, IssueSource};
