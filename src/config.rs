//! Configuration for the triage pipeline.
//!
//! Everything tunable is decided at construction time: categories and
//! keyword lists, thresholds, the embedding dimension, and the memory store
//! backend. Running pipelines never reload configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TriageError;

/// A classification category and the keywords that vote for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub keywords: Vec<String>,
}

impl Category {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Embedding engine selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend name. Only "hash" ships today; the field exists so a real
    /// model can be swapped in without an API change.
    pub backend: String,
    /// Vector dimension. Every store and every query is bound to this.
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            dimension: 384,
        }
    }
}

/// Duplicate detection tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    /// Minimum cosine similarity for a stored issue to count as a duplicate.
    pub threshold: f32,
    /// Maximum number of duplicates reported per issue.
    pub max_results: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            max_results: 5,
        }
    }
}

/// Priority policy tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    /// Confidence required before a label escalates to P0.
    pub confidence_floor: f32,
    /// Substrings that mark a bug as critical (P0) when confidence is high.
    pub critical_patterns: Vec<String>,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.6,
            critical_patterns: vec![
                "crash".to_string(),
                "data loss".to_string(),
                "corrupt".to_string(),
                "panic".to_string(),
                "broken".to_string(),
            ],
        }
    }
}

/// Complexity heuristic tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityConfig {
    /// Reports at or under this combined length with no complex signal
    /// are rated simple.
    pub simple_max_chars: usize,
    /// Numbered reproduction steps required to count as a complex signal.
    pub min_steps: usize,
    /// Keywords that indicate work spanning more than one component.
    pub cross_cutting_keywords: Vec<String>,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            simple_max_chars: 200,
            min_steps: 3,
            cross_cutting_keywords: vec![
                "refactor".to_string(),
                "regression".to_string(),
                "across".to_string(),
                "multiple".to_string(),
                "intermittent".to_string(),
                "race condition".to_string(),
            ],
        }
    }
}

/// Which memory store backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// No memory: duplicate checks and storage are skipped entirely.
    Disabled,
    /// Sharded in-memory map, gone when the process exits.
    Transient,
    /// Embedded SQLite database at `path`.
    Sqlite,
}

/// Memory store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file, used by the sqlite backend only.
    pub path: PathBuf,
    /// Upper bound on waiting for store locks before the operation is
    /// reported as `StorageUnavailable`.
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Transient,
            path: PathBuf::from(".sieve/memory.db"),
            timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level pipeline configuration.
///
/// `Default` gives the stock category table and thresholds with a transient
/// store, which is enough for tests and for library embedding. The CLI
/// layers a durable sqlite store on top.
///
/// # Example
///
/// ```no_run
/// use sieve::config::TriageConfig;
///
/// let config = TriageConfig::load("sieve.toml")?;
/// # Ok::<(), sieve::TriageError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub categories: Vec<Category>,
    /// Score floor for a category to label an issue outright.
    pub min_confidence: f32,
    pub embedding: EmbeddingConfig,
    pub duplicates: DuplicateConfig,
    pub priority: PriorityConfig,
    pub complexity: ComplexityConfig,
    pub store: StoreConfig,
    /// Worker threads for bulk retriage. Zero uses the global pool.
    pub workers: usize,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            min_confidence: 0.6,
            embedding: EmbeddingConfig::default(),
            duplicates: DuplicateConfig::default(),
            priority: PriorityConfig::default(),
            complexity: ComplexityConfig::default(),
            store: StoreConfig::default(),
            workers: 0,
        }
    }
}

/// The stock category table.
///
/// Keywords are matched as lowercase substrings, so entries here are kept
/// lowercase ("cve" rather than "CVE").
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("bug", &["error", "crash", "broken", "fail", "exception", "bug"]),
        Category::new("feature", &["feature", "enhancement", "add", "support", "implement"]),
        Category::new("docs", &["documentation", "docs", "readme", "guide", "tutorial"]),
        Category::new("question", &["how", "why", "question", "help", "confused"]),
        Category::new("performance", &["slow", "performance", "lag", "optimize", "speed"]),
        Category::new("security", &["security", "vulnerability", "exploit", "cve"]),
    ]
}

impl TriageConfig {
    /// Load and validate a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TriageError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TriageError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| {
            TriageError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that the type system cannot.
    ///
    /// An empty category list is tolerated (every issue scores zero and
    /// gets no labels); malformed entries are not.
    pub fn validate(&self) -> Result<(), TriageError> {
        let mut seen = std::collections::BTreeSet::new();
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(TriageError::Configuration(
                    "category with an empty name".to_string(),
                ));
            }
            if !seen.insert(category.name.as_str()) {
                return Err(TriageError::Configuration(format!(
                    "duplicate category name: {}",
                    category.name
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(TriageError::Configuration(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(TriageError::Configuration(
                "embedding dimension must be at least 1".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.duplicates.threshold) {
            return Err(TriageError::Configuration(format!(
                "duplicate threshold must be within [-1, 1], got {}",
                self.duplicates.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.priority.confidence_floor) {
            return Err(TriageError::Configuration(format!(
                "confidence_floor must be within [0, 1], got {}",
                self.priority.confidence_floor
            )));
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.path.as_os_str().is_empty() {
            return Err(TriageError::Configuration(
                "sqlite store requires a database path".to_string(),
            ));
        }
        Ok(())
    }
}
