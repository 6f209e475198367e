//! Embedding generation.
//!
//! Trait-based so a semantic model can be substituted later without
//! touching the duplicate detector or the memory store. The only backend
//! shipping today is the deterministic hash embedder.

mod hash;
mod similarity;

pub use hash::HashEmbedder;
pub use similarity::cosine_similarity;

use crate::config::EmbeddingConfig;
use crate::error::TriageError;

/// Trait for embedding engines.
///
/// `Send + Sync` so bulk retriage can share one engine across workers.
pub trait EmbeddingEngine: Send + Sync {
    /// Generate an embedding for a single text.
    ///
    /// Identical input must produce an identical vector for the lifetime
    /// of the engine; duplicate detection depends on it.
    fn embed(&self, text: &str) -> Result<Vec<f32>, TriageError>;

    /// Vector dimension, fixed for the engine's lifetime.
    fn dimension(&self) -> usize;

    /// Backend name for diagnostics.
    fn backend_name(&self) -> &'static str;
}

/// Create the embedding engine selected by configuration.
pub fn create_engine(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingEngine>, TriageError> {
    if config.dimension == 0 {
        return Err(TriageError::Configuration(
            "embedding dimension must be at least 1".to_string(),
        ));
    }
    match config.backend.as_str() {
        "hash" => Ok(Box::new(HashEmbedder::new(config.dimension))),
        other => Err(TriageError::Configuration(format!(
            "unknown embedding backend: {}",
            other
        ))),
    }
}
