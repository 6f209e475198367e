//! Hash-based embedding backend.
//!
//! Maps a SHA-256 digest of the text into a fixed-dimension vector with
//! components in [-1, 1]. This is a stand-in for a semantic model: it
//! guarantees reproducibility and the vector-shape contract, but only
//! byte-identical text lands on the same point. Near-identical wording
//! produces uncorrelated vectors.

use sha2::{Digest, Sha256};

use super::EmbeddingEngine;
use crate::error::TriageError;

pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingEngine for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, TriageError> {
        let digest = Sha256::digest(text.as_bytes());
        // Cycle through the 32 digest bytes, scaling each into [-1, 1].
        let vector = (0..self.dimension)
            .map(|i| (digest[i % digest.len()] as f32 / 255.0) * 2.0 - 1.0)
            .collect();
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend_name(&self) -> &'static str {
        "hash-sha256"
    }
}
