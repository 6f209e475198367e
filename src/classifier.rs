//! Keyword classifier.
//!
//! Scores issue text against configured categories by substring keyword
//! matching. No model calls, no network, no state: the same text always
//! produces the same result, which keeps retriage runs reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Category;
use crate::error::TriageError;

/// The classifier's verdict for one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Per-category score in [0, 1], rounded to two decimals. Every
    /// configured category appears, including zero scores.
    pub scores: BTreeMap<String, f32>,
    /// Categories assigned to the issue, in configured category order.
    pub labels: Vec<String>,
    /// The highest category score.
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }
}

/// Deterministic keyword classifier.
pub struct Classifier {
    categories: Vec<Category>,
    min_confidence: f32,
}

impl Classifier {
    /// Build a classifier over the given categories.
    ///
    /// Keywords are lowercased here so matching against lowercased issue
    /// text works no matter how the configuration was written. An empty
    /// category list is accepted; empty keyword lists simply score zero.
    pub fn new(categories: &[Category], min_confidence: f32) -> Result<Self, TriageError> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(TriageError::Configuration(format!(
                "min_confidence must be within [0, 1], got {}",
                min_confidence
            )));
        }
        let mut seen = std::collections::BTreeSet::new();
        let mut normalized = Vec::with_capacity(categories.len());
        for category in categories {
            if category.name.trim().is_empty() {
                return Err(TriageError::Configuration(
                    "category with an empty name".to_string(),
                ));
            }
            if !seen.insert(category.name.clone()) {
                return Err(TriageError::Configuration(format!(
                    "duplicate category name: {}",
                    category.name
                )));
            }
            normalized.push(Category {
                name: category.name.clone(),
                keywords: category.keywords.iter().map(|k| k.to_lowercase()).collect(),
            });
        }
        Ok(Self {
            categories: normalized,
            min_confidence,
        })
    }

    /// Classify an issue by title and body.
    ///
    /// Each category scores `matched keywords / total keywords` against the
    /// lowercased combined text. Categories at or above the confidence
    /// threshold become labels; when none qualify but something matched,
    /// the top-scoring categories are assigned instead so no issue with a
    /// signal leaves unlabeled.
    pub fn classify(&self, title: &str, body: &str) -> ClassificationResult {
        let text = format!("{} {}", title, body).to_lowercase();

        // Raw scores drive thresholding; rounding is presentation only.
        let raw: Vec<f32> = self
            .categories
            .iter()
            .map(|category| {
                if category.keywords.is_empty() {
                    return 0.0;
                }
                let hits = category
                    .keywords
                    .iter()
                    .filter(|keyword| text.contains(keyword.as_str()))
                    .count();
                hits as f32 / category.keywords.len() as f32
            })
            .collect();

        let confidence = raw.iter().copied().fold(0.0_f32, f32::max);

        let mut labels: Vec<String> = self
            .categories
            .iter()
            .zip(&raw)
            .filter(|(_, score)| **score >= self.min_confidence)
            .map(|(category, _)| category.name.clone())
            .collect();

        // Fallback: nothing cleared the threshold but at least one keyword
        // matched, so take the top scorers (all of them on a tie).
        if labels.is_empty() && confidence > 0.0 {
            labels = self
                .categories
                .iter()
                .zip(&raw)
                .filter(|(_, score)| **score == confidence)
                .map(|(category, _)| category.name.clone())
                .collect();
        }

        let scores = self
            .categories
            .iter()
            .zip(&raw)
            .map(|(category, score)| (category.name.clone(), round2(*score)))
            .collect();

        ClassificationResult {
            scores,
            labels,
            confidence: round2(confidence),
        }
    }
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
