//! Inspect and exercise the memory store directly.

use std::path::Path;

use anyhow::{bail, Result};
use chrono::Utc;
use colored::*;

use sieve::config::TriageConfig;
use sieve::embedding::create_engine;
use sieve::memory::{IssueRecord, MemoryStore};
use sieve::{Classifier, Issue};

fn open_store(config: &TriageConfig) -> Result<MemoryStore> {
    match MemoryStore::open(&config.store, config.embedding.dimension)? {
        Some(store) => Ok(store),
        None => bail!("the memory store is disabled in this configuration"),
    }
}

/// Classify, embed, and store one issue without running the full pipeline.
pub fn store(config: Option<&Path>, number: u64, title: &str, body: &str) -> Result<()> {
    let config = super::load_config(config)?;
    let store = open_store(&config)?;
    let engine = create_engine(&config.embedding)?;
    let classifier = Classifier::new(&config.categories, config.min_confidence)?;

    let issue = Issue::new(number, title, body);
    let labels = classifier.classify(&issue.title, &issue.body).labels;
    let embedding = engine.embed(&issue.combined_text())?;

    store.upsert(IssueRecord {
        issue_number: issue.number,
        title: issue.title,
        body: issue.body,
        embedding,
        labels: labels.clone(),
        stored_at: Utc::now(),
    })?;

    let shown = if labels.is_empty() {
        "none".to_string()
    } else {
        labels.join(", ")
    };
    println!("{} stored #{number} with labels [{shown}]", "✓".green());
    Ok(())
}

/// Search stored issues by similarity to free text.
pub fn search(
    config: Option<&Path>,
    text: &str,
    threshold: Option<f32>,
    limit: usize,
) -> Result<()> {
    let config = super::load_config(config)?;
    let store = open_store(&config)?;
    let engine = create_engine(&config.embedding)?;
    let threshold = threshold.unwrap_or(config.duplicates.threshold);

    let query = engine.embed(text)?;
    let matches: Vec<_> = store
        .query_nearest(&query, limit)?
        .into_iter()
        .filter(|m| m.score >= threshold)
        .collect();

    if matches.is_empty() {
        println!("No stored issues at or above similarity {threshold:.2}");
        return Ok(());
    }

    println!("{}", format!("🔍 {} match(es)", matches.len()).bold());
    for m in &matches {
        match store.get(m.issue_number)? {
            Some(record) => {
                println!("   #{} ({:.2}) {}", m.issue_number, m.score, record.title);
            }
            None => {
                println!("   #{} ({:.2})", m.issue_number, m.score);
            }
        }
    }
    Ok(())
}

/// Show store backend, dimension, and record count.
pub fn stats(config: Option<&Path>) -> Result<()> {
    let config = super::load_config(config)?;
    let store = open_store(&config)?;

    println!("{}", "📊 Issue Memory".bold());
    println!("   backend:   {}", store.backend_name());
    println!("   dimension: {}", store.dimension());
    println!("   records:   {}", store.len()?);
    Ok(())
}
