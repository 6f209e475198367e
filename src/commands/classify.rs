//! Classify issue text without touching memory.

use std::path::Path;

use anyhow::Result;

use sieve::Classifier;

pub fn execute(config: Option<&Path>, title: &str, body: &str) -> Result<()> {
    let config = super::load_config(config)?;
    let classifier = Classifier::new(&config.categories, config.min_confidence)?;

    let result = classifier.classify(title, body);
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.labels.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
