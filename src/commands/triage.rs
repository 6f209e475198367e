//! Triage a single issue and optionally apply the outcome.

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;

use sieve::{IssueSource, TriageDecision, TriagePipeline};

use super::observe::ConsoleObserver;
use super::source_file::JsonIssueSource;

pub fn execute(
    config: Option<&Path>,
    number: u64,
    source: &Path,
    apply: bool,
    json: bool,
) -> Result<()> {
    let config = super::load_config(config)?;
    let source = JsonIssueSource::open(source)?;

    let mut pipeline = TriagePipeline::new(config).context("failed to build triage pipeline")?;
    if !json {
        pipeline = pipeline.with_observer(Box::new(ConsoleObserver::new(true)));
    }

    let decision = pipeline.triage_number(number, &source)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        print_decision(&decision);
    }

    if apply {
        source.apply_labels(number, &decision.classification.labels)?;
        source.post_comment(number, &decision.summary())?;
        if !json {
            println!("\n{} labels and summary written back", "✓".green());
        }
    }

    Ok(())
}

fn print_decision(decision: &TriageDecision) {
    println!(
        "\n{}",
        format!("📋 Issue #{}: {}", decision.issue.number, decision.issue.title).bold()
    );

    let labels = if decision.classification.labels.is_empty() {
        "none".to_string()
    } else {
        decision.classification.labels.join(", ")
    };
    println!("   labels:     {labels}");
    println!("   confidence: {:.2}", decision.classification.confidence);
    println!(
        "   priority:   {} ({})",
        decision.priority,
        decision.priority.label()
    );
    println!("   complexity: {}", decision.complexity);

    if decision.duplicates.is_empty() {
        println!("   duplicates: none");
    } else {
        println!("   duplicates:");
        for duplicate in &decision.duplicates {
            println!(
                "      #{} at similarity {:.2}",
                duplicate.issue_number, duplicate.score
            );
        }
    }

    println!("   stored:     {}", if decision.stored { "yes" } else { "no" });

    for warning in &decision.warnings {
        println!(
            "   {} {:?} degraded: {}",
            "⚠️".yellow(),
            warning.stage,
            warning.detail
        );
    }
}
