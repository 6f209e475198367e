//! Retriage the whole open backlog.

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;

use sieve::{BatchOptions, BatchReport, Priority, TriagePipeline};

use super::observe::ConsoleObserver;
use super::source_file::JsonIssueSource;

pub fn execute(config: Option<&Path>, source: &Path, json: bool) -> Result<()> {
    let config = super::load_config(config)?;
    let source = JsonIssueSource::open(source)?;

    let mut pipeline = TriagePipeline::new(config).context("failed to build triage pipeline")?;
    if !json {
        pipeline = pipeline.with_observer(Box::new(ConsoleObserver::new(false)));
        println!("🔁 Retriaging open issues...\n");
    }

    let report = pipeline.retriage_open(&source, &BatchOptions::default())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &BatchReport) {
    println!("\n{}", "📊 Retriage Summary".bold());
    println!("   processed: {}", report.total());
    println!("   succeeded: {}", report.succeeded.to_string().green());
    if report.failed > 0 {
        println!("   failed:    {}", report.failed.to_string().red());
    }
    if report.cancelled > 0 {
        println!("   cancelled: {}", report.cancelled);
    }

    let mut by_priority = [0usize; 4];
    let mut duplicates = 0;
    for decision in report.decisions() {
        let slot = match decision.priority {
            Priority::P0 => 0,
            Priority::P1 => 1,
            Priority::P2 => 2,
            Priority::P3 => 3,
        };
        by_priority[slot] += 1;
        if decision.is_duplicate() {
            duplicates += 1;
        }
    }
    println!(
        "   priorities: P0={} P1={} P2={} P3={}",
        by_priority[0], by_priority[1], by_priority[2], by_priority[3]
    );
    if duplicates > 0 {
        println!("   with likely duplicates: {duplicates}");
    }

    for failure in report.failures() {
        println!(
            "   {} #{} at {:?}: {}",
            "✗".red(),
            failure.issue_number,
            failure.stage,
            failure.error
        );
    }
}
