//! JSON-file issue source.
//!
//! A local stand-in for a remote tracker: the backlog is one JSON array
//! that triage reads and, with `--apply`, writes back. Keeps the CLI
//! usable offline and the whole pipeline testable without a network.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use sieve::{Issue, IssueSource, TriageError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BacklogEntry {
    number: u64,
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    comments: Vec<String>,
    #[serde(default = "default_open")]
    open: bool,
}

fn default_open() -> bool {
    true
}

pub struct JsonIssueSource {
    path: PathBuf,
    entries: Mutex<Vec<BacklogEntry>>,
}

impl JsonIssueSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read backlog {}", path.display()))?;
        let entries: Vec<BacklogEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse backlog {}", path.display()))?;
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn save(&self, entries: &[BacklogEntry]) -> Result<(), TriageError> {
        let json = serde_json::to_string_pretty(entries).map_err(|e| {
            TriageError::SourceUnavailable(format!("failed to encode backlog: {e}"))
        })?;
        std::fs::write(&self.path, json).map_err(|e| {
            TriageError::SourceUnavailable(format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl IssueSource for JsonIssueSource {
    fn fetch_issue(&self, number: u64) -> Result<Issue, TriageError> {
        self.entries
            .lock()
            .iter()
            .find(|entry| entry.number == number)
            .map(|entry| Issue::new(entry.number, entry.title.clone(), entry.body.clone()))
            .ok_or_else(|| {
                TriageError::SourceUnavailable(format!(
                    "issue #{number} not found in {}",
                    self.path.display()
                ))
            })
    }

    fn list_open_issues(&self) -> Result<Vec<Issue>, TriageError> {
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|entry| entry.open)
            .map(|entry| Issue::new(entry.number, entry.title.clone(), entry.body.clone()))
            .collect())
    }

    fn apply_labels(&self, number: u64, labels: &[String]) -> Result<(), TriageError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|entry| entry.number == number)
            .ok_or_else(|| {
                TriageError::SourceUnavailable(format!("issue #{number} not found"))
            })?;
        for label in labels {
            if !entry.labels.contains(label) {
                entry.labels.push(label.clone());
            }
        }
        self.save(&entries)
    }

    fn post_comment(&self, number: u64, text: &str) -> Result<(), TriageError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|entry| entry.number == number)
            .ok_or_else(|| {
                TriageError::SourceUnavailable(format!("issue #{number} not found"))
            })?;
        entry.comments.push(text.to_string());
        self.save(&entries)
    }
}
