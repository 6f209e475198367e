//! Issue input types and the tracker interface.

use serde::{Deserialize, Serialize};

use crate::error::TriageError;

/// An issue report as fetched from the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl Issue {
    pub fn new(number: u64, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            body: body.into(),
        }
    }

    /// Combined title and body, the text every downstream component sees.
    ///
    /// Classification and embedding both operate on this exact string, so
    /// the same issue always produces the same scores and the same vector.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }
}

/// External issue tracker.
///
/// The pipeline only reads (`fetch_issue`, `list_open_issues`). The write
/// half is exercised by callers after a decision is produced, so a failed
/// label application never corrupts triage state.
pub trait IssueSource: Send + Sync {
    /// Fetch a single issue by number.
    fn fetch_issue(&self, number: u64) -> Result<Issue, TriageError>;

    /// List every currently open issue.
    fn list_open_issues(&self) -> Result<Vec<Issue>, TriageError>;

    /// Apply labels to an issue.
    fn apply_labels(&self, number: u64, labels: &[String]) -> Result<(), TriageError>;

    /// Post a comment on an issue.
    fn post_comment(&self, number: u64, text: &str) -> Result<(), TriageError>;
}
