//! Priority and complexity assessment.
//!
//! Pure policy over the classification result and the issue text. Label
//! names drive the priority ladder; text shape (stack traces, numbered
//! steps, cross-cutting keywords, sheer length) drives complexity.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classifier::ClassificationResult;
use crate::config::{ComplexityConfig, PriorityConfig};
use crate::error::TriageError;

/// Urgency ladder. Lower is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    /// Human name matching the ladder: critical, high, medium, low.
    pub fn label(&self) -> &'static str {
        match self {
            Self::P0 => "critical",
            Self::P1 => "high",
            Self::P2 => "medium",
            Self::P3 => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
        };
        write!(f, "{name}")
    }
}

/// Effort estimate for resolving an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
        };
        write!(f, "{name}")
    }
}

/// Combined priority and complexity verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub priority: Priority,
    pub complexity: Complexity,
}

pub struct PriorityAssessor {
    confidence_floor: f32,
    critical_patterns: Vec<String>,
    cross_cutting: Vec<String>,
    simple_max_chars: usize,
    min_steps: usize,
    stack_trace: Regex,
    numbered_step: Regex,
}

impl PriorityAssessor {
    pub fn new(
        priority: &PriorityConfig,
        complexity: &ComplexityConfig,
    ) -> Result<Self, TriageError> {
        // Frame lines from Rust, Python, Java and JS runtimes.
        let stack_trace = Regex::new(
            r#"(?im)\bstack\s*trace\b|\bbacktrace\b|\btraceback\b|panicked at|^\s+at\s+\S+|^\s*file ".+", line \d+"#,
        )
        .map_err(|e| TriageError::Configuration(format!("bad stack trace pattern: {e}")))?;
        let numbered_step = Regex::new(r"(?m)^\s*\d+[.)]\s+")
            .map_err(|e| TriageError::Configuration(format!("bad step pattern: {e}")))?;

        Ok(Self {
            confidence_floor: priority.confidence_floor,
            critical_patterns: priority
                .critical_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            cross_cutting: complexity
                .cross_cutting_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            simple_max_chars: complexity.simple_max_chars,
            min_steps: complexity.min_steps,
            stack_trace,
            numbered_step,
        })
    }

    /// Assess one classified issue.
    ///
    /// A caller-supplied hint overrides the computed priority outright;
    /// complexity is always computed from the text.
    pub fn assess(
        &self,
        classification: &ClassificationResult,
        title: &str,
        body: &str,
        hint: Option<Priority>,
    ) -> Assessment {
        let combined = format!("{} {}", title, body);
        let lowered = combined.to_lowercase();
        let priority = hint.unwrap_or_else(|| self.priority_for(classification, &lowered));
        let complexity = self.complexity_for(&combined, &lowered);
        Assessment {
            priority,
            complexity,
        }
    }

    /// The ladder, top down: confident security or critical-looking bugs
    /// are P0, other bugs P1, performance P2, everything else P3.
    fn priority_for(&self, classification: &ClassificationResult, lowered: &str) -> Priority {
        let confident = classification.confidence >= self.confidence_floor;
        if confident && classification.has_label("security") {
            return Priority::P0;
        }
        if classification.has_label("bug") {
            let critical = self
                .critical_patterns
                .iter()
                .any(|pattern| lowered.contains(pattern.as_str()));
            if confident && critical {
                return Priority::P0;
            }
            return Priority::P1;
        }
        if classification.has_label("performance") {
            return Priority::P2;
        }
        Priority::P3
    }

    /// Any complex signal wins; otherwise short reports are simple and the
    /// rest land in the middle.
    fn complexity_for(&self, combined: &str, lowered: &str) -> Complexity {
        let has_stack_trace = self.stack_trace.is_match(combined);
        let steps = self.numbered_step.find_iter(combined).count();
        let cross_cutting = self
            .cross_cutting
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()));

        if has_stack_trace || steps >= self.min_steps || cross_cutting {
            return Complexity::Complex;
        }
        if combined.chars().count() <= self.simple_max_chars {
            return Complexity::Simple;
        }
        Complexity::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::config::default_categories;

    fn assessor() -> PriorityAssessor {
        PriorityAssessor::new(&PriorityConfig::default(), &ComplexityConfig::default()).unwrap()
    }

    fn classify(title: &str, body: &str) -> ClassificationResult {
        Classifier::new(&default_categories(), 0.6)
            .unwrap()
            .classify(title, body)
    }

    #[test]
    fn confident_security_label_is_p0() {
        let title = "security vulnerability: auth exploit, cve pending";
        let result = classify(title, "");
        assert!(result.confidence >= 0.6);
        let assessment = assessor().assess(&result, title, "", None);
        assert_eq!(assessment.priority, Priority::P0);
    }

    #[test]
    fn low_confidence_security_label_stays_p3() {
        // One keyword hit leaves security as the fallback label at 0.25,
        // below the floor, so the P0 rule must not fire.
        let title = "Possible vulnerability in session handling";
        let result = classify(title, "");
        assert_eq!(result.labels, vec!["security".to_string()]);
        assert!(result.confidence < 0.6);
        let assessment = assessor().assess(&result, title, "", None);
        assert_eq!(assessment.priority, Priority::P3);
    }

    #[test]
    fn critical_bug_with_high_confidence_is_p0() {
        let title = "bug: crash error, broken save fails with exception";
        let result = classify(title, "");
        assert_eq!(result.confidence, 1.0);
        let assessment = assessor().assess(&result, title, "", None);
        assert_eq!(assessment.priority, Priority::P0);
    }

    #[test]
    fn ordinary_bug_is_p1() {
        let title = "Login fails with exception";
        let result = classify(title, "");
        let assessment = assessor().assess(&result, title, "", None);
        assert_eq!(assessment.priority, Priority::P1);
    }

    #[test]
    fn performance_label_is_p2() {
        let title = "App is slow, optimize the dashboard, speed matters, performance lag";
        let result = classify(title, "");
        assert!(result.has_label("performance"));
        assert!(!result.has_label("bug"));
        let assessment = assessor().assess(&result, title, "", None);
        assert_eq!(assessment.priority, Priority::P2);
    }

    #[test]
    fn everything_else_is_p3() {
        let title = "Please clarify the tutorial";
        let result = classify(title, "");
        let assessment = assessor().assess(&result, title, "", None);
        assert_eq!(assessment.priority, Priority::P3);
    }

    #[test]
    fn hint_overrides_computed_priority() {
        let title = "Please clarify the tutorial";
        let result = classify(title, "");
        let assessment = assessor().assess(&result, title, "", Some(Priority::P0));
        assert_eq!(assessment.priority, Priority::P0);
    }

    #[test]
    fn short_plain_report_is_simple() {
        let result = classify("Typo in readme", "");
        let assessment = assessor().assess(&result, "Typo in readme", "", None);
        assert_eq!(assessment.complexity, Complexity::Simple);
    }

    #[test]
    fn long_report_without_signals_is_medium() {
        let body = "The dashboard renders oddly under certain window sizes. ".repeat(8);
        let result = classify("Rendering oddity", &body);
        let assessment = assessor().assess(&result, "Rendering oddity", &body, None);
        assert_eq!(assessment.complexity, Complexity::Medium);
    }

    #[test]
    fn stack_trace_marks_complex() {
        let body = "It dies with:\n    at com.example.Main.run(Main.java:42)\n    at java.base/java.lang.Thread.run(Thread.java:833)";
        let result = classify("Crash", body);
        let assessment = assessor().assess(&result, "Crash", body, None);
        assert_eq!(assessment.complexity, Complexity::Complex);
    }

    #[test]
    fn rust_panic_marks_complex() {
        let body = "thread 'main' panicked at src/lib.rs:10";
        let result = classify("Panic", body);
        let assessment = assessor().assess(&result, "Panic", body, None);
        assert_eq!(assessment.complexity, Complexity::Complex);
    }

    #[test]
    fn numbered_steps_mark_complex() {
        let body = "Steps:\n1. Open the app\n2. Import a project\n3. Hit save twice";
        let result = classify("Save button misbehaves", body);
        let assessment = assessor().assess(&result, "Save button misbehaves", body, None);
        assert_eq!(assessment.complexity, Complexity::Complex);
    }

    #[test]
    fn two_steps_are_not_enough() {
        let body = "1. Open the app\n2. Watch it";
        let result = classify("Minor visual blip", body);
        let assessment = assessor().assess(&result, "Minor visual blip", body, None);
        assert_ne!(assessment.complexity, Complexity::Complex);
    }

    #[test]
    fn cross_cutting_keyword_marks_complex() {
        let title = "Regression in the export flow";
        let result = classify(title, "");
        let assessment = assessor().assess(&result, title, "", None);
        assert_eq!(assessment.complexity, Complexity::Complex);
    }

    #[test]
    fn priority_ordering_matches_urgency() {
        assert!(Priority::P0 < Priority::P1);
        assert!(Priority::P1 < Priority::P2);
        assert!(Priority::P2 < Priority::P3);
    }

    #[test]
    fn priority_labels_follow_the_ladder() {
        assert_eq!(Priority::P0.label(), "critical");
        assert_eq!(Priority::P3.label(), "low");
        assert_eq!(Priority::P1.to_string(), "P1");
    }
}
