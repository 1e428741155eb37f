//! Content quality classification

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse usability grade of extracted content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    #[default]
    High,
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Warning,
    Error,
}

/// One quality finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub level: IssueLevel,
    pub code: &'static str,
    pub message: String,
}

struct Signal {
    level: IssueLevel,
    code: &'static str,
    message: &'static str,
    pattern: &'static str,
}

const SIGNALS: &[Signal] = &[
    Signal {
        level: IssueLevel::Error,
        code: "error_page",
        message: "content looks like an error page",
        pattern: r"\b404\b[\s:\-]*(page\s+)?not\s+found|\bpage\s+not\s+found\b|\berror\s+404\b|\b(page|document)\s+(you\s+(requested|were\s+looking\s+for)\s+)?(could\s+not|cannot|can't)\s+be\s+found\b",
    },
    Signal {
        level: IssueLevel::Error,
        code: "access_denied",
        message: "content reports denied access",
        pattern: r"\baccess\s+denied\b|\b403\s+forbidden\b|\byou\s+(do\s+not|don't)\s+have\s+permission\b",
    },
    Signal {
        level: IssueLevel::Error,
        code: "login_required",
        message: "content is behind a login",
        pattern: r"\b(log|sign)\s*in\s+to\s+(continue|view|access|read)\b|\byou\s+must\s+be\s+(logged|signed)\s+in\b|\b(login|authentication)\s+required\b",
    },
    Signal {
        level: IssueLevel::Warning,
        code: "stub_content",
        message: "content is a stub or placeholder",
        pattern: r"\bthis\s+(article|page|section)\s+is\s+a\s+stub\b|\bcoming\s+soon\b|\bunder\s+construction\b|\blorem\s+ipsum\b|\bplaceholder\s+(text|page|content)\b",
    },
];

static COMPILED: Lazy<Vec<(&'static Signal, Regex)>> = Lazy::new(|| {
    SIGNALS
        .iter()
        .filter_map(|signal| {
            RegexBuilder::new(signal.pattern)
                .case_insensitive(true)
                .build()
                .ok()
                .map(|regex| (signal, regex))
        })
        .collect()
});

/// Grades title and content
///
/// Any error signal makes the result [`Quality::Low`], any warning
/// [`Quality::Medium`]. Every match is reported.
pub fn assess_quality(title: &str, content: &str, min_content_length: usize) -> (Quality, Vec<Issue>) {
    let haystack = format!("{}\n{}", title, content);
    let mut issues = Vec::new();

    for (signal, regex) in COMPILED.iter() {
        if regex.is_match(&haystack) {
            issues.push(Issue {
                level: signal.level,
                code: signal.code,
                message: signal.message.to_string(),
            });
        }
    }

    let length = content.chars().count();
    if length < min_content_length {
        issues.push(Issue {
            level: IssueLevel::Warning,
            code: "content_too_short",
            message: format!(
                "content has {} characters, minimum is {}",
                length, min_content_length
            ),
        });
    }

    let quality = if issues.iter().any(|i| i.level == IssueLevel::Error) {
        Quality::Low
    } else if issues.is_empty() {
        Quality::High
    } else {
        Quality::Medium
    };

    (quality, issues)
}
