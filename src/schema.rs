//! Link records passed between pipeline stages
//!
//! Scanner -> dedupe -> cache filter -> validator -> persister.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// One textual sighting of a URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOccurrence {
    /// URL as extracted (after parenthesis repair)
    pub url: String,
    /// File the URL was found in
    pub source: PathBuf,
    /// 1-indexed line number
    pub line: usize,
}

impl LinkOccurrence {
    pub fn new(url: impl Into<String>, source: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
            line,
        }
    }

    /// `path:line` for report output
    pub fn location(&self) -> String {
        format!("{}:{}", self.source.display(), self.line)
    }
}

/// The occurrence chosen to stand for every sighting of one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueLink {
    /// First occurrence in scan order
    #[serde(flatten)]
    pub occurrence: LinkOccurrence,
    /// Number of sightings collapsed into this record
    pub sightings: usize,
}

impl UniqueLink {
    pub fn url(&self) -> &str {
        &self.occurrence.url
    }
}

/// Why a link failed validation
///
/// The `Display` text is the error detail written to the failure report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Server answered outside 200..=399
    #[error("HTTP {code} {reason}")]
    Status { code: u16, reason: String },

    #[error("Timeout after {0} ms")]
    Timeout(u64),

    #[error("DNS lookup failed: {0}")]
    Dns(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Too many redirects")]
    Redirect,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request error: {0}")]
    Request(String),
}

/// Result of attempting to resolve one candidate
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub link: UniqueLink,
    /// HTTP status on success
    pub result: Result<u16, LinkError>,
}

impl ValidationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn url(&self) -> &str {
        self.link.url()
    }

    pub fn error_detail(&self) -> Option<String> {
        self.result.as_ref().err().map(|e| e.to_string())
    }
}

/// How the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Candidates were validated
    Checked,
    /// Validation was skipped on request
    Skipped,
    /// Every discovered link was filtered out by the caches
    NothingToCheck,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Checked => write!(f, "checked"),
            RunStatus::Skipped => write!(f, "skipped"),
            RunStatus::NothingToCheck => write!(f, "nothing_to_check"),
        }
    }
}

/// Final counts for one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub files_scanned: usize,
    pub links_found: usize,
    pub unique_links: usize,
    pub candidates: usize,
    pub accepted: usize,
    pub failed: usize,
    /// Tasks that died before producing an outcome
    pub aborted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
}
