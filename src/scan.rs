//! Link scanner: walk a directory tree and extract link occurrences
//!
//! Files that are not valid UTF-8 are treated as binary and skipped.
//! Entries that cannot be read (permissions, races) are skipped with a
//! warning. Only an unusable root is fatal.

use crate::extract::extract_links;
use crate::schema::LinkOccurrence;
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan root {path} is not a readable directory: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("Invalid include pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Scan restrictions
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Files never scanned (cache files, report output)
    pub exclude: Vec<PathBuf>,
    /// When non-empty, only files whose root-relative path matches one
    /// of these are scanned
    pub include: Vec<Pattern>,
}

impl ScanOptions {
    pub fn with_include<I, S>(mut self, patterns: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let compiled = Pattern::new(pattern).map_err(|source| ScanError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;
            self.include.push(compiled);
        }
        Ok(self)
    }

    pub fn with_exclude<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.exclude.extend(paths.into_iter().map(Into::into));
        self
    }
}

/// Everything the scanner saw
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Occurrences in scan order
    pub occurrences: Vec<LinkOccurrence>,
    /// Text files read
    pub files_scanned: usize,
    /// Binary or unreadable files passed over
    pub files_skipped: usize,
}

impl ScanReport {
    /// Occurrences grouped by file, in scan order
    pub fn by_file(&self) -> Vec<(&Path, Vec<&LinkOccurrence>)> {
        let mut groups: Vec<(&Path, Vec<&LinkOccurrence>)> = Vec::new();
        for occ in &self.occurrences {
            let same_file = groups
                .last()
                .is_some_and(|(path, _)| *path == occ.source.as_path());
            match groups.last_mut() {
                Some((_, links)) if same_file => links.push(occ),
                _ => groups.push((occ.source.as_path(), vec![occ])),
            }
        }
        groups
    }
}

/// Walk `root` recursively and collect link occurrences
///
/// Files are visited in lexicographic path order so the result, and the
/// first-seen tie-break downstream, is deterministic.
pub async fn scan(root: &Path, options: &ScanOptions) -> Result<ScanReport, ScanError> {
    let root = check_root(root).await?;
    let exclude = absolute_excludes(&options.exclude);

    let pattern = format!(
        "{}/**/*",
        Pattern::escape(&root.to_string_lossy())
    );
    let walk = glob::glob(&pattern).map_err(|source| ScanError::Pattern {
        pattern: pattern.clone(),
        source,
    })?;

    let mut report = ScanReport::default();

    for entry in walk {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Skipping unreadable entry {}: {}", e.path().display(), e.error());
                continue;
            }
        };

        if !path.is_file() {
            continue;
        }
        if exclude.iter().any(|ex| *ex == path) {
            log::debug!("Excluded {}", path.display());
            continue;
        }

        let relative = path.strip_prefix(&root).unwrap_or(&path);
        if !is_included(relative, &options.include) {
            continue;
        }

        match read_text(&path).await {
            Some(content) => {
                report.files_scanned += 1;
                report.occurrences.extend(
                    extract_links(&content)
                        .into_iter()
                        .map(|(line, url)| LinkOccurrence::new(url, relative, line)),
                );
            }
            None => report.files_skipped += 1,
        }
    }

    log::info!(
        "Scanned {} files ({} skipped), {} links",
        report.files_scanned,
        report.files_skipped,
        report.occurrences.len()
    );

    Ok(report)
}

/// Canonical root, or why it cannot be scanned
pub async fn check_root(root: &Path) -> Result<PathBuf, ScanError> {
    let invalid = |reason: String| ScanError::InvalidRoot {
        path: root.to_path_buf(),
        reason,
    };

    let canonical = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| invalid(e.to_string()))?;
    let meta = tokio::fs::metadata(&canonical)
        .await
        .map_err(|e| invalid(e.to_string()))?;

    if !meta.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }
    let _entries = tokio::fs::read_dir(&canonical)
        .await
        .map_err(|e| invalid(e.to_string()))?;

    Ok(canonical)
}

/// Canonical forms of the exclusions that exist; missing paths can't be
/// visited anyway
fn absolute_excludes(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter_map(|p| std::fs::canonicalize(p).ok())
        .collect()
}

fn is_included(relative: &Path, include: &[Pattern]) -> bool {
    if include.is_empty() {
        return true;
    }
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    include
        .iter()
        .any(|p| p.matches_path_with(relative, options))
}

async fn read_text(path: &Path) -> Option<String> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Skipping {}: {}", path.display(), e);
            return None;
        }
    };

    match String::from_utf8(bytes) {
        Ok(content) => Some(content),
        Err(_) => {
            log::debug!("Skipping binary file {}", path.display());
            None
        }
    }
}
