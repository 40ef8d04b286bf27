//! Result aggregation and persistence
//!
//! Runs strictly after every validation task has joined. All writes are
//! sequential.

use crate::cache::{self, CacheError};
use crate::schema::ValidationOutcome;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;

/// What to do with the ignored cache after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IgnoredUpdate {
    /// Leave entries alone (the file is still re-sorted)
    #[default]
    Keep,
    /// Replace the ignored cache with this run's failures
    Rebuild,
    /// Add this run's failures to the ignored cache
    Augment,
}

/// Where and how outcomes are written
#[derive(Debug, Clone)]
pub struct PersistOptions {
    pub accepted_cache: PathBuf,
    pub ignored_cache: PathBuf,
    /// Accepted URLs are written back only when the cache was consulted
    pub update_accepted: bool,
    /// The ignored cache was consulted this run
    pub ignored_in_use: bool,
    pub ignored_update: IgnoredUpdate,
    pub report_dir: PathBuf,
    pub report_prefix: String,
}

/// Outcomes split by verdict
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub accepted: Vec<&'a ValidationOutcome>,
    /// Sorted by URL, then source path, then line
    pub failed: Vec<&'a ValidationOutcome>,
}

/// What persistence did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Persisted {
    pub accepted: usize,
    pub failed: usize,
    pub report: Option<PathBuf>,
}

/// Split outcomes; completion order is not relied on
pub fn partition(outcomes: &[ValidationOutcome]) -> Partition<'_> {
    let (accepted, mut failed): (Vec<_>, Vec<_>) =
        outcomes.iter().partition(|o| o.is_success());

    failed.sort_by(|a, b| {
        let (a, b) = (&a.link.occurrence, &b.link.occurrence);
        (&a.url, &a.source, a.line).cmp(&(&b.url, &b.source, b.line))
    });

    Partition { accepted, failed }
}

/// Report file name for a run started at `at`
pub fn report_path(dir: &Path, prefix: &str, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}.{}", prefix, at.format("%Y-%m-%d_%H%M%S")))
}

/// One tab-separated line per failure: url, path:line, error detail
pub fn render_report(failed: &[&ValidationOutcome]) -> String {
    let mut out = String::new();
    for outcome in failed {
        let occ = &outcome.link.occurrence;
        out.push_str(&format!(
            "{}\t{}\t{}\n",
            occ.url,
            occ.location(),
            outcome.error_detail().unwrap_or_default()
        ));
    }
    out
}

/// Update caches and write the failure report
pub async fn persist_outcomes(
    outcomes: &[ValidationOutcome],
    options: &PersistOptions,
    at: DateTime<Local>,
) -> Result<Persisted, CacheError> {
    let parts = partition(outcomes);

    if options.update_accepted && !parts.accepted.is_empty() {
        cache::persist(&options.accepted_cache, parts.accepted.iter().map(|o| o.url())).await?;
        log::info!(
            "Added {} links to {}",
            parts.accepted.len(),
            options.accepted_cache.display()
        );
    }

    let report = if parts.failed.is_empty() {
        None
    } else {
        let path = report_path(&options.report_dir, &options.report_prefix, at);
        write_report(&path, &parts.failed).await?;
        Some(path)
    };

    let failed_urls = parts.failed.iter().map(|o| o.url());
    match options.ignored_update {
        IgnoredUpdate::Rebuild => {
            cache::rewrite(&options.ignored_cache, failed_urls).await?;
        }
        IgnoredUpdate::Augment => {
            cache::persist(&options.ignored_cache, failed_urls).await?;
        }
        IgnoredUpdate::Keep => {
            if options.ignored_in_use {
                normalize(&options.ignored_cache).await?;
            }
        }
    }

    Ok(Persisted {
        accepted: parts.accepted.len(),
        failed: parts.failed.len(),
        report,
    })
}

/// Re-sort an existing cache file in place
pub async fn normalize(path: &Path) -> Result<(), CacheError> {
    if fs::try_exists(path).await.unwrap_or(false) {
        cache::persist(path, Vec::<String>::new()).await?;
    }
    Ok(())
}

async fn write_report(path: &Path, failed: &[&ValidationOutcome]) -> Result<(), CacheError> {
    let wrap = |source| CacheError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(wrap)?;
    }
    fs::write(path, render_report(failed)).await.map_err(wrap)?;
    log::info!("Wrote {} failures to {}", failed.len(), path.display());
    Ok(())
}
