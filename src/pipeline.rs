//! Run orchestration: scan -> dedupe -> filter -> validate -> persist
//!
//! Caches are read once before validation and written once after every
//! task has joined.

use crate::cache::{self, CacheSet};
use crate::check_links::{HttpProbe, Probe, Validator};
use crate::config::Config;
use crate::filter::{dedupe, filter_cached, FilterOptions};
use crate::persist::{self, partition, IgnoredUpdate, PersistOptions};
use crate::report::Reporter;
use crate::scan::{self, ScanOptions};
use crate::schema::{RunStatus, RunSummary};
use anyhow::{Context, Result};
use chrono::Local;
use glob::Pattern;
use std::path::PathBuf;

/// Per-run switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub use_accepted: bool,
    pub use_ignored: bool,
    pub reset_accepted: bool,
    pub reset_ignored: bool,
    /// `false` stops after filtering: no requests, no report
    pub validate: bool,
    pub ignored_update: IgnoredUpdate,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_accepted: true,
            use_ignored: true,
            reset_accepted: false,
            reset_ignored: false,
            validate: true,
            ignored_update: IgnoredUpdate::Keep,
        }
    }
}

impl RunOptions {
    /// Whether ignored links are filtered out before validation
    ///
    /// Never while rebuilding: a rebuild replaces the cache with this run's
    /// failures, so ignored links must be checked to keep the dead ones.
    pub fn consults_ignored(&self) -> bool {
        self.use_ignored && self.ignored_update != IgnoredUpdate::Rebuild
    }
}

/// Run with the `reqwest` probe
pub async fn run(config: &Config, options: &RunOptions, reporter: &dyn Reporter) -> Result<RunSummary> {
    let probe = HttpProbe::new(config).context("Failed to build HTTP client")?;
    let validator = Validator::new(probe, config.workers());
    run_with(config, options, &validator, reporter).await
}

/// Run with any probe
pub async fn run_with<P: Probe>(
    config: &Config,
    options: &RunOptions,
    validator: &Validator<P>,
    reporter: &dyn Reporter,
) -> Result<RunSummary> {
    let started = Local::now();

    // Fail on a bad root before touching any file
    scan::check_root(&config.root).await?;

    if options.reset_accepted {
        cache::reset(&config.accepted_cache).await?;
    }
    if options.reset_ignored {
        cache::reset(&config.ignored_cache).await?;
    }

    let accepted = if options.use_accepted {
        cache::load(&config.accepted_cache).await?
    } else {
        CacheSet::new()
    };
    let use_ignored = options.consults_ignored();
    let ignored = if use_ignored {
        cache::load(&config.ignored_cache).await?
    } else {
        CacheSet::new()
    };
    log::info!(
        "Loaded {} accepted and {} ignored links",
        accepted.len(),
        ignored.len()
    );

    let scan_options = ScanOptions::default()
        .with_include(&config.include)?
        .with_exclude([config.accepted_cache.clone(), config.ignored_cache.clone()])
        .with_exclude(previous_reports(config));
    let scanned = scan::scan(&config.root, &scan_options).await?;
    reporter.scan_finished(&scanned);

    let links_found = scanned.occurrences.len();
    let unique = dedupe(scanned.occurrences);
    let unique_links = unique.len();
    let filter = FilterOptions {
        use_accepted: options.use_accepted,
        use_ignored,
    };
    let candidates = filter_cached(unique, &accepted, &ignored, filter);
    reporter.filtered(links_found, unique_links, candidates.len());

    let mut summary = RunSummary {
        status: RunStatus::Checked,
        files_scanned: scanned.files_scanned,
        links_found,
        unique_links,
        candidates: candidates.len(),
        accepted: 0,
        failed: 0,
        aborted: 0,
        report: None,
    };

    if !options.validate {
        if use_ignored {
            persist::normalize(&config.ignored_cache).await?;
        }
        summary.status = RunStatus::Skipped;
        reporter.finished(&summary);
        return Ok(summary);
    }

    if candidates.is_empty() {
        summary.status = RunStatus::NothingToCheck;
    }

    let validation = validator.validate_all(candidates, reporter).await;

    let persist_options = PersistOptions {
        accepted_cache: config.accepted_cache.clone(),
        ignored_cache: config.ignored_cache.clone(),
        update_accepted: options.use_accepted,
        ignored_in_use: use_ignored,
        ignored_update: options.ignored_update,
        report_dir: config.report_dir.clone(),
        report_prefix: config.report_prefix.clone(),
    };
    let persisted = persist::persist_outcomes(&validation.outcomes, &persist_options, started).await?;

    reporter.failures(&partition(&validation.outcomes).failed);

    summary.accepted = persisted.accepted;
    summary.failed = persisted.failed;
    summary.aborted = validation.aborted.len();
    summary.report = persisted.report;
    reporter.finished(&summary);

    Ok(summary)
}

/// Earlier failure reports in the report directory
fn previous_reports(config: &Config) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/{}.*",
        Pattern::escape(&config.report_dir.to_string_lossy()),
        Pattern::escape(&config.report_prefix)
    );
    match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(e) => {
            log::warn!("Cannot list previous reports: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SilentReporter;
    use crate::schema::LinkError;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// Succeeds for every URL except those containing "dead"
    struct StubProbe;

    impl Probe for StubProbe {
        async fn probe(&self, url: &str) -> Result<u16, LinkError> {
            if url.contains("dead") {
                Err(LinkError::Status {
                    code: 404,
                    reason: "Not Found".to_string(),
                })
            } else {
                Ok(200)
            }
        }
    }

    fn workspace() -> (tempfile::TempDir, Config) {
        let dir = tempdir().unwrap();
        let root = dir.path().join("docs");
        fs::create_dir_all(&root).unwrap();
        let config = Config {
            root,
            accepted_cache: dir.path().join("storage/successfullinks.txt"),
            ignored_cache: dir.path().join("storage/ignoredlinks.txt"),
            report_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        (dir, config)
    }

    fn write(root: &Path, name: &str, content: &str) {
        fs::write(root.join(name), content).unwrap();
    }

    async fn run_stub(config: &Config, options: &RunOptions) -> RunSummary {
        let validator = Validator::new(StubProbe, 4);
        run_with(config, options, &validator, &SilentReporter)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_accepted_cache_filters_candidates() {
        let (_dir, config) = workspace();
        fs::create_dir_all(config.accepted_cache.parent().unwrap()).unwrap();
        fs::write(&config.accepted_cache, "https://ok.example\n").unwrap();
        write(&config.root, "a.md", "https://ok.example\nhttps://new.example\n");

        let summary = run_stub(&config, &RunOptions::default()).await;

        assert_eq!(summary.unique_links, 2);
        assert_eq!(summary.candidates, 1);
        assert_eq!(summary.accepted, 1);
        let cache = fs::read_to_string(&config.accepted_cache).unwrap();
        assert_eq!(cache, "https://new.example\nhttps://ok.example\n");
    }

    #[tokio::test]
    async fn test_second_run_only_rechecks_failures() {
        let (_dir, config) = workspace();
        write(&config.root, "a.md", "https://alive.example\nhttps://dead.example\n");

        let first = run_stub(&config, &RunOptions::default()).await;
        assert_eq!(first.candidates, 2);
        assert_eq!(first.failed, 1);
        assert!(first.report.is_some());

        let second = run_stub(&config, &RunOptions::default()).await;
        assert_eq!(second.candidates, 1);
        assert_eq!(second.failed, 1);
    }

    #[tokio::test]
    async fn test_no_validation_skips() {
        let (_dir, config) = workspace();
        write(&config.root, "a.md", "https://dead.example\n");

        let options = RunOptions {
            validate: false,
            ..RunOptions::default()
        };
        let summary = run_stub(&config, &options).await;

        assert_eq!(summary.status, RunStatus::Skipped);
        assert_eq!(summary.candidates, 1);
        assert_eq!(summary.report, None);
    }

    #[tokio::test]
    async fn test_nothing_to_check() {
        let (_dir, config) = workspace();
        write(&config.root, "a.md", "no links here\n");

        let summary = run_stub(&config, &RunOptions::default()).await;

        assert_eq!(summary.status, RunStatus::NothingToCheck);
        assert_eq!(summary.report, None);
    }

    #[tokio::test]
    async fn test_reset_accepted_rechecks_everything() {
        let (_dir, config) = workspace();
        fs::create_dir_all(config.accepted_cache.parent().unwrap()).unwrap();
        fs::write(&config.accepted_cache, "https://ok.example\n").unwrap();
        write(&config.root, "a.md", "https://ok.example\n");

        let options = RunOptions {
            reset_accepted: true,
            ..RunOptions::default()
        };
        let summary = run_stub(&config, &options).await;

        assert_eq!(summary.candidates, 1);
    }

    #[tokio::test]
    async fn test_rebuild_ignored_from_failures() {
        let (_dir, config) = workspace();
        write(&config.root, "a.md", "https://dead.example/one\nhttps://fine.example\n");

        let options = RunOptions {
            use_ignored: false,
            ignored_update: IgnoredUpdate::Rebuild,
            ..RunOptions::default()
        };
        run_stub(&config, &options).await;

        let ignored = fs::read_to_string(&config.ignored_cache).unwrap();
        assert_eq!(ignored, "https://dead.example/one\n");

        // Next run filters the now-ignored link out
        let summary = run_stub(&config, &RunOptions::default()).await;
        assert_eq!(summary.status, RunStatus::NothingToCheck);
    }

    #[tokio::test]
    async fn test_rebuild_ignored_keeps_still_dead_entries() {
        let (_dir, config) = workspace();
        fs::create_dir_all(config.ignored_cache.parent().unwrap()).unwrap();
        fs::write(&config.ignored_cache, "https://dead.curated.example\nhttps://fixed.example\n").unwrap();
        write(
            &config.root,
            "a.md",
            "https://dead.curated.example\nhttps://dead.new.example\nhttps://fixed.example\n",
        );

        let options = RunOptions {
            ignored_update: IgnoredUpdate::Rebuild,
            ..RunOptions::default()
        };
        let summary = run_stub(&config, &options).await;

        assert_eq!(summary.candidates, 3);
        assert_eq!(summary.failed, 2);
        let ignored = fs::read_to_string(&config.ignored_cache).unwrap();
        assert_eq!(ignored, "https://dead.curated.example\nhttps://dead.new.example\n");
    }

    #[test]
    fn test_consults_ignored() {
        assert!(RunOptions::default().consults_ignored());
        let rebuild = RunOptions {
            ignored_update: IgnoredUpdate::Rebuild,
            ..RunOptions::default()
        };
        assert!(!rebuild.consults_ignored());
        let augment = RunOptions {
            ignored_update: IgnoredUpdate::Augment,
            ..RunOptions::default()
        };
        assert!(augment.consults_ignored());
    }

    #[tokio::test]
    async fn test_invalid_root_fails_before_cache_io() {
        let (dir, mut config) = workspace();
        config.root = dir.path().join("missing");

        let validator = Validator::new(StubProbe, 1);
        let err = run_with(&config, &RunOptions::default(), &validator, &SilentReporter).await;

        assert!(err.is_err());
        assert!(!config.accepted_cache.exists());
    }

    #[tokio::test]
    async fn test_previous_reports_not_scanned() {
        let (dir, mut config) = workspace();
        config.root = dir.path().to_path_buf();
        fs::write(dir.path().join("failed_links.2020-01-01_000000"), "https://old.example\tx:1\tHTTP 404\n").unwrap();
        fs::write(dir.path().join("doc.md"), "https://fresh.example\n").unwrap();

        let summary = run_stub(&config, &RunOptions::default()).await;

        assert_eq!(summary.unique_links, 1);
    }
}
