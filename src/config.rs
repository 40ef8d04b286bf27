//! Run configuration: built-in defaults, optional YAML file, CLI overrides

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_ACCEPTED_CACHE: &str = "scripts/link-storage/successfullinks.txt";
pub const DEFAULT_IGNORED_CACHE: &str = "scripts/link-storage/ignoredlinks.txt";
pub const DEFAULT_REPORT_PREFIX: &str = "failed_links";
pub const DEFAULT_TIMEOUT_MS: u64 = 7000;
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Gecko/20100101 Firefox/143.0";

/// HTTP method used to probe links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// HEAD, reissued as GET when the server rejects HEAD
    #[default]
    Head,
    /// Always GET
    Get,
}

/// Fully resolved configuration for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
    pub accepted_cache: PathBuf,
    pub ignored_cache: PathBuf,
    pub report_dir: PathBuf,
    pub report_prefix: String,
    pub concurrency: usize,
    pub timeout_ms: u64,
    pub method: Method,
    pub user_agent: String,
    pub include: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            accepted_cache: PathBuf::from(DEFAULT_ACCEPTED_CACHE),
            ignored_cache: PathBuf::from(DEFAULT_IGNORED_CACHE),
            report_dir: PathBuf::from("."),
            report_prefix: DEFAULT_REPORT_PREFIX.to_string(),
            concurrency: default_concurrency(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            method: Method::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            include: Vec::new(),
        }
    }
}

/// Five workers per available CPU
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 5)
        .unwrap_or(5)
}

/// Any subset of [`Config`] fields, as read from YAML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub root: Option<PathBuf>,
    pub accepted_cache: Option<PathBuf>,
    pub ignored_cache: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
    pub report_prefix: Option<String>,
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub method: Option<Method>,
    pub user_agent: Option<String>,
    pub include: Option<Vec<String>>,
}

impl ConfigFile {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

impl Config {
    /// Layer a config file over the current values
    pub fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(v) = file.root {
            self.root = v;
        }
        if let Some(v) = file.accepted_cache {
            self.accepted_cache = v;
        }
        if let Some(v) = file.ignored_cache {
            self.ignored_cache = v;
        }
        if let Some(v) = file.report_dir {
            self.report_dir = v;
        }
        if let Some(v) = file.report_prefix {
            self.report_prefix = v;
        }
        if let Some(v) = file.concurrency {
            self.concurrency = v;
        }
        if let Some(v) = file.timeout_ms {
            self.timeout_ms = v;
        }
        if let Some(v) = file.method {
            self.method = v;
        }
        if let Some(v) = file.user_agent {
            self.user_agent = v;
        }
        if let Some(v) = file.include {
            self.include = v;
        }
        self
    }

    /// Worker limit, never zero
    pub fn workers(&self) -> usize {
        self.concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.accepted_cache, PathBuf::from(DEFAULT_ACCEPTED_CACHE));
        assert_eq!(config.ignored_cache, PathBuf::from(DEFAULT_IGNORED_CACHE));
        assert_eq!(config.timeout_ms, 7000);
        assert_eq!(config.method, Method::Head);
        assert!(config.concurrency >= 5);
        assert!(config.include.is_empty());
    }

    #[test]
    fn test_merge_partial_file() {
        let file = ConfigFile::parse(
            r#"
accepted_cache: links/ok.txt
timeout_ms: 2500
method: get
include:
  - "docs/**/*.md"
"#,
        )
        .unwrap();

        let config = Config::default().merge_file(file);
        assert_eq!(config.accepted_cache, PathBuf::from("links/ok.txt"));
        assert_eq!(config.ignored_cache, PathBuf::from(DEFAULT_IGNORED_CACHE));
        assert_eq!(config.timeout_ms, 2500);
        assert_eq!(config.method, Method::Get);
        assert_eq!(config.include, vec!["docs/**/*.md".to_string()]);
    }

    #[test]
    fn test_empty_file() {
        let file = ConfigFile::parse("  \n").unwrap();
        assert_eq!(Config::default().merge_file(file), Config::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(ConfigFile::parse("timeout: 5").is_err());
    }

    #[test]
    fn test_workers_never_zero() {
        let config = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert_eq!(config.workers(), 1);
    }
}
