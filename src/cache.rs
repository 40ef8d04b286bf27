//! Accepted/ignored link caches
//!
//! Plain text, one URL per line, kept sorted so repeated runs produce
//! minimal diffs under version control.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A set of previously classified URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSet {
    urls: BTreeSet<String>,
}

impl CacheSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Sorted, newline-terminated file body
    fn render(&self) -> String {
        let mut out = String::new();
        for url in &self.urls {
            out.push_str(url);
            out.push('\n');
        }
        out
    }
}

impl<S: Into<String>> FromIterator<S> for CacheSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            urls: iter
                .into_iter()
                .map(Into::into)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for CacheSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for url in iter {
            let url = url.into().trim().to_string();
            if !url.is_empty() {
                self.urls.insert(url);
            }
        }
    }
}

/// Load a cache file, creating it empty if missing
pub async fn load(path: &Path) -> Result<CacheSet, CacheError> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(content.lines().collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            write_file(path, "").await?;
            log::info!("Created empty cache {}", path.display());
            Ok(CacheSet::new())
        }
        Err(source) => Err(CacheError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Truncate a cache file to empty
pub async fn reset(path: &Path) -> Result<(), CacheError> {
    write_file(path, "").await?;
    log::info!("Reset cache {}", path.display());
    Ok(())
}

/// Append entries, then re-sort and rewrite the whole file
///
/// Returns the set now on disk. With no new entries this just normalizes
/// the file.
pub async fn persist<I, S>(path: &Path, entries: I) -> Result<CacheSet, CacheError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut set = load(path).await?;
    set.extend(entries);
    write_file(path, &set.render()).await?;
    log::debug!("Persisted {} entries to {}", set.len(), path.display());
    Ok(set)
}

/// Replace the file's contents with exactly `entries`, sorted
pub async fn rewrite<I, S>(path: &Path, entries: I) -> Result<CacheSet, CacheError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let set: CacheSet = entries.into_iter().collect();
    write_file(path, &set.render()).await?;
    log::debug!("Rewrote {} with {} entries", path.display(), set.len());
    Ok(set)
}

async fn write_file(path: &Path, content: &str) -> Result<(), CacheError> {
    let wrap = |source| CacheError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(wrap)?;
    }
    fs::write(path, content).await.map_err(wrap)
}
