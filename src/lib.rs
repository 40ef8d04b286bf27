//! link-validate: incremental dead-link detection
//!
//! Pipeline:
//! - scan: walk a tree, extract one link per line
//! - filter: dedupe, drop links in the accepted/ignored caches
//! - check_links: resolve candidates with a bounded worker pool
//! - persist: update caches, write the failure report

pub mod cache;
pub mod check_links;
pub mod config;
pub mod extract;
pub mod filter;
pub mod logging;
pub mod persist;
pub mod pipeline;
pub mod report;
pub mod scan;
pub mod schema;

pub use cache::{CacheError, CacheSet};
pub use check_links::{HttpProbe, Probe, Validation, Validator};
pub use config::Config;
pub use pipeline::{run, run_with, RunOptions};
pub use report::{ConsoleReporter, Reporter, SilentReporter};
pub use schema::{LinkError, LinkOccurrence, RunStatus, RunSummary, UniqueLink, ValidationOutcome};
