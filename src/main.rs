//! link-validate CLI
//!
//! Finds http(s) links in a documentation tree and checks the ones not
//! already known to be good or deliberately ignored.

use anyhow::Result;
use clap::Parser;
use link_validate::config::{Config, ConfigFile, Method};
use link_validate::logging::init_logging;
use link_validate::persist::IgnoredUpdate;
use link_validate::pipeline::{self, RunOptions};
use link_validate::report::ConsoleReporter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "link-validate")]
#[command(version)]
#[command(about = "Incremental dead-link detection for documentation trees")]
#[command(long_about = "Scans a directory tree for http(s) links and checks each one not \
already recorded as working (accepted cache) or deliberately skipped (ignored cache).\n\n\
Working links are added to the accepted cache; failures go to a timestamped report.")]
struct Cli {
    /// Directory to scan (default: current directory)
    #[arg(value_name = "ROOT")]
    root: Option<PathBuf>,

    /// Do not consult or update the accepted-links cache
    #[arg(short = 's', long)]
    skip_accepted: bool,

    /// Do not consult the ignored-links cache
    #[arg(short = 'i', long)]
    skip_ignored: bool,

    /// Empty the accepted-links cache before running
    #[arg(long)]
    reset_accepted: bool,

    /// Empty the ignored-links cache before running
    #[arg(long)]
    reset_ignored: bool,

    /// Extract and filter links only; make no requests
    #[arg(short = 'n', long)]
    no_validation: bool,

    /// Replace the ignored cache with this run's failures (implies --skip-ignored)
    #[arg(long, conflicts_with = "augment_ignored")]
    rebuild_ignored: bool,

    /// Append this run's failures to the ignored cache
    #[arg(long)]
    augment_ignored: bool,

    /// Maximum requests in flight (1-256)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..=256))]
    concurrency: Option<u16>,

    /// Timeout per URL in milliseconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Request method
    #[arg(long, value_enum)]
    method: Option<Method>,

    /// Only scan files matching this glob, relative to ROOT (repeatable)
    #[arg(long, value_name = "GLOB")]
    include: Vec<String>,

    /// YAML config file
    #[arg(long, env = "LINK_VALIDATE_CONFIG")]
    config: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Less log output
    #[arg(short, long, action = clap::ArgAction::Count)]
    quiet: u8,
}

impl Cli {
    /// Defaults < config file < flags
    async fn config(&self) -> Result<Config> {
        let mut config = Config::default();
        if let Some(path) = &self.config {
            config = config.merge_file(ConfigFile::load(path).await?);
        }

        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = usize::from(concurrency);
        }
        if let Some(timeout) = self.timeout {
            config.timeout_ms = timeout;
        }
        if let Some(method) = self.method {
            config.method = method;
        }
        if !self.include.is_empty() {
            config.include = self.include.clone();
        }
        Ok(config)
    }

    fn run_options(&self) -> RunOptions {
        let ignored_update = if self.rebuild_ignored {
            IgnoredUpdate::Rebuild
        } else if self.augment_ignored {
            IgnoredUpdate::Augment
        } else {
            IgnoredUpdate::Keep
        };

        RunOptions {
            use_accepted: !self.skip_accepted,
            use_ignored: !self.skip_ignored && !self.rebuild_ignored,
            reset_accepted: self.reset_accepted,
            reset_ignored: self.reset_ignored,
            validate: !self.no_validation,
            ignored_update,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = cli.config().await?;
    log::debug!("Config: {:?}", config);

    let reporter = ConsoleReporter::new(!cli.no_color);
    let summary = pipeline::run(&config, &cli.run_options(), &reporter).await?;

    if cli.json {
        println!("{}", serde_json::to_string(&summary)?);
    }

    Ok(())
}
