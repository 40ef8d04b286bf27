//! Diagnostic logging via `env_logger`
//!
//! User-facing output goes through [`crate::report`]; this is for
//! `-v`/`RUST_LOG` diagnostics only.

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Map `-v`/`-q` counts to a level, starting from `warn`
pub fn level_for(verbose: u8, quiet: u8) -> LevelFilter {
    match 2 + i16::from(verbose) - i16::from(quiet) {
        i16::MIN..=0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the global logger; `RUST_LOG` wins over the CLI flags
pub fn init_logging(verbose: u8, quiet: u8) {
    let mut builder = Builder::from_env(Env::default().filter_or("RUST_LOG", "warn"));

    if std::env::var_os("RUST_LOG").is_none() {
        builder
            .filter_level(LevelFilter::Warn)
            .filter_module("link_validate", level_for(verbose, quiet));
    }

    builder
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .target(env_logger::Target::Stderr);

    // A second init (tests) keeps the first logger
    let _ = builder.try_init();
}
