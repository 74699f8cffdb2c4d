//! Command-line front end for `folio-core`.

pub mod cli_args;

use std::path::{Path, PathBuf};

use anyhow::Context;
use folio_core::{
    LoggingDestination, RunSummary, apply_runtime_overrides, init_logging, load_config,
};
use tracing::{info, warn};

use cli_args::Cli;

/// Loads `.env` from the working directory or its ancestors. Variables
/// already set in the process win.
pub fn load_env_file() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Loads a specific env file, returning its path when it was read.
pub fn load_env_file_from(path: &Path) -> Option<PathBuf> {
    dotenvy::from_path(path).ok().map(|()| path.to_path_buf())
}

/// `.env`, then the config file, `FOLIO_*` variables and flags; then one full run.
pub fn run(cli: Cli) -> anyhow::Result<RunSummary> {
    let env_file = load_env_file();
    let destination = if cli.quiet {
        LoggingDestination::FileOnly
    } else {
        LoggingDestination::FileAndStderr
    };
    if let Err(err) = init_logging(destination) {
        eprintln!("Warning: logging unavailable: {err}");
    }
    if let Some(path) = &env_file {
        info!("Loaded environment from {}", path.display());
    }

    let load = load_config(cli.config.as_deref());
    let mut warnings = load.warnings;
    let mut config = load.config;

    config
        .tunables
        .apply_env()
        .context("invalid FOLIO_* environment override")?;
    apply_runtime_overrides(&mut config, &cli.to_runtime_overrides(), &mut warnings);

    for warning in &warnings {
        warn!("{warning}");
        if cli.quiet {
            eprintln!("Warning: {warning}");
        }
    }

    let summary = folio_core::run(&config, cli.token.as_deref())
        .context("catalog refresh failed")?;
    Ok(summary)
}
