//! Logger setup for the `mdviewer` binary.
//!
//! Without `--log`/`--debug` only warnings reach stderr. With either flag the
//! log also goes to `mdviewer.log` in the per-user config directory.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::LevelFilter;
use mdviewer_logging::LogDestination;

use super::args::Args;

const LOG_FILE_NAME: &str = "mdviewer.log";

pub fn initialize(args: &Args) -> Result<()> {
    let Some(level) = args.file_log_level() else {
        mdviewer_logging::initialize(LogDestination::Terminal, LevelFilter::Warn);
        return Ok(());
    };

    let path = config_dir()?.join(LOG_FILE_NAME);
    mdviewer_logging::initialize(LogDestination::Both(path), level);
    Ok(())
}

/// Per-user config directory, created on first use.
fn config_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("jp", "laki", "mdviewer")
        .context("no home directory to put the config directory in")?;
    let dir = dirs.config_dir().to_path_buf();
    fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create config directory {}", dir.display()))?;
    Ok(dir)
}
