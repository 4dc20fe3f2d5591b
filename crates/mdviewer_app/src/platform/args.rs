use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;

/// Markdown viewer that follows edits to the file as they are saved.
#[derive(Parser, Debug)]
#[command(name = "mdviewer", version, author, about)]
pub struct Args {
    /// Markdown file to show
    pub file: Option<PathBuf>,
    /// Write a log file to the config directory and to stderr
    #[arg(short, long)]
    pub log: bool,
    /// Log at debug level (takes precedence over --log)
    #[arg(short, long)]
    pub debug: bool,
    /// Write the rendered page to this HTML file instead of the terminal
    #[arg(long, value_name = "HTML")]
    pub output: Option<PathBuf>,
    /// Window in which a burst of file events collapses into one refresh
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub debounce_ms: u64,
}

impl Args {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Level for the log file, if one was asked for.
    pub fn file_log_level(&self) -> Option<LevelFilter> {
        if self.debug {
            Some(LevelFilter::Debug)
        } else if self.log {
            Some(LevelFilter::Info)
        } else {
            None
        }
    }
}
