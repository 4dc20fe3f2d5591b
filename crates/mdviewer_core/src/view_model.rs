use std::fmt;
use std::path::PathBuf;

use crate::Phase;

/// Transient annotation shown next to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    UpdateFailed { reason: String },
    RenderFailed { reason: String },
    OpenFailed { path: PathBuf, reason: String },
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::UpdateFailed { reason } => write!(f, "update failed: {reason}"),
            StatusLine::RenderFailed { reason } => write!(f, "render failed: {reason}"),
            StatusLine::OpenFailed { path, reason } => {
                write!(f, "cannot open {}: {reason}", path.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: Phase,
    pub document: Option<PathBuf>,
    pub has_content: bool,
    pub scroll_offset: u32,
    pub status: Option<StatusLine>,
    /// Set once the file watch is gone; the document no longer refreshes.
    pub watch_lost: Option<String>,
    pub dirty: bool,
}

impl AppViewModel {
    /// One-line summary for status bars and logs.
    pub fn status_text(&self) -> String {
        let phase = match self.phase {
            Phase::Loading => "Loading...",
            Phase::Ready => "Ready",
            Phase::Refreshing => "Refreshing",
            Phase::Unmounted => "Closed",
        };
        let document = match &self.document {
            Some(path) => path.display().to_string(),
            None => "(no document)".to_string(),
        };

        let mut text = format!("{phase} | {document}");
        if let Some(reason) = &self.watch_lost {
            text.push_str(&format!(" | watch lost: {reason}"));
        }
        if let Some(status) = &self.status {
            text.push_str(&format!(" | {status}"));
        }
        text
    }
}
