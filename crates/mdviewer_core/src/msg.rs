use std::path::PathBuf;

use crate::{Content, FetchSeq};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The view was attached to the presentation surface.
    Mounted,
    /// The backing file changed on disk.
    ContentInvalidated,
    /// The cache resolved a fetch.
    ContentResolved { seq: FetchSeq, content: Content },
    /// The cache could not read the document; last good content is kept.
    FetchFailed { seq: FetchSeq, reason: String },
    /// The surface now shows the render requested for `seq`.
    Rendered { seq: FetchSeq },
    /// The renderer rejected the content requested for `seq`.
    RenderFailed { seq: FetchSeq, reason: String },
    /// The file watch ended for good; no more automatic refreshes.
    WatchLost { reason: String },
    /// User asked to show another document.
    OpenRequested { path: PathBuf },
    /// The engine switched to the requested document.
    DocumentOpened { path: PathBuf },
    /// The engine refused the requested document.
    OpenFailed { path: PathBuf, reason: String },
    /// User scrolled the rendered pane.
    Scrolled { offset: u32 },
    /// The view was closed.
    Unmounted,
}
