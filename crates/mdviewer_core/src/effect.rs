use std::path::PathBuf;

use crate::{Content, FetchSeq};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start receiving change signals.
    Subscribe,
    /// Request the first available content from the cache.
    LoadInitial,
    /// Mark cached content stale and schedule a refetch.
    Invalidate,
    /// Render and present this content, then report back with `Rendered` or `RenderFailed`.
    Render { seq: FetchSeq, content: Content },
    ScrollToTop,
    OpenDocument { path: PathBuf },
    /// Stop receiving change signals.
    Unsubscribe,
}
