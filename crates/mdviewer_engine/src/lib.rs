//! Viewer engine: file watching, change notification, content caching and
//! the session that drives the presentation state machine.
mod cache;
mod engine;
mod notifier;
mod reader;
mod render;
mod session;
mod types;
mod watcher;

pub use cache::{CacheError, CacheSnapshot, CachedContent, ContentCache, Invalidation};
pub use engine::{DocumentEngine, EngineConfig, EngineError, WatchStatus};
pub use notifier::{ChangeNotifier, Subscription};
pub use reader::{DocumentReader, FileReader, ReadError};
pub use render::{MarkdownRenderer, RenderError, RenderSettings, Renderer, SafeMarkup};
pub use session::{Surface, UserCommand, ViewSession};
pub use types::{ChangeSignal, FetchFailure, WatchEvent, WatcherId};
pub use watcher::{FileWatcher, WatchError, WatchSettings};

pub use mdviewer_core::{Content, FetchSeq};
