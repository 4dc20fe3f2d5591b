use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use mdviewer_logging::{viewer_debug, viewer_info, viewer_trace, viewer_warn};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::reader::{FileReader, ReadError};
use crate::watcher::{FileWatcher, WatchError, WatchSettings};
use crate::{ChangeNotifier, ContentCache, Subscription, WatchEvent, WatcherId};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Watch(#[from] WatchError),
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Document to show at start. Without one the document is empty.
    pub document: Option<PathBuf>,
    pub watch: WatchSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchStatus {
    Inactive,
    Watching { watcher: WatcherId, path: PathBuf },
    /// The watch ended and will not be re-registered until another document is opened.
    Lost { watcher: WatcherId, reason: String },
}

/// Owns the reader, cache, notifier and the active file watch for the
/// current document.
///
/// Background work (watch pump, fetches) runs on the runtime passed to
/// [`DocumentEngine::start`].
pub struct DocumentEngine {
    runtime: Handle,
    watch_settings: WatchSettings,
    reader: Arc<FileReader>,
    cache: ContentCache,
    notifier: ChangeNotifier,
    status: Arc<watch::Sender<WatchStatus>>,
    pump: Mutex<Option<CancellationToken>>,
    next_watcher: AtomicU64,
}

impl DocumentEngine {
    pub fn start(config: EngineConfig, runtime: Handle) -> Result<Self, EngineError> {
        let reader = Arc::new(FileReader::default());
        if let Some(path) = &config.document {
            reader.set_path(path)?;
        }
        let cache = ContentCache::new(reader.clone(), runtime.clone());
        let (status, _) = watch::channel(WatchStatus::Inactive);

        let engine = Self {
            runtime,
            watch_settings: config.watch,
            reader,
            cache,
            notifier: ChangeNotifier::new(),
            status: Arc::new(status),
            pump: Mutex::new(None),
            next_watcher: AtomicU64::new(0),
        };
        if let Some(path) = &config.document {
            let watcher = engine.new_watcher(path)?;
            engine.install_watch(watcher);
        }
        Ok(engine)
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }

    pub fn watch_status(&self) -> watch::Receiver<WatchStatus> {
        self.status.subscribe()
    }

    pub fn document(&self) -> Option<PathBuf> {
        self.reader.path()
    }

    /// Switches to another document: new watch, new reader path, fresh fetch.
    ///
    /// On error the current document stays in place.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let path = path.as_ref();
        let watcher = self.new_watcher(path)?;
        self.switch_to(path, watcher)?;
        let seq = self.cache.reload();
        viewer_info!("opened {:?} (fetch #{})", path, seq);
        Ok(())
    }

    /// Stops the watch and closes the notifier. Idempotent.
    pub fn shutdown(&self) {
        if let Some(token) = self.pump_slot().take() {
            token.cancel();
        }
        self.notifier.close();
        self.status.send_replace(WatchStatus::Inactive);
    }

    fn pump_slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.pump.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn new_watcher(&self, path: &Path) -> Result<FileWatcher, EngineError> {
        let id = WatcherId(self.next_watcher.fetch_add(1, Ordering::Relaxed) + 1);
        Ok(FileWatcher::watch(id, path, self.watch_settings.clone())?)
    }

    /// Points the reader at `path`, then hands `watcher` to a new pump.
    ///
    /// Nothing is replaced unless the reader accepts the path.
    fn switch_to(&self, path: &Path, watcher: FileWatcher) -> Result<(), EngineError> {
        self.reader.set_path(path)?;
        self.install_watch(watcher);
        Ok(())
    }

    fn install_watch(&self, watcher: FileWatcher) {
        let token = CancellationToken::new();
        if let Some(previous) = self.pump_slot().replace(token.clone()) {
            previous.cancel();
        }
        self.status.send_replace(WatchStatus::Watching {
            watcher: watcher.id(),
            path: watcher.path().to_path_buf(),
        });
        self.runtime.spawn(pump(
            watcher,
            self.notifier.clone(),
            self.status.clone(),
            token,
        ));
    }
}

impl Drop for DocumentEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn pump(
    mut watcher: FileWatcher,
    notifier: ChangeNotifier,
    status: Arc<watch::Sender<WatchStatus>>,
    cancel: CancellationToken,
) {
    let id = watcher.id();
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                viewer_debug!("{}: watch stopped", id);
                return;
            }
            event = watcher.next_event() => event,
        };

        match event {
            Some(WatchEvent::Changed(signal)) => {
                let delivered = notifier.notify(signal);
                viewer_trace!("{}: signal #{} delivered to {}", id, signal.seq, delivered);
            }
            Some(WatchEvent::Lost { reason }) => {
                viewer_warn!("{}: no more live updates: {}", id, reason);
                // A newer watch may already own the status.
                status.send_if_modified(|current| match current {
                    WatchStatus::Watching { watcher, .. } if *watcher == id => {
                        *current = WatchStatus::Lost {
                            watcher: id,
                            reason,
                        };
                        true
                    }
                    _ => false,
                });
                return;
            }
            None => return,
        }
    }
}
