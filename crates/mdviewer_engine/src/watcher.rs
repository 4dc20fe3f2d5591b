//! Single-file watcher with burst debouncing.
//!
//! The OS watch is registered on the file's parent directory (non-recursive)
//! and events are filtered by path, so editors that save by writing a temp
//! file and renaming it over the target keep being observed. A background
//! thread collapses each burst of raw events into at most one
//! [`WatchEvent::Changed`] per debounce window.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::mpsc as std_mpsc;
use std::task::{Context, Poll};
use std::thread;
use std::time::{Duration, Instant};

use futures_util::Stream;
use mdviewer_logging::{viewer_debug, viewer_trace, viewer_warn};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{ChangeSignal, WatchEvent, WatcherId};

#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Bursts of raw events inside this window produce one change signal.
    pub debounce: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watched path not found: {}", .0.display())]
    PathNotFound(PathBuf),
    #[error("watched path has no parent directory: {}", .0.display())]
    NoParent(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("file watch backend failed: {0}")]
    Backend(#[from] notify::Error),
}

enum RawEvent {
    Touched,
    Failed(String),
}

/// Lazy, unbounded, non-restartable sequence of changes to one file.
///
/// Ends after [`WatchEvent::Lost`]. Dropping the watcher unregisters the OS
/// watch and stops the debounce thread.
pub struct FileWatcher {
    id: WatcherId,
    path: PathBuf,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    _backend: RecommendedWatcher,
}

impl FileWatcher {
    pub fn watch(
        id: WatcherId,
        path: impl AsRef<Path>,
        settings: WatchSettings,
    ) -> Result<Self, WatchError> {
        let path = path.as_ref();
        let target = match path.canonicalize() {
            Ok(target) => target,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(WatchError::PathNotFound(path.to_path_buf()))
            }
            Err(err) => return Err(WatchError::Io(err)),
        };
        let parent = target
            .parent()
            .ok_or_else(|| WatchError::NoParent(target.clone()))?
            .to_path_buf();

        let (raw_tx, raw_rx) = std_mpsc::channel();
        let filter_target = target.clone();
        let filter_parent = parent.clone();
        let mut backend = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let raw = match res {
                    Ok(event) => {
                        if !is_relevant(&event, &filter_target, &filter_parent) {
                            return;
                        }
                        viewer_trace!("watch event: {:?}", event);
                        RawEvent::Touched
                    }
                    Err(err) => RawEvent::Failed(err.to_string()),
                };
                let _ = raw_tx.send(raw);
            },
            notify::Config::default(),
        )?;
        backend.watch(&parent, RecursiveMode::NonRecursive)?;
        viewer_debug!("{}: watching {:?}", id, target);

        let (event_tx, events) = mpsc::unbounded_channel();
        let thread_target = target.clone();
        thread::Builder::new()
            .name("mdviewer-watch".to_string())
            .spawn(move || debounce_loop(id, thread_target, settings.debounce, raw_rx, event_tx))?;

        Ok(Self {
            id,
            path: target,
            events,
            _backend: backend,
        })
    }

    pub fn id(&self) -> WatcherId {
        self.id
    }

    /// Canonical path of the watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }
}

impl Stream for FileWatcher {
    type Item = WatchEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

fn is_relevant(event: &Event, target: &Path, parent: &Path) -> bool {
    // The backend dropped events; anything may have changed.
    if event.need_rescan() {
        return true;
    }
    // The directory itself went away or moved; the existence check decides.
    if matches!(
        event.kind,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    ) && event.paths.iter().any(|p| p == parent)
    {
        return true;
    }
    if !event.paths.iter().any(|p| p == target) {
        return false;
    }
    matches!(
        event.kind,
        EventKind::Any
            | EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(
                ModifyKind::Any | ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Other
            )
    )
}

fn debounce_loop(
    id: WatcherId,
    target: PathBuf,
    window: Duration,
    raw_rx: std_mpsc::Receiver<RawEvent>,
    events: mpsc::UnboundedSender<WatchEvent>,
) {
    let mut seq = 0u64;

    // Ends when the backend (and with it the sender) is dropped.
    while let Ok(first) = raw_rx.recv() {
        let mut failure = match first {
            RawEvent::Touched => None,
            RawEvent::Failed(message) => Some(message),
        };

        // The window is fixed from the first event, so a continuous stream of
        // writes still yields one signal per window.
        let deadline = Instant::now() + window;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match raw_rx.recv_timeout(remaining) {
                Ok(RawEvent::Touched) => {}
                Ok(RawEvent::Failed(message)) => failure = Some(message),
                Err(std_mpsc::RecvTimeoutError::Timeout) => break,
                Err(std_mpsc::RecvTimeoutError::Disconnected) => return,
            }
        }

        if let Some(message) = &failure {
            viewer_warn!("{}: watch backend error for {:?}: {}", id, target, message);
        }

        if !target.exists() {
            let reason = failure.unwrap_or_else(|| format!("{} was removed", target.display()));
            viewer_warn!("{}: watch lost: {}", id, reason);
            let _ = events.send(WatchEvent::Lost { reason });
            return;
        }

        seq += 1;
        viewer_debug!("{}: change #{} for {:?}", id, seq, target);
        let signal = ChangeSignal { watcher: id, seq };
        if events.send(WatchEvent::Changed(signal)).is_err() {
            return;
        }
    }
}
