//! Single-document content cache with coalesced refetches.
//!
//! Fetch rules:
//! - at most one fetch is issued per invalidation burst: invalidations that
//!   arrive while a fetch is in flight collapse into exactly one follow-up
//!   fetch, issued as soon as the in-flight fetch resolves;
//! - results are applied by sequence number, highest resolved wins;
//! - a failed read keeps the previous content and records the failure.
//!
//! Content and its sequence number are published together through a
//! `tokio::sync::watch` channel, so readers never see one without the other.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mdviewer_logging::{viewer_debug, viewer_trace, viewer_warn};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::reader::{DocumentReader, ReadError};
use crate::{Content, FetchFailure, FetchSeq};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("content cache was shut down")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedContent {
    pub seq: FetchSeq,
    pub content: Content,
}

/// Consistent view of the cache at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    /// Newest applied content. `None` until the first successful fetch.
    pub current: Option<CachedContent>,
    /// Most recent failed attempt newer than `current`.
    pub last_failure: Option<FetchFailure>,
}

impl CacheSnapshot {
    fn applied_seq(&self) -> FetchSeq {
        self.current.as_ref().map_or(0, |current| current.seq)
    }
}

/// Outcome of [`ContentCache::invalidate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// A new fetch was started.
    Issued(FetchSeq),
    /// A fetch is in flight; one follow-up fetch is scheduled after it.
    Coalesced,
}

#[derive(Debug, Default)]
struct FetchState {
    last_issued: FetchSeq,
    in_flight: usize,
    follow_up: bool,
}

struct Shared {
    reader: Arc<dyn DocumentReader>,
    runtime: Handle,
    fetch: Mutex<FetchState>,
    snapshot: watch::Sender<CacheSnapshot>,
}

impl Shared {
    fn fetch_state(&self) -> MutexGuard<'_, FetchState> {
        self.fetch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct ContentCache {
    shared: Arc<Shared>,
}

impl ContentCache {
    /// Fetches run as tasks on `runtime`.
    pub fn new(reader: Arc<dyn DocumentReader>, runtime: Handle) -> Self {
        let (snapshot, _) = watch::channel(CacheSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                reader,
                runtime,
                fetch: Mutex::new(FetchState::default()),
                snapshot,
            }),
        }
    }

    /// Returns the newest content, waiting for the first fetch if needed.
    pub async fn get(&self) -> Result<CachedContent, CacheError> {
        let mut rx = self.shared.snapshot.subscribe();
        {
            let mut state = self.shared.fetch_state();
            if state.last_issued == 0 {
                issue(&self.shared, &mut state);
            }
        }
        let snapshot = rx
            .wait_for(|snapshot| snapshot.current.is_some())
            .await
            .map_err(|_| CacheError::Closed)?;
        snapshot.current.clone().ok_or(CacheError::Closed)
    }

    /// Marks the content stale and schedules a refetch.
    pub fn invalidate(&self) -> Invalidation {
        let mut state = self.shared.fetch_state();
        if state.in_flight > 0 {
            state.follow_up = true;
            viewer_trace!("invalidation coalesced behind fetch #{}", state.last_issued);
            Invalidation::Coalesced
        } else {
            Invalidation::Issued(issue(&self.shared, &mut state))
        }
    }

    /// Starts a fetch now, without waiting for one in flight.
    ///
    /// Used when the document itself changes: the in-flight read targets the
    /// old document and will lose to this one.
    pub fn reload(&self) -> FetchSeq {
        let mut state = self.shared.fetch_state();
        state.follow_up = false;
        issue(&self.shared, &mut state)
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// Number of fetches started so far.
    pub fn fetches_issued(&self) -> u64 {
        self.shared.fetch_state().last_issued
    }
}

fn issue(shared: &Arc<Shared>, state: &mut FetchState) -> FetchSeq {
    state.last_issued += 1;
    state.in_flight += 1;
    let seq = state.last_issued;
    viewer_debug!("fetch #{} issued", seq);

    let task_shared = shared.clone();
    shared.runtime.spawn(async move {
        let result = task_shared.reader.read_document().await;
        resolve(&task_shared, seq, result);
    });
    seq
}

fn resolve(shared: &Arc<Shared>, seq: FetchSeq, result: Result<String, ReadError>) {
    let mut state = shared.fetch_state();
    state.in_flight = state.in_flight.saturating_sub(1);

    match result {
        Ok(text) => {
            let content = Content::from(text);
            shared.snapshot.send_if_modified(|snapshot| {
                if seq <= snapshot.applied_seq() {
                    viewer_debug!(
                        "fetch #{} resolved after #{}; discarded",
                        seq,
                        snapshot.applied_seq()
                    );
                    return false;
                }
                snapshot.current = Some(CachedContent { seq, content });
                if snapshot.last_failure.as_ref().is_some_and(|f| f.seq < seq) {
                    snapshot.last_failure = None;
                }
                true
            });
        }
        Err(err) => {
            viewer_warn!("fetch #{} failed: {}", seq, err);
            shared.snapshot.send_if_modified(|snapshot| {
                if seq <= snapshot.applied_seq() {
                    return false;
                }
                snapshot.last_failure = Some(FetchFailure {
                    seq,
                    message: err.to_string(),
                });
                true
            });
        }
    }

    if state.in_flight == 0 && state.follow_up {
        state.follow_up = false;
        issue(shared, &mut state);
    }
}
