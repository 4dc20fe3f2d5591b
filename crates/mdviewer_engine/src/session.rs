//! UI-context driver for the presentation state machine.
//!
//! A [`ViewSession`] owns the [`AppState`] and is the only place that calls
//! [`update`]. Change signals, cache results, watch status and user commands
//! are turned into [`Msg`]s; the resulting [`Effect`]s are executed against
//! the engine and the [`Surface`].

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use mdviewer_core::{update, AppState, AppViewModel, Effect, FetchSeq, Msg, Phase};
use mdviewer_logging::{viewer_debug, viewer_info, viewer_trace, viewer_warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{
    CacheError, CacheSnapshot, CachedContent, ChangeSignal, DocumentEngine, Invalidation,
    Renderer, SafeMarkup, Subscription, WatchStatus,
};

/// Where rendered documents and status end up.
pub trait Surface {
    /// Replaces the displayed document.
    fn present(&mut self, markup: &SafeMarkup);
    fn scroll_to_top(&mut self);
    /// Called whenever the state changed in a way the status line can show.
    fn show_status(&mut self, view: &AppViewModel);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Open(PathBuf),
    Scroll(u32),
    Close,
}

enum Wake {
    Signal(Option<ChangeSignal>),
    Initial(Option<CachedContent>),
    Snapshot(bool),
    Status(bool),
    Command(Option<UserCommand>),
}

pub struct ViewSession<S, R> {
    engine: Arc<DocumentEngine>,
    renderer: R,
    surface: S,
    state: AppState,
    subscription: Option<Subscription>,
    initial: Option<JoinHandle<Result<CachedContent, CacheError>>>,
    seen_failure: FetchSeq,
}

impl<S: Surface, R: Renderer> ViewSession<S, R> {
    pub fn new(engine: Arc<DocumentEngine>, renderer: R, surface: S) -> Self {
        let state = match engine.document() {
            Some(path) => AppState::with_document(path),
            None => AppState::new(),
        };
        Self {
            engine,
            renderer,
            surface,
            state,
            subscription: None,
            initial: None,
            seen_failure: 0,
        }
    }

    /// Runs until the session is unmounted and hands back the surface.
    ///
    /// Must be polled on the UI context; it never blocks on I/O itself.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<UserCommand>) -> S {
        let mut snapshots = self.engine.cache().subscribe();
        let mut watch_status = self.engine.watch_status();
        let mut inbox = VecDeque::from([Msg::Mounted]);
        let mut snapshots_open = true;
        let mut status_open = true;
        let mut commands_open = true;

        loop {
            while let Some(msg) = inbox.pop_front() {
                self.dispatch(msg, &mut inbox);
            }
            if self.state.phase() == Phase::Unmounted {
                break;
            }

            let wake = tokio::select! {
                signal = next_signal(&mut self.subscription) => Wake::Signal(signal),
                loaded = join_initial(&mut self.initial) => Wake::Initial(loaded),
                changed = snapshots.changed(), if snapshots_open => Wake::Snapshot(changed.is_ok()),
                changed = watch_status.changed(), if status_open => Wake::Status(changed.is_ok()),
                command = commands.recv(), if commands_open => Wake::Command(command),
            };

            match wake {
                Wake::Signal(Some(signal)) => {
                    viewer_trace!("change signal #{} from {}", signal.seq, signal.watcher);
                    inbox.push_back(Msg::ContentInvalidated);
                }
                Wake::Signal(None) => {
                    viewer_debug!("change notifier closed");
                    self.subscription = None;
                }
                Wake::Initial(Some(cached)) => inbox.push_back(Msg::ContentResolved {
                    seq: cached.seq,
                    content: cached.content,
                }),
                Wake::Initial(None) => {}
                Wake::Snapshot(true) => {
                    let snapshot = snapshots.borrow_and_update().clone();
                    self.on_snapshot(snapshot, &mut inbox);
                }
                Wake::Snapshot(false) => snapshots_open = false,
                Wake::Status(true) => {
                    if let Some(msg) = watch_lost(&mut watch_status) {
                        inbox.push_back(msg);
                    }
                }
                Wake::Status(false) => status_open = false,
                Wake::Command(Some(command)) => inbox.push_back(command_msg(command)),
                Wake::Command(None) => {
                    commands_open = false;
                    inbox.push_back(Msg::Unmounted);
                }
            }
        }

        viewer_info!("view session closed");
        self.surface
    }

    fn dispatch(&mut self, msg: Msg, inbox: &mut VecDeque<Msg>) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let view = state.view();
        let was_dirty = state.consume_dirty();
        self.state = state;

        for effect in effects {
            self.run_effect(effect, inbox);
        }
        if was_dirty {
            self.surface.show_status(&view);
        }
    }

    fn run_effect(&mut self, effect: Effect, inbox: &mut VecDeque<Msg>) {
        match effect {
            Effect::Subscribe => {
                if self.subscription.is_none() {
                    self.subscription = Some(self.engine.subscribe());
                }
            }
            Effect::LoadInitial => {
                let cache = self.engine.cache().clone();
                self.initial = Some(tokio::spawn(async move { cache.get().await }));
            }
            Effect::Invalidate => match self.engine.cache().invalidate() {
                Invalidation::Issued(seq) => viewer_debug!("refresh fetch #{} issued", seq),
                Invalidation::Coalesced => viewer_trace!("refresh coalesced"),
            },
            // Confirmations go to the front so they apply before anything
            // that was queued while rendering.
            Effect::Render { seq, content } => match self.renderer.render(&content) {
                Ok(markup) => {
                    self.surface.present(&markup);
                    inbox.push_front(Msg::Rendered { seq });
                }
                Err(err) => {
                    viewer_warn!("render of fetch #{} failed: {}", seq, err);
                    inbox.push_front(Msg::RenderFailed {
                        seq,
                        reason: err.to_string(),
                    });
                }
            },
            Effect::ScrollToTop => self.surface.scroll_to_top(),
            Effect::OpenDocument { path } => match self.engine.open(&path) {
                Ok(()) => inbox.push_front(Msg::DocumentOpened { path }),
                Err(err) => {
                    viewer_warn!("cannot open {:?}: {}", path, err);
                    inbox.push_front(Msg::OpenFailed {
                        path,
                        reason: err.to_string(),
                    });
                }
            },
            Effect::Unsubscribe => {
                if let Some(subscription) = self.subscription.take() {
                    subscription.unsubscribe();
                }
            }
        }
    }

    fn on_snapshot(&mut self, snapshot: CacheSnapshot, inbox: &mut VecDeque<Msg>) {
        // Already applied sequences are dropped by the state machine.
        if let Some(current) = snapshot.current {
            inbox.push_back(Msg::ContentResolved {
                seq: current.seq,
                content: current.content,
            });
        }
        if let Some(failure) = snapshot.last_failure {
            if failure.seq > self.seen_failure {
                self.seen_failure = failure.seq;
                inbox.push_back(Msg::FetchFailed {
                    seq: failure.seq,
                    reason: failure.message,
                });
            }
        }
    }
}

fn command_msg(command: UserCommand) -> Msg {
    match command {
        UserCommand::Open(path) => Msg::OpenRequested { path },
        UserCommand::Scroll(offset) => Msg::Scrolled { offset },
        UserCommand::Close => Msg::Unmounted,
    }
}

fn watch_lost(status: &mut watch::Receiver<WatchStatus>) -> Option<Msg> {
    match &*status.borrow_and_update() {
        WatchStatus::Lost { reason, .. } => Some(Msg::WatchLost {
            reason: reason.clone(),
        }),
        _ => None,
    }
}

async fn next_signal(subscription: &mut Option<Subscription>) -> Option<ChangeSignal> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

async fn join_initial(
    initial: &mut Option<JoinHandle<Result<CachedContent, CacheError>>>,
) -> Option<CachedContent> {
    let Some(handle) = initial.as_mut() else {
        return std::future::pending().await;
    };
    let joined = handle.await;
    *initial = None;
    match joined {
        Ok(Ok(cached)) => Some(cached),
        Ok(Err(err)) => {
            viewer_warn!("initial load failed: {}", err);
            None
        }
        Err(err) => {
            viewer_warn!("initial load task failed: {}", err);
            None
        }
    }
}
