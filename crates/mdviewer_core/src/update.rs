use crate::view_model::StatusLine;
use crate::{AppState, Effect, Msg, Phase};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    // Unmounted is terminal: late fetch results and signals have no effect.
    if state.phase() == Phase::Unmounted {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Mounted => {
            if state.is_mounted() {
                Vec::new()
            } else {
                state.mount();
                vec![Effect::Subscribe, Effect::LoadInitial]
            }
        }
        Msg::ContentInvalidated => {
            // The cache coalesces repeated invalidations, so always forward.
            if state.phase() == Phase::Ready {
                state.set_phase(Phase::Refreshing);
            }
            vec![Effect::Invalidate]
        }
        Msg::ContentResolved { seq, content } => {
            // Highest resolved sequence wins; older results are dropped.
            if seq <= state.applied_seq() {
                return (state, Vec::new());
            }
            state.accept_seq(seq);

            if state.is_displayed(&content) {
                // Same bytes as on screen: keep the view and its scroll position.
                state.cancel_render();
                state.clear_status();
                state.set_phase(Phase::Ready);
                Vec::new()
            } else {
                state.begin_render(seq, content.clone());
                vec![Effect::Render { seq, content }]
            }
        }
        Msg::Rendered { seq } => match state.take_pending_render(seq) {
            Some(pending) => {
                state.show(pending.content);
                state.clear_status();
                state.set_phase(Phase::Ready);
                vec![Effect::ScrollToTop]
            }
            None => Vec::new(),
        },
        Msg::RenderFailed { seq, reason } => match state.take_pending_render(seq) {
            Some(_) => {
                state.set_status(StatusLine::RenderFailed { reason });
                state.set_phase(Phase::Ready);
                Vec::new()
            }
            None => Vec::new(),
        },
        Msg::FetchFailed { seq, reason } => {
            if seq <= state.applied_seq() {
                return (state, Vec::new());
            }
            state.set_status(StatusLine::UpdateFailed { reason });
            if state.phase() == Phase::Refreshing {
                state.set_phase(Phase::Ready);
            }
            Vec::new()
        }
        Msg::WatchLost { reason } => {
            state.set_watch_lost(reason);
            Vec::new()
        }
        Msg::OpenRequested { path } => vec![Effect::OpenDocument { path }],
        Msg::DocumentOpened { path } => {
            state.switch_document(path);
            if state.phase() == Phase::Ready {
                state.set_phase(Phase::Refreshing);
            }
            Vec::new()
        }
        Msg::OpenFailed { path, reason } => {
            state.set_status(StatusLine::OpenFailed { path, reason });
            Vec::new()
        }
        Msg::Scrolled { offset } => {
            state.set_scroll_offset(offset);
            Vec::new()
        }
        Msg::Unmounted => {
            state.unmount();
            vec![Effect::Unsubscribe]
        }
    };

    (state, effects)
}
