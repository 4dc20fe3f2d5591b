use std::path::{Path, PathBuf};

use crate::view_model::{AppViewModel, StatusLine};
use crate::{Content, FetchSeq};

/// Lifecycle of the presentation controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No content has been fetched yet.
    #[default]
    Loading,
    /// Content is displayed and current.
    Ready,
    /// A refetch is in flight; previous content stays visible.
    Refreshing,
    /// Subscription torn down. Terminal.
    Unmounted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingRender {
    pub(crate) seq: FetchSeq,
    pub(crate) content: Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    phase: Phase,
    mounted: bool,
    applied_seq: FetchSeq,
    displayed: Option<Content>,
    pending_render: Option<PendingRender>,
    scroll_offset: u32,
    document: Option<PathBuf>,
    status: Option<StatusLine>,
    watch_lost: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with a known document path, as given on the command line.
    pub fn with_document(path: impl Into<PathBuf>) -> Self {
        Self {
            document: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn displayed(&self) -> Option<&Content> {
        self.displayed.as_ref()
    }

    pub fn scroll_offset(&self) -> u32 {
        self.scroll_offset
    }

    pub fn document(&self) -> Option<&Path> {
        self.document.as_deref()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self.phase,
            document: self.document.clone(),
            has_content: self.displayed.is_some(),
            scroll_offset: self.scroll_offset,
            status: self.status.clone(),
            watch_lost: self.watch_lost.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether the view changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub(crate) fn mount(&mut self) {
        self.mounted = true;
        self.phase = Phase::Loading;
        self.mark_dirty();
    }

    pub(crate) fn unmount(&mut self) {
        self.phase = Phase::Unmounted;
        self.pending_render = None;
        self.mark_dirty();
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            self.phase = phase;
            self.mark_dirty();
        }
    }

    pub(crate) fn applied_seq(&self) -> FetchSeq {
        self.applied_seq
    }

    /// Accepts `seq` as the newest resolved fetch.
    pub(crate) fn accept_seq(&mut self, seq: FetchSeq) {
        self.applied_seq = seq;
    }

    pub(crate) fn is_displayed(&self, content: &Content) -> bool {
        self.displayed.as_deref() == Some(&**content)
    }

    pub(crate) fn begin_render(&mut self, seq: FetchSeq, content: Content) {
        self.pending_render = Some(PendingRender { seq, content });
    }

    pub(crate) fn cancel_render(&mut self) {
        self.pending_render = None;
    }

    pub(crate) fn take_pending_render(&mut self, seq: FetchSeq) -> Option<PendingRender> {
        match &self.pending_render {
            Some(pending) if pending.seq == seq => self.pending_render.take(),
            _ => None,
        }
    }

    pub(crate) fn show(&mut self, content: Content) {
        self.displayed = Some(content);
        self.scroll_offset = 0;
        self.mark_dirty();
    }

    pub(crate) fn set_scroll_offset(&mut self, offset: u32) {
        if self.scroll_offset != offset {
            self.scroll_offset = offset;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_status(&mut self, status: StatusLine) {
        self.status = Some(status);
        self.mark_dirty();
    }

    pub(crate) fn clear_status(&mut self) {
        if self.status.take().is_some() {
            self.mark_dirty();
        }
    }

    pub(crate) fn set_watch_lost(&mut self, reason: String) {
        self.watch_lost = Some(reason);
        self.mark_dirty();
    }

    pub(crate) fn switch_document(&mut self, path: PathBuf) {
        self.document = Some(path);
        self.watch_lost = None;
        self.status = None;
        self.mark_dirty();
    }
}
