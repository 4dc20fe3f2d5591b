use std::fmt;

use crate::FetchSeq;

/// Identifies one watcher instance. A new watcher gets a new id, so its
/// signal sequence starting over at 1 is never mistaken for a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(pub u64);

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Zero-payload "content invalidated" signal.
///
/// `seq` increases monotonically per watcher and is only used to drop
/// duplicates, never to order changes across watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSignal {
    pub watcher: WatcherId,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed(ChangeSignal),
    /// The watched path is gone. Terminal: no event follows.
    Lost { reason: String },
}

/// A fetch attempt that failed. The cache keeps its previous content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub seq: FetchSeq,
    pub message: String,
}
