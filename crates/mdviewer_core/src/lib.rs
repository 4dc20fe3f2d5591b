//! Viewer core: pure presentation state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

use std::sync::Arc;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{AppState, Phase};
pub use update::update;
pub use view_model::{AppViewModel, StatusLine};

/// Raw document source text. Replaced as a whole, never edited in place.
pub type Content = Arc<str>;

/// Sequence number of a content fetch. The first fetch is 1.
pub type FetchSeq = u64;
