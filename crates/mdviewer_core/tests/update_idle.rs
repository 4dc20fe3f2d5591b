use mdviewer_core::{update, AppState, Msg};

// Messages that carry nothing new must leave the state untouched and clean.
#[test]
fn stale_confirmations_change_nothing() {
    let state = AppState::new();

    for msg in [
        Msg::Rendered { seq: 3 },
        Msg::RenderFailed {
            seq: 3,
            reason: "late".to_string(),
        },
        Msg::Scrolled { offset: 0 },
    ] {
        let (mut next, effects) = update(state.clone(), msg.clone());
        assert_eq!(state, next, "{msg:?}");
        assert!(effects.is_empty(), "{msg:?}");
        assert!(!next.consume_dirty(), "{msg:?}");
    }
}
