//! Read-only selectors over [`BroadcastState`].
//!
//! Flags only mean something once the adapter is ready, so every selector
//! that reads flags treats a not-ready state as having none. Flag names are
//! normalized before lookup; `"dark-mode"` and `"darkMode"` select the same
//! flag.

use super::channel::BroadcastState;
use crate::normalizer::camel_case_name;
use crate::types::{AdapterStatus, FlagSet, FlagValue};

pub fn select_status(state: &BroadcastState) -> AdapterStatus {
    state.status
}

pub fn select_flags(state: &BroadcastState) -> FlagSet {
    if state.status.is_ready {
        state.flags.clone()
    } else {
        FlagSet::new()
    }
}

/// Selector for a single flag's value.
pub fn select_flag(
    name: &str,
) -> impl Fn(&BroadcastState) -> Option<FlagValue> + Send + Sync + 'static {
    let name = camel_case_name(name);
    move |state| {
        if state.status.is_ready {
            state.flags.get(&name).cloned()
        } else {
            None
        }
    }
}

/// Selector that is `true` when the flag's value equals `variation`.
pub fn is_variation_active(
    name: &str,
    variation: impl Into<FlagValue>,
) -> impl Fn(&BroadcastState) -> bool + Send + Sync + 'static {
    let select = select_flag(name);
    let variation = variation.into();
    move |state| select(state).as_ref() == Some(&variation)
}

/// Selector that is `true` when the flag is switched on.
pub fn is_feature_enabled(name: &str) -> impl Fn(&BroadcastState) -> bool + Send + Sync + 'static {
    is_variation_active(name, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_state() -> BroadcastState {
        BroadcastState {
            status: AdapterStatus::ready(),
            flags: FlagSet::new().with("darkMode", true).with("theme", "dusk"),
        }
    }

    #[test]
    fn test_not_ready_hides_flags() {
        let state = BroadcastState {
            status: AdapterStatus::default(),
            flags: FlagSet::new().with("darkMode", true),
        };

        assert!(select_flags(&state).is_empty());
        assert_eq!(select_flag("darkMode")(&state), None);
        assert!(!is_feature_enabled("dark-mode")(&state));
    }

    #[test]
    fn test_raw_name_lookup() {
        let state = ready_state();
        assert_eq!(select_flag("dark-mode")(&state), Some(FlagValue::Bool(true)));
        assert!(is_feature_enabled("dark mode")(&state));
    }

    #[test]
    fn test_variation() {
        let state = ready_state();
        assert!(is_variation_active("theme", "dusk")(&state));
        assert!(!is_variation_active("theme", "dawn")(&state));
        assert!(!is_feature_enabled("theme")(&state));
    }
}
