mod binding;
mod channel;
pub mod selectors;

pub use binding::SubscriberBinding;
pub use channel::{BroadcastChannel, BroadcastState, SubscriptionToken};
pub use selectors::{
    is_feature_enabled, is_variation_active, select_flag, select_flags, select_status,
};
