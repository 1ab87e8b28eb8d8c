mod config;
pub mod emitter;
pub mod identity;

pub use config::{
    AdapterConfiguration, AdapterConfigurationBuilder, FlagsCallback, PartialConfiguration,
    StatusCallback, DEFAULT_READY_TIMEOUT,
};
pub use emitter::{AdapterEvent, EventListener, ListenerId, UpdateEmitter};
pub use identity::create_anonymous_user_key;
