//! flagcast
//!
//! Feature flag adapter and subscription broadcast for Rust hosts.
//!
//! An [`Adapter`] owns the connection to a flag evaluation service: it
//! configures a session, keeps a normalized [`FlagSet`] for the current
//! user, and reacts to service updates and user changes. A
//! [`BroadcastChannel`] distributes the adapter's status and flags to any
//! number of consumers, each of which watches only its own slice through a
//! [`SubscriberBinding`].
//!
//! # Quick Start
//!
//! ```no_run
//! use flagcast::{
//!     is_feature_enabled, Adapter, AdapterConfiguration, BroadcastChannel, MemoryService,
//!     SubscriberBinding, User,
//! };
//!
//! #[tokio::main]
//! async fn main() -> flagcast::Result<()> {
//!     // Any ServiceConnector works here; MemoryService runs in-process.
//!     let service = MemoryService::with_treatments([("dark-mode", "on")]);
//!     let adapter = Adapter::new(service.clone());
//!
//!     // One channel for the whole consumer tree
//!     let channel = BroadcastChannel::new();
//!     adapter.attach_channel(&channel);
//!
//!     let dark_mode = SubscriberBinding::attach(&channel, is_feature_enabled("dark-mode"), |on| {
//!         println!("dark mode is now {}", on);
//!     });
//!
//!     adapter
//!         .configure(AdapterConfiguration::new("sdk-key", User::new()))
//!         .await?;
//!     assert!(dark_mode.current());
//!
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod adapter;
pub mod broadcast;
pub mod core;
pub mod error;
pub mod normalizer;
pub mod types;

// Re-exports from types module
pub use types::{AdapterStatus, FlagSet, FlagValue, RawFlags, User};

// Re-exports from error module
pub use error::{ErrorCode, FlagcastError, Result};

// Re-exports from core module
pub use crate::core::{
    create_anonymous_user_key, AdapterConfiguration, AdapterConfigurationBuilder, AdapterEvent,
    EventListener, FlagsCallback, ListenerId, PartialConfiguration, StatusCallback,
    UpdateEmitter, DEFAULT_READY_TIMEOUT,
};

// Re-exports from adapter module
pub use adapter::{
    Adapter, AdapterPhase, ConnectionSettings, EvaluationService, MemoryService, ServiceClient,
    ServiceConnector, ServiceEvent, ServiceEventCallback, ServiceEventKind, ServiceManager,
    TreatmentRequest,
};

// Re-exports from broadcast module
pub use broadcast::{
    is_feature_enabled, is_variation_active, select_flag, select_flags, select_status,
    BroadcastChannel, BroadcastState, SubscriberBinding, SubscriptionToken,
};

// Re-exports from normalizer module
pub use normalizer::{
    camel_case_flags, camel_case_name, normalize_flag, normalize_flags, normalize_value,
};

/// Crate version, for hosts that report which adapter they run.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
