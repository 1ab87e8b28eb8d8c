//! The capability the adapter needs from an evaluation service.
//!
//! Adapters never depend on a concrete service. A [`ServiceConnector`] opens
//! a session from an authorization key and a user key; the resulting
//! [`EvaluationService`] hands out a per-user [`ServiceClient`] for
//! evaluating treatments and a [`ServiceManager`] for listing flag names.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{RawFlags, User};

/// Signals a service client emits to registered callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// The client finished its initial synchronization. Emitted once.
    Ready,
    /// Flag definitions changed on the service side.
    Update,
    /// The client gave up initializing.
    InitFailed { reason: String },
}

impl ServiceEvent {
    pub fn kind(&self) -> ServiceEventKind {
        match self {
            ServiceEvent::Ready => ServiceEventKind::Ready,
            ServiceEvent::Update => ServiceEventKind::Update,
            ServiceEvent::InitFailed { .. } => ServiceEventKind::InitFailed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceEventKind {
    Ready,
    Update,
    InitFailed,
}

pub type ServiceEventCallback = Arc<dyn Fn(ServiceEvent) + Send + Sync>;

/// What a connector needs to open a session.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub authorization_key: String,
    pub key: String,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("authorization_key", &"[REDACTED]")
            .field("key", &self.key)
            .finish()
    }
}

pub trait ServiceConnector: Send + Sync {
    /// Opens a session with the evaluation service.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or refuses the
    /// credentials.
    fn connect(&self, settings: &ConnectionSettings) -> Result<Arc<dyn EvaluationService>>;
}

pub trait EvaluationService: Send + Sync {
    fn client(&self, user: &User) -> Arc<dyn ServiceClient>;
    fn manager(&self) -> Arc<dyn ServiceManager>;
}

#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Registers a callback for one kind of event.
    ///
    /// Clients deliver events in the order they occur and may invoke the
    /// callback before `on` returns.
    fn on(&self, kind: ServiceEventKind, callback: ServiceEventCallback);

    /// Evaluates the named flags for `user`.
    async fn get_treatments(&self, names: &[String], user: &User) -> Result<RawFlags>;
}

#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Names of every flag the service currently knows.
    async fn names(&self) -> Result<Vec<String>>;
}
