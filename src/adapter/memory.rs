//! In-process evaluation service.
//!
//! `MemoryService` implements the whole service capability against flags
//! held in memory. Hosts use it to run without a remote service (demos,
//! offline mode, local development); tests use it to script the service's
//! side of the conversation: readiness, updates, failures and slow
//! evaluations.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::service::{
    ConnectionSettings, EvaluationService, ServiceClient, ServiceConnector, ServiceEvent,
    ServiceEventCallback, ServiceEventKind, ServiceManager,
};
use crate::error::{ErrorCode, FlagcastError, Result};
use crate::types::{RawFlags, User};

/// One recorded `get_treatments` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentRequest {
    pub names: Vec<String>,
    pub user: User,
}

#[derive(Default)]
struct MemoryInner {
    treatments: RwLock<BTreeMap<String, serde_json::Value>>,
    user_treatments: RwLock<HashMap<String, BTreeMap<String, serde_json::Value>>>,
    listeners: Mutex<Vec<(ServiceEventKind, ServiceEventCallback)>>,
    ready: AtomicBool,
    refusal: Mutex<Option<String>>,
    evaluation_failure: Mutex<Option<String>>,
    holds: Mutex<HashMap<String, Arc<Semaphore>>>,
    connections: Mutex<Vec<ConnectionSettings>>,
    clients: Mutex<Vec<User>>,
    treatment_requests: Mutex<Vec<TreatmentRequest>>,
    names_calls: AtomicUsize,
}

impl MemoryInner {
    fn emit(&self, event: ServiceEvent) {
        let kind = event.kind();
        let callbacks: Vec<ServiceEventCallback> = self
            .listeners
            .lock()
            .iter()
            .filter(|(listener_kind, _)| *listener_kind == kind)
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(event.clone());
        }
    }

    fn check_failure(&self) -> Result<()> {
        match self.evaluation_failure.lock().clone() {
            Some(reason) => Err(FlagcastError::service_unavailable(reason)),
            None => Ok(()),
        }
    }
}

/// In-memory [`ServiceConnector`] and [`EvaluationService`].
///
/// Clones share the same flags and recorded calls.
#[derive(Clone)]
pub struct MemoryService {
    inner: Arc<MemoryInner>,
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryService {
    /// A service that is ready as soon as a client registers for the ready
    /// signal.
    pub fn new() -> Self {
        let service = Self::pending();
        service.inner.ready.store(true, Ordering::SeqCst);
        service
    }

    /// A service that stays unready until [`signal_ready`](Self::signal_ready)
    /// or [`signal_init_failure`](Self::signal_init_failure) is called.
    pub fn pending() -> Self {
        Self {
            inner: Arc::new(MemoryInner::default()),
        }
    }

    pub fn with_treatments<I, K, V>(treatments: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        let service = Self::new();
        {
            let mut current = service.inner.treatments.write();
            for (name, value) in treatments {
                current.insert(name.into(), value.into());
            }
        }
        service
    }

    /// Sets the treatment every user gets for `name` and signals an update.
    pub fn set_treatment(&self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.inner
            .treatments
            .write()
            .insert(name.into(), value.into());
        self.signal_update();
    }

    pub fn remove_treatment(&self, name: &str) {
        self.inner.treatments.write().remove(name);
        self.signal_update();
    }

    /// Overrides the treatment of `name` for one user key.
    pub fn set_user_treatment(
        &self,
        user_key: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) {
        self.inner
            .user_treatments
            .write()
            .entry(user_key.into())
            .or_default()
            .insert(name.into(), value.into());
        self.signal_update();
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Marks the service ready and fires the ready signal once.
    pub fn signal_ready(&self) {
        if !self.inner.ready.swap(true, Ordering::SeqCst) {
            self.inner.emit(ServiceEvent::Ready);
        }
    }

    pub fn signal_init_failure(&self, reason: impl Into<String>) {
        self.inner.emit(ServiceEvent::InitFailed {
            reason: reason.into(),
        });
    }

    /// Fires the update signal. Updates are only signalled once ready.
    pub fn signal_update(&self) {
        if self.is_ready() {
            self.inner.emit(ServiceEvent::Update);
        }
    }

    /// Makes every following `connect` fail with `reason`.
    pub fn refuse_connections(&self, reason: impl Into<String>) {
        *self.inner.refusal.lock() = Some(reason.into());
    }

    /// Makes `names` and `get_treatments` fail until cleared with `None`.
    pub fn fail_evaluations(&self, reason: Option<String>) {
        *self.inner.evaluation_failure.lock() = reason;
    }

    /// Blocks `get_treatments` for `user_key` until released.
    pub fn hold_evaluations(&self, user_key: impl Into<String>) {
        self.inner
            .holds
            .lock()
            .insert(user_key.into(), Arc::new(Semaphore::new(0)));
    }

    pub fn release_evaluations(&self, user_key: &str) {
        if let Some(hold) = self.inner.holds.lock().remove(user_key) {
            hold.close();
        }
    }

    pub fn connections(&self) -> Vec<ConnectionSettings> {
        self.inner.connections.lock().clone()
    }

    /// Users clients were created for.
    pub fn clients(&self) -> Vec<User> {
        self.inner.clients.lock().clone()
    }

    pub fn treatment_requests(&self) -> Vec<TreatmentRequest> {
        self.inner.treatment_requests.lock().clone()
    }

    pub fn names_calls(&self) -> usize {
        self.inner.names_calls.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self, kind: ServiceEventKind) -> usize {
        self.inner
            .listeners
            .lock()
            .iter()
            .filter(|(listener_kind, _)| *listener_kind == kind)
            .count()
    }

    /// Forgets recorded calls, keeping flags and listeners.
    pub fn clear_recorded(&self) {
        self.inner.treatment_requests.lock().clear();
        self.inner.names_calls.store(0, Ordering::SeqCst);
    }
}

impl ServiceConnector for MemoryService {
    fn connect(&self, settings: &ConnectionSettings) -> Result<Arc<dyn EvaluationService>> {
        if let Some(reason) = self.inner.refusal.lock().clone() {
            return Err(FlagcastError::new(ErrorCode::ServiceRejected, reason));
        }
        self.inner.connections.lock().push(settings.clone());
        Ok(Arc::new(self.clone()))
    }
}

impl EvaluationService for MemoryService {
    fn client(&self, user: &User) -> Arc<dyn ServiceClient> {
        self.inner.clients.lock().push(user.clone());
        Arc::new(MemoryClient {
            inner: Arc::clone(&self.inner),
        })
    }

    fn manager(&self) -> Arc<dyn ServiceManager> {
        Arc::new(MemoryManager {
            inner: Arc::clone(&self.inner),
        })
    }
}

struct MemoryClient {
    inner: Arc<MemoryInner>,
}

#[async_trait]
impl ServiceClient for MemoryClient {
    fn on(&self, kind: ServiceEventKind, callback: ServiceEventCallback) {
        self.inner
            .listeners
            .lock()
            .push((kind, Arc::clone(&callback)));

        if kind == ServiceEventKind::Ready && self.inner.ready.load(Ordering::SeqCst) {
            callback(ServiceEvent::Ready);
        }
    }

    async fn get_treatments(&self, names: &[String], user: &User) -> Result<RawFlags> {
        self.inner.treatment_requests.lock().push(TreatmentRequest {
            names: names.to_vec(),
            user: user.clone(),
        });

        let key = user.key_or_empty().to_string();
        let hold = self.inner.holds.lock().get(&key).cloned();
        if let Some(hold) = hold {
            // Closed on release; the error only signals that.
            let _ = hold.acquire().await;
        }
        self.inner.check_failure()?;

        let treatments = self.inner.treatments.read();
        let user_treatments = self.inner.user_treatments.read();
        let overrides = user_treatments.get(&key);

        Ok(names
            .iter()
            .map(|name| {
                let value = overrides
                    .and_then(|values| values.get(name))
                    .or_else(|| treatments.get(name))
                    .cloned()
                    .unwrap_or(serde_json::Value::Null);
                (name.clone(), value)
            })
            .collect())
    }
}

struct MemoryManager {
    inner: Arc<MemoryInner>,
}

#[async_trait]
impl ServiceManager for MemoryManager {
    async fn names(&self) -> Result<Vec<String>> {
        self.inner.names_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.check_failure()?;

        let mut names: Vec<String> = self.inner.treatments.read().keys().cloned().collect();
        for values in self.inner.user_treatments.read().values() {
            names.extend(values.keys().cloned());
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}
