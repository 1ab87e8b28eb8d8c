use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::service::{
    ConnectionSettings, ServiceClient, ServiceConnector, ServiceEvent, ServiceEventKind,
    ServiceManager,
};
use crate::broadcast::BroadcastChannel;
use crate::core::{
    AdapterConfiguration, AdapterEvent, ListenerId, PartialConfiguration, UpdateEmitter,
};
use crate::error::{ErrorCode, FlagcastError, Result};
use crate::normalizer::normalize_flags;
use crate::types::{AdapterStatus, FlagSet, User};

/// Lifecycle phases of an [`Adapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterPhase {
    Unconfigured,
    Configuring,
    Ready,
    Reconfiguring,
}

#[derive(Clone)]
struct ServiceSession {
    client: Arc<dyn ServiceClient>,
    manager: Arc<dyn ServiceManager>,
}

#[derive(Default)]
struct AdapterState {
    configuration: Option<Arc<AdapterConfiguration>>,
    session: Option<ServiceSession>,
    status: AdapterStatus,
    flags: FlagSet,
    // Every evaluation takes a ticket when it starts. A result is applied
    // only if its ticket is newer than `applied_ticket` and not older than
    // `superseded_ticket`, the ticket of the last configuration change.
    issued_ticket: u64,
    applied_ticket: u64,
    superseded_ticket: u64,
    reconfigures_in_flight: usize,
    update_pump: Option<JoinHandle<()>>,
}

impl AdapterState {
    fn issue_ticket(&mut self) -> u64 {
        self.issued_ticket += 1;
        self.issued_ticket
    }

    fn is_stale(&self, ticket: u64) -> bool {
        ticket <= self.applied_ticket || ticket < self.superseded_ticket
    }
}

struct AdapterInner {
    connector: Arc<dyn ServiceConnector>,
    state: Mutex<AdapterState>,
    phase: watch::Sender<AdapterPhase>,
    emitter: UpdateEmitter,
}

impl Drop for AdapterInner {
    fn drop(&mut self) {
        if let Some(pump) = self.state.get_mut().update_pump.take() {
            pump.abort();
        }
    }
}

/// Owns the connection lifecycle to an evaluation service.
///
/// The adapter moves from `Unconfigured` through `Configuring` to `Ready`
/// exactly once, and between `Ready` and `Reconfiguring` afterwards. Status
/// and flags are published to the configuration callbacks and to the
/// [`UpdateEmitter`] whenever an evaluation completes.
///
/// Handles are cheap to clone and share the same adapter.
///
/// # Example
///
/// ```no_run
/// use flagcast::{Adapter, AdapterConfiguration, MemoryService, PartialConfiguration, User};
///
/// # async fn run() -> flagcast::Result<()> {
/// let service = MemoryService::new();
/// service.set_treatment("dark-mode", "on");
///
/// let adapter = Adapter::new(service);
/// adapter
///     .configure(AdapterConfiguration::new("sdk-key", User::with_key("user-1")))
///     .await?;
/// assert_eq!(adapter.flags().get("darkMode"), Some(&true.into()));
///
/// adapter
///     .reconfigure(PartialConfiguration::with_user(User::with_key("user-2")))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Adapter {
    inner: Arc<AdapterInner>,
}

impl Adapter {
    pub fn new<C>(connector: C) -> Self
    where
        C: ServiceConnector + 'static,
    {
        Self::with_connector(Arc::new(connector))
    }

    pub fn with_connector(connector: Arc<dyn ServiceConnector>) -> Self {
        let (phase, _) = watch::channel(AdapterPhase::Unconfigured);
        Self {
            inner: Arc::new(AdapterInner {
                connector,
                state: Mutex::new(AdapterState::default()),
                phase,
                emitter: UpdateEmitter::new(),
            }),
        }
    }

    pub fn phase(&self) -> AdapterPhase {
        *self.inner.phase.borrow()
    }

    pub fn status(&self) -> AdapterStatus {
        self.inner.state.lock().status
    }

    pub fn is_ready(&self) -> bool {
        self.status().is_ready
    }

    /// Flags of the most recently applied evaluation. Empty until ready.
    pub fn flags(&self) -> FlagSet {
        self.inner.state.lock().flags.clone()
    }

    /// The authoritative configuration, if the adapter was configured.
    pub fn configuration(&self) -> Option<Arc<AdapterConfiguration>> {
        self.inner.state.lock().configuration.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.configuration().map(|configuration| configuration.user.clone())
    }

    pub fn emitter(&self) -> &UpdateEmitter {
        &self.inner.emitter
    }

    /// Connects to the evaluation service and waits until it is ready.
    ///
    /// # Errors
    ///
    /// Returns `ADAPTER_ALREADY_CONFIGURED` unless the adapter is
    /// unconfigured, a validation error for an invalid configuration, and a
    /// configuration error if the service cannot be reached, fails to
    /// initialize, or does not become ready in time. The adapter stays
    /// unconfigured on every error.
    ///
    /// Service clients have no way to remove callbacks, so every attempt
    /// leaves its ready, init-failed and update callbacks registered on the
    /// client it created. After a failed attempt they are inert: the ready
    /// signal they fed is gone and updates go to a closed queue.
    pub async fn configure(&self, configuration: AdapterConfiguration) -> Result<()> {
        configuration.validate()?;

        let claimed = self.inner.phase.send_if_modified(|phase| {
            if *phase == AdapterPhase::Unconfigured {
                *phase = AdapterPhase::Configuring;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(FlagcastError::already_configured());
        }
        tracing::debug!("Adapter configuring");

        let mut guard = ConfigureGuard {
            inner: &self.inner,
            armed: true,
        };
        self.establish(Arc::new(configuration.with_resolved_user()))
            .await?;
        guard.armed = false;

        Ok(())
    }

    async fn establish(&self, configuration: Arc<AdapterConfiguration>) -> Result<()> {
        let settings = ConnectionSettings {
            authorization_key: configuration.authorization_key.clone(),
            key: configuration.user.key_or_empty().to_string(),
        };
        let service = self.inner.connector.connect(&settings).map_err(|error| {
            FlagcastError::with_source(
                ErrorCode::ConfigurationFailed,
                "Failed to connect to evaluation service",
                error,
            )
        })?;
        let session = ServiceSession {
            client: service.client(&configuration.user),
            manager: service.manager(),
        };

        let ready = register_ready_signal(session.client.as_ref());
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        session.client.on(
            ServiceEventKind::Update,
            Arc::new(move |_: ServiceEvent| {
                let _ = update_tx.send(());
            }),
        );

        let signal = match configuration.ready_timeout {
            Some(limit) => tokio::time::timeout(limit, ready).await.map_err(|_| {
                FlagcastError::new(
                    ErrorCode::ConfigurationTimeout,
                    format!("Evaluation service not ready after {:?}", limit),
                )
            })?,
            None => ready.await,
        };
        match signal {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                return Err(FlagcastError::configuration_error(format!(
                    "Evaluation service failed to initialize: {}",
                    reason
                )));
            }
            Err(_) => {
                return Err(FlagcastError::configuration_error(
                    "Evaluation service closed before becoming ready",
                ));
            }
        }

        // Updates signalled before ready are covered by the evaluation below.
        while update_rx.try_recv().is_ok() {}

        let ticket = {
            let mut state = self.inner.state.lock();
            let ticket = state.issue_ticket();
            state.superseded_ticket = ticket;
            ticket
        };
        let flags = evaluate(&session, &configuration.user)
            .await
            .map_err(|error| {
                FlagcastError::with_source(
                    ErrorCode::ConfigurationFailed,
                    "Failed to evaluate flags while configuring",
                    error,
                )
            })?;

        let status = AdapterStatus::ready();
        {
            let mut state = self.inner.state.lock();
            state.configuration = Some(Arc::clone(&configuration));
            state.session = Some(session);
            state.status = status;
            state.flags = flags.clone();
            state.applied_ticket = ticket;
        }

        // Hosts are notified before the phase turns `Ready` and releases
        // deferred reconfigures and updates.
        self.inner.emitter.emit(&AdapterEvent::StatusChanged(status));
        configuration.notify_status(status);
        self.inner.emitter.emit(&AdapterEvent::FlagsChanged(flags.clone()));
        configuration.notify_flags(&flags);

        let pump = spawn_update_pump(Arc::downgrade(&self.inner), update_rx);
        self.inner.state.lock().update_pump = Some(pump);
        self.inner.phase.send_replace(AdapterPhase::Ready);
        tracing::info!(flags = flags.len(), "Adapter ready");

        Ok(())
    }

    /// Replaces the user and/or callbacks and re-evaluates every flag.
    ///
    /// A call made while `configure` is still waiting for the service is
    /// deferred until that configure completes. The configuration of the
    /// latest call is authoritative: a result evaluated for an older
    /// configuration is discarded, even when the latest call failed, and
    /// its call still resolves `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns `ADAPTER_NOT_CONFIGURED` if no configure succeeded, and an
    /// evaluation error if the service fails; the previous flags stay in
    /// effect in that case.
    pub async fn reconfigure(&self, partial: PartialConfiguration) -> Result<()> {
        self.inner.wait_until_configured().await?;

        let (configuration, session, ticket) = {
            let mut state = self.inner.state.lock();
            let (Some(current), Some(session)) =
                (state.configuration.clone(), state.session.clone())
            else {
                return Err(FlagcastError::not_configured());
            };
            let next = Arc::new(current.merge(partial));
            state.configuration = Some(Arc::clone(&next));
            state.reconfigures_in_flight += 1;
            let ticket = state.issue_ticket();
            state.superseded_ticket = ticket;
            (next, session, ticket)
        };
        let _in_flight = ReconfigureGuard::enter(&self.inner);
        tracing::debug!(
            ticket,
            user = configuration.user.key_or_empty(),
            "Adapter reconfiguring"
        );

        let flags = evaluate(&session, &configuration.user)
            .await
            .map_err(|error| {
                FlagcastError::with_source(
                    ErrorCode::EvaluationFailed,
                    "Failed to re-evaluate flags for reconfigured user",
                    error,
                )
            })?;
        self.inner.apply_flags(ticket, flags);

        Ok(())
    }

    /// Keeps `channel` in sync with this adapter.
    ///
    /// The channel is seeded with the current state right away, since the
    /// emitter does not replay past events.
    pub fn attach_channel(&self, channel: &BroadcastChannel) -> ListenerId {
        let (status, flags) = {
            let state = self.inner.state.lock();
            (state.status, state.flags.clone())
        };
        channel.publish(status, flags);

        let adapter = Arc::downgrade(&self.inner);
        let channel = channel.clone();
        self.inner.emitter.on(move |_event| {
            let Some(adapter) = adapter.upgrade() else {
                return;
            };
            // Status and flags are committed together before either event
            // fires, so publishing the committed pair never mixes states.
            let (status, flags) = {
                let state = adapter.state.lock();
                (state.status, state.flags.clone())
            };
            channel.publish(status, flags);
        })
    }

    pub fn detach_channel(&self, id: ListenerId) -> bool {
        self.inner.emitter.off(id)
    }
}

impl AdapterInner {
    async fn wait_until_configured(&self) -> Result<()> {
        let mut phase = self.phase.subscribe();
        loop {
            let current = *phase.borrow_and_update();
            match current {
                AdapterPhase::Unconfigured => return Err(FlagcastError::not_configured()),
                AdapterPhase::Ready | AdapterPhase::Reconfiguring => return Ok(()),
                AdapterPhase::Configuring => {
                    tracing::debug!("Reconfigure deferred until configure completes");
                }
            }
            if phase.changed().await.is_err() {
                return Err(FlagcastError::not_configured());
            }
        }
    }

    async fn refresh(&self) -> Result<bool> {
        let (configuration, session, ticket) = {
            let mut state = self.state.lock();
            let (Some(configuration), Some(session)) =
                (state.configuration.clone(), state.session.clone())
            else {
                return Err(FlagcastError::not_configured());
            };
            let ticket = state.issue_ticket();
            (configuration, session, ticket)
        };

        let flags = evaluate(&session, &configuration.user)
            .await
            .map_err(|error| {
                FlagcastError::with_source(
                    ErrorCode::EvaluationFailed,
                    "Failed to re-evaluate flags after service update",
                    error,
                )
            })?;

        Ok(self.apply_flags(ticket, flags))
    }

    fn apply_flags(&self, ticket: u64, flags: FlagSet) -> bool {
        let configuration = {
            let mut state = self.state.lock();
            if state.is_stale(ticket) {
                tracing::debug!(
                    ticket,
                    applied = state.applied_ticket,
                    superseded = state.superseded_ticket,
                    "Discarding stale evaluation"
                );
                return false;
            }
            state.applied_ticket = ticket;
            state.flags = flags.clone();
            state.configuration.clone()
        };

        self.emitter.emit(&AdapterEvent::FlagsChanged(flags.clone()));
        if let Some(configuration) = configuration {
            configuration.notify_flags(&flags);
        }
        true
    }
}

/// Rolls the phase back to `Unconfigured` unless configure completed,
/// including when the configure future is dropped mid-flight.
struct ConfigureGuard<'a> {
    inner: &'a AdapterInner,
    armed: bool,
}

impl Drop for ConfigureGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.phase.send_replace(AdapterPhase::Unconfigured);
            tracing::debug!("Configure did not complete; adapter unconfigured");
        }
    }
}

struct ReconfigureGuard<'a> {
    inner: &'a AdapterInner,
}

impl<'a> ReconfigureGuard<'a> {
    fn enter(inner: &'a AdapterInner) -> Self {
        inner.phase.send_replace(AdapterPhase::Reconfiguring);
        Self { inner }
    }
}

impl Drop for ReconfigureGuard<'_> {
    fn drop(&mut self) {
        let idle = {
            let mut state = self.inner.state.lock();
            state.reconfigures_in_flight = state.reconfigures_in_flight.saturating_sub(1);
            state.reconfigures_in_flight == 0
        };
        if idle {
            self.inner.phase.send_if_modified(|phase| {
                if *phase == AdapterPhase::Reconfiguring {
                    *phase = AdapterPhase::Ready;
                    true
                } else {
                    false
                }
            });
        }
    }
}

type ReadySignal = oneshot::Receiver<std::result::Result<(), String>>;

fn register_ready_signal(client: &dyn ServiceClient) -> ReadySignal {
    let (tx, rx) = oneshot::channel();
    let sender = Arc::new(Mutex::new(Some(tx)));

    let on_ready = Arc::clone(&sender);
    client.on(
        ServiceEventKind::Ready,
        Arc::new(move |_: ServiceEvent| {
            if let Some(tx) = on_ready.lock().take() {
                let _ = tx.send(Ok(()));
            }
        }),
    );
    client.on(
        ServiceEventKind::InitFailed,
        Arc::new(move |event: ServiceEvent| {
            let reason = match event {
                ServiceEvent::InitFailed { reason } => reason,
                other => format!("unexpected {:?} signal", other),
            };
            if let Some(tx) = sender.lock().take() {
                let _ = tx.send(Err(reason));
            }
        }),
    );

    rx
}

async fn evaluate(session: &ServiceSession, user: &User) -> Result<FlagSet> {
    let names = session.manager.names().await?;
    let raw = session.client.get_treatments(&names, user).await?;
    Ok(normalize_flags(&raw))
}

// Processes service updates one at a time, in the order they were signalled.
fn spawn_update_pump(
    adapter: Weak<AdapterInner>,
    mut updates: mpsc::UnboundedReceiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while updates.recv().await.is_some() {
            let Some(adapter) = adapter.upgrade() else {
                break;
            };
            match adapter.refresh().await {
                Ok(true) => tracing::debug!("Flags refreshed after service update"),
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(error = %error, "Keeping last known flags after failed update")
                }
            }
        }
        tracing::debug!("Update pump stopped");
    })
}
