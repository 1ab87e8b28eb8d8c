use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ErrorCode, FlagcastError, Result};
use crate::types::{AdapterStatus, FlagSet, User};

pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Callback types handed to the host state layer.
pub type StatusCallback = Arc<dyn Fn(AdapterStatus) + Send + Sync>;
pub type FlagsCallback = Arc<dyn Fn(FlagSet) + Send + Sync>;

/// Everything one `configure` call needs.
///
/// A configuration is never mutated. `reconfigure` builds a new one from
/// the current configuration and a [`PartialConfiguration`].
#[derive(Clone)]
pub struct AdapterConfiguration {
    pub authorization_key: String,
    pub user: User,
    pub on_status_state_change: Option<StatusCallback>,
    pub on_flags_state_change: Option<FlagsCallback>,
    /// How long `configure` waits for the service's ready signal. `None`
    /// waits indefinitely.
    pub ready_timeout: Option<Duration>,
}

impl AdapterConfiguration {
    pub fn new(authorization_key: impl Into<String>, user: User) -> Self {
        Self {
            authorization_key: authorization_key.into(),
            user,
            on_status_state_change: None,
            on_flags_state_change: None,
            ready_timeout: Some(DEFAULT_READY_TIMEOUT),
        }
    }

    pub fn builder(authorization_key: impl Into<String>) -> AdapterConfigurationBuilder {
        AdapterConfigurationBuilder::new(authorization_key)
    }

    pub fn validate(&self) -> Result<()> {
        if self.authorization_key.trim().is_empty() {
            return Err(FlagcastError::config_error(
                ErrorCode::ConfigInvalidAuthorizationKey,
                "Authorization key is required",
            ));
        }

        if self.ready_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(FlagcastError::config_error(
                ErrorCode::ConfigInvalidReadyTimeout,
                "Ready timeout must be positive",
            ));
        }

        Ok(())
    }

    /// Returns this configuration with an anonymous user key filled in.
    pub fn with_resolved_user(mut self) -> Self {
        self.user = self.user.with_resolved_key();
        self
    }

    /// Builds the configuration that supersedes this one.
    ///
    /// The user is replaced as a whole, not merged attribute by attribute.
    /// Callbacks are replaced only when the partial configuration carries
    /// them.
    pub fn merge(&self, partial: PartialConfiguration) -> Self {
        let PartialConfiguration {
            user,
            on_status_state_change,
            on_flags_state_change,
        } = partial;

        Self {
            authorization_key: self.authorization_key.clone(),
            user: user.unwrap_or_else(|| self.user.clone()).with_resolved_key(),
            on_status_state_change: on_status_state_change
                .or_else(|| self.on_status_state_change.clone()),
            on_flags_state_change: on_flags_state_change
                .or_else(|| self.on_flags_state_change.clone()),
            ready_timeout: self.ready_timeout,
        }
    }

    pub(crate) fn notify_status(&self, status: AdapterStatus) {
        if let Some(callback) = &self.on_status_state_change {
            callback(status);
        }
    }

    pub(crate) fn notify_flags(&self, flags: &FlagSet) {
        if let Some(callback) = &self.on_flags_state_change {
            callback(flags.clone());
        }
    }
}

impl fmt::Debug for AdapterConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfiguration")
            .field("authorization_key", &"[REDACTED]")
            .field("user", &self.user)
            .field("on_status_state_change", &self.on_status_state_change.is_some())
            .field("on_flags_state_change", &self.on_flags_state_change.is_some())
            .field("ready_timeout", &self.ready_timeout)
            .finish()
    }
}

/// The fields a `reconfigure` call may replace.
#[derive(Clone, Default)]
pub struct PartialConfiguration {
    pub user: Option<User>,
    pub on_status_state_change: Option<StatusCallback>,
    pub on_flags_state_change: Option<FlagsCallback>,
}

impl PartialConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: User) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    pub fn user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn on_status_state_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(AdapterStatus) + Send + Sync + 'static,
    {
        self.on_status_state_change = Some(Arc::new(callback));
        self
    }

    pub fn on_flags_state_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(FlagSet) + Send + Sync + 'static,
    {
        self.on_flags_state_change = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for PartialConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialConfiguration")
            .field("user", &self.user)
            .field("on_status_state_change", &self.on_status_state_change.is_some())
            .field("on_flags_state_change", &self.on_flags_state_change.is_some())
            .finish()
    }
}

pub struct AdapterConfigurationBuilder {
    authorization_key: String,
    user: User,
    on_status_state_change: Option<StatusCallback>,
    on_flags_state_change: Option<FlagsCallback>,
    ready_timeout: Option<Duration>,
}

impl AdapterConfigurationBuilder {
    pub fn new(authorization_key: impl Into<String>) -> Self {
        Self {
            authorization_key: authorization_key.into(),
            user: User::default(),
            on_status_state_change: None,
            on_flags_state_change: None,
            ready_timeout: Some(DEFAULT_READY_TIMEOUT),
        }
    }

    pub fn user(mut self, user: User) -> Self {
        self.user = user;
        self
    }

    pub fn on_status_state_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(AdapterStatus) + Send + Sync + 'static,
    {
        self.on_status_state_change = Some(Arc::new(callback));
        self
    }

    pub fn on_flags_state_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(FlagSet) + Send + Sync + 'static,
    {
        self.on_flags_state_change = Some(Arc::new(callback));
        self
    }

    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = Some(timeout);
        self
    }

    pub fn no_ready_timeout(mut self) -> Self {
        self.ready_timeout = None;
        self
    }

    pub fn build(self) -> AdapterConfiguration {
        AdapterConfiguration {
            authorization_key: self.authorization_key,
            user: self.user,
            on_status_state_change: self.on_status_state_change,
            on_flags_state_change: self.on_flags_state_change,
            ready_timeout: self.ready_timeout,
        }
    }
}
