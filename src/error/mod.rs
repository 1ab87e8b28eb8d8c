use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Configure errors
    ConfigurationFailed,
    ConfigurationTimeout,
    ConfigInvalidAuthorizationKey,
    ConfigInvalidReadyTimeout,

    // Lifecycle errors
    AdapterAlreadyConfigured,
    AdapterNotConfigured,

    // Evaluation errors
    EvaluationFailed,

    // Service errors
    ServiceUnavailable,
    ServiceRejected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigurationFailed => "CONFIGURATION_FAILED",
            ErrorCode::ConfigurationTimeout => "CONFIGURATION_TIMEOUT",
            ErrorCode::ConfigInvalidAuthorizationKey => "CONFIG_INVALID_AUTHORIZATION_KEY",
            ErrorCode::ConfigInvalidReadyTimeout => "CONFIG_INVALID_READY_TIMEOUT",
            ErrorCode::AdapterAlreadyConfigured => "ADAPTER_ALREADY_CONFIGURED",
            ErrorCode::AdapterNotConfigured => "ADAPTER_NOT_CONFIGURED",
            ErrorCode::EvaluationFailed => "EVALUATION_FAILED",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::ServiceRejected => "SERVICE_REJECTED",
        }
    }

    /// Whether a later call with the same input may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCode::ConfigurationTimeout
                | ErrorCode::EvaluationFailed
                | ErrorCode::ServiceUnavailable
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("[{code}] {message}")]
pub struct FlagcastError {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FlagcastError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn config_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    /// The service could not be reached or rejected initialization.
    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationFailed, message)
    }

    /// For [`ServiceClient`](crate::adapter::ServiceClient) implementations
    /// that lose their connection.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn not_configured() -> Self {
        Self::new(
            ErrorCode::AdapterNotConfigured,
            "Adapter not configured. Call Adapter::configure() first.",
        )
    }

    pub fn already_configured() -> Self {
        Self::new(
            ErrorCode::AdapterAlreadyConfigured,
            "Adapter already configured. Use Adapter::reconfigure() instead.",
        )
    }

    pub fn is_recoverable(&self) -> bool {
        self.code.is_recoverable()
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConfigurationFailed
                | ErrorCode::ConfigurationTimeout
                | ErrorCode::ConfigInvalidAuthorizationKey
                | ErrorCode::ConfigInvalidReadyTimeout
        )
    }

    pub fn is_not_configured(&self) -> bool {
        self.code == ErrorCode::AdapterNotConfigured
    }

    pub fn is_evaluation_error(&self) -> bool {
        self.code == ErrorCode::EvaluationFailed
    }

    pub fn is_service_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ServiceUnavailable | ErrorCode::ServiceRejected
        )
    }
}

pub type Result<T> = std::result::Result<T, FlagcastError>;
