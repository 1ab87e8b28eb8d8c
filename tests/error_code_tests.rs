use flagcast::{ErrorCode, FlagcastError};

#[test]
fn test_error_code_string_values() {
    assert_eq!(ErrorCode::ConfigurationFailed.as_str(), "CONFIGURATION_FAILED");
    assert_eq!(ErrorCode::ConfigurationTimeout.as_str(), "CONFIGURATION_TIMEOUT");
    assert_eq!(
        ErrorCode::ConfigInvalidAuthorizationKey.as_str(),
        "CONFIG_INVALID_AUTHORIZATION_KEY"
    );
    assert_eq!(ErrorCode::ConfigInvalidReadyTimeout.as_str(), "CONFIG_INVALID_READY_TIMEOUT");

    assert_eq!(ErrorCode::AdapterAlreadyConfigured.as_str(), "ADAPTER_ALREADY_CONFIGURED");
    assert_eq!(ErrorCode::AdapterNotConfigured.as_str(), "ADAPTER_NOT_CONFIGURED");

    assert_eq!(ErrorCode::EvaluationFailed.as_str(), "EVALUATION_FAILED");

    assert_eq!(ErrorCode::ServiceUnavailable.as_str(), "SERVICE_UNAVAILABLE");
    assert_eq!(ErrorCode::ServiceRejected.as_str(), "SERVICE_REJECTED");
}

#[test]
fn test_recoverable_errors() {
    assert!(ErrorCode::ConfigurationTimeout.is_recoverable());
    assert!(ErrorCode::EvaluationFailed.is_recoverable());
    assert!(ErrorCode::ServiceUnavailable.is_recoverable());
}

#[test]
fn test_non_recoverable_errors() {
    assert!(!ErrorCode::ConfigurationFailed.is_recoverable());
    assert!(!ErrorCode::ConfigInvalidAuthorizationKey.is_recoverable());
    assert!(!ErrorCode::ConfigInvalidReadyTimeout.is_recoverable());
    assert!(!ErrorCode::AdapterAlreadyConfigured.is_recoverable());
    assert!(!ErrorCode::AdapterNotConfigured.is_recoverable());
    assert!(!ErrorCode::ServiceRejected.is_recoverable());
}

#[test]
fn test_error_display() {
    let error = FlagcastError::new(ErrorCode::EvaluationFailed, "names unavailable");
    assert_eq!(error.to_string(), "[EVALUATION_FAILED] names unavailable");
}

#[test]
fn test_lifecycle_errors() {
    let error = FlagcastError::not_configured();
    assert_eq!(error.code, ErrorCode::AdapterNotConfigured);
    assert!(error.is_not_configured());

    let error = FlagcastError::already_configured();
    assert_eq!(error.code, ErrorCode::AdapterAlreadyConfigured);
    assert!(!error.is_not_configured());
}

#[test]
fn test_service_errors() {
    let error = FlagcastError::service_unavailable("connection reset");
    assert!(error.is_service_error());
    assert!(error.is_recoverable());

    let error = FlagcastError::new(ErrorCode::ServiceRejected, "bad key");
    assert!(error.is_service_error());
    assert!(!error.is_recoverable());
}

#[test]
fn test_configuration_errors() {
    assert!(FlagcastError::configuration_error("refused").is_configuration_error());
    assert!(FlagcastError::new(ErrorCode::ConfigurationTimeout, "slow").is_configuration_error());
    assert!(!FlagcastError::new(ErrorCode::EvaluationFailed, "boom").is_configuration_error());
}
