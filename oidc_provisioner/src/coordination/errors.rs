//! Error types for the login flow

use thiserror::Error;

use crate::oidc::OidcError;
use crate::provisioning::ProvisioningError;
use crate::utils::UtilError;

/// Errors that can end a login attempt
#[derive(Error, Debug)]
pub enum CoordinationError {
    /// The identity provider answered the authorization request with an error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Callback without a usable code or state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The fixed secondary team could neither be found nor created
    #[error("Secondary team unavailable: {0}")]
    SecondaryTenantUnavailable(String),

    /// Error from OIDC operations
    #[error("OIDC error: {0}")]
    OidcError(OidcError),

    /// Error from provisioning operations
    #[error("Provisioning error: {0}")]
    ProvisioningError(ProvisioningError),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    UtilsError(UtilError),
}

impl CoordinationError {
    /// Log the error and return self
    ///
    /// Allows explicit logging at the call site while still propagating with `?`.
    pub fn log(self) -> Self {
        match &self {
            Self::Authentication(msg) => tracing::error!("Authentication error: {}", msg),
            Self::InvalidState(msg) => tracing::error!("Invalid state: {}", msg),
            Self::SecondaryTenantUnavailable(msg) => {
                tracing::error!("Secondary team unavailable: {}", msg)
            }
            Self::OidcError(err) => tracing::error!("OIDC error: {}", err),
            Self::ProvisioningError(err) => tracing::error!("Provisioning error: {}", err),
            Self::UtilsError(err) => tracing::error!("Utils error: {}", err),
        }
        self
    }
}

impl From<OidcError> for CoordinationError {
    fn from(err: OidcError) -> Self {
        let error = Self::OidcError(err);
        tracing::debug!("{}", error);
        error
    }
}

impl From<ProvisioningError> for CoordinationError {
    fn from(err: ProvisioningError) -> Self {
        let error = Self::ProvisioningError(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<UtilError> for CoordinationError {
    fn from(err: UtilError) -> Self {
        let error = Self::UtilsError(err);
        tracing::error!("{}", error);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_sync_and_send() {
        fn assert_sync_send<T: Sync + Send>() {}
        assert_sync_send::<CoordinationError>();
    }

    #[test]
    fn test_error_display() {
        let err = CoordinationError::SecondaryTenantUnavailable("ig.corp.io".to_string());
        assert_eq!(err.to_string(), "Secondary team unavailable: ig.corp.io");

        let err = CoordinationError::from(OidcError::MalformedUserInfo("no group".to_string()));
        assert_eq!(
            err.to_string(),
            "OIDC error: Malformed user info: no group"
        );

        let err = CoordinationError::from(ProvisioningError::Storage("down".to_string()));
        assert_eq!(err.to_string(), "Provisioning error: Storage error: down");
    }

    #[test]
    fn test_log_returns_self() {
        let err = CoordinationError::InvalidState("missing code".to_string()).log();
        assert!(matches!(err, CoordinationError::InvalidState(msg) if msg == "missing code"));
    }
}
