use crate::utils::UtilError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum OidcError {
    /// Required profile fields are missing
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// No tenant domain can be derived from the group claim
    #[error("Malformed user info: {0}")]
    MalformedUserInfo(String),

    #[error("Fetch user info error: {0}")]
    FetchUserInfo(String),

    #[error("Token exchange error: {0}")]
    TokenExchange(String),

    #[error("State mismatch: {0}")]
    StateMismatch(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
