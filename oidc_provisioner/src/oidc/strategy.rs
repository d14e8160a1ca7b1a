use std::sync::Arc;

use super::config::OidcConfig;
use super::errors::OidcError;
use super::main::get_client;

/// Extension point for extra parameters sent to the authorization endpoint.
///
/// Receives the query of the request that started the login. Whatever it
/// returns is merged *under* the strategy's own parameters, so it can never
/// replace `client_id`, `redirect_uri`, `state` and friends.
pub trait AuthorizationParams: Send + Sync {
    fn authorization_params(&self, original_query: &[(String, String)]) -> Vec<(String, String)>;
}

/// Forwards the original query unchanged.
///
/// Lets a caller pass provider hints such as `prompt` or `login_hint` through
/// the initiate route.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginalQueryPassthrough;

impl AuthorizationParams for OriginalQueryPassthrough {
    fn authorization_params(&self, original_query: &[(String, String)]) -> Vec<(String, String)> {
        original_query.to_vec()
    }
}

/// Sends nothing beyond the strategy's own parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtraParams;

impl AuthorizationParams for NoExtraParams {
    fn authorization_params(&self, _original_query: &[(String, String)]) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// A configured OIDC login strategy.
///
/// Owns the configuration, the HTTP client used for the token and userinfo
/// calls, and the authorization parameter hook.
#[derive(Clone)]
pub struct OidcStrategy {
    pub(crate) config: Arc<OidcConfig>,
    pub(crate) client: reqwest::Client,
    pub(crate) params: Arc<dyn AuthorizationParams>,
}

impl std::fmt::Debug for OidcStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcStrategy")
            .field("provider_name", &self.config.provider_name)
            .field("auth_uri", &self.config.auth_uri)
            .finish_non_exhaustive()
    }
}

impl OidcStrategy {
    pub fn new(config: OidcConfig) -> Result<Self, OidcError> {
        Ok(Self {
            config: Arc::new(config),
            client: get_client()?,
            params: Arc::new(OriginalQueryPassthrough),
        })
    }

    /// Build the strategy from the environment, or `None` when OIDC login
    /// is not fully configured.
    pub fn from_env() -> Result<Option<Self>, OidcError> {
        OidcConfig::from_env()?.map(Self::new).transpose()
    }

    pub fn with_authorization_params(mut self, params: Arc<dyn AuthorizationParams>) -> Self {
        self.params = params;
        self
    }

    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.provider_name
    }
}
