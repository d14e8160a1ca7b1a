use std::sync::Arc;

use oidc_provisioner::{OidcError, OidcStrategy, Provisioner};

use super::completion::{LoginCompletion, TeamRedirect};

/// Everything the login routes need: the strategy, the store and what to do
/// once a login succeeded.
#[derive(Clone)]
pub struct AuthState {
    pub(crate) strategy: OidcStrategy,
    pub(crate) provisioner: Arc<dyn Provisioner>,
    pub(crate) completion: Arc<dyn LoginCompletion>,
}

impl AuthState {
    pub fn new(strategy: OidcStrategy, provisioner: Arc<dyn Provisioner>) -> Self {
        let completion = Arc::new(TeamRedirect::new(strategy.config()));
        Self {
            strategy,
            provisioner,
            completion,
        }
    }

    /// `None` when the OIDC environment is incomplete.
    pub fn from_env(provisioner: Arc<dyn Provisioner>) -> Result<Option<Self>, OidcError> {
        Ok(OidcStrategy::from_env()?.map(|strategy| Self::new(strategy, provisioner)))
    }

    pub fn with_completion(mut self, completion: Arc<dyn LoginCompletion>) -> Self {
        self.completion = completion;
        self
    }

    pub fn strategy(&self) -> &OidcStrategy {
        &self.strategy
    }
}
