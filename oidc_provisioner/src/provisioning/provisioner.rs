use async_trait::async_trait;

use super::errors::ProvisioningError;
use super::types::{
    AccountRequest, AccountResult, AuthenticationProvider, Team, TeamProvisionRequest, User,
    UserProvisionRequest,
};

/// Persistence operations the login flow relies on.
///
/// Implementations must tolerate concurrent calls for the same team domain
/// or user: two logins racing to create `acme.corp.io` end up with one team.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn find_team_by_domain(&self, domain: &str) -> Result<Option<Team>, ProvisioningError>;

    /// Find-or-create a team together with its authentication provider.
    async fn provision_team(&self, request: TeamProvisionRequest)
    -> Result<Team, ProvisioningError>;

    /// Find-or-create team, provider, user and authentication record.
    async fn provision_account(
        &self,
        request: AccountRequest,
    ) -> Result<AccountResult, ProvisioningError>;

    async fn find_user_by_team_and_name(
        &self,
        team_id: &str,
        name: &str,
    ) -> Result<Option<User>, ProvisioningError>;

    /// Find-or-create a user by team and email. The flag is `true` when the
    /// user was created by this call.
    async fn provision_user(
        &self,
        request: UserProvisionRequest,
    ) -> Result<(User, bool), ProvisioningError>;

    async fn find_authentication_provider(
        &self,
        name: &str,
        team_id: &str,
        provider_id: &str,
    ) -> Result<Option<AuthenticationProvider>, ProvisioningError>;
}
