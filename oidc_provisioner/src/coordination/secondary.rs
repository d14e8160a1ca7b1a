use crate::oidc::{OidcConfig, Profile, TokenSet};
use crate::provisioning::{AccountResult, NewUser, Provisioner, UserProvisionRequest, UserRole};
use crate::tenant::ensure_secondary_tenant;

use super::account::authentication_from;
use super::errors::CoordinationError;

/// Find or create the user's account in the fixed secondary team.
///
/// Members of the admin group become admins of the secondary team when
/// their user is first created.
pub async fn provision_secondary_account(
    provisioner: &dyn Provisioner,
    profile: &Profile,
    name: &str,
    tokens: &TokenSet,
    config: &OidcConfig,
    ip: Option<&str>,
) -> Result<AccountResult, CoordinationError> {
    let team = ensure_secondary_tenant(provisioner, config, ip).await?;

    if let Some(user) = provisioner.find_user_by_team_and_name(&team.id, name).await? {
        tracing::debug!(user_id = %user.id, "Secondary user exists");
        return Ok(AccountResult {
            user,
            team,
            is_new_user: false,
            is_new_team: false,
        });
    }

    let provider = provisioner
        .find_authentication_provider(&config.provider_name, &team.id, &team.domain)
        .await?;
    if provider.is_none() {
        tracing::warn!(team_id = %team.id, "Secondary team has no authentication provider");
    }

    let role = profile
        .groups()
        .contains(&config.admin_group.as_str())
        .then_some(UserRole::Admin);

    let (user, is_new_user) = provisioner
        .provision_user(UserProvisionRequest {
            ip: ip.map(str::to_string),
            team_id: team.id.clone(),
            user: NewUser {
                name: name.to_string(),
                email: profile.email().to_string(),
                avatar_url: profile.picture().map(str::to_string),
                role,
            },
            authentication: provider
                .map(|p| (p.id, authentication_from(profile, tokens, config))),
        })
        .await?;

    if is_new_user {
        tracing::debug!(user_id = %user.id, role = user.role.as_str(), "Secondary user created");
    } else {
        tracing::debug!(user_id = %user.id, "Secondary user matched by email");
    }

    Ok(AccountResult {
        user,
        team,
        is_new_user,
        is_new_team: false,
    })
}

/// Team domain the login was started from: the state cookie up to the first `|`.
pub fn wanted_domain(state_cookie: Option<&str>) -> Option<&str> {
    state_cookie
        .and_then(|state| state.split('|').next())
        .filter(|domain| !domain.is_empty())
}

/// Pick the secondary result when the login was started from the secondary
/// team's domain, the primary one otherwise.
pub fn select_result(
    primary: AccountResult,
    secondary: AccountResult,
    wanted: Option<&str>,
) -> AccountResult {
    if wanted == Some(secondary.team.domain.as_str()) {
        tracing::debug!(domain = %secondary.team.domain, "Switching to secondary team");
        secondary
    } else {
        primary
    }
}
