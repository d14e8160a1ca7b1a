use crate::oidc::{OidcConfig, OidcError, Profile, TokenSet};
use crate::provisioning::{
    AccountRequest, AccountResult, NewAuthentication, NewAuthenticationProvider, NewTeam, NewUser,
    Provisioner, TeamRequest,
};
use crate::tenant::PrimaryTenant;

use super::errors::CoordinationError;

/// Display name: `name`, then the configured claim, then `username`.
pub fn resolve_display_name(profile: &Profile, config: &OidcConfig) -> Result<String, OidcError> {
    profile
        .name()
        .or_else(|| profile.claim(&config.username_claim))
        .or_else(|| profile.username())
        .map(str::to_string)
        .ok_or_else(|| {
            OidcError::Authentication(
                "Neither a name or username was returned in the profile parameter, but at least one is required."
                    .to_string(),
            )
        })
}

/// Token material as stored with the user.
///
/// The subject falls back to the email when the provider sends neither
/// `sub` nor `id`.
pub(super) fn authentication_from(
    profile: &Profile,
    tokens: &TokenSet,
    config: &OidcConfig,
) -> NewAuthentication {
    NewAuthentication {
        provider_id: profile
            .subject()
            .unwrap_or_else(|| profile.email().to_string()),
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone(),
        expires_in: tokens.expires_in,
        scopes: config.scopes.clone(),
    }
}

pub fn build_account_request(
    profile: &Profile,
    name: &str,
    tenant: &PrimaryTenant,
    tokens: &TokenSet,
    config: &OidcConfig,
    ip: Option<&str>,
) -> AccountRequest {
    let team = match &tenant.team {
        Some(team) => TeamRequest::Existing {
            team_id: team.id.clone(),
        },
        None => TeamRequest::New(NewTeam {
            name: format!("{}{}", config.team_name_prefix, tenant.subdomain),
            domain: tenant.domain.clone(),
            subdomain: tenant.subdomain.clone(),
        }),
    };

    AccountRequest {
        ip: ip.map(str::to_string),
        team,
        user: NewUser {
            name: name.to_string(),
            email: profile.email().to_string(),
            avatar_url: profile.picture().map(str::to_string),
            role: None,
        },
        authentication_provider: NewAuthenticationProvider {
            name: config.provider_name.clone(),
            provider_id: tenant.provider_id.clone(),
        },
        authentication: authentication_from(profile, tokens, config),
    }
}

/// Provision the account in the resolved primary team.
pub async fn provision_primary_account(
    provisioner: &dyn Provisioner,
    profile: &Profile,
    name: &str,
    tenant: &PrimaryTenant,
    tokens: &TokenSet,
    config: &OidcConfig,
    ip: Option<&str>,
) -> Result<AccountResult, CoordinationError> {
    let request = build_account_request(profile, name, tenant, tokens, config, ip);
    let result = provisioner.provision_account(request).await?;

    tracing::debug!(
        team_id = %result.team.id,
        user_id = %result.user.id,
        is_new_team = result.is_new_team,
        is_new_user = result.is_new_user,
        "Primary account provisioned"
    );

    Ok(result)
}
