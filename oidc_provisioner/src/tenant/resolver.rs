use crate::coordination::CoordinationError;
use crate::oidc::{OidcConfig, OidcError, Profile};
use crate::provisioning::{
    AuthenticationProvider, NewAuthenticationProvider, NewTeam, Provisioner, Team,
    TeamProvisionRequest,
};

/// Tenant identity derived from a group claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamDomain {
    pub subdomain: String,
    /// `<subdomain>.<base_domain>`
    pub domain: String,
}

/// Result of primary tenant resolution.
#[derive(Debug, Clone)]
pub struct PrimaryTenant {
    pub domain: String,
    pub subdomain: String,
    /// `None` when no team owns the domain yet
    pub team: Option<Team>,
    pub authentication_provider: Option<AuthenticationProvider>,
    /// The existing provider's id, or the domain
    pub provider_id: String,
}

/// Derive the tenant domain from the first group carrying `prefix`.
///
/// Groups are taken in the order the identity provider listed them and the
/// first prefixed one wins, so a user in several prefixed groups lands in
/// whichever the provider happens to list first. The short name is the part
/// after the prefix up to the next `_`: `fc_acme_editors` gives `acme`.
/// No case normalisation is applied.
pub fn derive_team_domain(
    groups: &[&str],
    prefix: &str,
    base_domain: &str,
) -> Result<TeamDomain, OidcError> {
    let group = groups
        .iter()
        .find(|g| g.starts_with(prefix))
        .ok_or_else(|| {
            OidcError::MalformedUserInfo(format!("No group starting with '{prefix}' in profile"))
        })?;

    let subdomain = group[prefix.len()..]
        .split('_')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            OidcError::MalformedUserInfo(format!("Group '{group}' has no team name"))
        })?;

    Ok(TeamDomain {
        subdomain: subdomain.to_string(),
        domain: format!("{subdomain}.{base_domain}"),
    })
}

/// Find the team (and its OIDC provider link) the profile belongs to.
pub async fn resolve_primary(
    provisioner: &dyn Provisioner,
    profile: &Profile,
    config: &OidcConfig,
) -> Result<PrimaryTenant, CoordinationError> {
    let TeamDomain { subdomain, domain } =
        derive_team_domain(&profile.groups(), &config.group_prefix, &config.base_domain)?;

    let team = provisioner.find_team_by_domain(&domain).await?;

    // Only a single OIDC provider per team is supported.
    let authentication_provider = match &team {
        Some(team) => {
            provisioner
                .find_authentication_provider(&config.provider_name, &team.id, &domain)
                .await?
        }
        None => None,
    };

    let provider_id = authentication_provider
        .as_ref()
        .map(|p| p.provider_id.clone())
        .unwrap_or_else(|| domain.clone());

    tracing::debug!(
        domain = %domain,
        team_found = team.is_some(),
        provider_found = authentication_provider.is_some(),
        "Primary tenant resolved"
    );

    Ok(PrimaryTenant {
        domain,
        subdomain,
        team,
        authentication_provider,
        provider_id,
    })
}

/// Find or create the fixed secondary tenant.
///
/// A provisioning failure ends the login attempt with
/// [`CoordinationError::SecondaryTenantUnavailable`].
pub async fn ensure_secondary_tenant(
    provisioner: &dyn Provisioner,
    config: &OidcConfig,
    ip: Option<&str>,
) -> Result<Team, CoordinationError> {
    let domain = config.secondary_domain();

    if let Some(team) = provisioner.find_team_by_domain(&domain).await? {
        return Ok(team);
    }

    tracing::debug!(domain = %domain, "Creating secondary team");

    let request = TeamProvisionRequest {
        ip: ip.map(str::to_string),
        team: NewTeam {
            name: config.secondary_team_name.clone(),
            domain: domain.clone(),
            subdomain: config.secondary_subdomain.clone(),
        },
        authentication_provider: NewAuthenticationProvider {
            name: config.provider_name.clone(),
            provider_id: domain.clone(),
        },
    };

    provisioner.provision_team(request).await.map_err(|e| {
        tracing::error!(domain = %domain, error = %e, "Failed creating secondary team");
        CoordinationError::SecondaryTenantUnavailable(format!("{domain}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oidc::full_env;
    use crate::test_utils::MemoryProvisioner;
    use proptest::prelude::*;
    use serde_json::json;

    fn config() -> OidcConfig {
        let env = full_env();
        OidcConfig::from_lookup(|k| env.get(k).cloned())
            .expect("lookup")
            .expect("configured")
    }

    #[test]
    fn test_example_profile_resolves_domain() {
        let domain = derive_team_domain(&["fc_acme", "other"], "fc_", "corp.io").expect("domain");
        assert_eq!(domain.domain, "acme.corp.io");
        assert_eq!(domain.subdomain, "acme");
    }

    #[test]
    fn test_first_prefixed_group_wins() {
        let domain =
            derive_team_domain(&["staff", "fc_beta", "fc_acme"], "fc_", "corp.io").expect("domain");
        assert_eq!(domain.domain, "beta.corp.io");
    }

    #[test]
    fn test_short_name_stops_at_next_delimiter() {
        let domain = derive_team_domain(&["fc_acme_editors"], "fc_", "corp.io").expect("domain");
        assert_eq!(domain.domain, "acme.corp.io");
    }

    #[test]
    fn test_no_case_normalisation() {
        let domain = derive_team_domain(&["fc_ACME"], "fc_", "corp.io").expect("domain");
        assert_eq!(domain.domain, "ACME.corp.io");
    }

    #[test]
    fn test_missing_or_empty_group_is_malformed() {
        for groups in [vec![], vec!["other", "xfc_acme"], vec!["fc_"], vec!["fc__x"]] {
            let result = derive_team_domain(&groups, "fc_", "corp.io");
            assert!(
                matches!(result, Err(OidcError::MalformedUserInfo(_))),
                "{groups:?} should be malformed"
            );
        }
    }

    proptest! {
        #[test]
        fn test_domain_is_first_prefixed_short_name(
            noise in proptest::collection::vec("[a-z]{1,8}", 0..4),
            short in "[a-z0-9]{1,16}",
            later in proptest::collection::vec("fc_[a-z0-9]{1,8}", 0..3),
        ) {
            let first = format!("fc_{short}");
            let groups: Vec<&str> = noise
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(first.as_str()))
                .chain(later.iter().map(String::as_str))
                .collect();

            let domain = derive_team_domain(&groups, "fc_", "corp.io").expect("domain");
            prop_assert_eq!(domain.domain, format!("{short}.corp.io"));
        }
    }

    #[tokio::test]
    async fn test_resolve_primary_for_unknown_team() {
        let store = MemoryProvisioner::default();
        let profile = Profile::from_value(json!({
            "email": "a@x.com", "name": "A", "groups": ["fc_acme", "other"]
        }))
        .expect("profile");

        let tenant = resolve_primary(&store, &profile, &config()).await.expect("tenant");
        assert_eq!(tenant.domain, "acme.corp.io");
        assert!(tenant.team.is_none());
        assert!(tenant.authentication_provider.is_none());
        assert_eq!(tenant.provider_id, "acme.corp.io");
    }

    #[tokio::test]
    async fn test_resolve_primary_finds_existing_team_and_provider() {
        let store = MemoryProvisioner::default();
        let team = store.seed_team("Wiki acme", "acme.corp.io", "acme", Some("oidc"));
        let profile = Profile::from_value(json!({
            "email": "a@x.com", "name": "A", "groups": ["fc_acme"]
        }))
        .expect("profile");

        let tenant = resolve_primary(&store, &profile, &config()).await.expect("tenant");
        assert_eq!(tenant.team.map(|t| t.id), Some(team.id));
        assert!(tenant.authentication_provider.is_some());
    }

    #[tokio::test]
    async fn test_ensure_secondary_tenant_creates_once() {
        let store = MemoryProvisioner::default();
        let config = config();

        let a = ensure_secondary_tenant(&store, &config, Some("10.0.0.1"))
            .await
            .expect("created");
        let b = ensure_secondary_tenant(&store, &config, None)
            .await
            .expect("found");

        assert_eq!(a.id, b.id);
        assert_eq!(a.domain, "ig.corp.io");
        assert_eq!(a.name, "Wiki IG");
        assert_eq!(store.calls("provision_team"), 1);
        assert!(
            store
                .find_authentication_provider("oidc", &a.id, "ig.corp.io")
                .await
                .expect("lookup")
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_secondary_provisioning_failure_is_fatal() {
        let store = MemoryProvisioner::default();
        store.fail_on("provision_team");

        let result = ensure_secondary_tenant(&store, &config(), None).await;
        assert!(matches!(
            result,
            Err(CoordinationError::SecondaryTenantUnavailable(_))
        ));
    }
}
