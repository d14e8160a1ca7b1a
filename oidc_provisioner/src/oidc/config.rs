use url::Url;

use crate::config::AUTH_ROUTE_PREFIX;

use super::errors::OidcError;
use super::types::ClaimPath;

/// Name under which the strategy is registered; also the `name` of the
/// authentication provider rows it creates and looks up.
pub const OIDC_PROVIDER_NAME: &str = "oidc";

/// Cookie holding `<host>|<nonce>|<client>` across the authorization redirect.
pub const STATE_COOKIE_NAME: &str = "state";

pub(crate) const STATE_COOKIE_MAX_AGE: i64 = 600;

/// Query parameters of the initiate route read by the login itself and never
/// forwarded to the identity provider.
pub const LOGIN_QUERY_KEYS: [&str; 2] = ["host", "client"];

// Some providers reject GET on their userinfo endpoint.
const DEFAULT_POST_USERINFO_URIS: &[&str] = &["https://api.dropboxapi.com/2/openid/userinfo"];

const DEFAULT_SCOPES: &str = "openid profile email";
const DEFAULT_USERNAME_CLAIM: &str = "preferred_username";
const DEFAULT_GROUP_PREFIX: &str = "fc_";
const DEFAULT_TEAM_NAME_PREFIX: &str = "Wiki ";
const DEFAULT_SECONDARY_SUBDOMAIN: &str = "ig";
const DEFAULT_SECONDARY_TEAM_NAME: &str = "Wiki IG";
const DEFAULT_ADMIN_GROUP: &str = "Administratoren";

/// The five values that must all be present before the strategy is registered.
pub const REQUIRED_ENV_VARS: [&str; 5] = [
    "OIDC_CLIENT_ID",
    "OIDC_CLIENT_SECRET",
    "OIDC_AUTH_URI",
    "OIDC_TOKEN_URI",
    "OIDC_USERINFO_URI",
];

/// Configuration of the OIDC login strategy.
///
/// Built once at start-up with [`OidcConfig::from_env`]. Partial configuration
/// yields `None`, which leaves the login routes unregistered.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub provider_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub userinfo_uri: String,
    pub callback_url: String,
    /// Application origin, e.g. `https://wiki.example.com`
    pub app_url: String,
    pub scopes: Vec<String>,
    pub username_claim: ClaimPath,
    /// Tenant domains are `<subdomain>.<base_domain>`
    pub base_domain: String,
    pub group_prefix: String,
    pub team_name_prefix: String,
    pub secondary_subdomain: String,
    pub secondary_team_name: String,
    pub admin_group: String,
    pub post_userinfo_uris: Vec<String>,
    /// `Domain` of the state cookie, so it reaches the callback host from
    /// whichever team subdomain the login started on
    pub cookie_domain: Option<String>,
}

impl OidcConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Option<Self>, OidcError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Returns `Ok(None)` when any of [`REQUIRED_ENV_VARS`] is missing or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, OidcError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required: Vec<Option<String>> = REQUIRED_ENV_VARS.iter().map(|k| get(k)).collect();
        let [
            Some(client_id),
            Some(client_secret),
            Some(auth_uri),
            Some(token_uri),
            Some(userinfo_uri),
        ]: [Option<String>; 5] = required
            .try_into()
            .map_err(|_| OidcError::Configuration("required variable count".to_string()))?
        else {
            tracing::info!("OIDC login disabled: not all of {:?} are set", REQUIRED_ENV_VARS);
            return Ok(None);
        };

        let app_url = get("URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        let app_url = app_url.trim_end_matches('/').to_string();

        let base_domain = match get("OIDC_BASE_DOMAIN") {
            Some(domain) => domain,
            None => Url::parse(&app_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .ok_or_else(|| {
                    OidcError::Configuration(format!(
                        "OIDC_BASE_DOMAIN is not set and URL '{app_url}' has no host"
                    ))
                })?,
        };

        let scopes = get("OIDC_SCOPES")
            .unwrap_or_else(|| DEFAULT_SCOPES.to_string())
            .split(' ')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let post_userinfo_uris = match get("OIDC_POST_USERINFO_URIS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_POST_USERINFO_URIS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let cookie_domain = match get("OIDC_COOKIE_DOMAIN") {
            Some(domain) => Some(domain),
            None => Url::parse(&app_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .filter(|host| covers(&base_domain, host))
                .map(|_| base_domain.clone()),
        };

        let provider_name = OIDC_PROVIDER_NAME.to_string();
        let callback_url = format!(
            "{app_url}{}/{provider_name}.callback",
            AUTH_ROUTE_PREFIX.as_str()
        );

        let config = Self {
            provider_name,
            client_id,
            client_secret,
            auth_uri,
            token_uri,
            userinfo_uri,
            callback_url,
            app_url,
            scopes,
            username_claim: ClaimPath::parse(
                &get("OIDC_USERNAME_CLAIM").unwrap_or_else(|| DEFAULT_USERNAME_CLAIM.to_string()),
            ),
            base_domain,
            group_prefix: get("OIDC_GROUP_PREFIX")
                .unwrap_or_else(|| DEFAULT_GROUP_PREFIX.to_string()),
            team_name_prefix: lookup("OIDC_TEAM_NAME_PREFIX")
                .unwrap_or_else(|| DEFAULT_TEAM_NAME_PREFIX.to_string()),
            secondary_subdomain: get("OIDC_SECONDARY_SUBDOMAIN")
                .unwrap_or_else(|| DEFAULT_SECONDARY_SUBDOMAIN.to_string()),
            secondary_team_name: get("OIDC_SECONDARY_TEAM_NAME")
                .unwrap_or_else(|| DEFAULT_SECONDARY_TEAM_NAME.to_string()),
            admin_group: get("OIDC_ADMIN_GROUP").unwrap_or_else(|| DEFAULT_ADMIN_GROUP.to_string()),
            post_userinfo_uris,
            cookie_domain,
        };

        tracing::debug!(
            base_domain = %config.base_domain,
            callback_url = %config.callback_url,
            "OIDC login configured"
        );

        Ok(Some(config))
    }

    /// Whether the userinfo endpoint has to be called with POST.
    pub fn userinfo_requires_post(&self) -> bool {
        self.post_userinfo_uris.iter().any(|u| *u == self.userinfo_uri)
    }

    /// `<subdomain>.<base_domain>`
    pub fn team_domain(&self, subdomain: &str) -> String {
        format!("{subdomain}.{}", self.base_domain)
    }

    pub fn secondary_domain(&self) -> String {
        self.team_domain(&self.secondary_subdomain)
    }

    pub(crate) fn is_https(&self) -> bool {
        self.app_url.starts_with("https://")
    }
}

/// Whether a cookie with `Domain=<domain>` is sent to `host`.
///
/// Single-label domains such as `localhost` are left alone; browsers refuse
/// them as cookie domains.
fn covers(domain: &str, host: &str) -> bool {
    domain.contains('.') && (host == domain || host.ends_with(&format!(".{domain}")))
}
