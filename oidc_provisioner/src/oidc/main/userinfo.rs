use serde_json::Value;

use crate::oidc::config::OidcConfig;
use crate::oidc::errors::OidcError;
use crate::oidc::strategy::OidcStrategy;
use crate::oidc::types::Profile;

/// Call the userinfo endpoint and decode the profile.
///
/// Endpoints on the POST allow-list are called with POST, everything else
/// with GET. A profile without an email is rejected here, before any tenant
/// or account lookup runs.
pub async fn fetch_profile(
    client: &reqwest::Client,
    config: &OidcConfig,
    access_token: &str,
) -> Result<Profile, OidcError> {
    let request = if config.userinfo_requires_post() {
        client.post(&config.userinfo_uri)
    } else {
        client.get(&config.userinfo_uri)
    };

    let response = request
        .bearer_auth(access_token)
        .header(http::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| OidcError::FetchUserInfo(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(OidcError::FetchUserInfo(format!(
            "Userinfo endpoint returned {status}"
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| OidcError::FetchUserInfo(e.to_string()))?;

    let value: Value = serde_json::from_str(&body).map_err(|e| {
        OidcError::Authentication(format!("Failed to parse the userinfo response: {e}"))
    })?;

    let profile = Profile::from_value(value)?;
    tracing::debug!(email = profile.email(), "Fetched userinfo profile");
    Ok(profile)
}

impl OidcStrategy {
    pub async fn fetch_profile(&self, access_token: &str) -> Result<Profile, OidcError> {
        fetch_profile(&self.client, &self.config, access_token).await
    }
}
