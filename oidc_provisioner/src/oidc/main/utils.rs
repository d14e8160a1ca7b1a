use std::time::Duration;

use http::header::HeaderMap;
use subtle::ConstantTimeEq;

use crate::oidc::config::{OidcConfig, STATE_COOKIE_MAX_AGE, STATE_COOKIE_NAME};
use crate::oidc::errors::OidcError;
use crate::oidc::types::LoginState;
use crate::utils::header_set_cookie;

/// HTTP client for the token and userinfo calls.
///
/// - `timeout`: 30 seconds.
/// - `pool_idle_timeout`: 90 seconds.
/// - `pool_max_idle_per_host`: 32.
pub(crate) fn get_client() -> Result<reqwest::Client, OidcError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(32)
        .build()
        .map_err(|e| OidcError::Configuration(format!("Failed to create HTTP client: {e}")))
}

// Cross-site form_post callbacks only carry the cookie when SameSite=None,
// which browsers accept on secure origins only.
fn state_cookie_same_site(config: &OidcConfig) -> &'static str {
    if config.is_https() {
        "None; Secure"
    } else {
        "Lax"
    }
}

pub(super) fn set_state_cookie(
    headers: &mut HeaderMap,
    config: &OidcConfig,
    state: &LoginState,
) -> Result<(), OidcError> {
    header_set_cookie(
        headers,
        STATE_COOKIE_NAME,
        &state.encode(),
        state_cookie_same_site(config),
        STATE_COOKIE_MAX_AGE,
        config.cookie_domain.as_deref(),
    )?;
    Ok(())
}

/// Expire the state cookie.
pub fn clear_state_cookie(headers: &mut HeaderMap, config: &OidcConfig) -> Result<(), OidcError> {
    header_set_cookie(
        headers,
        STATE_COOKIE_NAME,
        "",
        state_cookie_same_site(config),
        -86400,
        config.cookie_domain.as_deref(),
    )?;
    Ok(())
}

/// Check the `state` parameter returned by the identity provider against the
/// nonce held in the state cookie.
pub fn verify_login_state(
    cookie: Option<&str>,
    state_param: Option<&str>,
) -> Result<LoginState, OidcError> {
    let cookie = cookie
        .filter(|c| !c.is_empty())
        .ok_or_else(|| OidcError::StateMismatch("State cookie not found".to_string()))?;
    let state_param = state_param
        .ok_or_else(|| OidcError::StateMismatch("State parameter not found".to_string()))?;

    let login_state = LoginState::parse(cookie)?;

    if !bool::from(login_state.nonce.as_bytes().ct_eq(state_param.as_bytes())) {
        tracing::error!("State parameter does not match the state cookie");
        return Err(OidcError::StateMismatch(
            "State parameter does not match the state cookie".to_string(),
        ));
    }

    Ok(login_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oidc::types::Client;

    #[test]
    fn test_get_client() {
        assert!(get_client().is_ok());
    }

    #[test]
    fn test_verify_login_state_accepts_matching_nonce() {
        let state = verify_login_state(Some("ig.corp.io|abc|desktop"), Some("abc")).expect("valid");
        assert_eq!(state.host, "ig.corp.io");
        assert_eq!(state.client, Client::Desktop);
    }

    #[test]
    fn test_verify_login_state_rejects_mismatch() {
        let result = verify_login_state(Some("ig.corp.io|abc|web"), Some("abd"));
        assert!(matches!(result, Err(OidcError::StateMismatch(_))));

        let result = verify_login_state(Some("ig.corp.io|abc|web"), Some("ab"));
        assert!(matches!(result, Err(OidcError::StateMismatch(_))));
    }

    #[test]
    fn test_verify_login_state_requires_cookie_and_parameter() {
        assert!(matches!(
            verify_login_state(None, Some("abc")),
            Err(OidcError::StateMismatch(_))
        ));
        assert!(matches!(
            verify_login_state(Some(""), Some("abc")),
            Err(OidcError::StateMismatch(_))
        ));
        assert!(matches!(
            verify_login_state(Some("ig.corp.io|abc|web"), None),
            Err(OidcError::StateMismatch(_))
        ));
    }
}
