use http::HeaderMap;
use serde::Serialize;

use crate::oidc::{
    AuthResponse, Client, OidcStrategy, STATE_COOKIE_NAME, TokenSet, clear_state_cookie,
    verify_login_state,
};
use crate::provisioning::{AccountResult, Provisioner, Team, User};
use crate::tenant::resolve_primary;

use super::account::{provision_primary_account, resolve_display_name};
use super::errors::CoordinationError;
use super::secondary::{provision_secondary_account, select_result, wanted_domain};

/// Where a login attempt is; failures are logged with the stage they happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Init,
    Redirected,
    CallbackReceived,
    ProfileFetched,
    TenantResolved,
    AccountProvisioned,
    SecondarySwitchEvaluated,
    Done,
    Failed,
}

/// Outcome of a successful login, handed to the session layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticationResult {
    pub user: User,
    pub team: Team,
    pub is_new_user: bool,
    pub is_new_team: bool,
    pub client: Client,
}

impl AuthenticationResult {
    fn new(result: AccountResult, client: Client) -> Self {
        Self {
            user: result.user,
            team: result.team,
            is_new_user: result.is_new_user,
            is_new_team: result.is_new_team,
            client,
        }
    }
}

/// Host recorded in the state cookie: the `host` query parameter when given,
/// the host the request was sent to otherwise.
///
/// Logins started on the application URL pass the team domain they belong to
/// as `?host=`; the callback compares it with the secondary team's domain.
pub fn login_host<'a>(
    original_query: &'a [(String, String)],
    request_host: Option<&'a str>,
) -> Result<&'a str, CoordinationError> {
    let host = original_query
        .iter()
        .find(|(key, _)| key == "host")
        .map(|(_, value)| value.as_str())
        .or(request_host)
        .ok_or_else(|| CoordinationError::InvalidState("Login host is missing".to_string()))?;

    // Written into a cookie value, so no separators may pass.
    let valid = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if !valid {
        return Err(CoordinationError::InvalidState(format!(
            "Invalid login host '{host}'"
        )));
    }

    Ok(host)
}

/// Client from the `client` query parameter; unknown values mean `Web`.
pub fn login_client(original_query: &[(String, String)]) -> Client {
    original_query
        .iter()
        .find(|(key, _)| key == "client")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or_default()
}

/// Start a login and return the authorization URL plus the state cookie header.
pub fn begin_login(
    strategy: &OidcStrategy,
    original_query: &[(String, String)],
    host: &str,
    client: Client,
) -> Result<(String, HeaderMap), CoordinationError> {
    let (auth_url, headers) = strategy
        .prepare_oidc_auth_request(original_query, host, client)
        .map_err(|e| CoordinationError::from(e).log())?;

    tracing::debug!(
        from = ?LoginStage::Init,
        stage = ?LoginStage::Redirected,
        host,
        "OIDC login started"
    );
    Ok((auth_url, headers))
}

/// Callback reached with GET (query response mode).
pub async fn get_authorized_core(
    strategy: &OidcStrategy,
    provisioner: &dyn Provisioner,
    auth_response: &AuthResponse,
    cookies: &headers::Cookie,
    ip: Option<&str>,
) -> Result<(HeaderMap, AuthenticationResult), CoordinationError> {
    complete_login(
        strategy,
        provisioner,
        auth_response,
        cookies.get(STATE_COOKIE_NAME),
        ip,
    )
    .await
}

/// Callback reached with POST (form_post response mode).
pub async fn post_authorized_core(
    strategy: &OidcStrategy,
    provisioner: &dyn Provisioner,
    auth_response: &AuthResponse,
    cookies: &headers::Cookie,
    ip: Option<&str>,
) -> Result<(HeaderMap, AuthenticationResult), CoordinationError> {
    if auth_response.state.as_deref().is_none_or(str::is_empty) {
        return Err(CoordinationError::InvalidState("State parameter is missing".to_string()).log());
    }

    complete_login(
        strategy,
        provisioner,
        auth_response,
        cookies.get(STATE_COOKIE_NAME),
        ip,
    )
    .await
}

/// Run one callback to completion.
///
/// The returned headers expire the state cookie.
pub async fn complete_login(
    strategy: &OidcStrategy,
    provisioner: &dyn Provisioner,
    auth_response: &AuthResponse,
    state_cookie: Option<&str>,
    ip: Option<&str>,
) -> Result<(HeaderMap, AuthenticationResult), CoordinationError> {
    let mut stage = LoginStage::CallbackReceived;

    let result = run_callback(
        &mut stage,
        strategy,
        provisioner,
        auth_response,
        state_cookie,
        ip,
    )
    .await;

    match result {
        Ok(result) => {
            let mut headers = HeaderMap::new();
            clear_state_cookie(&mut headers, strategy.config())?;
            tracing::info!(
                stage = ?LoginStage::Done,
                user_id = %result.user.id,
                team_id = %result.team.id,
                client = result.client.as_str(),
                "OIDC login completed"
            );
            Ok((headers, result))
        }
        Err(e) => {
            tracing::error!(
                stage = ?LoginStage::Failed,
                failed_after = ?stage,
                error = %e,
                "OIDC login failed"
            );
            Err(e)
        }
    }
}

async fn run_callback(
    stage: &mut LoginStage,
    strategy: &OidcStrategy,
    provisioner: &dyn Provisioner,
    auth_response: &AuthResponse,
    state_cookie: Option<&str>,
    ip: Option<&str>,
) -> Result<AuthenticationResult, CoordinationError> {
    if let Some(error) = &auth_response.error {
        let description = auth_response.error_description.as_deref().unwrap_or("");
        return Err(CoordinationError::Authentication(format!(
            "Identity provider returned '{error}' {description}"
        )));
    }

    let login_state = verify_login_state(state_cookie, auth_response.state.as_deref())?;

    let code = auth_response
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| CoordinationError::InvalidState("Authorization code is missing".into()))?;

    let tokens = strategy.exchange_code(code).await?;
    let profile = strategy.fetch_profile(&tokens.access_token).await?;
    *stage = LoginStage::ProfileFetched;

    let account = provision_login(
        stage,
        provisioner,
        strategy,
        &profile,
        &tokens,
        wanted_domain(state_cookie),
        ip,
    )
    .await?;

    Ok(AuthenticationResult::new(account, login_state.client))
}

/// Provision primary and secondary accounts for a fetched profile and pick
/// the one matching the domain the login started from.
pub async fn provision_login(
    stage: &mut LoginStage,
    provisioner: &dyn Provisioner,
    strategy: &OidcStrategy,
    profile: &crate::oidc::Profile,
    tokens: &TokenSet,
    wanted: Option<&str>,
    ip: Option<&str>,
) -> Result<AccountResult, CoordinationError> {
    let config = strategy.config();

    let name = resolve_display_name(profile, config)?;

    let tenant = resolve_primary(provisioner, profile, config).await?;
    *stage = LoginStage::TenantResolved;

    let primary =
        provision_primary_account(provisioner, profile, &name, &tenant, tokens, config, ip).await?;
    *stage = LoginStage::AccountProvisioned;

    let secondary =
        provision_secondary_account(provisioner, profile, &name, tokens, config, ip).await?;
    *stage = LoginStage::SecondarySwitchEvaluated;

    Ok(select_result(primary, secondary, wanted))
}
