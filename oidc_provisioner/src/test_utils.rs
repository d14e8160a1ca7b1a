//! Shared fixtures for unit tests
//!
//! [`MockIdentityProvider`] serves the token and userinfo endpoints on an
//! ephemeral local port. [`MemoryProvisioner`] keeps teams and users in memory
//! and records which operations the login flow called.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::oidc::{OidcConfig, OidcStrategy, full_env};
use crate::provisioning::{
    AccountRequest, AccountResult, AuthenticationProvider, NewAuthenticationProvider, NewTeam,
    Provisioner, ProvisioningError, Team, TeamProvisionRequest, TeamRequest, User,
    UserAuthentication, UserProvisionRequest,
};

const MOCK_ACCESS_TOKEN: &str = "mock-access-token";
const MOCK_CODE: &str = "good-code";

#[derive(Default)]
struct IdpState {
    profile: Option<Value>,
    token_forms: Vec<HashMap<String, String>>,
    userinfo_methods: Vec<String>,
    authorizations: Vec<String>,
}

type SharedIdpState = Arc<Mutex<IdpState>>;

fn lock(state: &SharedIdpState) -> MutexGuard<'_, IdpState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Identity provider stand-in bound to `127.0.0.1:0`.
pub struct MockIdentityProvider {
    base_url: String,
    state: SharedIdpState,
}

impl MockIdentityProvider {
    pub async fn start() -> Self {
        let state = SharedIdpState::default();

        let app = Router::new()
            .route("/token", post(token))
            .route("/userinfo", get(userinfo).post(userinfo))
            .route("/userinfo/raw", get(raw_userinfo))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock identity provider");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock identity provider");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn userinfo_url(&self) -> String {
        format!("{}/userinfo", self.base_url)
    }

    /// Userinfo endpoint answering 200 with a body that is not JSON.
    pub fn raw_text_url(&self) -> String {
        format!("{}/userinfo/raw", self.base_url)
    }

    /// Strategy pointing its token endpoint here and its userinfo endpoint at `userinfo_url`.
    pub fn strategy(&self, userinfo_url: &str) -> OidcStrategy {
        let mut env = full_env();
        env.insert("OIDC_TOKEN_URI", format!("{}/token", self.base_url));
        env.insert("OIDC_USERINFO_URI", userinfo_url.to_string());

        let config = OidcConfig::from_lookup(|k| env.get(k).cloned())
            .expect("lookup")
            .expect("configured");
        OidcStrategy::new(config).expect("strategy")
    }

    pub fn set_profile(&self, profile: Value) {
        lock(&self.state).profile = Some(profile);
    }

    pub fn last_token_form(&self) -> Option<HashMap<String, String>> {
        lock(&self.state).token_forms.last().cloned()
    }

    pub fn userinfo_methods(&self) -> Vec<String> {
        lock(&self.state).userinfo_methods.clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        lock(&self.state).authorizations.last().cloned()
    }
}

async fn token(
    State(state): State<SharedIdpState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let accepted = form.get("code").map(String::as_str) == Some(MOCK_CODE);
    lock(&state).token_forms.push(form);

    if !accepted {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        )
            .into_response();
    }

    Json(json!({
        "access_token": MOCK_ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": "mock-refresh-token",
        "scope": "openid profile email",
    }))
    .into_response()
}

async fn userinfo(
    State(state): State<SharedIdpState>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let authorization = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut state = lock(&state);
    state.userinfo_methods.push(method.to_string());
    state.authorizations.push(authorization.clone());

    if authorization != format!("Bearer {MOCK_ACCESS_TOKEN}") {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let profile = state.profile.clone().unwrap_or_else(|| {
        json!({"email": "user@example.com", "name": "User", "groups": ["fc_acme"]})
    });
    Json(profile).into_response()
}

async fn raw_userinfo() -> &'static str {
    "<html>not json</html>"
}

#[derive(Default)]
struct MemoryState {
    teams: Vec<Team>,
    users: Vec<User>,
    providers: Vec<AuthenticationProvider>,
    authentications: Vec<UserAuthentication>,
    calls: HashMap<&'static str, usize>,
    failing: HashSet<String>,
}

impl MemoryState {
    fn record(&mut self, operation: &'static str) -> Result<(), ProvisioningError> {
        *self.calls.entry(operation).or_default() += 1;
        if self.failing.contains(operation) {
            return Err(ProvisioningError::Storage(format!(
                "{operation} unavailable"
            )));
        }
        Ok(())
    }

    /// Returns the team and whether it was created.
    fn insert_team(&mut self, new_team: &NewTeam) -> (Team, bool) {
        if let Some(team) = self.teams.iter().find(|t| t.domain == new_team.domain) {
            return (team.clone(), false);
        }
        let team = Team::new(
            new_team.name.clone(),
            new_team.domain.clone(),
            new_team.subdomain.clone(),
        );
        self.teams.push(team.clone());
        (team, true)
    }

    fn insert_provider(
        &mut self,
        team_id: &str,
        provider: &NewAuthenticationProvider,
    ) -> AuthenticationProvider {
        if let Some(existing) = self.providers.iter().find(|p| {
            p.team_id == team_id && p.name == provider.name && p.provider_id == provider.provider_id
        }) {
            return existing.clone();
        }
        let created = AuthenticationProvider::new(team_id, provider);
        self.providers.push(created.clone());
        created
    }

    fn insert_user(&mut self, user: User) -> (User, bool) {
        if let Some(existing) = self
            .users
            .iter()
            .find(|u| u.team_id == user.team_id && u.email == user.email)
        {
            return (existing.clone(), false);
        }
        self.users.push(user.clone());
        (user, true)
    }

    fn upsert_authentication(&mut self, authentication: UserAuthentication) {
        self.authentications.retain(|a| {
            a.authentication_provider_id != authentication.authentication_provider_id
                || a.provider_id != authentication.provider_id
        });
        self.authentications.push(authentication);
    }
}

/// In-memory [`Provisioner`] with call counting and failure injection.
#[derive(Default)]
pub struct MemoryProvisioner {
    state: Mutex<MemoryState>,
}

impl MemoryProvisioner {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a team directly, optionally with a provider whose id is the team domain.
    pub fn seed_team(
        &self,
        name: &str,
        domain: &str,
        subdomain: &str,
        provider_name: Option<&str>,
    ) -> Team {
        let mut state = self.state();
        let (team, _) = state.insert_team(&NewTeam {
            name: name.to_string(),
            domain: domain.to_string(),
            subdomain: subdomain.to_string(),
        });
        if let Some(provider_name) = provider_name {
            state.insert_provider(
                &team.id,
                &NewAuthenticationProvider {
                    name: provider_name.to_string(),
                    provider_id: domain.to_string(),
                },
            );
        }
        team
    }

    /// Make every later call of `operation` fail with a storage error.
    pub fn fail_on(&self, operation: &str) {
        self.state().failing.insert(operation.to_string());
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    pub fn team_count(&self) -> usize {
        self.state().teams.len()
    }

    pub fn authentication_count(&self, user_id: &str) -> usize {
        self.state()
            .authentications
            .iter()
            .filter(|a| a.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl Provisioner for MemoryProvisioner {
    async fn find_team_by_domain(&self, domain: &str) -> Result<Option<Team>, ProvisioningError> {
        let mut state = self.state();
        state.record("find_team_by_domain")?;
        Ok(state.teams.iter().find(|t| t.domain == domain).cloned())
    }

    async fn provision_team(
        &self,
        request: TeamProvisionRequest,
    ) -> Result<Team, ProvisioningError> {
        let mut state = self.state();
        state.record("provision_team")?;
        let (team, _) = state.insert_team(&request.team);
        state.insert_provider(&team.id, &request.authentication_provider);
        Ok(team)
    }

    async fn provision_account(
        &self,
        request: AccountRequest,
    ) -> Result<AccountResult, ProvisioningError> {
        let mut state = self.state();
        state.record("provision_account")?;

        let (team, is_new_team) = match &request.team {
            TeamRequest::Existing { team_id } => {
                let team = state
                    .teams
                    .iter()
                    .find(|t| &t.id == team_id)
                    .cloned()
                    .ok_or_else(|| ProvisioningError::NotFound(format!("Team {team_id} not found")))?;
                (team, false)
            }
            TeamRequest::New(new_team) => state.insert_team(new_team),
        };

        let provider = state.insert_provider(&team.id, &request.authentication_provider);

        let linked = state
            .authentications
            .iter()
            .find(|a| {
                a.authentication_provider_id == provider.id
                    && a.provider_id == request.authentication.provider_id
            })
            .and_then(|a| state.users.iter().find(|u| u.id == a.user_id))
            .cloned();

        let (user, is_new_user) = match linked {
            Some(user) => (user, false),
            None => state.insert_user(User::new(&team.id, &request.user)),
        };

        state.upsert_authentication(UserAuthentication::new(
            &user.id,
            &provider.id,
            &request.authentication,
        ));

        Ok(AccountResult {
            user,
            team,
            is_new_user,
            is_new_team,
        })
    }

    async fn find_user_by_team_and_name(
        &self,
        team_id: &str,
        name: &str,
    ) -> Result<Option<User>, ProvisioningError> {
        let mut state = self.state();
        state.record("find_user_by_team_and_name")?;
        Ok(state
            .users
            .iter()
            .find(|u| u.team_id == team_id && u.name == name)
            .cloned())
    }

    async fn provision_user(
        &self,
        request: UserProvisionRequest,
    ) -> Result<(User, bool), ProvisioningError> {
        let mut state = self.state();
        state.record("provision_user")?;

        let (user, is_new) = state.insert_user(User::new(&request.team_id, &request.user));
        if let Some((provider_id, authentication)) = &request.authentication {
            state.upsert_authentication(UserAuthentication::new(
                &user.id,
                provider_id,
                authentication,
            ));
        }
        Ok((user, is_new))
    }

    async fn find_authentication_provider(
        &self,
        name: &str,
        team_id: &str,
        provider_id: &str,
    ) -> Result<Option<AuthenticationProvider>, ProvisioningError> {
        let mut state = self.state();
        state.record("find_authentication_provider")?;
        Ok(state
            .providers
            .iter()
            .find(|p| p.name == name && p.team_id == team_id && p.provider_id == provider_id)
            .cloned())
    }
}
