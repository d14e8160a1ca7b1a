use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::errors::ProvisioningError;

/// A tenant, identified by `<subdomain>.<base_domain>`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub subdomain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn new(name: String, domain: String, subdomain: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            domain,
            subdomain,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Member,
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = ProvisioningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "viewer" => Ok(Self::Viewer),
            _ => Err(ProvisioningError::InvalidData(format!("Unknown role: {s}"))),
        }
    }
}

impl TryFrom<String> for UserRole {
    type Error = ProvisioningError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A user inside one team.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(team_id: &str, user: &NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            team_id: team_id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
            role: user.role.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Links a team to an identity provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct AuthenticationProvider {
    pub id: String,
    pub name: String,
    pub provider_id: String,
    pub team_id: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl AuthenticationProvider {
    pub fn new(team_id: &str, provider: &NewAuthenticationProvider) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: provider.name.clone(),
            provider_id: provider.provider_id.clone(),
            team_id: team_id.to_string(),
            enabled: true,
            created_at: Utc::now(),
        }
    }
}

/// Token material of one user at one authentication provider.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAuthentication {
    pub id: String,
    pub user_id: String,
    pub authentication_provider_id: String,
    /// Subject identifier at the identity provider
    pub provider_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAuthentication {
    pub fn new(user_id: &str, authentication_provider_id: &str, auth: &NewAuthentication) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            authentication_provider_id: authentication_provider_id.to_string(),
            provider_id: auth.provider_id.clone(),
            access_token: auth.access_token.clone(),
            refresh_token: auth.refresh_token.clone(),
            scopes: auth.scopes.clone(),
            expires_at: auth.expires_at(now),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    /// `None` leaves the store default
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuthenticationProvider {
    pub name: String,
    pub provider_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuthentication {
    pub provider_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Seconds from now
    pub expires_in: Option<i64>,
    pub scopes: Vec<String>,
}

impl NewAuthentication {
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| now + Duration::seconds(secs))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTeam {
    pub name: String,
    pub domain: String,
    pub subdomain: String,
}

/// Team part of an account request.
#[derive(Debug, Clone, PartialEq)]
pub enum TeamRequest {
    /// The team was found during tenant resolution
    Existing { team_id: String },
    /// Create the team unless someone else already did
    New(NewTeam),
}

/// Everything needed to find-or-create a team, provider, user and
/// authentication record in one call.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRequest {
    pub ip: Option<String>,
    pub team: TeamRequest,
    pub user: NewUser,
    pub authentication_provider: NewAuthenticationProvider,
    pub authentication: NewAuthentication,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamProvisionRequest {
    pub ip: Option<String>,
    pub team: NewTeam,
    pub authentication_provider: NewAuthenticationProvider,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProvisionRequest {
    pub ip: Option<String>,
    pub team_id: String,
    pub user: NewUser,
    /// `(authentication_provider_id, authentication)`
    pub authentication: Option<(String, NewAuthentication)>,
}

/// Outcome of provisioning; this is what a login resolves to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountResult {
    pub user: User,
    pub team: Team,
    pub is_new_user: bool,
    pub is_new_team: bool,
}
