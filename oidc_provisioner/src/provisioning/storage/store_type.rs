use std::sync::Arc;

use async_trait::async_trait;

use crate::provisioning::errors::ProvisioningError;
use crate::provisioning::provisioner::Provisioner;
use crate::provisioning::types::{
    AccountRequest, AccountResult, AuthenticationProvider, Team, TeamProvisionRequest,
    TeamRequest, User, UserAuthentication, UserProvisionRequest,
};
use crate::storage::{DataStore, SqliteDataStore, data_store_from_env};

use super::postgres::*;
use super::sqlite::*;

/// [`Provisioner`] backed by the SQLite or PostgreSQL data store.
///
/// Uniqueness of team domains, per-team emails and provider links is left to
/// the database; every insert is followed by a read of the winning row.
#[derive(Clone)]
pub struct SqlProvisioner {
    store: Arc<dyn DataStore>,
}

impl SqlProvisioner {
    /// Wrap a data store and create the tables.
    pub async fn connect(store: Arc<dyn DataStore>) -> Result<Self, ProvisioningError> {
        let provisioner = Self { store };
        provisioner.init().await?;
        Ok(provisioner)
    }

    /// Connect to the store named by `GENERIC_DATA_STORE_TYPE`/`GENERIC_DATA_STORE_URL`.
    pub async fn from_env() -> Result<Self, ProvisioningError> {
        Self::connect(data_store_from_env()?).await
    }

    pub async fn in_memory() -> Result<Self, ProvisioningError> {
        Self::connect(Arc::new(SqliteDataStore::in_memory()?)).await
    }

    /// Initialize the provisioning tables
    pub async fn init(&self) -> Result<(), ProvisioningError> {
        let store = &self.store;

        match (store.as_sqlite(), store.as_postgres()) {
            (Some(pool), _) => create_tables_sqlite(pool).await,
            (_, Some(pool)) => create_tables_postgres(pool).await,
            _ => Err(ProvisioningError::Storage(
                "Unsupported database type".to_string(),
            )),
        }
    }

    async fn get_team_by_id(&self, id: &str) -> Result<Option<Team>, ProvisioningError> {
        if let Some(pool) = self.store.as_sqlite() {
            get_team_by_id_sqlite(pool, id).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_team_by_id_postgres(pool, id).await
        } else {
            Err(unsupported())
        }
    }

    async fn insert_team(&self, team: &Team) -> Result<Team, ProvisioningError> {
        if let Some(pool) = self.store.as_sqlite() {
            insert_team_sqlite(pool, team).await
        } else if let Some(pool) = self.store.as_postgres() {
            insert_team_postgres(pool, team).await
        } else {
            Err(unsupported())
        }
    }

    async fn insert_authentication_provider(
        &self,
        provider: &AuthenticationProvider,
    ) -> Result<AuthenticationProvider, ProvisioningError> {
        if let Some(pool) = self.store.as_sqlite() {
            insert_authentication_provider_sqlite(pool, provider).await
        } else if let Some(pool) = self.store.as_postgres() {
            insert_authentication_provider_postgres(pool, provider).await
        } else {
            Err(unsupported())
        }
    }

    async fn get_user_by_authentication(
        &self,
        authentication_provider_id: &str,
        provider_id: &str,
    ) -> Result<Option<User>, ProvisioningError> {
        if let Some(pool) = self.store.as_sqlite() {
            get_user_by_authentication_sqlite(pool, authentication_provider_id, provider_id).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_user_by_authentication_postgres(pool, authentication_provider_id, provider_id)
                .await
        } else {
            Err(unsupported())
        }
    }

    async fn get_user_by_team_and_email(
        &self,
        team_id: &str,
        email: &str,
    ) -> Result<Option<User>, ProvisioningError> {
        if let Some(pool) = self.store.as_sqlite() {
            get_user_by_team_and_email_sqlite(pool, team_id, email).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_user_by_team_and_email_postgres(pool, team_id, email).await
        } else {
            Err(unsupported())
        }
    }

    async fn insert_user(&self, user: &User) -> Result<User, ProvisioningError> {
        if let Some(pool) = self.store.as_sqlite() {
            insert_user_sqlite(pool, user).await
        } else if let Some(pool) = self.store.as_postgres() {
            insert_user_postgres(pool, user).await
        } else {
            Err(unsupported())
        }
    }

    async fn upsert_user_authentication(
        &self,
        authentication: &UserAuthentication,
    ) -> Result<(), ProvisioningError> {
        if let Some(pool) = self.store.as_sqlite() {
            upsert_user_authentication_sqlite(pool, authentication).await
        } else if let Some(pool) = self.store.as_postgres() {
            upsert_user_authentication_postgres(pool, authentication).await
        } else {
            Err(unsupported())
        }
    }
}

fn unsupported() -> ProvisioningError {
    ProvisioningError::Storage("Unsupported database type".to_string())
}

#[async_trait]
impl Provisioner for SqlProvisioner {
    #[tracing::instrument(skip_all, fields(domain = %domain))]
    async fn find_team_by_domain(&self, domain: &str) -> Result<Option<Team>, ProvisioningError> {
        let result = if let Some(pool) = self.store.as_sqlite() {
            get_team_by_domain_sqlite(pool, domain).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_team_by_domain_postgres(pool, domain).await
        } else {
            Err(unsupported())
        };

        match &result {
            Ok(team) => tracing::debug!(found = team.is_some(), "Team lookup completed"),
            Err(e) => tracing::error!(error = %e, "Team lookup failed"),
        }

        result
    }

    #[tracing::instrument(skip_all, fields(domain = %request.team.domain))]
    async fn provision_team(
        &self,
        request: TeamProvisionRequest,
    ) -> Result<Team, ProvisioningError> {
        let candidate = Team::new(
            request.team.name,
            request.team.domain,
            request.team.subdomain,
        );
        let team = self.insert_team(&candidate).await?;
        let provider = self
            .insert_authentication_provider(&AuthenticationProvider::new(
                &team.id,
                &request.authentication_provider,
            ))
            .await?;

        tracing::info!(
            team_id = %team.id,
            is_new_team = team.id == candidate.id,
            authentication_provider_id = %provider.id,
            "Team provisioned"
        );
        Ok(team)
    }

    #[tracing::instrument(skip_all, fields(email = %request.user.email))]
    async fn provision_account(
        &self,
        request: AccountRequest,
    ) -> Result<AccountResult, ProvisioningError> {
        let (team, is_new_team) = match &request.team {
            TeamRequest::Existing { team_id } => {
                let team = self.get_team_by_id(team_id).await?.ok_or_else(|| {
                    ProvisioningError::NotFound(format!("Team {team_id} not found"))
                })?;
                (team, false)
            }
            TeamRequest::New(new_team) => {
                let candidate = Team::new(
                    new_team.name.clone(),
                    new_team.domain.clone(),
                    new_team.subdomain.clone(),
                );
                let team = self.insert_team(&candidate).await?;
                let is_new = team.id == candidate.id;
                (team, is_new)
            }
        };

        let provider = self
            .insert_authentication_provider(&AuthenticationProvider::new(
                &team.id,
                &request.authentication_provider,
            ))
            .await?;

        let known = match self
            .get_user_by_authentication(&provider.id, &request.authentication.provider_id)
            .await?
        {
            Some(user) => Some(user),
            None => {
                self.get_user_by_team_and_email(&team.id, &request.user.email)
                    .await?
            }
        };

        let (user, is_new_user) = match known {
            Some(user) => (user, false),
            None => {
                let candidate = User::new(&team.id, &request.user);
                let user = self.insert_user(&candidate).await?;
                let is_new = user.id == candidate.id;
                (user, is_new)
            }
        };

        self.upsert_user_authentication(&UserAuthentication::new(
            &user.id,
            &provider.id,
            &request.authentication,
        ))
        .await?;

        tracing::info!(
            team_id = %team.id,
            user_id = %user.id,
            is_new_team,
            is_new_user,
            ip = request.ip.as_deref().unwrap_or("-"),
            "Account provisioned"
        );

        Ok(AccountResult {
            user,
            team,
            is_new_user,
            is_new_team,
        })
    }

    #[tracing::instrument(skip_all, fields(team_id = %team_id))]
    async fn find_user_by_team_and_name(
        &self,
        team_id: &str,
        name: &str,
    ) -> Result<Option<User>, ProvisioningError> {
        if let Some(pool) = self.store.as_sqlite() {
            get_user_by_team_and_name_sqlite(pool, team_id, name).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_user_by_team_and_name_postgres(pool, team_id, name).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip_all, fields(team_id = %request.team_id))]
    async fn provision_user(
        &self,
        request: UserProvisionRequest,
    ) -> Result<(User, bool), ProvisioningError> {
        let candidate = User::new(&request.team_id, &request.user);
        let user = self.insert_user(&candidate).await?;
        let is_new = user.id == candidate.id;

        if let Some((authentication_provider_id, authentication)) = &request.authentication {
            self.upsert_user_authentication(&UserAuthentication::new(
                &user.id,
                authentication_provider_id,
                authentication,
            ))
            .await?;
        }

        tracing::info!(user_id = %user.id, role = user.role.as_str(), is_new, "User provisioned");
        Ok((user, is_new))
    }

    #[tracing::instrument(skip_all, fields(team_id = %team_id))]
    async fn find_authentication_provider(
        &self,
        name: &str,
        team_id: &str,
        provider_id: &str,
    ) -> Result<Option<AuthenticationProvider>, ProvisioningError> {
        if let Some(pool) = self.store.as_sqlite() {
            get_authentication_provider_sqlite(pool, name, team_id, provider_id).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_authentication_provider_postgres(pool, name, team_id, provider_id).await
        } else {
            Err(unsupported())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioning::types::{
        NewAuthentication, NewAuthenticationProvider, NewTeam, NewUser, UserRole,
    };

    fn account_request(team: TeamRequest, email: &str, subject: &str) -> AccountRequest {
        AccountRequest {
            ip: Some("127.0.0.1".to_string()),
            team,
            user: NewUser {
                name: "Alice".to_string(),
                email: email.to_string(),
                avatar_url: None,
                role: None,
            },
            authentication_provider: NewAuthenticationProvider {
                name: "oidc".to_string(),
                provider_id: "acme.corp.io".to_string(),
            },
            authentication: NewAuthentication {
                provider_id: subject.to_string(),
                access_token: "at".to_string(),
                refresh_token: Some("rt".to_string()),
                expires_in: Some(3600),
                scopes: vec!["openid".to_string(), "email".to_string()],
            },
        }
    }

    fn new_acme() -> TeamRequest {
        TeamRequest::New(NewTeam {
            name: "Wiki acme".to_string(),
            domain: "acme.corp.io".to_string(),
            subdomain: "acme".to_string(),
        })
    }

    #[tokio::test]
    async fn test_provision_account_creates_then_reuses() {
        let store = SqlProvisioner::in_memory().await.expect("store");

        let first = store
            .provision_account(account_request(new_acme(), "a@x.com", "sub-1"))
            .await
            .expect("first login");
        assert!(first.is_new_team);
        assert!(first.is_new_user);
        assert_eq!(first.team.domain, "acme.corp.io");

        let second = store
            .provision_account(account_request(
                TeamRequest::Existing {
                    team_id: first.team.id.clone(),
                },
                "a@x.com",
                "sub-1",
            ))
            .await
            .expect("second login");
        assert!(!second.is_new_team);
        assert!(!second.is_new_user);
        assert_eq!(second.user.id, first.user.id);

        let provider = store
            .find_authentication_provider("oidc", &first.team.id, "acme.corp.io")
            .await
            .expect("lookup")
            .expect("provider linked");
        assert!(provider.enabled);
    }

    #[tokio::test]
    async fn test_new_team_request_for_existing_domain_reuses_team() {
        let store = SqlProvisioner::in_memory().await.expect("store");

        let first = store
            .provision_account(account_request(new_acme(), "a@x.com", "sub-1"))
            .await
            .expect("first");
        let second = store
            .provision_account(account_request(new_acme(), "b@x.com", "sub-2"))
            .await
            .expect("second");

        assert_eq!(first.team.id, second.team.id);
        assert!(!second.is_new_team);
        assert!(second.is_new_user);
    }

    #[tokio::test]
    async fn test_existing_team_must_exist() {
        let store = SqlProvisioner::in_memory().await.expect("store");
        let result = store
            .provision_account(account_request(
                TeamRequest::Existing {
                    team_id: "missing".to_string(),
                },
                "a@x.com",
                "sub-1",
            ))
            .await;
        assert!(matches!(result, Err(ProvisioningError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_provision_team_is_idempotent() {
        let store = SqlProvisioner::in_memory().await.expect("store");
        let request = TeamProvisionRequest {
            ip: None,
            team: NewTeam {
                name: "Wiki IG".to_string(),
                domain: "ig.corp.io".to_string(),
                subdomain: "ig".to_string(),
            },
            authentication_provider: NewAuthenticationProvider {
                name: "oidc".to_string(),
                provider_id: "ig.corp.io".to_string(),
            },
        };

        let a = store.provision_team(request.clone()).await.expect("a");
        let b = store.provision_team(request).await.expect("b");
        assert_eq!(a.id, b.id);

        let found = store
            .find_team_by_domain("ig.corp.io")
            .await
            .expect("lookup")
            .expect("team");
        assert_eq!(found.id, a.id);
        assert!(
            store
                .find_team_by_domain("IG.corp.io")
                .await
                .expect("lookup")
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_provision_user_and_find_by_name() {
        let store = SqlProvisioner::in_memory().await.expect("store");
        let team = store
            .provision_team(TeamProvisionRequest {
                ip: None,
                team: NewTeam {
                    name: "Wiki IG".to_string(),
                    domain: "ig.corp.io".to_string(),
                    subdomain: "ig".to_string(),
                },
                authentication_provider: NewAuthenticationProvider {
                    name: "oidc".to_string(),
                    provider_id: "ig.corp.io".to_string(),
                },
            })
            .await
            .expect("team");
        let provider = store
            .find_authentication_provider("oidc", &team.id, "ig.corp.io")
            .await
            .expect("lookup")
            .expect("provider");

        let (user, created) = store
            .provision_user(UserProvisionRequest {
                ip: None,
                team_id: team.id.clone(),
                user: NewUser {
                    name: "Alice".to_string(),
                    email: "a@x.com".to_string(),
                    avatar_url: Some("https://x.com/a.png".to_string()),
                    role: Some(UserRole::Admin),
                },
                authentication: Some((
                    provider.id,
                    NewAuthentication {
                        provider_id: "sub-1".to_string(),
                        access_token: "at".to_string(),
                        refresh_token: None,
                        expires_in: None,
                        scopes: vec![],
                    },
                )),
            })
            .await
            .expect("user");
        assert!(created);
        assert_eq!(user.role, UserRole::Admin);

        let found = store
            .find_user_by_team_and_name(&team.id, "Alice")
            .await
            .expect("lookup")
            .expect("user");
        assert_eq!(found.id, user.id);
        assert_eq!(found.avatar_url.as_deref(), Some("https://x.com/a.png"));

        let (again, created) = store
            .provision_user(UserProvisionRequest {
                ip: None,
                team_id: team.id.clone(),
                user: NewUser {
                    name: "Alice Renamed".to_string(),
                    email: "a@x.com".to_string(),
                    ..Default::default()
                },
                authentication: None,
            })
            .await
            .expect("same email");
        assert!(!created);
        assert_eq!(again.id, user.id);
        assert_eq!(again.name, "Alice");
    }

    #[tokio::test]
    async fn test_concurrent_account_provisioning_yields_one_team() {
        let store = SqlProvisioner::in_memory().await.expect("store");

        let (a, b) = tokio::join!(
            store.provision_account(account_request(new_acme(), "a@x.com", "sub-1")),
            store.provision_account(account_request(new_acme(), "a@x.com", "sub-1")),
        );
        let (a, b) = (a.expect("a"), b.expect("b"));

        assert_eq!(a.team.id, b.team.id);
        assert_eq!(a.user.id, b.user.id);
        assert!(a.is_new_team ^ b.is_new_team);
    }
}
