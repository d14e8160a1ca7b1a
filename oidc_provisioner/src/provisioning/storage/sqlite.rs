use sqlx::{Pool, Sqlite};

use crate::provisioning::errors::ProvisioningError;
use crate::provisioning::types::{AuthenticationProvider, Team, User, UserAuthentication};
use crate::storage::{
    DB_TABLE_AUTHENTICATION_PROVIDERS, DB_TABLE_TEAMS, DB_TABLE_USER_AUTHENTICATIONS,
    DB_TABLE_USERS,
};

// SQLite implementations
pub(super) async fn create_tables_sqlite(pool: &Pool<Sqlite>) -> Result<(), ProvisioningError> {
    let teams = DB_TABLE_TEAMS.as_str();
    let users = DB_TABLE_USERS.as_str();
    let providers = DB_TABLE_AUTHENTICATION_PROVIDERS.as_str();
    let authentications = DB_TABLE_USER_AUTHENTICATIONS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {teams} (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            domain TEXT NOT NULL UNIQUE,
            subdomain TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {users} (
            id TEXT PRIMARY KEY NOT NULL,
            team_id TEXT NOT NULL REFERENCES {teams}(id),
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            avatar_url TEXT,
            role TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            UNIQUE (team_id, email)
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE INDEX IF NOT EXISTS idx_{users}_team_name ON {users} (team_id, name)
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {providers} (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            provider_id TEXT NOT NULL,
            team_id TEXT NOT NULL REFERENCES {teams}(id),
            enabled BOOLEAN NOT NULL DEFAULT true,
            created_at TIMESTAMP NOT NULL,
            UNIQUE (team_id, name, provider_id)
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {authentications} (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL REFERENCES {users}(id),
            authentication_provider_id TEXT NOT NULL REFERENCES {providers}(id),
            provider_id TEXT NOT NULL,
            access_token TEXT NOT NULL,
            refresh_token TEXT,
            scopes TEXT NOT NULL,
            expires_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            UNIQUE (authentication_provider_id, provider_id)
        )
        "#
    ))
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn get_team_by_domain_sqlite(
    pool: &Pool<Sqlite>,
    domain: &str,
) -> Result<Option<Team>, ProvisioningError> {
    let table_name = DB_TABLE_TEAMS.as_str();

    Ok(sqlx::query_as::<_, Team>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE domain = ?
        "#
    ))
    .bind(domain)
    .fetch_optional(pool)
    .await?)
}

pub(super) async fn get_team_by_id_sqlite(
    pool: &Pool<Sqlite>,
    id: &str,
) -> Result<Option<Team>, ProvisioningError> {
    let table_name = DB_TABLE_TEAMS.as_str();

    Ok(sqlx::query_as::<_, Team>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

/// Insert unless the domain is taken, then return whichever row owns it.
pub(super) async fn insert_team_sqlite(
    pool: &Pool<Sqlite>,
    team: &Team,
) -> Result<Team, ProvisioningError> {
    let table_name = DB_TABLE_TEAMS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (id, name, domain, subdomain, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (domain) DO NOTHING
        "#
    ))
    .bind(&team.id)
    .bind(&team.name)
    .bind(&team.domain)
    .bind(&team.subdomain)
    .bind(team.created_at)
    .bind(team.updated_at)
    .execute(pool)
    .await?;

    get_team_by_domain_sqlite(pool, &team.domain)
        .await?
        .ok_or_else(|| ProvisioningError::Conflict(format!("Team {} vanished", team.domain)))
}

pub(super) async fn get_authentication_provider_sqlite(
    pool: &Pool<Sqlite>,
    name: &str,
    team_id: &str,
    provider_id: &str,
) -> Result<Option<AuthenticationProvider>, ProvisioningError> {
    let table_name = DB_TABLE_AUTHENTICATION_PROVIDERS.as_str();

    Ok(sqlx::query_as::<_, AuthenticationProvider>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE name = ? AND team_id = ? AND provider_id = ?
        "#
    ))
    .bind(name)
    .bind(team_id)
    .bind(provider_id)
    .fetch_optional(pool)
    .await?)
}

pub(super) async fn insert_authentication_provider_sqlite(
    pool: &Pool<Sqlite>,
    provider: &AuthenticationProvider,
) -> Result<AuthenticationProvider, ProvisioningError> {
    let table_name = DB_TABLE_AUTHENTICATION_PROVIDERS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (id, name, provider_id, team_id, enabled, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (team_id, name, provider_id) DO NOTHING
        "#
    ))
    .bind(&provider.id)
    .bind(&provider.name)
    .bind(&provider.provider_id)
    .bind(&provider.team_id)
    .bind(provider.enabled)
    .bind(provider.created_at)
    .execute(pool)
    .await?;

    get_authentication_provider_sqlite(
        pool,
        &provider.name,
        &provider.team_id,
        &provider.provider_id,
    )
    .await?
    .ok_or_else(|| {
        ProvisioningError::Conflict(format!("Authentication provider {} vanished", provider.id))
    })
}

pub(super) async fn get_user_by_team_and_name_sqlite(
    pool: &Pool<Sqlite>,
    team_id: &str,
    name: &str,
) -> Result<Option<User>, ProvisioningError> {
    let table_name = DB_TABLE_USERS.as_str();

    Ok(sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE team_id = ? AND name = ?
        ORDER BY created_at ASC LIMIT 1
        "#
    ))
    .bind(team_id)
    .bind(name)
    .fetch_optional(pool)
    .await?)
}

pub(super) async fn get_user_by_team_and_email_sqlite(
    pool: &Pool<Sqlite>,
    team_id: &str,
    email: &str,
) -> Result<Option<User>, ProvisioningError> {
    let table_name = DB_TABLE_USERS.as_str();

    Ok(sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE team_id = ? AND email = ?
        "#
    ))
    .bind(team_id)
    .bind(email)
    .fetch_optional(pool)
    .await?)
}

pub(super) async fn get_user_by_authentication_sqlite(
    pool: &Pool<Sqlite>,
    authentication_provider_id: &str,
    provider_id: &str,
) -> Result<Option<User>, ProvisioningError> {
    let users = DB_TABLE_USERS.as_str();
    let authentications = DB_TABLE_USER_AUTHENTICATIONS.as_str();

    Ok(sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT u.* FROM {users} u
        INNER JOIN {authentications} a ON a.user_id = u.id
        WHERE a.authentication_provider_id = ? AND a.provider_id = ?
        "#
    ))
    .bind(authentication_provider_id)
    .bind(provider_id)
    .fetch_optional(pool)
    .await?)
}

/// Insert unless the email is taken in the team, then return whichever row owns it.
pub(super) async fn insert_user_sqlite(
    pool: &Pool<Sqlite>,
    user: &User,
) -> Result<User, ProvisioningError> {
    let table_name = DB_TABLE_USERS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (id, team_id, name, email, avatar_url, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (team_id, email) DO NOTHING
        "#
    ))
    .bind(&user.id)
    .bind(&user.team_id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.avatar_url)
    .bind(user.role.as_str())
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await?;

    get_user_by_team_and_email_sqlite(pool, &user.team_id, &user.email)
        .await?
        .ok_or_else(|| ProvisioningError::Conflict(format!("User {} vanished", user.id)))
}

pub(super) async fn upsert_user_authentication_sqlite(
    pool: &Pool<Sqlite>,
    authentication: &UserAuthentication,
) -> Result<(), ProvisioningError> {
    let table_name = DB_TABLE_USER_AUTHENTICATIONS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name}
            (id, user_id, authentication_provider_id, provider_id, access_token,
             refresh_token, scopes, expires_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (authentication_provider_id, provider_id) DO UPDATE SET
            access_token = excluded.access_token,
            refresh_token = excluded.refresh_token,
            scopes = excluded.scopes,
            expires_at = excluded.expires_at,
            updated_at = excluded.updated_at
        "#
    ))
    .bind(&authentication.id)
    .bind(&authentication.user_id)
    .bind(&authentication.authentication_provider_id)
    .bind(&authentication.provider_id)
    .bind(&authentication.access_token)
    .bind(&authentication.refresh_token)
    .bind(authentication.scopes.join(" "))
    .bind(authentication.expires_at)
    .bind(authentication.created_at)
    .bind(authentication.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}
