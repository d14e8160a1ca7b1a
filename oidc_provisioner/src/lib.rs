//! oidc_provisioner - OpenID Connect login with team and user provisioning
//!
//! A login runs through the identity provider's authorization code flow, reads
//! the userinfo profile and maps it onto a team and a user:
//!
//! - the first group starting with the configured prefix (`fc_` by default)
//!   names the user's primary team, `<short>.<base domain>`
//! - the team, its authentication provider, the user and the token material
//!   are found or created through a [`Provisioner`]
//! - every user is also provisioned into a fixed secondary team, and the login
//!   lands there when it was started from that team's domain

mod config;
mod coordination;
mod oidc;
mod provisioning;
mod storage;
mod tenant;
mod utils;

#[cfg(test)]
mod test_utils;

pub use config::AUTH_ROUTE_PREFIX;

pub use coordination::{
    AuthenticationResult, CoordinationError, LoginStage, begin_login, build_account_request,
    complete_login, get_authorized_core, login_client, login_host, post_authorized_core,
    provision_login,
    provision_primary_account, provision_secondary_account, resolve_display_name, select_result,
    wanted_domain,
};

pub use oidc::{
    AuthResponse, AuthorizationParams, ClaimPath, Client, LOGIN_QUERY_KEYS, LoginState,
    NoExtraParams,
    OIDC_PROVIDER_NAME, OidcConfig, OidcError, OidcStrategy, OriginalQueryPassthrough, Profile,
    REQUIRED_ENV_VARS, STATE_COOKIE_NAME, TokenSet, clear_state_cookie, fetch_profile,
    verify_login_state,
};

pub use provisioning::{
    AccountRequest, AccountResult, AuthenticationProvider, NewAuthentication,
    NewAuthenticationProvider, NewTeam, NewUser, Provisioner, ProvisioningError, SqlProvisioner,
    Team, TeamProvisionRequest, TeamRequest, User, UserAuthentication, UserProvisionRequest,
    UserRole,
};

pub use storage::{DataStore, PostgresDataStore, SqliteDataStore, StorageError, data_store_from_env};

pub use tenant::{
    PrimaryTenant, TeamDomain, derive_team_domain, ensure_secondary_tenant, resolve_primary,
};

pub use utils::{UtilError, gen_random_string};
