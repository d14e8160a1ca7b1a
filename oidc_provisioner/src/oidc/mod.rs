mod config;
mod errors;
mod main;
mod strategy;
mod types;

pub use config::{
    LOGIN_QUERY_KEYS, OIDC_PROVIDER_NAME, OidcConfig, REQUIRED_ENV_VARS, STATE_COOKIE_NAME,
};
pub use errors::OidcError;
pub use main::{clear_state_cookie, fetch_profile, verify_login_state};
pub use strategy::{AuthorizationParams, NoExtraParams, OidcStrategy, OriginalQueryPassthrough};
pub use types::{AuthResponse, ClaimPath, Client, LoginState, Profile, TokenSet};

#[cfg(test)]
pub(crate) use config::tests::full_env;
