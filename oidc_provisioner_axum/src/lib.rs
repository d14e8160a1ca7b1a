//! Axum routes for OIDC login with team provisioning
//!
//! Mount [`oidc_router`] under [`AUTH_ROUTE_PREFIX`]. Without a configured
//! strategy the router is empty and every login path answers 404.

mod completion;
mod config;
mod error;
mod oidc;
mod router;
mod state;

pub use completion::{LoginCompletion, TeamRedirect};
pub use config::{OIDC_REDIRECT_DESKTOP_PATH, OIDC_REDIRECT_WEB_PATH};
pub use error::IntoResponseError;
pub use router::{oidc_router, oidc_router_no_trace};
pub use state::AuthState;

pub use oidc_provisioner::AUTH_ROUTE_PREFIX;
