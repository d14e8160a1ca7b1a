//! Central configuration for the oidc_provisioner crate

use std::sync::LazyLock;

/// Route prefix under which the login routes are mounted
///
/// The initiate route is `{AUTH_ROUTE_PREFIX}/{provider}` and the callback is
/// `{AUTH_ROUTE_PREFIX}/{provider}.callback`.
/// Default: "/auth"
pub static AUTH_ROUTE_PREFIX: LazyLock<String> =
    LazyLock::new(|| std::env::var("AUTH_ROUTE_PREFIX").unwrap_or_else(|_| "/auth".to_string()));
