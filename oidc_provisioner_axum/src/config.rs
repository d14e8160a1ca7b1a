//! Redirect targets used after a completed login

use std::sync::LazyLock;

/// Path on the team's domain a browser login lands on
/// Default: "/home"
pub static OIDC_REDIRECT_WEB_PATH: LazyLock<String> = LazyLock::new(|| {
    std::env::var("OIDC_REDIRECT_WEB_PATH").unwrap_or_else(|_| "/home".to_string())
});

/// Path on the team's domain a desktop-app login lands on
/// Default: "/desktop-redirect"
pub static OIDC_REDIRECT_DESKTOP_PATH: LazyLock<String> = LazyLock::new(|| {
    std::env::var("OIDC_REDIRECT_DESKTOP_PATH").unwrap_or_else(|_| "/desktop-redirect".to_string())
});
