use async_trait::async_trait;
use axum::{
    Json,
    response::{Html, IntoResponse, Response},
};
use http::HeaderMap;

use oidc_provisioner::AuthenticationResult;
use oidc_provisioner_axum::{AUTH_ROUTE_PREFIX, LoginCompletion};

pub(crate) async fn index() -> Html<String> {
    Html(format!(
        r#"<h1>OIDC provisioning demo</h1>
<p><a href="{prefix}/oidc">Log in</a> | <a href="{prefix}/oidc?client=desktop">Log in (desktop)</a></p>"#,
        prefix = AUTH_ROUTE_PREFIX.as_str()
    ))
}

/// Shows the provisioned user and team instead of redirecting, so a local
/// setup without team subdomains can be tried end to end.
pub(crate) struct ShowResult;

#[async_trait]
impl LoginCompletion for ShowResult {
    async fn complete(&self, headers: HeaderMap, result: AuthenticationResult) -> Response {
        tracing::info!(
            user = %result.user.name,
            team = %result.team.domain,
            "Login completed"
        );
        (headers, Json(result)).into_response()
    }
}
