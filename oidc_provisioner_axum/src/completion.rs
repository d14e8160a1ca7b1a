use async_trait::async_trait;
use axum::response::{IntoResponse, Redirect, Response};
use http::HeaderMap;
use oidc_provisioner::{AuthenticationResult, Client, OidcConfig};

use super::config::{OIDC_REDIRECT_DESKTOP_PATH, OIDC_REDIRECT_WEB_PATH};

/// Turns a successful login into the HTTP response.
///
/// `headers` expire the state cookie and must be sent with the response.
/// Applications hook their session handling in here.
#[async_trait]
pub trait LoginCompletion: Send + Sync {
    async fn complete(&self, headers: HeaderMap, result: AuthenticationResult) -> Response;
}

/// Redirects to the team's own domain.
#[derive(Debug, Clone)]
pub struct TeamRedirect {
    scheme: &'static str,
}

impl TeamRedirect {
    /// Use the scheme of the application URL for team URLs.
    pub fn new(config: &OidcConfig) -> Self {
        let scheme = if config.app_url.starts_with("https://") {
            "https"
        } else {
            "http"
        };
        Self { scheme }
    }

    pub fn location(&self, result: &AuthenticationResult) -> String {
        let path = match result.client {
            Client::Web => OIDC_REDIRECT_WEB_PATH.as_str(),
            Client::Desktop => OIDC_REDIRECT_DESKTOP_PATH.as_str(),
        };
        format!("{}://{}{}", self.scheme, result.team.domain, path)
    }
}

#[async_trait]
impl LoginCompletion for TeamRedirect {
    async fn complete(&self, headers: HeaderMap, result: AuthenticationResult) -> Response {
        let location = self.location(&result);
        tracing::debug!(
            user_id = %result.user.id,
            team_id = %result.team.id,
            location,
            "Redirecting after login"
        );
        (headers, Redirect::to(&location)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oidc_provisioner::{NewUser, Team, User};

    fn result(client: Client) -> AuthenticationResult {
        let team = Team::new(
            "Wiki acme".to_string(),
            "acme.corp.io".to_string(),
            "acme".to_string(),
        );
        let user = User::new(
            &team.id,
            &NewUser {
                name: "Alice".to_string(),
                email: "a@x.com".to_string(),
                ..Default::default()
            },
        );
        AuthenticationResult {
            user,
            team,
            is_new_user: true,
            is_new_team: true,
            client,
        }
    }

    fn redirect() -> TeamRedirect {
        TeamRedirect { scheme: "https" }
    }

    #[test]
    fn test_location_per_client() {
        assert_eq!(
            redirect().location(&result(Client::Web)),
            "https://acme.corp.io/home"
        );
        assert_eq!(
            redirect().location(&result(Client::Desktop)),
            "https://acme.corp.io/desktop-redirect"
        );
    }

    #[tokio::test]
    async fn test_complete_keeps_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::SET_COOKIE,
            http::HeaderValue::from_static("state=; Max-Age=-86400"),
        );

        let response = redirect().complete(headers, result(Client::Web)).await;

        assert_eq!(response.status(), http::StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(http::header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("https://acme.corp.io/home")
        );
        assert!(response.headers().contains_key(http::header::SET_COOKIE));
    }
}
