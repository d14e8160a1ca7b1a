use axum::{
    Router,
    extract::{Form, Query, State},
    response::{Redirect, Response},
    routing::get,
};
use axum_extra::{TypedHeader, headers};
use http::{HeaderMap, StatusCode, header::HOST};

use oidc_provisioner::{
    AuthResponse, begin_login, get_authorized_core, login_client, login_host,
    post_authorized_core,
};

use super::error::IntoResponseError;
use super::state::AuthState;

pub(super) fn router(state: AuthState) -> Router {
    let name = state.strategy.name().to_string();
    Router::new()
        .route(&format!("/{name}"), get(initiate))
        .route(
            &format!("/{name}.callback"),
            get(get_callback).post(post_callback),
        )
        .with_state(state)
}

/// Host the login was started from, without port.
fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(HOST)?
        .to_str()
        .ok()?
        .split(':')
        .next()
        .filter(|host| !host.is_empty())
}

/// First hop of `X-Forwarded-For`.
fn client_ip(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
}

async fn initiate(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<(HeaderMap, Redirect), (StatusCode, String)> {
    let host = login_host(&query, request_host(&headers)).into_response_error()?;
    let client = login_client(&query);

    let (auth_url, cookie_headers) =
        begin_login(&state.strategy, &query, host, client).into_response_error()?;

    Ok((cookie_headers, Redirect::to(&auth_url)))
}

async fn get_callback(
    State(state): State<AuthState>,
    Query(query): Query<AuthResponse>,
    TypedHeader(cookies): TypedHeader<headers::Cookie>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let (cookie_headers, result) = get_authorized_core(
        &state.strategy,
        state.provisioner.as_ref(),
        &query,
        &cookies,
        client_ip(&headers),
    )
    .await
    .into_response_error()?;

    Ok(state.completion.complete(cookie_headers, result).await)
}

/// Callback for the form_post response mode.
///
/// The state cookie only arrives here when it was set with `SameSite=None`,
/// which the initiate route does for https origins.
async fn post_callback(
    State(state): State<AuthState>,
    TypedHeader(cookies): TypedHeader<headers::Cookie>,
    headers: HeaderMap,
    Form(form): Form<AuthResponse>,
) -> Result<Response, (StatusCode, String)> {
    let (cookie_headers, result) = post_authorized_core(
        &state.strategy,
        state.provisioner.as_ref(),
        &form,
        &cookies,
        client_ip(&headers),
    )
    .await
    .into_response_error()?;

    Ok(state.completion.complete(cookie_headers, result).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_request_host_strips_port() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("acme.corp.io:3000"));
        assert_eq!(request_host(&headers), Some("acme.corp.io"));

        headers.insert(HOST, HeaderValue::from_static("ig.corp.io"));
        assert_eq!(request_host(&headers), Some("ig.corp.io"));

        assert_eq!(request_host(&HeaderMap::new()), None);
    }

    #[test]
    fn test_client_ip_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.1, 172.16.0.1"),
        );
        assert_eq!(client_ip(&headers), Some("10.0.0.1"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
