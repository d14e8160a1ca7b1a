//! Router for the OIDC login endpoints

use axum::Router;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::state::AuthState;

/// Create the router for the OIDC login endpoints
///
/// With a configured strategy named `oidc` the endpoints are:
/// - `GET  {AUTH_ROUTE_PREFIX}/oidc` starts the login
/// - `GET  {AUTH_ROUTE_PREFIX}/oidc.callback` completes it (query response mode)
/// - `POST {AUTH_ROUTE_PREFIX}/oidc.callback` completes it (form_post response mode)
///
/// `None` registers nothing, so all of the above answer 404.
pub fn oidc_router(state: Option<AuthState>) -> Router {
    oidc_router_no_trace(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`oidc_router`] without the HTTP tracing middleware.
pub fn oidc_router_no_trace(state: Option<AuthState>) -> Router {
    match state {
        Some(state) => {
            tracing::info!(provider = state.strategy.name(), "OIDC login routes registered");
            super::oidc::router(state)
        }
        None => {
            tracing::info!("OIDC login is not configured, no routes registered");
            Router::new()
        }
    }
}
