use std::sync::Arc;

use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oidc_provisioner::SqlProvisioner;
use oidc_provisioner_axum::{AUTH_ROUTE_PREFIX, AuthState, oidc_router};

mod handlers;

use crate::handlers::{ShowResult, index};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=debug,oidc_provisioner=debug,oidc_provisioner_axum=debug,tower_http=info",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provisioner = Arc::new(SqlProvisioner::from_env().await?);

    let mut state = AuthState::from_env(provisioner)?;
    if std::env::var("DEMO_SHOW_RESULT").is_ok_and(|v| v == "true") {
        state = state.map(|s| s.with_completion(Arc::new(ShowResult)));
    }
    if state.is_none() {
        tracing::warn!("OIDC_* variables incomplete, login routes are disabled");
    }

    let app = Router::new()
        .route("/", get(index))
        .nest(AUTH_ROUTE_PREFIX.as_str(), oidc_router(state));

    let addr = std::env::var("DEMO_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
