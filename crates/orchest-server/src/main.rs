//! HTTP entrypoint for the pipeline run orchestrator.
//!
//! Exposes `/health`, `/ready`, and `POST /pipeline-runs`. Submitting a run
//! spawns [`orchest_engine::run`] as a background task and returns
//! immediately — the run's own lifecycle is reported to the external
//! tracker, this surface doesn't poll it back.

mod routes;
mod state;

use std::net::SocketAddr;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = orchest_config::Config::from_env()?;
    let state = AppState::new(config).await?;

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let app: Router = routes::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = std::env::var("ORCHEST_SERVER_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()?;

    tracing::info!(%addr, "starting orchest-server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
