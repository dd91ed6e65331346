pub mod driver;
pub mod routes;

use crate::application::commands::AppState;
use crate::infrastructure::error::InfraError;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::planner::router())
        .merge(routes::tasks::router())
        .merge(routes::timer::router())
        .merge(routes::data::router())
        .with_state(state)
        .layer(cors)
}

/// Serves the API until ctrl-c.
pub async fn serve(state: SharedState, host: &str, port: u16) -> Result<(), InfraError> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "daygrid listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
