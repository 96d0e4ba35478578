use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use crate::config::Config;
use crate::helpers::handler_404::page_not_found_handler;
use crate::repositories::postgres_repo::PostgresRepo;
use crate::repositories::RepoError;

pub mod health_check;
pub mod property_controller;
pub mod reservation_controller;
pub mod user_controller;

#[derive(Clone)]
pub struct AppState {
    pub postgres_repo: Arc<PostgresRepo>,
}

pub async fn serve(
    postgres_repo: Arc<PostgresRepo>,
    config: &Config,
) -> anyhow::Result<()> {
    let origins = config.allowed_origins()?;
    let app_state = AppState { postgres_repo };

    let application = router_endpoints(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::OPTIONS
                        ])
                        .allow_origin(origins)
                        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                )
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("API server listening on: {}", addr);
    axum::Server::bind(&addr)
        .serve(application.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Error spinning up the API server")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, draining connections");
}

pub fn router_endpoints(app_state: AppState) -> Router {
    Router::new()
        .merge(health_check::router(app_state.clone()))
        .nest("/users", user_controller::router(app_state.clone()))
        .nest("/reservations", reservation_controller::router(app_state.clone()))
        .nest("/properties", property_controller::router(app_state))
        .fallback(page_not_found_handler)
}

/// Logs the failure and turns it into the response callers see.
pub fn repo_error_response(action: &str, e: RepoError) -> Response {
    warn!("Something went wrong {} due to: {}", action, e);
    let (status, message) = match &e {
        RepoError::InvalidArgument(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
        RepoError::Conflict(reason) => (StatusCode::CONFLICT, reason.clone()),
        RepoError::Pool(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Database unavailable, please try again.".to_string(),
        ),
        RepoError::Query(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed {}, please try again.", action),
        ),
    };

    (status, Json(json!({ "error": message }))).into_response()
}
