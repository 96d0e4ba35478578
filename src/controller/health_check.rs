use std::sync::Arc;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Router};
use tracing::warn;
use crate::controller::AppState;
use crate::repositories::postgres_repo::PostgresRepo;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health_check))
        .route_layer(Extension(app_state.postgres_repo))
}

/// Healthy only while the database answers.
async fn get_health_check(
    Extension(postgres_repo): Extension<Arc<PostgresRepo>>,
) -> StatusCode {
    match postgres_repo.ping().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            warn!("Health check failed due to: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
