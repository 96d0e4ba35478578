use std::sync::Arc;
use axum::{Extension, Json, Router};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use crate::controller::{repo_error_response, AppState};
use crate::repositories::postgres_repo::PostgresRepo;
use crate::repositories::property_query::DEFAULT_LIMIT;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(get_all_reservations))
        .route_layer(Extension(app_state.postgres_repo))
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GetReservationQuery {
    pub guest_id: i32,
    pub limit: Option<i64>,
}

pub async fn get_all_reservations(
    Extension(postgres_repo): Extension<Arc<PostgresRepo>>,
    Query(query): Query<GetReservationQuery>,
) -> impl IntoResponse {
    let reservations_res = postgres_repo
        .get_all_reservations(
            query.guest_id,
            query.limit.unwrap_or(DEFAULT_LIMIT),
        ).await;

    return match reservations_res {
        Ok(reservations) => (StatusCode::OK, Json(reservations)).into_response(),
        Err(e) => repo_error_response("retrieving guest's reservations", e),
    };
}
