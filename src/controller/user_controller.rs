use std::sync::Arc;
use axum::{Extension, Json, Router};
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use serde_json::json;
use crate::controller::{repo_error_response, AppState};
use crate::models::user::NewUser;
use crate::repositories::postgres_repo::PostgresRepo;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(get_user_by_email).post(add_user))
        .route("/:id", get(get_user_by_id))
        .route_layer(Extension(app_state.postgres_repo))
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GetUserByEmailQuery {
    pub email: String,
}

pub async fn get_user_by_email(
    Extension(postgres_repo): Extension<Arc<PostgresRepo>>,
    Query(query): Query<GetUserByEmailQuery>,
) -> impl IntoResponse {
    let user_res = postgres_repo
        .get_user_with_email(&query.email)
        .await;

    return match user_res {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("No user with email: {}", query.email) })),
        ).into_response(),
        Err(e) => repo_error_response("retrieving user by email", e),
    };
}

pub async fn get_user_by_id(
    Extension(postgres_repo): Extension<Arc<PostgresRepo>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let user_res = postgres_repo
        .get_user_with_id(id)
        .await;

    return match user_res {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("No user with id: {}", id) })),
        ).into_response(),
        Err(e) => repo_error_response("retrieving user by id", e),
    };
}

pub async fn add_user(
    Extension(postgres_repo): Extension<Arc<PostgresRepo>>,
    Json(body): Json<NewUser>,
) -> impl IntoResponse {
    let add_user_res = postgres_repo
        .add_user(&body)
        .await;

    return match add_user_res {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => repo_error_response("adding user", e),
    };
}
