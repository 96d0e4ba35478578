use std::sync::Arc;
use axum::{Extension, Json, Router};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::{serde_as, NoneAsEmptyString};
use crate::controller::{repo_error_response, AppState};
use crate::models::property::{NewProperty, PropertySearchOptions};
use crate::repositories::postgres_repo::PostgresRepo;
use crate::repositories::property_query::DEFAULT_LIMIT;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(search_properties).post(add_property))
        .route_layer(Extension(app_state.postgres_repo))
}

#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LimitParam {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub limit: Option<i64>,
}

pub async fn search_properties(
    Extension(postgres_repo): Extension<Arc<PostgresRepo>>,
    Query(options): Query<PropertySearchOptions>,
    Query(limit): Query<LimitParam>,
) -> impl IntoResponse {
    let properties_res = postgres_repo
        .get_all_properties(
            &options,
            limit.limit.unwrap_or(DEFAULT_LIMIT),
        ).await;

    return match properties_res {
        Ok(properties) => (
            StatusCode::OK,
            Json(json!({ "properties": properties })),
        ).into_response(),
        Err(e) => repo_error_response("searching for properties", e),
    };
}

pub async fn add_property(
    Extension(postgres_repo): Extension<Arc<PostgresRepo>>,
    Json(body): Json<NewProperty>,
) -> impl IntoResponse {
    let add_property_res = postgres_repo
        .add_property(&body)
        .await;

    return match add_property_res {
        Ok(property) => (StatusCode::OK, Json(property)).into_response(),
        Err(e) => repo_error_response("adding property", e),
    };
}
