use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use utoipa::ToSchema;

use crate::features::{competitors, entries, stages, standings};
use crate::middleware::auth::ApiKeys;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub rallies_loaded: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        rallies_loaded: state.engine.rally_ids().len(),
    })
}

pub fn router(state: AppState, api_keys: ApiKeys) -> Router {
    let rallies = Router::new()
        .merge(stages::routes::routes(api_keys.clone()))
        .merge(standings::routes::routes())
        .merge(entries::routes::routes(api_keys.clone()))
        .merge(competitors::routes::routes(api_keys));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health))
        .nest("/api/rallies", rallies)
        .layer(cors)
        .with_state(state)
}
