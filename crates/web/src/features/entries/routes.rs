use axum::{Router, middleware, routing::post};

use super::handlers::{submit_batch, submit_entry};
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    Router::new()
        .route("/:rally_id/entries", post(submit_entry))
        .route("/:rally_id/entries/batch", post(submit_batch))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth))
}
