use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::handlers::{get_stage_classification, list_stages, sync_stages};
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    let protected = Router::new()
        .route("/:rally_id/stages/sync", post(sync_stages))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth));

    Router::new()
        .route("/:rally_id/stages", get(list_stages))
        .route(
            "/:rally_id/stages/:stage_id/classification",
            get(get_stage_classification),
        )
        .merge(protected)
}
