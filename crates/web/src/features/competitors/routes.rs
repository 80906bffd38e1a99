use axum::{Router, middleware, routing::put};

use super::handlers::register_competitor;
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    Router::new()
        .route("/:rally_id/competitors/:competitor_id", put(register_competitor))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth))
}
