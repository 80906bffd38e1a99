use axum::{Router, routing::get};

use super::handlers::get_overall_standings;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/:rally_id/standings", get(get_overall_standings))
}
