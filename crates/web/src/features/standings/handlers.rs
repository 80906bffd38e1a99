use axum::{
    Json,
    extract::{Path, State},
};
use storage::{dto::OverallStandingsResponse, models::RallyId};

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/rallies/{rally_id}/standings",
    params(
        ("rally_id" = String, Path, description = "Rally id")
    ),
    responses(
        (status = 200, description = "Overall standings after the last completed stage", body = OverallStandingsResponse),
        (status = 404, description = "Rally not found or no competitors registered")
    ),
    tag = "standings"
)]
pub async fn get_overall_standings(
    State(state): State<AppState>,
    Path(rally_id): Path<String>,
) -> Result<Json<OverallStandingsResponse>, WebError> {
    let standings = services::overall_standings(&state, &RallyId::from(rally_id)).await?;

    Ok(Json(OverallStandingsResponse::from(standings.as_ref())))
}
