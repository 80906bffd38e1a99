use axum::{
    Json,
    extract::{Path, State},
};
use storage::{
    dto::{CompetitorResponse, RegisterCompetitorRequest},
    models::{CompetitorId, RallyId},
};
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    put,
    path = "/api/rallies/{rally_id}/competitors/{competitor_id}",
    params(
        ("rally_id" = String, Path, description = "Rally id"),
        ("competitor_id" = String, Path, description = "Competitor id")
    ),
    request_body = RegisterCompetitorRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Competitor registered or updated", body = CompetitorResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Rally not found"),
        (status = 409, description = "Car number already taken")
    ),
    tag = "competitors"
)]
pub async fn register_competitor(
    State(state): State<AppState>,
    Path((rally_id, competitor_id)): Path<(String, String)>,
    Json(req): Json<RegisterCompetitorRequest>,
) -> Result<Json<CompetitorResponse>, WebError> {
    req.validate()?;

    let competitor = req.into_competitor(CompetitorId::from(competitor_id));
    let competitor =
        services::register_competitor(&state, &RallyId::from(rally_id), competitor).await?;

    Ok(Json(CompetitorResponse::from(competitor)))
}
