use axum::{
    Json,
    extract::{Path, State},
};
use storage::{
    dto::{StageClassificationResponse, StageResponse},
    models::{RallyId, StageId},
};

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/rallies/{rally_id}/stages",
    params(
        ("rally_id" = String, Path, description = "Rally id")
    ),
    responses(
        (status = 200, description = "Stages in ordinal order", body = Vec<StageResponse>),
        (status = 404, description = "Rally not found")
    ),
    tag = "stages"
)]
pub async fn list_stages(
    State(state): State<AppState>,
    Path(rally_id): Path<String>,
) -> Result<Json<Vec<StageResponse>>, WebError> {
    let stages = services::stages_in_order(&state, &RallyId::from(rally_id)).await?;

    Ok(Json(stages.into_iter().map(StageResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/rallies/{rally_id}/stages/{stage_id}/classification",
    params(
        ("rally_id" = String, Path, description = "Rally id"),
        ("stage_id" = String, Path, description = "Stage id")
    ),
    responses(
        (status = 200, description = "Ranked stage result", body = StageClassificationResponse),
        (status = 404, description = "Unknown rally or stage, or stage not run yet"),
        (status = 409, description = "Stage cancelled")
    ),
    tag = "stages"
)]
pub async fn get_stage_classification(
    State(state): State<AppState>,
    Path((rally_id, stage_id)): Path<(String, String)>,
) -> Result<Json<StageClassificationResponse>, WebError> {
    let classification = services::stage_classification(
        &state,
        &RallyId::from(rally_id),
        &StageId::from(stage_id),
    )
    .await?;

    Ok(Json(StageClassificationResponse::from(classification.as_ref())))
}

#[utoipa::path(
    post,
    path = "/api/rallies/{rally_id}/stages/sync",
    params(
        ("rally_id" = String, Path, description = "Rally id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Stage definitions reloaded", body = Vec<StageResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Rally not found"),
        (status = 409, description = "Stored stages are inconsistent")
    ),
    tag = "stages"
)]
pub async fn sync_stages(
    State(state): State<AppState>,
    Path(rally_id): Path<String>,
) -> Result<Json<Vec<StageResponse>>, WebError> {
    let stages = services::sync_stages(&state, &RallyId::from(rally_id)).await?;

    Ok(Json(stages.into_iter().map(StageResponse::from).collect()))
}
