use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::{
    dto::{BatchOutcomeResponse, BatchSubmitRequest, EntryOutcomeResponse, SubmitEntryRequest},
    error::EngineError,
    models::RallyId,
    services::SubmissionOutcome,
};
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    post,
    path = "/api/rallies/{rally_id}/entries",
    params(
        ("rally_id" = String, Path, description = "Rally id")
    ),
    request_body = SubmitEntryRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Entry accepted or superseded by a newer revision", body = EntryOutcomeResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown rally, stage or competitor"),
        (status = 409, description = "Stage cancelled"),
        (status = 422, description = "Entry recorded but its time could not be parsed", body = EntryOutcomeResponse)
    ),
    tag = "entries"
)]
pub async fn submit_entry(
    State(state): State<AppState>,
    Path(rally_id): Path<String>,
    Json(req): Json<SubmitEntryRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let entry = req.into_entry().map_err(EngineError::from)?;
    let (stage_id, competitor_id) = (entry.stage_id.clone(), entry.competitor_id.clone());

    let outcome = services::submit_entry(&state, &RallyId::from(rally_id), entry).await?;
    let status = match outcome {
        SubmissionOutcome::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SubmissionOutcome::Accepted | SubmissionOutcome::Superseded => StatusCode::OK,
    };
    let response = EntryOutcomeResponse::new(&stage_id, &competitor_id, &Ok(outcome));

    Ok((status, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/rallies/{rally_id}/entries/batch",
    params(
        ("rally_id" = String, Path, description = "Rally id")
    ),
    request_body = BatchSubmitRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Per-entry outcomes", body = BatchOutcomeResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown rally or stage"),
        (status = 409, description = "Batch targets a cancelled stage")
    ),
    tag = "entries"
)]
pub async fn submit_batch(
    State(state): State<AppState>,
    Path(rally_id): Path<String>,
    Json(req): Json<BatchSubmitRequest>,
) -> Result<Json<BatchOutcomeResponse>, WebError> {
    req.validate()?;

    let entries = req
        .entries
        .into_iter()
        .map(SubmitEntryRequest::into_entry)
        .collect::<Result<Vec<_>, _>>()
        .map_err(EngineError::from)?;

    let reports = services::submit_batch(&state, &RallyId::from(rally_id), entries).await?;

    Ok(Json(BatchOutcomeResponse::from(reports.as_slice())))
}
