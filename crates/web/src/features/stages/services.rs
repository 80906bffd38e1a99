use std::sync::Arc;

use storage::models::{RallyId, Stage, StageClassification, StageId};
use storage::repository::StageRepository;
use tracing::info;

use crate::error::WebResult;
use crate::hydration::ensure_loaded;
use crate::state::AppState;

pub async fn stages_in_order(state: &AppState, rally_id: &RallyId) -> WebResult<Vec<Stage>> {
    ensure_loaded(state, rally_id).await?;
    Ok(state.engine.stages_in_order(rally_id)?)
}

pub async fn stage_classification(
    state: &AppState,
    rally_id: &RallyId,
    stage_id: &StageId,
) -> WebResult<Arc<StageClassification>> {
    ensure_loaded(state, rally_id).await?;
    Ok(state.engine.stage_classification(rally_id, stage_id)?)
}

/// Reload the rally's stage definitions from the database into the engine.
pub async fn sync_stages(state: &AppState, rally_id: &RallyId) -> WebResult<Vec<Stage>> {
    ensure_loaded(state, rally_id).await?;

    let stages = StageRepository::new(state.db.pool())
        .list_by_rally(rally_id)
        .await?;
    state.engine.sync_stages(rally_id, stages)?;
    info!(rally_id = %rally_id, "Stage definitions synced");

    Ok(state.engine.stages_in_order(rally_id)?)
}
