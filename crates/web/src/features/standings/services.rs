use std::sync::Arc;

use storage::models::{OverallStandings, RallyId};

use crate::error::WebResult;
use crate::hydration::ensure_loaded;
use crate::state::AppState;

pub async fn overall_standings(
    state: &AppState,
    rally_id: &RallyId,
) -> WebResult<Arc<OverallStandings>> {
    ensure_loaded(state, rally_id).await?;
    Ok(state.engine.overall_standings(rally_id)?)
}
