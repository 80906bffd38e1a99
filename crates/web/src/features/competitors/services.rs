use storage::models::{Competitor, RallyId};
use storage::repository::CompetitorRepository;
use tracing::info;

use crate::error::{WebError, WebResult};
use crate::hydration::{ensure_loaded, evict_on_failure};
use crate::state::AppState;

/// Register or update a crew in the engine, then store it.
pub async fn register_competitor(
    state: &AppState,
    rally_id: &RallyId,
    competitor: Competitor,
) -> WebResult<Competitor> {
    ensure_loaded(state, rally_id).await?;

    state
        .engine
        .register_competitor(rally_id, competitor.clone())?;
    let persisted = CompetitorRepository::new(state.db.pool())
        .upsert(rally_id, &competitor)
        .await
        .map_err(WebError::from);
    evict_on_failure(state, rally_id, persisted)?;
    info!(
        rally_id = %rally_id,
        competitor_id = %competitor.competitor_id,
        car_number = competitor.car_number,
        "Competitor registered"
    );

    Ok(competitor)
}
