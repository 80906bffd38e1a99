use storage::error::StorageError;
use storage::models::RallyId;
use storage::repository::{
    CompetitorRepository, RallyRepository, StageEntryRepository, StageRepository,
};
use tracing::{info, warn};

use crate::error::WebResult;
use crate::state::AppState;

/// Make sure the engine holds `rally_id`, loading it from the database on
/// first access. Unknown rallies are `NotFound`.
pub async fn ensure_loaded(state: &AppState, rally_id: &RallyId) -> WebResult<()> {
    if state.engine.contains_rally(rally_id) {
        return Ok(());
    }

    let lock = state.hydration_lock(rally_id);
    let _guard = lock.lock().await;
    if state.engine.contains_rally(rally_id) {
        return Ok(());
    }

    let result = hydrate(state, rally_id).await;
    if result.is_err() {
        state.release_hydration_lock(rally_id);
    }
    result
}

/// Pass `result` through, dropping the rally from the engine when it is an
/// error. A write the database refused must not stay visible in memory; the
/// next request reloads the rally from the store.
pub fn evict_on_failure<T>(state: &AppState, rally_id: &RallyId, result: WebResult<T>) -> WebResult<T> {
    if let Err(err) = &result
        && state.engine.evict(rally_id)
    {
        warn!(rally_id = %rally_id, error = %err, "Write not persisted, rally evicted from memory");
    }
    result
}

async fn hydrate(state: &AppState, rally_id: &RallyId) -> WebResult<()> {
    let pool = state.db.pool();
    if !RallyRepository::new(pool).exists(rally_id).await? {
        return Err(StorageError::NotFound.into());
    }

    let stages = StageRepository::new(pool).list_by_rally(rally_id).await?;
    let competitors = CompetitorRepository::new(pool).list_by_rally(rally_id).await?;
    let entries = StageEntryRepository::new(pool).list_by_rally(rally_id).await?;
    let (stage_count, competitor_count, entry_count) =
        (stages.len(), competitors.len(), entries.len());

    let reports = state
        .engine
        .hydrate(rally_id, stages, competitors, entries)?;
    let refused = reports.iter().filter(|report| report.result.is_err()).count();
    if refused > 0 {
        warn!(rally_id = %rally_id, refused, "Stored entries refused during hydration");
    }

    info!(
        rally_id = %rally_id,
        stages = stage_count,
        competitors = competitor_count,
        entries = entry_count,
        "Rally hydrated"
    );
    Ok(())
}
