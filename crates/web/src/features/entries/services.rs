use storage::error::StorageError;
use storage::models::{RallyId, StageEntry};
use storage::repository::StageEntryRepository;
use storage::services::{EntryReport, SubmissionOutcome};
use tracing::debug;

use crate::error::{WebError, WebResult};
use crate::hydration::{ensure_loaded, evict_on_failure};
use crate::state::AppState;

/// Entries the engine recorded are persisted; superseded and refused ones
/// are not.
fn is_recorded(result: &Result<SubmissionOutcome, storage::error::EngineError>) -> bool {
    matches!(
        result,
        Ok(SubmissionOutcome::Accepted | SubmissionOutcome::Rejected(_))
    )
}

pub async fn submit_entry(
    state: &AppState,
    rally_id: &RallyId,
    entry: StageEntry,
) -> WebResult<SubmissionOutcome> {
    ensure_loaded(state, rally_id).await?;

    let result = state.engine.submit_stage_entry(rally_id, entry.clone());
    if is_recorded(&result) {
        let persisted = StageEntryRepository::new(state.db.pool())
            .upsert(rally_id, &entry)
            .await
            .map_err(WebError::from);
        let written = evict_on_failure(state, rally_id, persisted)?;
        debug!(
            rally_id = %rally_id,
            stage_id = %entry.stage_id,
            competitor_id = %entry.competitor_id,
            written,
            "Stage entry persisted"
        );
    }

    Ok(result?)
}

/// Apply a batch in one recomputation and persist the recorded entries in a
/// single transaction.
pub async fn submit_batch(
    state: &AppState,
    rally_id: &RallyId,
    entries: Vec<StageEntry>,
) -> WebResult<Vec<EntryReport>> {
    ensure_loaded(state, rally_id).await?;

    let reports = state.engine.submit_batch(rally_id, entries.clone())?;

    let persisted = persist_batch(state, rally_id, &entries, &reports).await;
    let written = evict_on_failure(state, rally_id, persisted)?;
    debug!(rally_id = %rally_id, written, "Stage entry batch persisted");

    Ok(reports)
}

async fn persist_batch(
    state: &AppState,
    rally_id: &RallyId,
    entries: &[StageEntry],
    reports: &[EntryReport],
) -> WebResult<usize> {
    let mut tx = state.db.pool().begin().await.map_err(StorageError::from)?;
    let mut written = 0usize;
    for (entry, report) in entries.iter().zip(reports) {
        if is_recorded(&report.result)
            && StageEntryRepository::upsert_with(&mut *tx, rally_id, entry).await?
        {
            written += 1;
        }
    }
    tx.commit().await.map_err(StorageError::from)?;
    Ok(written)
}
