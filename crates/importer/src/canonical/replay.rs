use serde::Serialize;
use storage::dto::{EntryOutcomeResponse, OverallStandingsResponse, StageClassificationResponse};
use storage::error::EngineError;
use storage::models::StageId;
use storage::services::{StandingsEngine, SubmissionOutcome};
use tracing::{debug, info};

use super::transformer::RallyBundle;
use crate::Result;

/// Standings computed offline from a canonical file.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub rally_id: String,
    pub stages: Vec<StageClassificationResponse>,
    /// Absent when the file has no competitors.
    pub overall: Option<OverallStandingsResponse>,
    /// Entries that were refused or recorded without a usable time.
    pub issues: Vec<EntryOutcomeResponse>,
}

/// Feed a bundle through a fresh engine. With `until_stage`, only that stage
/// and the ones before it (by ordinal) are used, giving the standings as
/// they stood after it.
pub fn replay(bundle: &RallyBundle, until_stage: Option<&StageId>) -> Result<ReplayReport> {
    let rally_id = &bundle.rally.rally_id;

    let cutoff = match until_stage {
        Some(stage_id) => Some(
            bundle
                .stages
                .iter()
                .find(|stage| &stage.stage_id == stage_id)
                .map(|stage| stage.ordinal)
                .ok_or_else(|| EngineError::UnknownStage {
                    rally_id: rally_id.clone(),
                    stage_id: stage_id.clone(),
                })?,
        ),
        None => None,
    };

    let stages: Vec<_> = bundle
        .stages
        .iter()
        .filter(|stage| cutoff.is_none_or(|ordinal| stage.ordinal <= ordinal))
        .cloned()
        .collect();
    let entries: Vec<_> = bundle
        .entries
        .iter()
        .filter(|entry| stages.iter().any(|stage| stage.stage_id == entry.stage_id))
        .cloned()
        .collect();
    debug!(
        rally_id = %rally_id,
        stages = stages.len(),
        entries = entries.len(),
        "Replaying rally"
    );

    let engine = StandingsEngine::new();
    let reports = engine.hydrate(rally_id, stages, bundle.competitors.clone(), entries)?;
    let snapshot = engine.snapshot(rally_id)?;

    let classifications = snapshot
        .stages
        .iter()
        .filter_map(|stage| snapshot.classifications.get(&stage.stage_id))
        .map(|classification| StageClassificationResponse::from(classification.as_ref()))
        .collect();

    let overall = match snapshot.overall_standings() {
        Ok(standings) => Some(OverallStandingsResponse::from(standings.as_ref())),
        Err(EngineError::NoCompetitors(_)) => None,
        Err(e) => return Err(e.into()),
    };

    let issues: Vec<EntryOutcomeResponse> = reports
        .iter()
        .filter(|report| {
            !matches!(
                report.result,
                Ok(SubmissionOutcome::Accepted | SubmissionOutcome::Superseded)
            )
        })
        .map(EntryOutcomeResponse::from)
        .collect();

    info!(
        rally_id = %rally_id,
        generation = snapshot.generation,
        issues = issues.len(),
        "Replay finished"
    );

    Ok(ReplayReport {
        rally_id: rally_id.to_string(),
        stages: classifications,
        overall,
        issues,
    })
}
