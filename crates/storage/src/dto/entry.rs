use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::EngineError;
use crate::models::{CompetitorId, EntryStatus, StageEntry, StageId, UnknownStatus};
use crate::services::{EntryReport, SubmissionOutcome};

/// Request payload for submitting one stage result or a correction
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitEntryRequest {
    #[validate(length(min = 1, max = 64, message = "Stage id must be between 1 and 64 characters"))]
    pub stage_id: String,

    #[validate(length(
        min = 1,
        max = 64,
        message = "Competitor id must be between 1 and 64 characters"
    ))]
    pub competitor_id: String,

    /// Strictly increasing per (competitor, stage); only a newer revision
    /// replaces the stored entry. Bounded by the store's BIGINT column.
    #[validate(range(max = 9223372036854775807u64, message = "Revision does not fit a signed 64-bit integer"))]
    pub revision: u64,

    /// `S.F`, `M:SS.F` or `H:MM:SS.F`
    #[validate(length(max = 32))]
    pub elapsed_time: Option<String>,

    /// `finished`, `dnf`, `dns` or `excluded` (aliases such as `dsq` accepted)
    #[validate(custom(function = "validate_entry_status"))]
    pub status: String,
}

/// Request payload for submitting several results at once
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BatchSubmitRequest {
    #[validate(length(min = 1, max = 1000, message = "A batch holds between 1 and 1000 entries"))]
    #[validate(nested)]
    pub entries: Vec<SubmitEntryRequest>,
}

/// Outcome of one submitted entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EntryOutcomeResponse {
    pub stage_id: String,
    pub competitor_id: String,
    /// `accepted`, `superseded`, `rejected` or `failed`
    pub outcome: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchOutcomeResponse {
    pub accepted: usize,
    pub superseded: usize,
    pub rejected: usize,
    pub failed: usize,
    pub entries: Vec<EntryOutcomeResponse>,
}

fn validate_entry_status(status: &str) -> Result<(), validator::ValidationError> {
    status
        .parse::<EntryStatus>()
        .map(|_| ())
        .map_err(|_| validator::ValidationError::new("invalid_status"))
}

impl SubmitEntryRequest {
    pub fn into_entry(self) -> Result<StageEntry, UnknownStatus> {
        Ok(StageEntry {
            status: self.status.parse()?,
            competitor_id: CompetitorId::from(self.competitor_id),
            stage_id: StageId::from(self.stage_id),
            revision: self.revision,
            elapsed_time: self.elapsed_time,
        })
    }
}

impl EntryOutcomeResponse {
    pub fn new(
        stage_id: &StageId,
        competitor_id: &CompetitorId,
        result: &Result<SubmissionOutcome, EngineError>,
    ) -> Self {
        let (outcome, error) = match result {
            Ok(SubmissionOutcome::Accepted) => ("accepted", None),
            Ok(SubmissionOutcome::Superseded) => ("superseded", None),
            Ok(SubmissionOutcome::Rejected(err)) => ("rejected", Some(err.to_string())),
            Err(err) => ("failed", Some(err.to_string())),
        };

        Self {
            stage_id: stage_id.to_string(),
            competitor_id: competitor_id.to_string(),
            outcome: outcome.to_string(),
            error,
        }
    }
}

impl From<&EntryReport> for EntryOutcomeResponse {
    fn from(report: &EntryReport) -> Self {
        Self::new(&report.stage_id, &report.competitor_id, &report.result)
    }
}

impl From<&[EntryReport]> for BatchOutcomeResponse {
    fn from(reports: &[EntryReport]) -> Self {
        let entries: Vec<EntryOutcomeResponse> = reports.iter().map(Into::into).collect();
        let count = |outcome: &str| entries.iter().filter(|e| e.outcome == outcome).count();

        Self {
            accepted: count("accepted"),
            superseded: count("superseded"),
            rejected: count("rejected"),
            failed: count("failed"),
            entries,
        }
    }
}
