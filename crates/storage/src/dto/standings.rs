use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{
    ClassifiedEntry, EntryStatus, OverallEntry, OverallStandings, OverallUnclassified,
    StageClassification, StandingStatus, UnclassifiedEntry,
};

/// Ranked result of a single stage
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StageClassificationResponse {
    pub stage_id: String,
    pub classified: Vec<StageResultRow>,
    pub unclassified: Vec<StageUnclassifiedRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StageResultRow {
    pub position: u32,
    pub competitor_id: String,
    pub car_number: u32,
    pub display_name: String,
    /// Canonical elapsed time, e.g. `10:02.0`
    pub time: String,
    /// `-` for the leader, otherwise e.g. `+2.0s` or `+1:04.2`
    pub gap: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StageUnclassifiedRow {
    pub competitor_id: String,
    pub car_number: u32,
    pub display_name: String,
    pub status: EntryStatus,
    pub reason: String,
}

/// Overall rally standings after the last folded stage
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverallStandingsResponse {
    pub rally_id: String,
    pub after_stage: Option<String>,
    pub classified: Vec<OverallRow>,
    pub unclassified: Vec<OverallUnclassifiedRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverallRow {
    pub position: u32,
    pub competitor_id: String,
    pub car_number: u32,
    pub display_name: String,
    pub total: String,
    pub gap: String,
    pub counted_stages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverallUnclassifiedRow {
    pub competitor_id: String,
    pub car_number: u32,
    pub display_name: String,
    pub status: StandingStatus,
    pub total: String,
    pub out_on_stage: Option<String>,
}

impl From<&StageClassification> for StageClassificationResponse {
    fn from(classification: &StageClassification) -> Self {
        Self {
            stage_id: classification.stage_id.to_string(),
            classified: classification.classified.iter().map(Into::into).collect(),
            unclassified: classification.unclassified.iter().map(Into::into).collect(),
        }
    }
}

impl From<&ClassifiedEntry> for StageResultRow {
    fn from(row: &ClassifiedEntry) -> Self {
        Self {
            position: row.position,
            competitor_id: row.competitor_id.to_string(),
            car_number: row.car_number,
            display_name: row.display_name.clone(),
            time: row.time.to_string(),
            gap: row.gap.to_string(),
        }
    }
}

impl From<&UnclassifiedEntry> for StageUnclassifiedRow {
    fn from(row: &UnclassifiedEntry) -> Self {
        Self {
            competitor_id: row.competitor_id.to_string(),
            car_number: row.car_number,
            display_name: row.display_name.clone(),
            status: row.status,
            reason: row.reason.as_str().to_string(),
        }
    }
}

impl From<&OverallStandings> for OverallStandingsResponse {
    fn from(standings: &OverallStandings) -> Self {
        Self {
            rally_id: standings.rally_id.to_string(),
            after_stage: standings.after_stage.as_ref().map(ToString::to_string),
            classified: standings.classified.iter().map(Into::into).collect(),
            unclassified: standings.unclassified.iter().map(Into::into).collect(),
        }
    }
}

impl From<&OverallEntry> for OverallRow {
    fn from(row: &OverallEntry) -> Self {
        Self {
            position: row.position,
            competitor_id: row.competitor_id.to_string(),
            car_number: row.car_number,
            display_name: row.display_name.clone(),
            total: row.total.to_string(),
            gap: row.gap.to_string(),
            counted_stages: row.counted_stages,
        }
    }
}

impl From<&OverallUnclassified> for OverallUnclassifiedRow {
    fn from(row: &OverallUnclassified) -> Self {
        Self {
            competitor_id: row.competitor_id.to_string(),
            car_number: row.car_number,
            display_name: row.display_name.clone(),
            status: row.status,
            total: row.total.to_string(),
            out_on_stage: row.out_on_stage.as_ref().map(ToString::to_string),
        }
    }
}
