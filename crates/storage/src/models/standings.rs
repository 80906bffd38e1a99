use serde::{Deserialize, Serialize};

use super::{CompetitorId, Gap, RallyId, StageId, StandingStatus, TimeValue};

/// Running total of one competitor over the stages folded so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeRecord {
    pub competitor_id: CompetitorId,
    pub car_number: u32,
    pub total: TimeValue,
    pub counted_stages: u32,
    pub status: StandingStatus,
    /// Stage on which the competitor left the classification, if they did.
    pub out_on_stage: Option<StageId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallEntry {
    pub position: u32,
    pub competitor_id: CompetitorId,
    pub car_number: u32,
    pub display_name: String,
    pub total: TimeValue,
    pub gap: Gap,
    pub counted_stages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallUnclassified {
    pub competitor_id: CompetitorId,
    pub car_number: u32,
    pub display_name: String,
    pub status: StandingStatus,
    pub total: TimeValue,
    pub out_on_stage: Option<StageId>,
}

/// The rally's current overall classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallStandings {
    pub rally_id: RallyId,
    /// Last stage (by ordinal) that contributed to the totals.
    pub after_stage: Option<StageId>,
    pub classified: Vec<OverallEntry>,
    pub unclassified: Vec<OverallUnclassified>,
}

impl OverallStandings {
    pub fn empty(rally_id: RallyId) -> Self {
        Self {
            rally_id,
            after_stage: None,
            classified: Vec::new(),
            unclassified: Vec::new(),
        }
    }

    pub fn leader(&self) -> Option<&OverallEntry> {
        self.classified.first()
    }

    pub fn position_of(&self, competitor_id: &CompetitorId) -> Option<u32> {
        self.classified
            .iter()
            .find(|entry| &entry.competitor_id == competitor_id)
            .map(|entry| entry.position)
    }
}
