use serde::{Deserialize, Serialize};

use super::{CompetitorId, EntryStatus, Gap, StageId, TimeValue};

/// A timed, ranked row of a stage classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedEntry {
    pub position: u32,
    pub competitor_id: CompetitorId,
    pub car_number: u32,
    pub display_name: String,
    pub time: TimeValue,
    pub gap: Gap,
}

/// Why an entry carries no position. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnclassifiedReason {
    MissingTime,
    MalformedTime,
    Dnf,
    Dns,
    Excluded,
}

impl UnclassifiedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingTime => "missing-time",
            Self::MalformedTime => "malformed-time",
            Self::Dnf => "dnf",
            Self::Dns => "dns",
            Self::Excluded => "excluded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnclassifiedEntry {
    pub competitor_id: CompetitorId,
    pub car_number: u32,
    pub display_name: String,
    pub status: EntryStatus,
    pub reason: UnclassifiedReason,
}

/// Ranked result of one stage: timed rows first, then non-timed rows grouped
/// by reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageClassification {
    pub stage_id: StageId,
    pub classified: Vec<ClassifiedEntry>,
    pub unclassified: Vec<UnclassifiedEntry>,
}

impl StageClassification {
    pub fn leader(&self) -> Option<&ClassifiedEntry> {
        self.classified.first()
    }

    pub fn entry_count(&self) -> usize {
        self.classified.len() + self.unclassified.len()
    }
}
