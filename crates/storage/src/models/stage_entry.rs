use serde::{Deserialize, Serialize};

use super::{CompetitorId, EntryStatus, StageId};

/// One competitor's raw result on one stage.
///
/// Keyed by `(competitor_id, stage_id)`; a correction replaces the stored
/// entry only when its `revision` is strictly newer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEntry {
    pub competitor_id: CompetitorId,
    pub stage_id: StageId,
    pub revision: u64,
    pub elapsed_time: Option<String>,
    pub status: EntryStatus,
}
