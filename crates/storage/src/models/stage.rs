use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{RallyId, StageId, StageStatus};

/// A timed special stage.
///
/// `ordinal` fixes the folding order of cumulative times; it is not
/// necessarily creation order or start time, since stages can be reordered or
/// cancelled after the itinerary is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub stage_id: StageId,
    pub rally_id: RallyId,
    pub name: String,
    pub ordinal: i32,
    pub status: StageStatus,
    pub distance_km: Option<Decimal>,
}

impl Stage {
    pub fn is_cancelled(&self) -> bool {
        self.status == StageStatus::Cancelled
    }
}
