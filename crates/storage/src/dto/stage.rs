use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Stage, StageStatus};

/// Stage definition as listed for a rally
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StageResponse {
    pub stage_id: String,
    pub rally_id: String,
    pub name: String,
    pub ordinal: i32,
    pub status: StageStatus,
    pub distance_km: Option<Decimal>,
}

impl From<Stage> for StageResponse {
    fn from(stage: Stage) -> Self {
        Self {
            stage_id: stage.stage_id.to_string(),
            rally_id: stage.rally_id.to_string(),
            name: stage.name,
            ordinal: stage.ordinal,
            status: stage.status,
            distance_km: stage.distance_km,
        }
    }
}
