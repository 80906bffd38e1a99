use serde::{Deserialize, Serialize};

use super::CompetitorId;

/// A crew entered in a rally. The car number is unique within the rally only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    pub competitor_id: CompetitorId,
    pub display_name: String,
    pub co_driver_name: Option<String>,
    pub nationality: String,
    pub car_number: u32,
    pub team_id: Option<String>,
    pub car_id: Option<String>,
}
