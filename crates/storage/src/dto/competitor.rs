use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Competitor, CompetitorId};

/// Request payload for entering or updating a crew
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterCompetitorRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Display name must be between 1 and 255 characters"
    ))]
    pub display_name: String,

    #[validate(length(min = 1, max = 255))]
    pub co_driver_name: Option<String>,

    #[validate(length(min = 2, max = 3, message = "Nationality must be a 2 or 3 letter code"))]
    pub nationality: String,

    #[validate(range(min = 1, max = 9999))]
    pub car_number: u32,

    #[validate(length(max = 64))]
    pub team_id: Option<String>,

    #[validate(length(max = 64))]
    pub car_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompetitorResponse {
    pub competitor_id: String,
    pub display_name: String,
    pub co_driver_name: Option<String>,
    pub nationality: String,
    pub car_number: u32,
    pub team_id: Option<String>,
    pub car_id: Option<String>,
}

impl RegisterCompetitorRequest {
    pub fn into_competitor(self, competitor_id: CompetitorId) -> Competitor {
        Competitor {
            competitor_id,
            display_name: self.display_name,
            co_driver_name: self.co_driver_name,
            nationality: self.nationality.to_uppercase(),
            car_number: self.car_number,
            team_id: self.team_id,
            car_id: self.car_id,
        }
    }
}

impl From<Competitor> for CompetitorResponse {
    fn from(competitor: Competitor) -> Self {
        Self {
            competitor_id: competitor.competitor_id.to_string(),
            display_name: competitor.display_name,
            co_driver_name: competitor.co_driver_name,
            nationality: competitor.nationality,
            car_number: competitor.car_number,
            team_id: competitor.team_id,
            car_id: competitor.car_id,
        }
    }
}
