use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::RallyId;

/// Rally event metadata as kept by the results store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rally {
    pub rally_id: RallyId,
    pub name: String,
    pub slug: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
