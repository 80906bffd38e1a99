pub mod classification;
pub mod competitor;
pub mod ids;
pub mod rally;
pub mod stage;
pub mod stage_entry;
pub mod standings;
pub mod status;
pub mod time_value;

pub use classification::{
    ClassifiedEntry, StageClassification, UnclassifiedEntry, UnclassifiedReason,
};
pub use competitor::Competitor;
pub use ids::{CompetitorId, RallyId, StageId};
pub use rally::Rally;
pub use stage::Stage;
pub use stage_entry::StageEntry;
pub use standings::{CumulativeRecord, OverallEntry, OverallStandings, OverallUnclassified};
pub use status::{EntryStatus, StageStatus, StandingStatus, UnknownStatus};
pub use time_value::{Gap, TimeParseError, TimeValue};
