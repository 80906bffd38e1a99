pub mod competitor;
pub mod entry;
pub mod stage;
pub mod standings;

pub use competitor::{CompetitorResponse, RegisterCompetitorRequest};
pub use entry::{BatchOutcomeResponse, BatchSubmitRequest, EntryOutcomeResponse, SubmitEntryRequest};
pub use stage::StageResponse;
pub use standings::{
    OverallRow, OverallStandingsResponse, OverallUnclassifiedRow, StageClassificationResponse,
    StageResultRow, StageUnclassifiedRow,
};
