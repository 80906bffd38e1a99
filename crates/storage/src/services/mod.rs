pub mod competitor_registry;
pub mod coordinator;
pub mod cumulative;
pub mod overall_ranking;
pub mod stage_ranking;

pub use competitor_registry::{CompetitorRegistry, RegistryChange};
pub use coordinator::{EntryReport, StandingsEngine, StandingsSnapshot, SubmissionOutcome};
pub use cumulative::{CumulativeAggregator, CumulativeTotals, aggregate};
pub use overall_ranking::rank_overall;
pub use stage_ranking::classify_stage;
