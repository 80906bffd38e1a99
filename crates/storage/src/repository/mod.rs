pub mod competitor;
pub mod rally;
pub mod stage;
pub mod stage_entry;

pub use competitor::CompetitorRepository;
pub use rally::RallyRepository;
pub use stage::StageRepository;
pub use stage_entry::StageEntryRepository;
