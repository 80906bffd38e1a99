pub mod competitors;
pub mod entries;
pub mod stages;
pub mod standings;
