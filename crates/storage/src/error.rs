use thiserror::Error;

use crate::models::{CompetitorId, RallyId, StageId, UnknownStatus};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(sqlx::Error::Database(e))
                if e.code().as_deref() == Some("23505")
        )
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(sqlx::Error::Database(e))
                if e.code().as_deref() == Some("23503")
        )
    }
}

impl From<UnknownStatus> for StorageError {
    fn from(error: UnknownStatus) -> Self {
        StorageError::InvalidData(error.to_string())
    }
}

/// Failures reported by the standings engine. None of them is fatal; they
/// are handed back to the caller as typed results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Unknown rally: {0}")]
    UnknownRally(RallyId),

    #[error("Unknown stage {stage_id} in rally {rally_id}")]
    UnknownStage { rally_id: RallyId, stage_id: StageId },

    #[error("Unknown competitor {competitor_id} in rally {rally_id}")]
    UnknownCompetitor {
        rally_id: RallyId,
        competitor_id: CompetitorId,
    },

    #[error("Stage {0} is cancelled and cannot take entries")]
    CancelledStageWrite(StageId),

    #[error("Stage {0} is cancelled")]
    StageCancelled(StageId),

    #[error("Stage {0} has not been run yet")]
    NotYetRun(StageId),

    #[error("Rally {0} has no registered competitors")]
    NoCompetitors(RallyId),

    #[error("Car number {car_number} is already held by competitor {holder}")]
    DuplicateCarNumber { car_number: u32, holder: CompetitorId },

    #[error("Stage {0} is defined more than once")]
    DuplicateStage(StageId),

    #[error("Stage ordinal {ordinal} is used by both {first} and {second}")]
    DuplicateStageOrdinal {
        ordinal: i32,
        first: StageId,
        second: StageId,
    },

    #[error("Stage {stage_id} belongs to rally {actual}, not {expected}")]
    StageRallyMismatch {
        stage_id: StageId,
        expected: RallyId,
        actual: RallyId,
    },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),
}

impl From<UnknownStatus> for EngineError {
    fn from(error: UnknownStatus) -> Self {
        EngineError::InvalidStatus(error.0)
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
