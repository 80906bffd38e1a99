use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::{Result, StorageError};
use crate::models::{CompetitorId, RallyId, StageEntry, StageId};

#[derive(FromRow)]
struct StageEntryRow {
    competitor_id: String,
    stage_id: String,
    revision: i64,
    elapsed_time: Option<String>,
    status: String,
}

impl TryFrom<StageEntryRow> for StageEntry {
    type Error = StorageError;

    fn try_from(row: StageEntryRow) -> Result<Self> {
        let revision = u64::try_from(row.revision).map_err(|_| {
            StorageError::InvalidData(format!("Negative revision {}", row.revision))
        })?;

        Ok(Self {
            competitor_id: CompetitorId::from(row.competitor_id),
            stage_id: StageId::from(row.stage_id),
            revision,
            elapsed_time: row.elapsed_time,
            status: row.status.parse()?,
        })
    }
}

/// Repository for raw stage entries.
///
/// Writes are revision-guarded: a stored row is only replaced by a strictly
/// newer revision, so replays and out-of-order deliveries are harmless.
pub struct StageEntryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StageEntryRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_rally(&self, rally_id: &RallyId) -> Result<Vec<StageEntry>> {
        let rows = sqlx::query_as::<_, StageEntryRow>(
            r#"
            SELECT competitor_id, stage_id, revision, elapsed_time, status
            FROM stage_entries
            WHERE rally_id = $1
            ORDER BY stage_id, competitor_id
            "#,
        )
        .bind(rally_id.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(StageEntry::try_from).collect()
    }

    /// Returns whether the row was written.
    pub async fn upsert(&self, rally_id: &RallyId, entry: &StageEntry) -> Result<bool> {
        Self::upsert_with(self.pool, rally_id, entry).await
    }

    pub async fn upsert_with<'e, E>(
        executor: E,
        rally_id: &RallyId,
        entry: &StageEntry,
    ) -> Result<bool>
    where
        E: PgExecutor<'e>,
    {
        let revision = i64::try_from(entry.revision).map_err(|_| {
            StorageError::InvalidData(format!("Revision {} out of range", entry.revision))
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO stage_entries (rally_id, stage_id, competitor_id, revision, elapsed_time, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (stage_id, competitor_id)
            DO UPDATE SET
                revision = EXCLUDED.revision,
                elapsed_time = EXCLUDED.elapsed_time,
                status = EXCLUDED.status,
                recorded_at = NOW()
            WHERE stage_entries.revision < EXCLUDED.revision
            "#,
        )
        .bind(rally_id.as_str())
        .bind(entry.stage_id.as_str())
        .bind(entry.competitor_id.as_str())
        .bind(revision)
        .bind(&entry.elapsed_time)
        .bind(entry.status.as_str())
        .execute(executor)
        .await
        .map_err(|e| {
            let error = StorageError::from(e);
            if error.is_foreign_key_violation() {
                return StorageError::ConstraintViolation(format!(
                    "Stage {} or competitor {} is not stored for rally {}",
                    entry.stage_id, entry.competitor_id, rally_id
                ));
            }
            error
        })?;

        Ok(result.rows_affected() > 0)
    }
}
