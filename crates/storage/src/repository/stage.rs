use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::{Result, StorageError};
use crate::models::{RallyId, Stage, StageId};

#[derive(FromRow)]
struct StageRow {
    stage_id: String,
    rally_id: String,
    name: String,
    ordinal: i32,
    status: String,
    distance_km: Option<Decimal>,
}

impl TryFrom<StageRow> for Stage {
    type Error = StorageError;

    fn try_from(row: StageRow) -> Result<Self> {
        Ok(Self {
            stage_id: StageId::from(row.stage_id),
            rally_id: RallyId::from(row.rally_id),
            name: row.name,
            ordinal: row.ordinal,
            status: row.status.parse()?,
            distance_km: row.distance_km,
        })
    }
}

/// Repository for stage definitions
pub struct StageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StageRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All stages of a rally in ordinal order.
    pub async fn list_by_rally(&self, rally_id: &RallyId) -> Result<Vec<Stage>> {
        let rows = sqlx::query_as::<_, StageRow>(
            r#"
            SELECT stage_id, rally_id, name, ordinal, status, distance_km
            FROM stages
            WHERE rally_id = $1
            ORDER BY ordinal
            "#,
        )
        .bind(rally_id.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Stage::try_from).collect()
    }

    /// Insert or refresh a stage definition; usable inside a transaction.
    pub async fn upsert_with<'e, E>(executor: E, stage: &Stage) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO stages (stage_id, rally_id, name, ordinal, status, distance_km)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (stage_id)
            DO UPDATE SET
                name = EXCLUDED.name,
                ordinal = EXCLUDED.ordinal,
                status = EXCLUDED.status,
                distance_km = EXCLUDED.distance_km
            "#,
        )
        .bind(stage.stage_id.as_str())
        .bind(stage.rally_id.as_str())
        .bind(&stage.name)
        .bind(stage.ordinal)
        .bind(stage.status.as_str())
        .bind(stage.distance_km)
        .execute(executor)
        .await
        .map_err(|e| {
            let error = StorageError::from(e);
            if error.is_unique_violation() {
                return StorageError::ConstraintViolation(format!(
                    "Ordinal {} is already used in rally {}",
                    stage.ordinal, stage.rally_id
                ));
            }
            error
        })?;

        Ok(())
    }
}
