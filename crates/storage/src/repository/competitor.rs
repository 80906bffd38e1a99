use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::{Result, StorageError};
use crate::models::{Competitor, CompetitorId, RallyId};

#[derive(FromRow)]
struct CompetitorRow {
    competitor_id: String,
    display_name: String,
    co_driver_name: Option<String>,
    nationality: String,
    car_number: i32,
    team_id: Option<String>,
    car_id: Option<String>,
}

impl TryFrom<CompetitorRow> for Competitor {
    type Error = StorageError;

    fn try_from(row: CompetitorRow) -> Result<Self> {
        let car_number = u32::try_from(row.car_number).map_err(|_| {
            StorageError::InvalidData(format!(
                "Negative car number {} for competitor {}",
                row.car_number, row.competitor_id
            ))
        })?;

        Ok(Self {
            competitor_id: CompetitorId::from(row.competitor_id),
            display_name: row.display_name,
            co_driver_name: row.co_driver_name,
            nationality: row.nationality,
            car_number,
            team_id: row.team_id,
            car_id: row.car_id,
        })
    }
}

/// Repository for the crews entered in a rally
pub struct CompetitorRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CompetitorRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_rally(&self, rally_id: &RallyId) -> Result<Vec<Competitor>> {
        let rows = sqlx::query_as::<_, CompetitorRow>(
            r#"
            SELECT competitor_id, display_name, co_driver_name, nationality,
                   car_number, team_id, car_id
            FROM competitors
            WHERE rally_id = $1
            ORDER BY car_number
            "#,
        )
        .bind(rally_id.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Competitor::try_from).collect()
    }

    pub async fn upsert(&self, rally_id: &RallyId, competitor: &Competitor) -> Result<()> {
        Self::upsert_with(self.pool, rally_id, competitor).await
    }

    pub async fn upsert_with<'e, E>(
        executor: E,
        rally_id: &RallyId,
        competitor: &Competitor,
    ) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        let car_number = i32::try_from(competitor.car_number).map_err(|_| {
            StorageError::InvalidData(format!("Car number {} out of range", competitor.car_number))
        })?;

        sqlx::query(
            r#"
            INSERT INTO competitors (
                rally_id, competitor_id, display_name, co_driver_name,
                nationality, car_number, team_id, car_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (rally_id, competitor_id)
            DO UPDATE SET
                display_name = EXCLUDED.display_name,
                co_driver_name = EXCLUDED.co_driver_name,
                nationality = EXCLUDED.nationality,
                car_number = EXCLUDED.car_number,
                team_id = EXCLUDED.team_id,
                car_id = EXCLUDED.car_id
            "#,
        )
        .bind(rally_id.as_str())
        .bind(competitor.competitor_id.as_str())
        .bind(&competitor.display_name)
        .bind(&competitor.co_driver_name)
        .bind(&competitor.nationality)
        .bind(car_number)
        .bind(&competitor.team_id)
        .bind(&competitor.car_id)
        .execute(executor)
        .await
        .map_err(|e| {
            let error = StorageError::from(e);
            if error.is_unique_violation() {
                return StorageError::ConstraintViolation(format!(
                    "Car number {} is already taken in rally {}",
                    competitor.car_number, rally_id
                ));
            }
            error
        })?;

        Ok(())
    }
}
