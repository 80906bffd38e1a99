use sqlx::{PgExecutor, PgPool};

use crate::error::{Result, StorageError};
use crate::models::{Rally, RallyId};

/// Repository for rally metadata
pub struct RallyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RallyRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, rally_id: &RallyId) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM rallies WHERE rally_id = $1)",
        )
        .bind(rally_id.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Insert or refresh a rally; usable inside a caller's transaction.
    pub async fn upsert_with<'e, E>(executor: E, rally: &Rally) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO rallies (rally_id, name, slug, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (rally_id)
            DO UPDATE SET
                name = EXCLUDED.name,
                slug = EXCLUDED.slug,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date
            "#,
        )
        .bind(rally.rally_id.as_str())
        .bind(&rally.name)
        .bind(&rally.slug)
        .bind(rally.start_date)
        .bind(rally.end_date)
        .execute(executor)
        .await
        .map_err(|e| {
            let error = StorageError::from(e);
            if error.is_unique_violation() {
                return StorageError::ConstraintViolation(format!(
                    "Slug {} already exists",
                    rally.slug
                ));
            }
            error
        })?;

        Ok(())
    }
}
