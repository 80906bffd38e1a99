use super::models::CanonicalRallyFile;
use crate::{ImporterError, Result};
use sqlx::PgPool;
use storage::models::{
    Competitor, CompetitorId, EntryStatus, Rally, RallyId, Stage, StageEntry, StageId,
    StageStatus,
};
use storage::repository::{
    CompetitorRepository, RallyRepository, StageEntryRepository, StageRepository,
};
use tracing::info;

/// A canonical file mapped onto the domain types.
#[derive(Debug, Clone, PartialEq)]
pub struct RallyBundle {
    pub rally: Rally,
    pub stages: Vec<Stage>,
    pub competitors: Vec<Competitor>,
    pub entries: Vec<StageEntry>,
}

impl TryFrom<&CanonicalRallyFile> for RallyBundle {
    type Error = ImporterError;

    fn try_from(canonical: &CanonicalRallyFile) -> Result<Self> {
        let rally_id = RallyId::new(canonical.rally.rally_id.trim());

        let stages = canonical
            .stages
            .iter()
            .map(|stage| {
                let status = stage.status.parse::<StageStatus>().map_err(|e| {
                    ImporterError::TransformationError(format!("Stage '{}': {}", stage.stage_id, e))
                })?;
                Ok(Stage {
                    stage_id: StageId::new(stage.stage_id.trim()),
                    rally_id: rally_id.clone(),
                    name: stage.name.clone(),
                    ordinal: stage.ordinal,
                    status,
                    distance_km: stage.distance_km,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let competitors = canonical
            .competitors
            .iter()
            .map(|competitor| Competitor {
                competitor_id: CompetitorId::new(competitor.competitor_id.trim()),
                display_name: competitor.display_name.clone(),
                co_driver_name: competitor.co_driver_name.clone(),
                nationality: competitor.nationality.to_uppercase(),
                car_number: competitor.car_number,
                team_id: competitor.team_id.clone(),
                car_id: competitor.car_id.clone(),
            })
            .collect();

        let entries = canonical
            .entries
            .iter()
            .map(|entry| {
                let status = entry.status.parse::<EntryStatus>().map_err(|e| {
                    ImporterError::TransformationError(format!(
                        "Entry {} / {}: {}",
                        entry.stage_id, entry.competitor_id, e
                    ))
                })?;
                Ok(StageEntry {
                    competitor_id: CompetitorId::new(entry.competitor_id.trim()),
                    stage_id: StageId::new(entry.stage_id.trim()),
                    revision: entry.revision,
                    elapsed_time: entry.elapsed_time.clone(),
                    status,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rally: Rally {
                rally_id,
                name: canonical.rally.name.clone(),
                slug: canonical.rally.slug.clone(),
                start_date: canonical.rally.start_date,
                end_date: canonical.rally.end_date,
            },
            stages,
            competitors,
            entries,
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub stages: usize,
    pub competitors: usize,
    pub entries_written: usize,
    /// Entries already stored with the same or a newer revision.
    pub entries_skipped: usize,
}

pub struct RallyImporter<'a> {
    pool: &'a PgPool,
}

impl<'a> RallyImporter<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write the whole bundle in one transaction. Re-importing the same file
    /// is harmless: rows are upserted and entries are revision-guarded.
    pub async fn import_to_database(&self, bundle: &RallyBundle) -> Result<ImportSummary> {
        let mut tx = self.pool.begin().await?;
        let rally_id = &bundle.rally.rally_id;
        let mut summary = ImportSummary::default();

        RallyRepository::upsert_with(&mut *tx, &bundle.rally).await?;

        for stage in &bundle.stages {
            StageRepository::upsert_with(&mut *tx, stage).await?;
            summary.stages += 1;
        }

        for competitor in &bundle.competitors {
            CompetitorRepository::upsert_with(&mut *tx, rally_id, competitor).await?;
            summary.competitors += 1;
        }

        for entry in &bundle.entries {
            if StageEntryRepository::upsert_with(&mut *tx, rally_id, entry).await? {
                summary.entries_written += 1;
            } else {
                summary.entries_skipped += 1;
            }
        }

        tx.commit().await?;
        info!(
            rally_id = %rally_id,
            stages = summary.stages,
            competitors = summary.competitors,
            written = summary.entries_written,
            skipped = summary.entries_skipped,
            "Rally imported"
        );

        Ok(summary)
    }
}
