use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    Competitor, CompetitorId, CumulativeRecord, OverallStandings, RallyId, Stage,
    StageClassification, StageEntry, StageId, TimeParseError, TimeValue,
};

use super::competitor_registry::{CompetitorRegistry, RegistryChange};
use super::cumulative;
use super::overall_ranking::rank_overall;
use super::stage_ranking::classify_stage;

/// Result of a single stage-entry submission that was not refused outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    /// The stored revision is the same or newer; nothing changed.
    Superseded,
    /// Recorded with its status, but the time text could not be parsed, so
    /// the entry ranks as non-timed until corrected.
    Rejected(TimeParseError),
}

/// Per-entry report of a batch submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub stage_id: StageId,
    pub competitor_id: CompetitorId,
    pub result: EngineResult<SubmissionOutcome>,
}

/// Everything readers see for one rally, published as one unit.
#[derive(Debug, Clone)]
pub struct StandingsSnapshot {
    pub rally_id: RallyId,
    /// Incremented on every publication.
    pub generation: u64,
    pub stages: Vec<Stage>,
    pub classifications: BTreeMap<StageId, Arc<StageClassification>>,
    pub cumulative: BTreeMap<CompetitorId, CumulativeRecord>,
    pub overall: Arc<OverallStandings>,
    pub competitor_count: usize,
}

impl StandingsSnapshot {
    fn empty(rally_id: RallyId) -> Self {
        Self {
            overall: Arc::new(OverallStandings::empty(rally_id.clone())),
            rally_id,
            generation: 0,
            stages: Vec::new(),
            classifications: BTreeMap::new(),
            cumulative: BTreeMap::new(),
            competitor_count: 0,
        }
    }

    pub fn stage(&self, stage_id: &StageId) -> Option<&Stage> {
        self.stages.iter().find(|stage| &stage.stage_id == stage_id)
    }

    pub fn stage_classification(
        &self,
        stage_id: &StageId,
    ) -> EngineResult<Arc<StageClassification>> {
        let stage = self
            .stage(stage_id)
            .ok_or_else(|| EngineError::UnknownStage {
                rally_id: self.rally_id.clone(),
                stage_id: stage_id.clone(),
            })?;
        if stage.is_cancelled() {
            return Err(EngineError::StageCancelled(stage_id.clone()));
        }
        self.classifications
            .get(stage_id)
            .cloned()
            .ok_or_else(|| EngineError::NotYetRun(stage_id.clone()))
    }

    pub fn overall_standings(&self) -> EngineResult<Arc<OverallStandings>> {
        if self.competitor_count == 0 {
            return Err(EngineError::NoCompetitors(self.rally_id.clone()));
        }
        Ok(Arc::clone(&self.overall))
    }
}

/// Which classifications a change invalidates.
enum Dirty {
    Clean,
    Stages(BTreeSet<StageId>),
    All,
}

impl Dirty {
    fn from_stages(stages: BTreeSet<StageId>) -> Self {
        if stages.is_empty() {
            Dirty::Clean
        } else {
            Dirty::Stages(stages)
        }
    }

    fn merge(self, other: Dirty) -> Dirty {
        match (self, other) {
            (Dirty::All, _) | (_, Dirty::All) => Dirty::All,
            (Dirty::Clean, other) | (other, Dirty::Clean) => other,
            (Dirty::Stages(mut a), Dirty::Stages(b)) => {
                a.extend(b);
                Dirty::Stages(a)
            }
        }
    }

    fn touches(&self, stage_id: &StageId) -> bool {
        match self {
            Dirty::Clean => false,
            Dirty::Stages(stages) => stages.contains(stage_id),
            Dirty::All => true,
        }
    }
}

/// Mutable inputs of one rally. Only ever modified on a copy that is
/// committed after the matching snapshot is published.
#[derive(Debug, Clone, Default)]
struct RallyInputs {
    /// Kept in ordinal order.
    stages: Vec<Stage>,
    registry: CompetitorRegistry,
    entries: BTreeMap<StageId, BTreeMap<CompetitorId, StageEntry>>,
}

impl RallyInputs {
    fn stage(&self, stage_id: &StageId) -> Option<&Stage> {
        self.stages.iter().find(|stage| &stage.stage_id == stage_id)
    }

    fn replace_stages(&mut self, rally_id: &RallyId, mut stages: Vec<Stage>) -> EngineResult<bool> {
        let mut ids = BTreeSet::new();
        let mut ordinals: BTreeMap<i32, &StageId> = BTreeMap::new();
        for stage in &stages {
            if &stage.rally_id != rally_id {
                return Err(EngineError::StageRallyMismatch {
                    stage_id: stage.stage_id.clone(),
                    expected: rally_id.clone(),
                    actual: stage.rally_id.clone(),
                });
            }
            if !ids.insert(&stage.stage_id) {
                return Err(EngineError::DuplicateStage(stage.stage_id.clone()));
            }
            if let Some(first) = ordinals.insert(stage.ordinal, &stage.stage_id) {
                return Err(EngineError::DuplicateStageOrdinal {
                    ordinal: stage.ordinal,
                    first: first.clone(),
                    second: stage.stage_id.clone(),
                });
            }
        }

        stages.sort_by_key(|stage| stage.ordinal);
        if stages == self.stages {
            return Ok(false);
        }
        self.stages = stages;
        Ok(true)
    }

    /// Structural checks that refuse a whole submission.
    fn check_target(&self, rally_id: &RallyId, entry: &StageEntry) -> EngineResult<()> {
        let stage = self
            .stage(&entry.stage_id)
            .ok_or_else(|| EngineError::UnknownStage {
                rally_id: rally_id.clone(),
                stage_id: entry.stage_id.clone(),
            })?;
        if stage.is_cancelled() {
            return Err(EngineError::CancelledStageWrite(entry.stage_id.clone()));
        }
        Ok(())
    }

    fn apply_entry(
        &mut self,
        rally_id: &RallyId,
        entry: StageEntry,
    ) -> EngineResult<SubmissionOutcome> {
        if !self.registry.contains(&entry.competitor_id) {
            return Err(EngineError::UnknownCompetitor {
                rally_id: rally_id.clone(),
                competitor_id: entry.competitor_id.clone(),
            });
        }

        let stage_entries = self.entries.entry(entry.stage_id.clone()).or_default();
        if let Some(stored) = stage_entries.get(&entry.competitor_id)
            && entry.revision <= stored.revision
        {
            debug!(
                stage_id = %entry.stage_id,
                competitor_id = %entry.competitor_id,
                revision = entry.revision,
                stored_revision = stored.revision,
                "Stale revision ignored"
            );
            return Ok(SubmissionOutcome::Superseded);
        }

        let time_issue = entry
            .elapsed_time
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .and_then(|text| TimeValue::parse(text).err());
        stage_entries.insert(entry.competitor_id.clone(), entry);

        Ok(match time_issue {
            Some(err) => SubmissionOutcome::Rejected(err),
            None => SubmissionOutcome::Accepted,
        })
    }

    /// Apply entries in order, reporting each one and collecting the stages
    /// whose classification changed.
    fn apply_entries(
        &mut self,
        rally_id: &RallyId,
        entries: Vec<StageEntry>,
    ) -> (Vec<EntryReport>, BTreeSet<StageId>) {
        let mut touched = BTreeSet::new();
        let reports = entries
            .into_iter()
            .map(|entry| {
                let stage_id = entry.stage_id.clone();
                let competitor_id = entry.competitor_id.clone();
                let result = self.apply_entry(rally_id, entry);
                match &result {
                    Ok(SubmissionOutcome::Accepted) => {
                        touched.insert(stage_id.clone());
                    }
                    Ok(SubmissionOutcome::Rejected(err)) => {
                        warn!(
                            rally_id = %rally_id,
                            stage_id = %stage_id,
                            competitor_id = %competitor_id,
                            error = %err,
                            "Entry recorded without a usable time"
                        );
                        touched.insert(stage_id.clone());
                    }
                    Ok(SubmissionOutcome::Superseded) => {}
                    Err(err) => {
                        warn!(rally_id = %rally_id, error = %err, "Entry refused");
                    }
                }
                EntryReport {
                    stage_id,
                    competitor_id,
                    result,
                }
            })
            .collect();
        (reports, touched)
    }
}

/// One rally's aggregation pipeline: a serialization point for writers and
/// a published snapshot for readers.
struct RallyPipeline {
    rally_id: RallyId,
    inputs: Mutex<RallyInputs>,
    published: RwLock<Arc<StandingsSnapshot>>,
}

impl RallyPipeline {
    fn new(rally_id: RallyId) -> Self {
        Self {
            published: RwLock::new(Arc::new(StandingsSnapshot::empty(rally_id.clone()))),
            rally_id,
            inputs: Mutex::new(RallyInputs::default()),
        }
    }

    fn current(&self) -> Arc<StandingsSnapshot> {
        Arc::clone(&self.published.read())
    }

    /// Run `change` against a copy of the inputs; if anything became dirty,
    /// recompute, publish, then commit the copy. Writers to the same rally
    /// queue on the inputs lock, so updates apply in submission order.
    fn apply<T>(
        &self,
        change: impl FnOnce(&mut RallyInputs) -> EngineResult<(T, Dirty)>,
    ) -> EngineResult<T> {
        let mut inputs = self.inputs.lock();
        let mut next = inputs.clone();
        let (value, dirty) = change(&mut next)?;

        if matches!(dirty, Dirty::Clean) {
            return Ok(value);
        }

        let previous = self.current();
        let snapshot = recompute(&self.rally_id, &next, &previous, &dirty);
        info!(
            rally_id = %self.rally_id,
            generation = snapshot.generation,
            classified = snapshot.overall.classified.len(),
            unclassified = snapshot.overall.unclassified.len(),
            "Published standings"
        );
        *self.published.write() = Arc::new(snapshot);
        *inputs = next;

        Ok(value)
    }
}

fn recompute(
    rally_id: &RallyId,
    inputs: &RallyInputs,
    previous: &StandingsSnapshot,
    dirty: &Dirty,
) -> StandingsSnapshot {
    let mut classifications = BTreeMap::new();
    let mut reranked = 0usize;

    for stage in &inputs.stages {
        if stage.is_cancelled() {
            continue;
        }
        let Some(entries) = inputs
            .entries
            .get(&stage.stage_id)
            .filter(|entries| !entries.is_empty())
        else {
            continue;
        };

        let reused = (!dirty.touches(&stage.stage_id))
            .then(|| previous.classifications.get(&stage.stage_id).cloned())
            .flatten();
        let classification = match reused {
            Some(classification) => classification,
            None => {
                reranked += 1;
                Arc::new(classify_stage(&stage.stage_id, entries.values(), &inputs.registry))
            }
        };
        classifications.insert(stage.stage_id.clone(), classification);
    }

    let totals = cumulative::aggregate(&inputs.registry, &inputs.stages, &classifications);
    let overall = rank_overall(rally_id, &totals, &inputs.registry);
    debug!(rally_id = %rally_id, reranked, stages = classifications.len(), "Recomputed standings");

    StandingsSnapshot {
        rally_id: rally_id.clone(),
        generation: previous.generation + 1,
        stages: inputs.stages.clone(),
        classifications,
        cumulative: totals.records,
        overall: Arc::new(overall),
        competitor_count: inputs.registry.len(),
    }
}

/// Results aggregation engine for any number of rallies.
///
/// Each rally has its own pipeline; writers to one rally are serialized,
/// while different rallies proceed independently. Readers get the last
/// published [`StandingsSnapshot`] and never observe a recomputation in
/// progress.
#[derive(Default)]
pub struct StandingsEngine {
    rallies: DashMap<RallyId, Arc<RallyPipeline>>,
}

impl StandingsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_rally(&self, rally_id: &RallyId) -> bool {
        self.rallies.contains_key(rally_id)
    }

    pub fn rally_ids(&self) -> Vec<RallyId> {
        let mut ids: Vec<RallyId> = self.rallies.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Forget a rally, returning whether it was loaded. Readers already
    /// holding a snapshot keep it.
    pub fn evict(&self, rally_id: &RallyId) -> bool {
        let removed = self.rallies.remove(rally_id).is_some();
        if removed {
            info!(rally_id = %rally_id, "Rally evicted");
        }
        removed
    }

    fn pipeline(&self, rally_id: &RallyId) -> EngineResult<Arc<RallyPipeline>> {
        self.rallies
            .get(rally_id)
            .map(|pipeline| Arc::clone(pipeline.value()))
            .ok_or_else(|| EngineError::UnknownRally(rally_id.clone()))
    }

    fn pipeline_or_create(&self, rally_id: &RallyId) -> Arc<RallyPipeline> {
        let pipeline = self
            .rallies
            .entry(rally_id.clone())
            .or_insert_with(|| {
                info!(rally_id = %rally_id, "Creating rally pipeline");
                Arc::new(RallyPipeline::new(rally_id.clone()))
            });
        Arc::clone(pipeline.value())
    }

    /// Replace the rally's stage definitions with those of the metadata
    /// store. The engine never edits stages itself.
    pub fn sync_stages(&self, rally_id: &RallyId, stages: Vec<Stage>) -> EngineResult<()> {
        self.pipeline_or_create(rally_id).apply(|inputs| {
            let changed = inputs.replace_stages(rally_id, stages)?;
            Ok(((), if changed { Dirty::All } else { Dirty::Clean }))
        })
    }

    /// Idempotent upsert of a competitor's display metadata.
    pub fn register_competitor(&self, rally_id: &RallyId, competitor: Competitor) -> EngineResult<()> {
        self.pipeline_or_create(rally_id).apply(|inputs| {
            let change = inputs.registry.register(competitor)?;
            // Car numbers drive tie-breaks, so any change re-ranks every stage.
            let dirty = match change {
                RegistryChange::Unchanged => Dirty::Clean,
                RegistryChange::Inserted | RegistryChange::Updated => Dirty::All,
            };
            Ok(((), dirty))
        })
    }

    /// Submit one entry (new result or correction).
    ///
    /// Unknown or cancelled stages and unknown competitors are returned as
    /// errors; a stale revision is `Superseded`, not an error.
    pub fn submit_stage_entry(
        &self,
        rally_id: &RallyId,
        entry: StageEntry,
    ) -> EngineResult<SubmissionOutcome> {
        let pipeline = self.pipeline(rally_id)?;
        pipeline.apply(|inputs| {
            inputs.check_target(rally_id, &entry)?;
            let stage_id = entry.stage_id.clone();
            let competitor_id = entry.competitor_id.clone();
            let outcome = inputs.apply_entry(rally_id, entry)?;
            let dirty = match &outcome {
                SubmissionOutcome::Superseded => Dirty::Clean,
                SubmissionOutcome::Accepted => Dirty::Stages(BTreeSet::from([stage_id])),
                SubmissionOutcome::Rejected(err) => {
                    warn!(
                        rally_id = %rally_id,
                        stage_id = %stage_id,
                        competitor_id = %competitor_id,
                        error = %err,
                        "Entry recorded without a usable time"
                    );
                    Dirty::Stages(BTreeSet::from([stage_id]))
                }
            };
            Ok((outcome, dirty))
        })
    }

    /// Submit several entries with a single recomputation.
    ///
    /// Any entry aimed at an unknown or cancelled stage refuses the whole
    /// batch before anything is applied. Per-entry problems are reported in
    /// the returned list and do not affect the other entries.
    pub fn submit_batch(
        &self,
        rally_id: &RallyId,
        entries: Vec<StageEntry>,
    ) -> EngineResult<Vec<EntryReport>> {
        let pipeline = self.pipeline(rally_id)?;
        pipeline.apply(|inputs| {
            for entry in &entries {
                inputs.check_target(rally_id, entry)?;
            }
            let (reports, touched) = inputs.apply_entries(rally_id, entries);
            Ok((reports, Dirty::from_stages(touched)))
        })
    }

    /// Load a rally's stored state in one recomputation.
    ///
    /// Stored entries are replayed without the cancelled-stage check: they
    /// were accepted before the cancellation and stay on record, unranked.
    pub fn hydrate(
        &self,
        rally_id: &RallyId,
        stages: Vec<Stage>,
        competitors: Vec<Competitor>,
        entries: Vec<StageEntry>,
    ) -> EngineResult<Vec<EntryReport>> {
        self.pipeline_or_create(rally_id).apply(|inputs| {
            let mut dirty = Dirty::Clean;
            if inputs.replace_stages(rally_id, stages)? {
                dirty = Dirty::All;
            }
            for competitor in competitors {
                if inputs.registry.register(competitor)? != RegistryChange::Unchanged {
                    dirty = Dirty::All;
                }
            }
            let (reports, touched) = inputs.apply_entries(rally_id, entries);
            Ok((reports, dirty.merge(Dirty::from_stages(touched))))
        })
    }

    /// The rally's current published snapshot.
    pub fn snapshot(&self, rally_id: &RallyId) -> EngineResult<Arc<StandingsSnapshot>> {
        Ok(self.pipeline(rally_id)?.current())
    }

    pub fn stage_classification(
        &self,
        rally_id: &RallyId,
        stage_id: &StageId,
    ) -> EngineResult<Arc<StageClassification>> {
        self.snapshot(rally_id)?.stage_classification(stage_id)
    }

    pub fn overall_standings(&self, rally_id: &RallyId) -> EngineResult<Arc<OverallStandings>> {
        self.snapshot(rally_id)?.overall_standings()
    }

    pub fn stages_in_order(&self, rally_id: &RallyId) -> EngineResult<Vec<Stage>> {
        Ok(self.snapshot(rally_id)?.stages.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryStatus, StageStatus};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn rally() -> RallyId {
        RallyId::from("rally-estonia")
    }

    fn stage(id: &str, ordinal: i32) -> Stage {
        Stage {
            stage_id: StageId::from(id),
            rally_id: rally(),
            name: format!("Stage {id}"),
            ordinal,
            status: StageStatus::Completed,
            distance_km: None,
        }
    }

    fn competitor(id: &str, car_number: u32) -> Competitor {
        Competitor {
            competitor_id: CompetitorId::from(id),
            display_name: id.to_uppercase(),
            co_driver_name: None,
            nationality: "EST".to_string(),
            car_number,
            team_id: None,
            car_id: None,
        }
    }

    fn entry(stage: &str, competitor: &str, revision: u64, time: &str) -> StageEntry {
        StageEntry {
            competitor_id: CompetitorId::from(competitor),
            stage_id: StageId::from(stage),
            revision,
            elapsed_time: Some(time.to_string()),
            status: EntryStatus::Finished,
        }
    }

    fn total_of(overall: &OverallStandings, competitor: &str) -> Option<String> {
        overall
            .classified
            .iter()
            .find(|row| row.competitor_id.as_str() == competitor)
            .map(|row| row.total.to_string())
    }

    fn engine() -> StandingsEngine {
        let engine = StandingsEngine::new();
        engine
            .sync_stages(&rally(), vec![stage("ss1", 1), stage("ss2", 2)])
            .unwrap();
        for (id, car_number) in [("a", 1), ("b", 2), ("c", 3)] {
            engine
                .register_competitor(&rally(), competitor(id, car_number))
                .unwrap();
        }
        engine
    }

    #[test]
    fn test_duplicate_submission_is_superseded() {
        let engine = engine();
        let first = engine.submit_stage_entry(&rally(), entry("ss1", "a", 1, "5:00.0"));
        let after_first = engine.overall_standings(&rally()).unwrap();
        let generation = engine.snapshot(&rally()).unwrap().generation;

        let second = engine.submit_stage_entry(&rally(), entry("ss1", "a", 1, "5:00.0"));

        assert_eq!(first, Ok(SubmissionOutcome::Accepted));
        assert_eq!(second, Ok(SubmissionOutcome::Superseded));
        assert_eq!(engine.overall_standings(&rally()).unwrap(), after_first);
        assert_eq!(engine.snapshot(&rally()).unwrap().generation, generation);
    }

    #[test]
    fn test_evicted_rally_can_be_rehydrated() {
        let engine = engine();
        engine
            .submit_stage_entry(&rally(), entry("ss1", "a", 9, "5:00.0"))
            .unwrap();

        assert!(engine.evict(&rally()));
        assert!(!engine.evict(&rally()));
        assert_eq!(
            engine.overall_standings(&rally()),
            Err(EngineError::UnknownRally(rally()))
        );

        engine
            .hydrate(
                &rally(),
                vec![stage("ss1", 1)],
                vec![competitor("a", 1)],
                vec![entry("ss1", "a", 1, "5:10.0")],
            )
            .unwrap();
        let outcome = engine.submit_stage_entry(&rally(), entry("ss1", "a", 2, "5:05.0"));

        assert_eq!(outcome, Ok(SubmissionOutcome::Accepted));
        assert_eq!(
            total_of(&engine.overall_standings(&rally()).unwrap(), "a"),
            Some("5:05.0".to_string())
        );
    }

    #[test]
    fn test_older_revision_does_not_overwrite() {
        let engine = engine();
        engine
            .submit_stage_entry(&rally(), entry("ss1", "a", 2, "5:00.0"))
            .unwrap();

        let stale = engine.submit_stage_entry(&rally(), entry("ss1", "a", 1, "4:00.0"));

        assert_eq!(stale, Ok(SubmissionOutcome::Superseded));
        let classification = engine
            .stage_classification(&rally(), &StageId::from("ss1"))
            .unwrap();
        assert_eq!(classification.classified[0].time.to_string(), "5:00.0");
    }

    #[test]
    fn test_newer_revision_replaces_entry() {
        let engine = engine();
        engine
            .submit_stage_entry(&rally(), entry("ss1", "a", 1, "5:00.0"))
            .unwrap();
        engine
            .submit_stage_entry(&rally(), entry("ss1", "a", 2, "4:58.2"))
            .unwrap();

        let overall = engine.overall_standings(&rally()).unwrap();
        assert_eq!(total_of(&overall, "a"), Some("4:58.2".to_string()));
    }

    #[test]
    fn test_malformed_time_reported_and_ranked_non_timed() {
        let engine = engine();

        let outcome = engine.submit_stage_entry(&rally(), entry("ss1", "a", 1, "5:7x"));
        engine
            .submit_stage_entry(&rally(), entry("ss1", "b", 1, "5:10.0"))
            .unwrap();

        assert_eq!(
            outcome,
            Ok(SubmissionOutcome::Rejected(TimeParseError::MalformedTime(
                "5:7x".to_string()
            )))
        );
        let classification = engine
            .stage_classification(&rally(), &StageId::from("ss1"))
            .unwrap();
        assert_eq!(classification.classified.len(), 1);
        assert_eq!(classification.unclassified[0].competitor_id, CompetitorId::from("a"));
    }

    #[test]
    fn test_unknown_competitor_rejected() {
        let engine = engine();

        let result = engine.submit_stage_entry(&rally(), entry("ss1", "zz", 1, "5:00.0"));

        assert_eq!(
            result,
            Err(EngineError::UnknownCompetitor {
                rally_id: rally(),
                competitor_id: CompetitorId::from("zz"),
            })
        );
        assert_eq!(
            engine.stage_classification(&rally(), &StageId::from("ss1")),
            Err(EngineError::NotYetRun(StageId::from("ss1")))
        );
    }

    #[test]
    fn test_cancelled_stage_refuses_whole_batch() {
        let engine = engine();
        let mut cancelled = stage("ss2", 2);
        cancelled.status = StageStatus::Cancelled;
        engine
            .sync_stages(&rally(), vec![stage("ss1", 1), cancelled])
            .unwrap();

        let result = engine.submit_batch(
            &rally(),
            vec![
                entry("ss1", "a", 1, "5:00.0"),
                entry("ss2", "a", 1, "6:00.0"),
            ],
        );

        assert_eq!(result, Err(EngineError::CancelledStageWrite(StageId::from("ss2"))));
        assert_eq!(
            engine.stage_classification(&rally(), &StageId::from("ss1")),
            Err(EngineError::NotYetRun(StageId::from("ss1")))
        );
        assert_eq!(
            engine.stage_classification(&rally(), &StageId::from("ss2")),
            Err(EngineError::StageCancelled(StageId::from("ss2")))
        );
    }

    #[test]
    fn test_batch_keeps_per_entry_errors_local() {
        let engine = engine();

        let reports = engine
            .submit_batch(
                &rally(),
                vec![
                    entry("ss1", "a", 1, "5:00.0"),
                    entry("ss1", "ghost", 1, "4:00.0"),
                    entry("ss1", "b", 1, "5:01.0"),
                ],
            )
            .unwrap();

        let results: Vec<_> = reports.iter().map(|report| report.result.is_ok()).collect();
        assert_eq!(results, vec![true, false, true]);
        let classification = engine
            .stage_classification(&rally(), &StageId::from("ss1"))
            .unwrap();
        assert_eq!(classification.classified.len(), 2);
    }

    #[test]
    fn test_cancelling_stage_removes_its_time() {
        let engine = engine();
        engine
            .submit_batch(
                &rally(),
                vec![entry("ss1", "a", 1, "5:00.0"), entry("ss2", "a", 1, "6:00.0")],
            )
            .unwrap();
        assert_eq!(
            total_of(&engine.overall_standings(&rally()).unwrap(), "a"),
            Some("11:00.0".to_string())
        );

        let mut cancelled = stage("ss2", 2);
        cancelled.status = StageStatus::Cancelled;
        engine
            .sync_stages(&rally(), vec![stage("ss1", 1), cancelled])
            .unwrap();

        let overall = engine.overall_standings(&rally()).unwrap();
        assert_eq!(total_of(&overall, "a"), Some("5:00.0".to_string()));
        assert_eq!(overall.after_stage, Some(StageId::from("ss1")));
    }

    #[test]
    fn test_queries_on_unknown_rally() {
        let engine = StandingsEngine::new();
        let missing = RallyId::from("nope");

        assert_eq!(
            engine.overall_standings(&missing),
            Err(EngineError::UnknownRally(missing.clone()))
        );
        assert_eq!(
            engine.submit_stage_entry(&missing, entry("ss1", "a", 1, "1:00.0")),
            Err(EngineError::UnknownRally(missing.clone()))
        );
    }

    #[test]
    fn test_no_competitors_reported() {
        let engine = StandingsEngine::new();
        engine.sync_stages(&rally(), vec![stage("ss1", 1)]).unwrap();

        assert_eq!(
            engine.overall_standings(&rally()),
            Err(EngineError::NoCompetitors(rally()))
        );
    }

    #[test]
    fn test_sync_stages_validates_definitions() {
        let engine = StandingsEngine::new();

        assert_eq!(
            engine.sync_stages(&rally(), vec![stage("ss1", 1), stage("ss2", 1)]),
            Err(EngineError::DuplicateStageOrdinal {
                ordinal: 1,
                first: StageId::from("ss1"),
                second: StageId::from("ss2"),
            })
        );
        assert_eq!(
            engine.sync_stages(&rally(), vec![stage("ss1", 1), stage("ss1", 2)]),
            Err(EngineError::DuplicateStage(StageId::from("ss1")))
        );

        let mut foreign = stage("ss9", 9);
        foreign.rally_id = RallyId::from("other");
        assert!(matches!(
            engine.sync_stages(&rally(), vec![foreign]),
            Err(EngineError::StageRallyMismatch { .. })
        ));
    }

    #[test]
    fn test_stages_listed_in_ordinal_order() {
        let engine = StandingsEngine::new();
        engine
            .sync_stages(&rally(), vec![stage("ss3", 30), stage("ss1", 10), stage("ss2", 20)])
            .unwrap();

        let ids: Vec<_> = engine
            .stages_in_order(&rally())
            .unwrap()
            .into_iter()
            .map(|stage| stage.stage_id.to_string())
            .collect();
        assert_eq!(ids, vec!["ss1", "ss2", "ss3"]);
    }

    #[test]
    fn test_only_touched_stage_is_reranked() {
        let engine = engine();
        engine
            .submit_batch(
                &rally(),
                vec![entry("ss1", "a", 1, "5:00.0"), entry("ss2", "a", 1, "6:00.0")],
            )
            .unwrap();
        let before = engine.snapshot(&rally()).unwrap();

        engine
            .submit_stage_entry(&rally(), entry("ss2", "b", 1, "5:59.0"))
            .unwrap();
        let after = engine.snapshot(&rally()).unwrap();

        let ss1 = StageId::from("ss1");
        let ss2 = StageId::from("ss2");
        assert!(Arc::ptr_eq(&before.classifications[&ss1], &after.classifications[&ss1]));
        assert!(!Arc::ptr_eq(&before.classifications[&ss2], &after.classifications[&ss2]));
        assert_eq!(after.generation, before.generation + 1);
    }

    #[test]
    fn test_hydrate_loads_everything_at_once() {
        let engine = StandingsEngine::new();

        let reports = engine
            .hydrate(
                &rally(),
                vec![stage("ss1", 1)],
                vec![competitor("a", 1), competitor("b", 2)],
                vec![entry("ss1", "a", 3, "5:00.0"), entry("ss1", "b", 1, "4:59.0")],
            )
            .unwrap();

        assert!(reports.iter().all(|report| report.result == Ok(SubmissionOutcome::Accepted)));
        let snapshot = engine.snapshot(&rally()).unwrap();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(
            snapshot.overall.leader().map(|row| row.competitor_id.as_str()),
            Some("b")
        );
    }

    #[test]
    fn test_rallies_recompute_independently_across_threads() {
        let engine = Arc::new(StandingsEngine::new());
        let rallies: Vec<RallyId> = (0..4).map(|idx| RallyId::new(format!("rally-{idx}"))).collect();

        let handles: Vec<_> = rallies
            .iter()
            .cloned()
            .map(|rally_id| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let mut ss1 = stage("ss1", 1);
                    ss1.rally_id = rally_id.clone();
                    engine.sync_stages(&rally_id, vec![ss1]).unwrap();
                    for car in 1..=20u32 {
                        engine
                            .register_competitor(&rally_id, competitor(&format!("c{car}"), car))
                            .unwrap();
                    }
                    for car in 1..=20u32 {
                        let time = TimeValue::from_millis(300_000 + u64::from(car) * 100).to_string();
                        engine
                            .submit_stage_entry(&rally_id, entry("ss1", &format!("c{car}"), 1, &time))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for rally_id in &rallies {
            let overall = engine.overall_standings(rally_id).unwrap();
            assert_eq!(overall.classified.len(), 20);
            assert_eq!(overall.leader().unwrap().competitor_id, CompetitorId::from("c1"));
        }
        assert_eq!(engine.rally_ids(), rallies);
    }

    /// A correction set with one payload per (stage, competitor, revision).
    fn correction_set() -> impl Strategy<Value = Vec<StageEntry>> {
        prop::collection::vec((0usize..3, 0usize..2, 1u64..5, 240_000u64..360_000), 1..24).prop_map(
            |times| {
                let competitors = ["a", "b", "c"];
                let stages = ["ss1", "ss2"];
                let canonical: BTreeMap<(StageId, CompetitorId, u64), StageEntry> = times
                    .iter()
                    .map(|(crew, stage_idx, revision, millis)| {
                        // Same key and revision always carries the same payload.
                        let millis = millis - (millis % 1000) + revision * 7;
                        let submission = entry(
                            stages[*stage_idx],
                            competitors[*crew],
                            *revision,
                            &TimeValue::from_millis(millis).to_string(),
                        );
                        (
                            (
                                submission.stage_id.clone(),
                                submission.competitor_id.clone(),
                                submission.revision,
                            ),
                            submission,
                        )
                    })
                    .collect();
                canonical.into_values().collect()
            },
        )
    }

    proptest! {
        /// Property: any submission order of a fixed correction set converges.
        #[test]
        fn submission_order_does_not_change_result(
            (deduped, shuffled) in correction_set()
                .prop_flat_map(|deduped| (Just(deduped.clone()), Just(deduped).prop_shuffle())),
        ) {
            let forward = engine();
            for submission in &deduped {
                forward.submit_stage_entry(&rally(), submission.clone()).unwrap();
            }
            let backward = engine();
            for submission in deduped.iter().rev() {
                backward.submit_stage_entry(&rally(), submission.clone()).unwrap();
            }
            let random = engine();
            for submission in &shuffled {
                random.submit_stage_entry(&rally(), submission.clone()).unwrap();
            }

            let expected = forward.overall_standings(&rally()).unwrap();
            prop_assert_eq!(&expected, &backward.overall_standings(&rally()).unwrap());
            prop_assert_eq!(&expected, &random.overall_standings(&rally()).unwrap());
        }
    }
}
