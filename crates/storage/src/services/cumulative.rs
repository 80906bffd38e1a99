use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::models::{
    CompetitorId, CumulativeRecord, Stage, StageClassification, StageId, StandingStatus,
    TimeValue, UnclassifiedReason,
};

use super::competitor_registry::CompetitorRegistry;

/// Cumulative state after folding some prefix of the rally's stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeTotals {
    pub records: BTreeMap<CompetitorId, CumulativeRecord>,
    pub last_stage: Option<StageId>,
}

/// Folds stage classifications into running totals, one stage at a time.
///
/// Callers must feed stages in ordinal order; [`aggregate`] does the sorting
/// for the common whole-rally case.
#[derive(Debug, Clone)]
pub struct CumulativeAggregator {
    totals: CumulativeTotals,
}

impl CumulativeAggregator {
    /// Every registered competitor starts at zero, running.
    pub fn new(registry: &CompetitorRegistry) -> Self {
        let records = registry
            .iter()
            .map(|competitor| {
                (
                    competitor.competitor_id.clone(),
                    CumulativeRecord {
                        competitor_id: competitor.competitor_id.clone(),
                        car_number: competitor.car_number,
                        total: TimeValue::ZERO,
                        counted_stages: 0,
                        status: StandingStatus::Running,
                        out_on_stage: None,
                    },
                )
            })
            .collect();

        Self {
            totals: CumulativeTotals {
                records,
                last_stage: None,
            },
        }
    }

    pub fn fold_stage(&mut self, stage: &Stage, classification: &StageClassification) {
        if stage.is_cancelled() {
            debug!(stage_id = %stage.stage_id, "Skipping cancelled stage");
            return;
        }

        for row in &classification.classified {
            if let Some(record) = self.totals.records.get_mut(&row.competitor_id)
                && record.status.is_running()
            {
                record.total += row.time;
                record.counted_stages += 1;
            }
        }

        for row in &classification.unclassified {
            let Some(record) = self.totals.records.get_mut(&row.competitor_id) else {
                continue;
            };
            if matches!(
                row.reason,
                UnclassifiedReason::MissingTime | UnclassifiedReason::MalformedTime
            ) {
                continue;
            }

            let next = record.status.after_entry(row.status);
            if next != record.status {
                debug!(
                    stage_id = %stage.stage_id,
                    competitor_id = %record.competitor_id,
                    from = %record.status,
                    to = %next,
                    "Competitor leaves the classification"
                );
                if record.out_on_stage.is_none() {
                    record.out_on_stage = Some(stage.stage_id.clone());
                }
                record.status = next;
            }
        }

        self.totals.last_stage = Some(stage.stage_id.clone());
    }

    pub fn totals(&self) -> &CumulativeTotals {
        &self.totals
    }

    pub fn finish(self) -> CumulativeTotals {
        self.totals
    }
}

/// Fold every non-cancelled stage that has a classification, in ordinal
/// order regardless of the order `stages` is given in.
pub fn aggregate(
    registry: &CompetitorRegistry,
    stages: &[Stage],
    classifications: &BTreeMap<StageId, Arc<StageClassification>>,
) -> CumulativeTotals {
    let mut ordered: Vec<&Stage> = stages.iter().collect();
    ordered.sort_by_key(|stage| stage.ordinal);

    let mut aggregator = CumulativeAggregator::new(registry);
    for stage in ordered {
        if let Some(classification) = classifications.get(&stage.stage_id) {
            aggregator.fold_stage(stage, classification);
        }
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Competitor, EntryStatus, RallyId, StageEntry, StageStatus};
    use crate::services::stage_ranking::classify_stage;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn registry(ids: &[&str]) -> CompetitorRegistry {
        let mut registry = CompetitorRegistry::new();
        for (idx, id) in ids.iter().enumerate() {
            registry
                .register(Competitor {
                    competitor_id: CompetitorId::from(*id),
                    display_name: id.to_string(),
                    co_driver_name: None,
                    nationality: "FRA".to_string(),
                    car_number: idx as u32 + 1,
                    team_id: None,
                    car_id: None,
                })
                .unwrap();
        }
        registry
    }

    fn stage(id: &str, ordinal: i32, status: StageStatus) -> Stage {
        Stage {
            stage_id: StageId::from(id),
            rally_id: RallyId::from("rally"),
            name: id.to_uppercase(),
            ordinal,
            status,
            distance_km: None,
        }
    }

    fn classify(
        registry: &CompetitorRegistry,
        stage_id: &str,
        results: &[(&str, Option<&str>, EntryStatus)],
    ) -> Arc<StageClassification> {
        let entries: Vec<StageEntry> = results
            .iter()
            .map(|(competitor, time, status)| StageEntry {
                competitor_id: CompetitorId::from(*competitor),
                stage_id: StageId::from(stage_id),
                revision: 1,
                elapsed_time: time.map(str::to_string),
                status: *status,
            })
            .collect();
        Arc::new(classify_stage(&StageId::from(stage_id), &entries, registry))
    }

    fn record<'a>(totals: &'a CumulativeTotals, id: &str) -> &'a CumulativeRecord {
        &totals.records[&CompetitorId::from(id)]
    }

    #[test]
    fn test_sums_stage_times() {
        let registry = registry(&["a", "b"]);
        let stages = vec![
            stage("ss1", 1, StageStatus::Completed),
            stage("ss2", 2, StageStatus::Completed),
        ];
        let mut classifications = BTreeMap::new();
        classifications.insert(
            StageId::from("ss1"),
            classify(&registry, "ss1", &[
                ("a", Some("10:00.0"), EntryStatus::Finished),
                ("b", Some("10:05.0"), EntryStatus::Finished),
            ]),
        );
        classifications.insert(
            StageId::from("ss2"),
            classify(&registry, "ss2", &[
                ("a", Some("9:00.0"), EntryStatus::Finished),
                ("b", Some("8:58.0"), EntryStatus::Finished),
            ]),
        );

        let totals = aggregate(&registry, &stages, &classifications);

        assert_eq!(record(&totals, "a").total.to_string(), "19:00.0");
        assert_eq!(record(&totals, "b").total.to_string(), "19:03.0");
        assert_eq!(record(&totals, "b").counted_stages, 2);
        assert_eq!(totals.last_stage, Some(StageId::from("ss2")));
    }

    #[test]
    fn test_dnf_retires_and_stops_accrual() {
        let registry = registry(&["a", "b"]);
        let stages = vec![
            stage("ss1", 1, StageStatus::Completed),
            stage("ss2", 2, StageStatus::Completed),
        ];
        let mut classifications = BTreeMap::new();
        classifications.insert(
            StageId::from("ss1"),
            classify(&registry, "ss1", &[
                ("a", Some("10:00.0"), EntryStatus::Finished),
                ("b", None, EntryStatus::Dnf),
            ]),
        );
        classifications.insert(
            StageId::from("ss2"),
            classify(&registry, "ss2", &[
                ("a", Some("9:00.0"), EntryStatus::Finished),
                ("b", Some("8:00.0"), EntryStatus::Finished),
            ]),
        );

        let totals = aggregate(&registry, &stages, &classifications);
        let retired = record(&totals, "b");

        assert_eq!(retired.status, StandingStatus::Retired);
        assert_eq!(retired.total, TimeValue::ZERO);
        assert_eq!(retired.counted_stages, 0);
        assert_eq!(retired.out_on_stage, Some(StageId::from("ss1")));
    }

    #[test]
    fn test_exclusion_overrides_retirement() {
        let registry = registry(&["a"]);
        let stages = vec![
            stage("ss1", 1, StageStatus::Completed),
            stage("ss2", 2, StageStatus::Completed),
        ];
        let mut classifications = BTreeMap::new();
        classifications.insert(
            StageId::from("ss1"),
            classify(&registry, "ss1", &[("a", None, EntryStatus::Dnf)]),
        );
        classifications.insert(
            StageId::from("ss2"),
            classify(&registry, "ss2", &[("a", None, EntryStatus::Excluded)]),
        );

        let totals = aggregate(&registry, &stages, &classifications);

        assert_eq!(record(&totals, "a").status, StandingStatus::Excluded);
        assert_eq!(record(&totals, "a").out_on_stage, Some(StageId::from("ss1")));
    }

    #[test]
    fn test_folds_in_ordinal_order_and_skips_cancelled() {
        let registry = registry(&["a"]);
        // Given out of order on purpose; ss2 is cancelled.
        let stages = vec![
            stage("ss3", 3, StageStatus::Completed),
            stage("ss2", 2, StageStatus::Cancelled),
            stage("ss1", 1, StageStatus::Completed),
        ];
        let mut classifications = BTreeMap::new();
        for (id, time) in [("ss1", "5:00.0"), ("ss2", "6:00.0"), ("ss3", "7:00.0")] {
            classifications.insert(
                StageId::from(id),
                classify(&registry, id, &[("a", Some(time), EntryStatus::Finished)]),
            );
        }

        let totals = aggregate(&registry, &stages, &classifications);

        assert_eq!(record(&totals, "a").total.to_string(), "12:00.0");
        assert_eq!(record(&totals, "a").counted_stages, 2);
        assert_eq!(totals.last_stage, Some(StageId::from("ss3")));
    }

    #[test]
    fn test_missing_time_keeps_competitor_running() {
        let registry = registry(&["a"]);
        let stages = vec![stage("ss1", 1, StageStatus::Completed)];
        let mut classifications = BTreeMap::new();
        classifications.insert(
            StageId::from("ss1"),
            classify(&registry, "ss1", &[("a", Some("??"), EntryStatus::Finished)]),
        );

        let totals = aggregate(&registry, &stages, &classifications);

        assert_eq!(record(&totals, "a").status, StandingStatus::Running);
        assert_eq!(record(&totals, "a").counted_stages, 0);
    }

    proptest! {
        /// Property: a competitor who stays running never loses time between folds.
        #[test]
        fn running_total_is_monotonic(
            stage_times in prop::collection::vec(0u64..900_000, 1..20)
        ) {
            let registry = registry(&["a"]);
            let mut aggregator = CumulativeAggregator::new(&registry);
            let mut previous = TimeValue::ZERO;

            for (idx, millis) in stage_times.iter().enumerate() {
                let stage_id = format!("ss{idx}");
                let time = TimeValue::from_millis(*millis).to_string();
                let classification = classify(
                    &registry,
                    &stage_id,
                    &[("a", Some(time.as_str()), EntryStatus::Finished)],
                );
                aggregator.fold_stage(
                    &stage(&stage_id, idx as i32, StageStatus::Completed),
                    &classification,
                );

                let current = aggregator.totals().records[&CompetitorId::from("a")].total;
                prop_assert!(current >= previous);
                previous = current;
            }
        }
    }
}
