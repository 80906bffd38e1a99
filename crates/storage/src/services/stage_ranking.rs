use std::cmp::Ordering;

use tracing::warn;

use crate::models::{
    ClassifiedEntry, Competitor, EntryStatus, Gap, StageClassification, StageEntry, StageId,
    TimeValue, UnclassifiedEntry, UnclassifiedReason,
};

use super::competitor_registry::CompetitorRegistry;

/// Rank one stage's entries.
///
/// Timed entries (finished with a parseable time) are ordered by time, ties
/// broken by ascending car number. Everything else follows without position
/// or gap, grouped by [`UnclassifiedReason`]. A malformed time only demotes
/// its own entry. The output depends on the entry set alone, not on the order
/// the entries are supplied in.
pub fn classify_stage<'a>(
    stage_id: &StageId,
    entries: impl IntoIterator<Item = &'a StageEntry>,
    registry: &CompetitorRegistry,
) -> StageClassification {
    let mut timed: Vec<(TimeValue, &Competitor)> = Vec::new();
    let mut untimed: Vec<(UnclassifiedReason, EntryStatus, &Competitor)> = Vec::new();

    for entry in entries {
        let Some(competitor) = registry.get(&entry.competitor_id) else {
            warn!(
                stage_id = %stage_id,
                competitor_id = %entry.competitor_id,
                "Skipping stage entry for unregistered competitor"
            );
            continue;
        };

        match entry_time(entry) {
            Ok(time) => timed.push((time, competitor)),
            Err(reason) => untimed.push((reason, entry.status, competitor)),
        }
    }

    timed.sort_by(|(a_time, a), (b_time, b)| a_time.cmp(b_time).then_with(|| by_car_number(a, b)));
    untimed.sort_by(|(a_reason, _, a), (b_reason, _, b)| {
        a_reason.cmp(b_reason).then_with(|| by_car_number(a, b))
    });

    let leader_time = timed.first().map(|(time, _)| *time).unwrap_or_default();
    let classified = timed
        .into_iter()
        .zip(1u32..)
        .map(|((time, competitor), position)| ClassifiedEntry {
            position,
            competitor_id: competitor.competitor_id.clone(),
            car_number: competitor.car_number,
            display_name: competitor.display_name.clone(),
            time,
            gap: Gap::for_position(position, leader_time, time),
        })
        .collect();

    let unclassified = untimed
        .into_iter()
        .map(|(reason, status, competitor)| UnclassifiedEntry {
            competitor_id: competitor.competitor_id.clone(),
            car_number: competitor.car_number,
            display_name: competitor.display_name.clone(),
            status,
            reason,
        })
        .collect();

    StageClassification {
        stage_id: stage_id.clone(),
        classified,
        unclassified,
    }
}

/// Car number first, competitor id as a last resort so the order stays total
/// even if the registry was bypassed.
pub(crate) fn by_car_number(a: &Competitor, b: &Competitor) -> Ordering {
    a.car_number
        .cmp(&b.car_number)
        .then_with(|| a.competitor_id.cmp(&b.competitor_id))
}

fn entry_time(entry: &StageEntry) -> Result<TimeValue, UnclassifiedReason> {
    match entry.status {
        EntryStatus::Dnf => Err(UnclassifiedReason::Dnf),
        EntryStatus::Dns => Err(UnclassifiedReason::Dns),
        EntryStatus::Excluded => Err(UnclassifiedReason::Excluded),
        EntryStatus::Finished => match entry.elapsed_time.as_deref() {
            None => Err(UnclassifiedReason::MissingTime),
            Some(text) if text.trim().is_empty() => Err(UnclassifiedReason::MissingTime),
            Some(text) => TimeValue::parse(text).map_err(|err| {
                warn!(
                    stage_id = %entry.stage_id,
                    competitor_id = %entry.competitor_id,
                    error = %err,
                    "Malformed stage time, ranking entry as non-timed"
                );
                UnclassifiedReason::MalformedTime
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CompetitorId;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn registry(crews: &[(&str, u32)]) -> CompetitorRegistry {
        let mut registry = CompetitorRegistry::new();
        for (id, car_number) in crews {
            registry
                .register(Competitor {
                    competitor_id: CompetitorId::from(*id),
                    display_name: id.to_uppercase(),
                    co_driver_name: None,
                    nationality: "EST".to_string(),
                    car_number: *car_number,
                    team_id: None,
                    car_id: None,
                })
                .unwrap();
        }
        registry
    }

    fn entry(competitor: &str, time: Option<&str>, status: EntryStatus) -> StageEntry {
        StageEntry {
            competitor_id: CompetitorId::from(competitor),
            stage_id: StageId::from("ss1"),
            revision: 1,
            elapsed_time: time.map(str::to_string),
            status,
        }
    }

    fn finished(competitor: &str, time: &str) -> StageEntry {
        entry(competitor, Some(time), EntryStatus::Finished)
    }

    fn order(classification: &StageClassification) -> Vec<(u32, &str, String, String)> {
        classification
            .classified
            .iter()
            .map(|row| {
                (
                    row.position,
                    row.competitor_id.as_str(),
                    row.time.to_string(),
                    row.gap.to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_ranks_by_time_with_gaps() {
        let registry = registry(&[("a", 1), ("b", 2), ("c", 3)]);
        let entries = [
            finished("a", "10:00.0"),
            finished("b", "10:05.0"),
            finished("c", "10:02.0"),
        ];

        let classification = classify_stage(&StageId::from("ss1"), &entries, &registry);

        assert_eq!(
            order(&classification),
            vec![
                (1, "a", "10:00.0".to_string(), "-".to_string()),
                (2, "c", "10:02.0".to_string(), "+2.0s".to_string()),
                (3, "b", "10:05.0".to_string(), "+5.0s".to_string()),
            ]
        );
        assert!(classification.unclassified.is_empty());
    }

    #[test]
    fn test_tie_broken_by_car_number() {
        let registry = registry(&[("a", 9), ("b", 3)]);
        let entries = [finished("a", "5:00.0"), finished("b", "5:00.0")];

        let classification = classify_stage(&StageId::from("ss1"), &entries, &registry);

        assert_eq!(
            order(&classification),
            vec![
                (1, "b", "5:00.0".to_string(), "-".to_string()),
                (2, "a", "5:00.0".to_string(), "+0.0s".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_timed_entries_grouped_after_timed() {
        let registry = registry(&[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5), ("f", 6)]);
        let entries = [
            entry("f", None, EntryStatus::Excluded),
            entry("e", None, EntryStatus::Dns),
            entry("d", None, EntryStatus::Dnf),
            finished("c", "not a time"),
            entry("b", None, EntryStatus::Finished),
            finished("a", "4:12.3"),
        ];

        let classification = classify_stage(&StageId::from("ss1"), &entries, &registry);

        assert_eq!(classification.classified.len(), 1);
        let reasons: Vec<_> = classification
            .unclassified
            .iter()
            .map(|row| (row.competitor_id.as_str(), row.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("b", UnclassifiedReason::MissingTime),
                ("c", UnclassifiedReason::MalformedTime),
                ("d", UnclassifiedReason::Dnf),
                ("e", UnclassifiedReason::Dns),
                ("f", UnclassifiedReason::Excluded),
            ]
        );
    }

    #[test]
    fn test_unregistered_competitor_skipped() {
        let registry = registry(&[("a", 1)]);
        let entries = [finished("a", "4:00.0"), finished("ghost", "3:00.0")];

        let classification = classify_stage(&StageId::from("ss1"), &entries, &registry);

        assert_eq!(classification.entry_count(), 1);
        assert_eq!(
            classification.leader().map(|row| row.competitor_id.as_str()),
            Some("a")
        );
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let registry = registry(&[("a", 1), ("b", 2), ("c", 3)]);
        let forward = [
            finished("a", "3:00.0"),
            entry("b", None, EntryStatus::Dnf),
            finished("c", "2:59.9"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        assert_eq!(
            classify_stage(&StageId::from("ss1"), &forward, &registry),
            classify_stage(&StageId::from("ss1"), &reversed, &registry)
        );
    }

    proptest! {
        /// Property: positions are 1..N, times never decrease, leader gap is zero.
        #[test]
        fn positions_contiguous_and_times_sorted(
            times in prop::collection::vec(0u64..3_600_000, 1..40)
        ) {
            let crews: Vec<(String, u32)> = (0..times.len())
                .map(|idx| (format!("c{idx}"), idx as u32 + 1))
                .collect();
            let crew_refs: Vec<(&str, u32)> =
                crews.iter().map(|(id, n)| (id.as_str(), *n)).collect();
            let registry = registry(&crew_refs);
            let entries: Vec<StageEntry> = crews
                .iter()
                .zip(&times)
                .map(|((id, _), millis)| {
                    finished(id, &TimeValue::from_millis(*millis).to_string())
                })
                .collect();

            let classification = classify_stage(&StageId::from("ss1"), &entries, &registry);

            prop_assert_eq!(classification.classified.len(), times.len());
            for (idx, row) in classification.classified.iter().enumerate() {
                prop_assert_eq!(row.position as usize, idx + 1);
            }
            for pair in classification.classified.windows(2) {
                prop_assert!(pair[0].time <= pair[1].time);
            }
            prop_assert_eq!(classification.classified[0].gap.duration(), TimeValue::ZERO);
        }
    }
}
