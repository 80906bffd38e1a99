use tracing::warn;

use crate::models::{
    CumulativeRecord, Gap, OverallEntry, OverallStandings, OverallUnclassified, RallyId,
    StandingStatus,
};

use super::competitor_registry::CompetitorRegistry;
use super::cumulative::CumulativeTotals;

/// Rank cumulative totals into the overall classification.
///
/// Running competitors are ordered by total time with the same car-number
/// tie-break as stage results, and gapped to the leader's total. A crew still
/// waiting for a time on the current stage is ranked on what it has counted so
/// far. Retired then excluded competitors follow, unranked, each group in
/// ascending car number.
pub fn rank_overall(
    rally_id: &RallyId,
    totals: &CumulativeTotals,
    registry: &CompetitorRegistry,
) -> OverallStandings {
    let mut running: Vec<&CumulativeRecord> = Vec::new();
    let mut out: Vec<&CumulativeRecord> = Vec::new();

    for record in totals.records.values() {
        if record.status.is_running() {
            running.push(record);
        } else {
            out.push(record);
        }
    }

    running.sort_by(|a, b| {
        a.total
            .cmp(&b.total)
            .then_with(|| a.car_number.cmp(&b.car_number))
            .then_with(|| a.competitor_id.cmp(&b.competitor_id))
    });
    out.sort_by(|a, b| {
        status_rank(a.status)
            .cmp(&status_rank(b.status))
            .then_with(|| a.car_number.cmp(&b.car_number))
            .then_with(|| a.competitor_id.cmp(&b.competitor_id))
    });

    let leader_total = running
        .first()
        .map(|record| record.total)
        .unwrap_or_default();
    let classified = running
        .into_iter()
        .zip(1u32..)
        .map(|(record, position)| OverallEntry {
            position,
            competitor_id: record.competitor_id.clone(),
            car_number: record.car_number,
            display_name: display_name(registry, record),
            total: record.total,
            gap: Gap::for_position(position, leader_total, record.total),
            counted_stages: record.counted_stages,
        })
        .collect();

    let unclassified = out
        .into_iter()
        .map(|record| OverallUnclassified {
            competitor_id: record.competitor_id.clone(),
            car_number: record.car_number,
            display_name: display_name(registry, record),
            status: record.status,
            total: record.total,
            out_on_stage: record.out_on_stage.clone(),
        })
        .collect();

    OverallStandings {
        rally_id: rally_id.clone(),
        after_stage: totals.last_stage.clone(),
        classified,
        unclassified,
    }
}

fn status_rank(status: StandingStatus) -> u8 {
    match status {
        StandingStatus::Running => 0,
        StandingStatus::Retired => 1,
        StandingStatus::Excluded => 2,
    }
}

fn display_name(registry: &CompetitorRegistry, record: &CumulativeRecord) -> String {
    match registry.get(&record.competitor_id) {
        Some(competitor) => competitor.display_name.clone(),
        None => {
            warn!(competitor_id = %record.competitor_id, "Cumulative record without registry entry");
            record.competitor_id.to_string()
        }
    }
}
