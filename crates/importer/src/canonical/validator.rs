use super::models::{CanonicalRallyFile, FORMAT_VERSION};
use crate::{ImporterError, Result};
use std::collections::{HashMap, HashSet};
use storage::models::{EntryStatus, StageStatus, TimeValue};
use tracing::warn;

pub struct CanonicalValidator;

impl CanonicalValidator {
    pub fn validate(canonical: &CanonicalRallyFile) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        if canonical.format_version != FORMAT_VERSION {
            report.errors.push(format!(
                "Unsupported format version: {}. Expected {}",
                canonical.format_version, FORMAT_VERSION
            ));
        }

        let rally = &canonical.rally;
        if rally.rally_id.trim().is_empty() {
            report.errors.push("Rally id is required".to_string());
        }
        if rally.name.is_empty() {
            report.errors.push("Rally name is required".to_string());
        }
        if rally.slug.is_empty() {
            report.errors.push("Rally slug is required".to_string());
        }
        if rally.end_date < rally.start_date {
            report
                .errors
                .push("Rally end_date must be >= start_date".to_string());
        }

        if canonical.stages.is_empty() {
            report
                .errors
                .push("At least one stage is required".to_string());
        }

        let mut stage_status = HashMap::new();
        let mut ordinals = HashSet::new();
        for stage in &canonical.stages {
            if stage.stage_id.trim().is_empty() {
                report.errors.push("Stage id cannot be empty".to_string());
            }
            if !ordinals.insert(stage.ordinal) {
                report.errors.push(format!(
                    "Stage '{}' reuses ordinal {}",
                    stage.stage_id, stage.ordinal
                ));
            }
            let status = match stage.status.parse::<StageStatus>() {
                Ok(status) => Some(status),
                Err(e) => {
                    report
                        .errors
                        .push(format!("Stage '{}': {}", stage.stage_id, e));
                    None
                }
            };
            if stage_status.insert(stage.stage_id.as_str(), status).is_some() {
                report
                    .errors
                    .push(format!("Duplicate stage id: '{}'", stage.stage_id));
            }
        }

        if canonical.competitors.is_empty() {
            report
                .warnings
                .push("No competitors in file".to_string());
        }

        let mut competitor_ids = HashSet::new();
        let mut car_numbers: HashMap<u32, &str> = HashMap::new();
        for competitor in &canonical.competitors {
            if competitor.display_name.is_empty() {
                report.errors.push(format!(
                    "Competitor '{}' has empty display_name",
                    competitor.competitor_id
                ));
            }
            if competitor.nationality.is_empty() {
                report.warnings.push(format!(
                    "Competitor '{}' has no nationality",
                    competitor.competitor_id
                ));
            }
            if !competitor_ids.insert(competitor.competitor_id.as_str()) {
                report.errors.push(format!(
                    "Duplicate competitor id: '{}'",
                    competitor.competitor_id
                ));
            }
            if let Some(holder) =
                car_numbers.insert(competitor.car_number, &competitor.competitor_id)
            {
                report.errors.push(format!(
                    "Car number {} used by both '{}' and '{}'",
                    competitor.car_number, holder, competitor.competitor_id
                ));
            }
        }

        let mut revisions = HashSet::new();
        for (idx, entry) in canonical.entries.iter().enumerate() {
            let label = format!(
                "Entry {} ({} / {})",
                idx + 1,
                entry.stage_id,
                entry.competitor_id
            );

            match stage_status.get(entry.stage_id.as_str()) {
                None => report
                    .errors
                    .push(format!("{}: unknown stage", label)),
                Some(Some(StageStatus::Cancelled)) => report
                    .warnings
                    .push(format!("{}: stage is cancelled, entry will not count", label)),
                Some(_) => {}
            }
            if !competitor_ids.contains(entry.competitor_id.as_str()) {
                report
                    .errors
                    .push(format!("{}: unknown competitor", label));
            }

            let status = match entry.status.parse::<EntryStatus>() {
                Ok(status) => Some(status),
                Err(e) => {
                    report.errors.push(format!("{}: {}", label, e));
                    None
                }
            };

            match entry.elapsed_time.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => {
                    if let Err(e) = TimeValue::parse(text) {
                        report
                            .warnings
                            .push(format!("{}: {}, ranked without a time", label, e));
                    }
                }
                _ if status == Some(EntryStatus::Finished) => report
                    .warnings
                    .push(format!("{}: finished without a time", label)),
                _ => {}
            }

            if !revisions.insert((&entry.stage_id, &entry.competitor_id, entry.revision)) {
                report.warnings.push(format!(
                    "{}: revision {} appears more than once, the first one wins",
                    label, entry.revision
                ));
            }
        }

        if !report.errors.is_empty() {
            Err(ImporterError::ValidationError(format!(
                "Validation failed with {} error(s): {}",
                report.errors.len(),
                report.errors.join("; ")
            )))
        } else {
            Ok(report)
        }
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::fixtures::sample;
    use crate::canonical::models::{CompetitorData, EntryData};
    use pretty_assertions::assert_eq;

    fn error_message(canonical: &CanonicalRallyFile) -> String {
        match CanonicalValidator::validate(canonical) {
            Err(ImporterError::ValidationError(message)) => message,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_sample_is_valid_with_warnings() {
        let report = CanonicalValidator::validate(&sample()).unwrap();

        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("stage is cancelled"));
    }

    #[test]
    fn test_duplicate_car_number_is_an_error() {
        let mut canonical = sample();
        canonical.competitors.push(CompetitorData {
            competitor_id: "crew-d".to_string(),
            display_name: "D. Driver".to_string(),
            co_driver_name: None,
            nationality: "LAT".to_string(),
            car_number: 2,
            team_id: None,
            car_id: None,
        });

        assert!(error_message(&canonical).contains("Car number 2 used by both 'crew-b' and 'crew-d'"));
    }

    #[test]
    fn test_unknown_references_and_status_are_errors() {
        let mut canonical = sample();
        canonical.entries.push(EntryData {
            stage_id: "ss9".to_string(),
            competitor_id: "crew-z".to_string(),
            revision: 1,
            elapsed_time: Some("1:00.0".to_string()),
            status: "crashed".to_string(),
        });

        let message = error_message(&canonical);

        assert!(message.starts_with("Validation failed with 3 error(s)"));
        assert!(message.contains("unknown stage"));
        assert!(message.contains("unknown competitor"));
        assert!(message.contains("Unknown status: 'crashed'"));
    }

    #[test]
    fn test_malformed_time_is_only_a_warning() {
        let mut canonical = sample();
        canonical.entries[0].elapsed_time = Some("10:75.0".to_string());

        let report = CanonicalValidator::validate(&canonical).unwrap();

        assert!(report
            .warnings
            .iter()
            .any(|warning| warning.contains("ranked without a time")));
    }

    #[test]
    fn test_reused_ordinal_is_an_error() {
        let mut canonical = sample();
        canonical.stages[2].ordinal = 1;

        assert!(error_message(&canonical).contains("Stage 'ss3' reuses ordinal 1"));
    }
}
