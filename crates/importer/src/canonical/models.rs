use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const FORMAT_VERSION: &str = "1.0.0";

/// Source-independent interchange file for one rally's results.
///
/// Status fields are kept as raw text here; they are mapped to the closed
/// status enums when the file is turned into domain data, so that
/// validation can report every bad value at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRallyFile {
    pub format_version: String,
    pub source: SourceMetadata,
    pub rally: RallyData,
    pub stages: Vec<StageData>,
    pub competitors: Vec<CompetitorData>,
    #[serde(default)]
    pub entries: Vec<EntryData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(rename = "type")]
    pub r#type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub extracted_at: DateTime<Utc>,
    pub extractor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    TimingSheet,
    Csv,
    Api,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RallyData {
    pub rally_id: String,
    pub name: String,
    pub slug: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageData {
    pub stage_id: String,
    pub name: String,
    pub ordinal: i32,
    #[serde(default = "default_stage_status")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorData {
    pub competitor_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co_driver_name: Option<String>,
    pub nationality: String,
    pub car_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryData {
    pub stage_id: String,
    pub competitor_id: String,
    #[serde(default = "default_revision")]
    pub revision: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<String>,
    pub status: String,
}

fn default_stage_status() -> String {
    "completed".to_string()
}

fn default_revision() -> u64 {
    1
}
