use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown status: '{0}'")]
pub struct UnknownStatus(pub String);

/// Result status of one competitor on one stage.
///
/// Timing sheets and edit forms spell these inconsistently, so text is
/// mapped through [`EntryStatus::from_str`] at the ingestion boundary:
///
/// | text                                  | status     |
/// |---------------------------------------|------------|
/// | `finished`, `finish`, `ok`            | `Finished` |
/// | `dnf`, `retired`, `ret`               | `Dnf`      |
/// | `dns`                                 | `Dns`      |
/// | `excluded`, `dsq`, `disqualified`, `exc` | `Excluded` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Finished,
    Dnf,
    Dns,
    Excluded,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Dnf => "dnf",
            Self::Dns => "dns",
            Self::Excluded => "excluded",
        }
    }
}

impl FromStr for EntryStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "finished" | "finish" | "ok" => Ok(Self::Finished),
            "dnf" | "retired" | "ret" => Ok(Self::Dnf),
            "dns" => Ok(Self::Dns),
            "excluded" | "dsq" | "disqualified" | "exc" => Ok(Self::Excluded),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate status of a competitor across the rally so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StandingStatus {
    Running,
    Retired,
    Excluded,
}

impl StandingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Retired => "retired",
            Self::Excluded => "excluded",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Status after a non-finishing entry with `entry` status.
    ///
    /// Exclusion overrides retirement; nothing moves a competitor back to
    /// `Running`.
    pub fn after_entry(self, entry: EntryStatus) -> Self {
        match (self, entry) {
            (_, EntryStatus::Excluded) => Self::Excluded,
            (Self::Running, EntryStatus::Dnf | EntryStatus::Dns) => Self::Retired,
            (current, _) => current,
        }
    }
}

impl fmt::Display for StandingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a stage as maintained by the rally metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    Upcoming,
    InProgress,
    Completed,
    Cancelled,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for StageStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upcoming" => Ok(Self::Upcoming),
            "in-progress" | "in_progress" | "running" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
