//! Shared data model: report windows, execution state, artifacts, and the
//! daily report document written to `data/daily/<date>.json`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::DevMemoryError;

/// Commit-collection window for one logical report date.
///
/// `start` is inclusive, `end` is the last second that still belongs to the
/// window; the next window opens one second later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub report_date: NaiveDate,
}

impl ReportWindow {
    /// Git-friendly `--since` value.
    pub fn since_arg(&self) -> String {
        self.start.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Git-friendly `--until` value.
    pub fn until_arg(&self) -> String {
        self.end.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start && at <= self.end
    }
}

fn current_state_version() -> u32 {
    1
}

/// Persisted idempotency record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    #[serde(default = "current_state_version")]
    pub version: u32,
    #[serde(default)]
    pub last_daily_execution: Option<NaiveDate>,
}

impl ExecutionState {
    pub fn recorded(date: NaiveDate) -> Self {
        Self {
            version: current_state_version(),
            last_daily_execution: Some(date),
        }
    }

    pub fn has_executed_for(&self, report_date: NaiveDate) -> bool {
        self.last_daily_execution == Some(report_date)
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self {
            version: current_state_version(),
            last_daily_execution: None,
        }
    }
}

/// A finished daily report on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub report_date: NaiveDate,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}

impl ReportArtifact {
    /// Locate the artifact for `report_date` under `<data_dir>/daily`.
    pub fn locate(data_dir: &Path, report_date: NaiveDate) -> Self {
        let daily = data_dir.join("daily");
        let stem = report_date.format("%Y-%m-%d").to_string();
        Self {
            report_date,
            json_path: daily.join(format!("{stem}.json")),
            markdown_path: daily.join(format!("{stem}.md")),
        }
    }

    /// The JSON document is the commit marker; it counts only when non-empty.
    pub fn exists(&self) -> bool {
        std::fs::metadata(&self.json_path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }
}

/// Calendar month, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = DevMemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || DevMemoryError::Config(format!("invalid month '{s}', expected YYYY-MM"));
        let (y, m) = s.trim().split_once('-').ok_or_else(bad)?;
        let year: i32 = y.parse().map_err(|_| bad())?;
        let month: u32 = m.parse().map_err(|_| bad())?;
        if y.len() != 4 || !(1..=12).contains(&month) {
            return Err(bad());
        }
        Ok(Self { year, month })
    }
}

/// Rule-based classification of one repository's committed work.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Feature,
    Bugfix,
    Refactor,
    Improvement,
    #[default]
    NoActivity,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Bugfix => "bugfix",
            Self::Refactor => "refactor",
            Self::Improvement => "improvement",
            Self::NoActivity => "no_activity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Success,
    NoActivity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetail {
    pub hash: String,
    pub message: String,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCommittedSummary {
    pub repo_name: String,
    pub branch: String,
    pub commits_count: u32,
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
    #[serde(default)]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub commit_messages: Vec<String>,
    #[serde(default)]
    pub commit_details: Vec<CommitDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoWorkingState {
    pub repo_name: String,
    pub branch: String,
    #[serde(default)]
    pub modified_files: Vec<String>,
    #[serde(default)]
    pub untracked_files: Vec<String>,
    pub insertions: u32,
    pub deletions: u32,
}

impl RepoWorkingState {
    pub fn is_dirty(&self) -> bool {
        !self.modified_files.is_empty()
            || !self.untracked_files.is_empty()
            || self.insertions > 0
            || self.deletions > 0
    }
}

/// The daily report document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub repos_touched: u32,
    #[serde(default)]
    pub committed: Vec<RepoCommittedSummary>,
    #[serde(default)]
    pub working_state: Vec<RepoWorkingState>,
    pub status: ReportStatus,
}

impl DailyReport {
    pub fn total_commits(&self) -> u32 {
        self.committed.iter().map(|c| c.commits_count).sum()
    }

    pub fn total_files_changed(&self) -> u32 {
        self.committed.iter().map(|c| c.files_changed).sum()
    }
}

/// How an artifact was handed to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Markdown wrapped in a fenced code block inside the message body.
    Inline,
    /// Markdown uploaded as a file next to a short header message.
    Attachment,
}

/// Outcome of one `send` call, logged and then discarded.
#[derive(Debug, Default)]
pub struct DeliveryAttempt {
    pub status_code: Option<u16>,
    pub latency_ms: Option<u64>,
    /// Retries performed after the first request.
    pub retry_count: u32,
    /// Requests actually put on the wire.
    pub requests: u32,
    pub rate_limited: bool,
    pub retry_after: Option<Duration>,
    pub mode: Option<DeliveryMode>,
    pub error: Option<DevMemoryError>,
}

impl DeliveryAttempt {
    pub fn failed(error: DevMemoryError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.error.is_none() && self.status_code.is_some_and(|s| (200..300).contains(&s))
    }
}
