//! Report persistence under the data directory.
//!
//! ```text
//! data/
//! ├── daily/<YYYY-MM-DD>.md     written first
//! ├── daily/<YYYY-MM-DD>.json   written last, atomically (commit marker)
//! └── monthly/<YYYY-MM>.{json,md}
//! ```

use std::path::{Path, PathBuf};

use devmemory_core::{DailyReport, ReportArtifact, Result, YearMonth, write_atomic};
use serde::Serialize;

fn pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');
    Ok(json)
}

fn with_trailing_newline(markdown: &str) -> String {
    format!("{}\n", markdown.trim_end_matches('\n'))
}

#[derive(Debug, Clone)]
pub struct ReportWriter {
    data_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn daily_dir(&self) -> PathBuf {
        self.data_dir.join("daily")
    }

    pub fn monthly_dir(&self) -> PathBuf {
        self.data_dir.join("monthly")
    }

    /// Persist a daily report. On error the JSON marker is not left behind.
    pub fn write_daily(&self, report: &DailyReport, markdown: &str) -> Result<ReportArtifact> {
        let artifact = ReportArtifact::locate(&self.data_dir, report.date);
        write_atomic(&artifact.markdown_path, with_trailing_newline(markdown).as_bytes())?;
        write_atomic(&artifact.json_path, &pretty_json(report)?)?;
        tracing::info!("💾 Saved daily report to {}", artifact.json_path.display());
        Ok(artifact)
    }

    /// Persist a monthly roll-up; returns the Markdown path.
    pub fn write_monthly<T: Serialize>(&self, month: YearMonth, data: &T, markdown: &str) -> Result<PathBuf> {
        let dir = self.monthly_dir();
        let md_path = dir.join(format!("{month}.md"));
        write_atomic(&dir.join(format!("{month}.json")), &pretty_json(data)?)?;
        write_atomic(&md_path, with_trailing_newline(markdown).as_bytes())?;
        tracing::info!("💾 Saved monthly report to {}", md_path.display());
        Ok(md_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use devmemory_core::ReportStatus;

    fn empty_report() -> DailyReport {
        DailyReport {
            date: NaiveDate::from_ymd_opt(2026, 2, 12).unwrap(),
            repos_touched: 0,
            committed: vec![],
            working_state: vec![],
            status: ReportStatus::NoActivity,
        }
    }

    #[test]
    fn test_write_daily_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let artifact = writer.write_daily(&empty_report(), "# Daily\n\n\n").unwrap();

        assert!(artifact.exists());
        assert_eq!(std::fs::read_to_string(&artifact.markdown_path).unwrap(), "# Daily\n");
        let json = std::fs::read_to_string(&artifact.json_path).unwrap();
        let parsed: DailyReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, empty_report());
        assert!(json.contains("\"status\": \"no_activity\""));
        assert!(!dir.path().join("daily").join("2026-02-12.json.tmp").exists());
    }

    #[test]
    fn test_failed_markdown_write_leaves_no_marker() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the daily directory should be.
        std::fs::write(dir.path().join("daily"), "blocker").unwrap();
        let writer = ReportWriter::new(dir.path());

        assert!(writer.write_daily(&empty_report(), "# Daily").is_err());
        let artifact = ReportArtifact::locate(dir.path(), empty_report().date);
        assert!(!artifact.exists());
    }

    #[test]
    fn test_write_monthly_paths() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let month = YearMonth { year: 2026, month: 1 };
        let md = writer
            .write_monthly(month, &serde_json::json!({"month": "2026-01"}), "# Monthly")
            .unwrap();
        assert_eq!(md, dir.path().join("monthly").join("2026-01.md"));
        assert!(dir.path().join("monthly").join("2026-01.json").exists());
    }
}
