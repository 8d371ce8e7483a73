//! Monthly roll-up of the daily JSON reports.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use devmemory_core::traits::MonthlyAggregator;
use devmemory_core::{ActivityType, DailyReport, DevMemoryError, ReportStatus, Result, YearMonth};
use serde::{Deserialize, Serialize};

use crate::narrative::{NarrativeClient, monthly_prompt};
use crate::writer::ReportWriter;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMonthly {
    pub repo_name: String,
    pub total_commits: u32,
    pub total_files_changed: u32,
    pub total_insertions: u32,
    pub total_deletions: u32,
    /// Days per activity type; zero counts are never stored.
    pub activity_breakdown: BTreeMap<ActivityType, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: String,
    pub total_days_active: u32,
    pub total_commits: u32,
    pub total_files_changed: u32,
    pub total_insertions: u32,
    pub total_deletions: u32,
    /// Sorted by repository name.
    pub repositories: Vec<RepoMonthly>,
}

impl MonthlySummary {
    fn empty(month: YearMonth) -> Self {
        Self {
            month: month.to_string(),
            total_days_active: 0,
            total_commits: 0,
            total_files_changed: 0,
            total_insertions: 0,
            total_deletions: 0,
            repositories: Vec::new(),
        }
    }

    /// Activity counts summed over all repositories.
    pub fn activity_totals(&self) -> BTreeMap<ActivityType, u32> {
        let mut totals = BTreeMap::new();
        for repo in &self.repositories {
            for (kind, count) in &repo.activity_breakdown {
                *totals.entry(*kind).or_insert(0) += count;
            }
        }
        totals
    }
}

/// Daily JSON files belonging to `month`, in date order.
pub fn daily_files(daily_dir: &Path, month: YearMonth) -> Result<Vec<PathBuf>> {
    if !daily_dir.is_dir() {
        return Ok(Vec::new());
    }
    let prefix = format!("{month}-");
    let mut files: Vec<PathBuf> = std::fs::read_dir(daily_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension().is_some_and(|ext| ext == "json")
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Aggregate every daily report of `month`. Days marked `no_activity` are
/// skipped; a month without any daily file is an error.
pub fn aggregate_month(daily_dir: &Path, month: YearMonth) -> Result<MonthlySummary> {
    let files = daily_files(daily_dir, month)?;
    if files.is_empty() {
        return Err(DevMemoryError::Production(format!("no daily reports found for {month}")));
    }

    let mut summary = MonthlySummary::empty(month);
    let mut repos: BTreeMap<String, RepoMonthly> = BTreeMap::new();

    for path in files {
        let raw = std::fs::read_to_string(&path)?;
        let report: DailyReport = match serde_json::from_str(&raw) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("⚠️ Skipping unreadable daily report {}: {e}", path.display());
                continue;
            }
        };
        if report.status == ReportStatus::NoActivity {
            continue;
        }
        summary.total_days_active += 1;

        for item in report.committed.iter().filter(|c| !c.repo_name.is_empty()) {
            summary.total_commits += item.commits_count;
            summary.total_files_changed += item.files_changed;
            summary.total_insertions += item.insertions;
            summary.total_deletions += item.deletions;

            let repo = repos.entry(item.repo_name.clone()).or_insert_with(|| RepoMonthly {
                repo_name: item.repo_name.clone(),
                ..Default::default()
            });
            repo.total_commits += item.commits_count;
            repo.total_files_changed += item.files_changed;
            repo.total_insertions += item.insertions;
            repo.total_deletions += item.deletions;
            *repo.activity_breakdown.entry(item.activity_type).or_insert(0) += 1;
        }
    }

    summary.repositories = repos.into_values().collect();
    Ok(summary)
}

fn label(kind: ActivityType) -> &'static str {
    match kind {
        ActivityType::Feature => "New features",
        ActivityType::Bugfix => "Bug fixes",
        ActivityType::Refactor => "Refactoring",
        ActivityType::Improvement => "Improvements",
        ActivityType::NoActivity => "No activity",
    }
}

pub fn render_monthly(summary: &MonthlySummary, narrative: Option<&str>) -> String {
    let mut out = vec![format!("# Monthly Report: {}", summary.month), String::new()];

    out.push("## Overview".into());
    out.push(format!("- Active days: {}", summary.total_days_active));
    out.push(format!("- Total commits: {}", summary.total_commits));
    out.push(format!("- Total files changed: {}", summary.total_files_changed));
    out.push(format!("- Lines added: {}", summary.total_insertions));
    out.push(format!("- Lines removed: {}", summary.total_deletions));
    out.extend(["", "---", ""].map(String::from));

    let totals = summary.activity_totals();
    out.push("## Activity Distribution".into());
    for (kind, count) in &totals {
        out.push(format!("- {}: {count}", label(*kind)));
    }
    out.extend(["", "---", ""].map(String::from));

    out.push("## Most Active Repositories".into());
    let mut ranked: Vec<&RepoMonthly> = summary.repositories.iter().collect();
    ranked.sort_by(|a, b| b.total_commits.cmp(&a.total_commits).then_with(|| a.repo_name.cmp(&b.repo_name)));
    if ranked.is_empty() {
        out.push("- No repository data".into());
    }
    for repo in ranked.iter().take(5) {
        out.push(format!("- {}: {} commits", repo.repo_name, repo.total_commits));
    }
    out.extend(["", "---", ""].map(String::from));

    out.push("## Productivity Insight".into());
    let features = totals.get(&ActivityType::Feature).copied().unwrap_or(0);
    let bugfixes = totals.get(&ActivityType::Bugfix).copied().unwrap_or(0);
    out.push(
        match features.cmp(&bugfixes) {
            std::cmp::Ordering::Greater => "This month was dominated by new feature development.",
            std::cmp::Ordering::Less => "This month focused on stabilizing the system.",
            std::cmp::Ordering::Equal => "This month balanced feature development and bug fixing.",
        }
        .into(),
    );
    out.extend(["", "---", ""].map(String::from));

    out.push("## Repository Details".into());
    for repo in &summary.repositories {
        out.push(format!("### {}", repo.repo_name));
        out.push(format!("Commits: {}  ", repo.total_commits));
        out.push(format!("Files Changed: {}  ", repo.total_files_changed));
        out.push(format!("Insertions: {}  ", repo.total_insertions));
        out.push(format!("Deletions: {}  ", repo.total_deletions));
        out.push(String::new());
        out.push("Activity:".into());
        for (kind, count) in &repo.activity_breakdown {
            out.push(format!("- {}: {count}", kind.as_str()));
        }
        out.push(String::new());
    }

    if let Some(text) = narrative.map(str::trim).filter(|t| !t.is_empty()) {
        out.extend(["---", "", "## AI Executive Narrative", ""].map(String::from));
        out.push(text.to_string());
        out.push(String::new());
    }

    out.join("\n")
}

/// Reads the daily reports of a month and writes `monthly/<YYYY-MM>.{json,md}`.
pub struct MonthlyReporter {
    writer: ReportWriter,
    narrator: Option<NarrativeClient>,
}

impl MonthlyReporter {
    pub fn new(writer: ReportWriter, narrator: Option<NarrativeClient>) -> Self {
        Self { writer, narrator }
    }

    /// Aggregate, render, and persist; returns the Markdown path.
    pub async fn generate(&self, month: YearMonth) -> Result<PathBuf> {
        let summary = aggregate_month(&self.writer.daily_dir(), month)?;
        tracing::info!(
            "📈 Aggregated {month}: {} active days, {} commits, {} repositories",
            summary.total_days_active,
            summary.total_commits,
            summary.repositories.len()
        );
        let narrative = match &self.narrator {
            Some(n) => n.narrate(&monthly_prompt(&summary)).await,
            None => None,
        };
        let markdown = render_monthly(&summary, narrative.as_deref());
        self.writer.write_monthly(month, &summary, &markdown)
    }
}

#[async_trait]
impl MonthlyAggregator for MonthlyReporter {
    async fn aggregate(&self, month: YearMonth) -> Result<()> {
        self.generate(month).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use devmemory_core::RepoCommittedSummary;

    fn summary_for(repo: &str, commits: u32, ins: u32, kind: ActivityType) -> RepoCommittedSummary {
        RepoCommittedSummary {
            repo_name: repo.into(),
            branch: "main".into(),
            commits_count: commits,
            files_changed: commits * 2,
            insertions: ins,
            deletions: 1,
            activity_type: kind,
            commit_messages: vec![],
            commit_details: vec![],
        }
    }

    fn write_day(writer: &ReportWriter, day: u32, month: u32, committed: Vec<RepoCommittedSummary>) {
        let status = if committed.is_empty() {
            ReportStatus::NoActivity
        } else {
            ReportStatus::Success
        };
        let report = DailyReport {
            date: NaiveDate::from_ymd_opt(2026, month, day).unwrap(),
            repos_touched: committed.len() as u32,
            committed,
            working_state: vec![],
            status,
        };
        writer.write_daily(&report, "# day").unwrap();
    }

    fn seeded() -> (tempfile::TempDir, ReportWriter) {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        write_day(&writer, 5, 1, vec![
            summary_for("web", 2, 300, ActivityType::Feature),
            summary_for("api", 1, 10, ActivityType::Bugfix),
        ]);
        write_day(&writer, 6, 1, vec![summary_for("web", 3, 100, ActivityType::Feature)]);
        write_day(&writer, 7, 1, vec![]);
        // Other month, ignored.
        write_day(&writer, 2, 2, vec![summary_for("api", 9, 9, ActivityType::Bugfix)]);
        (dir, writer)
    }

    #[test]
    fn test_aggregate_month() {
        let (_dir, writer) = seeded();
        let summary = aggregate_month(&writer.daily_dir(), YearMonth { year: 2026, month: 1 }).unwrap();

        assert_eq!(summary.month, "2026-01");
        assert_eq!(summary.total_days_active, 2);
        assert_eq!(summary.total_commits, 6);
        assert_eq!(summary.total_insertions, 410);
        let names: Vec<&str> = summary.repositories.iter().map(|r| r.repo_name.as_str()).collect();
        assert_eq!(names, vec!["api", "web"]);
        assert_eq!(summary.repositories[1].activity_breakdown[&ActivityType::Feature], 2);
        assert!(!summary.repositories[1].activity_breakdown.contains_key(&ActivityType::Bugfix));
    }

    #[test]
    fn test_missing_month_is_production_error() {
        let (_dir, writer) = seeded();
        let err = aggregate_month(&writer.daily_dir(), YearMonth { year: 2025, month: 12 }).unwrap_err();
        assert!(matches!(err, DevMemoryError::Production(_)));
    }

    #[test]
    fn test_render_monthly() {
        let (_dir, writer) = seeded();
        let summary = aggregate_month(&writer.daily_dir(), YearMonth { year: 2026, month: 1 }).unwrap();
        let md = render_monthly(&summary, None);

        assert!(md.starts_with("# Monthly Report: 2026-01\n"));
        assert!(md.contains("- New features: 2"));
        assert!(md.contains("- Bug fixes: 1"));
        assert!(md.contains("- web: 5 commits\n- api: 1 commits"));
        assert!(md.contains("dominated by new feature development"));
        assert!(!md.contains("AI Executive Narrative"));
    }

    #[test]
    fn test_breakdown_serializes_snake_case_keys() {
        let (_dir, writer) = seeded();
        let summary = aggregate_month(&writer.daily_dir(), YearMonth { year: 2026, month: 1 }).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["repositories"][1]["activity_breakdown"]["feature"], 2);
    }

    #[tokio::test]
    async fn test_aggregator_writes_monthly_files() {
        let (dir, writer) = seeded();
        let reporter = MonthlyReporter::new(writer, None);
        reporter.aggregate(YearMonth { year: 2026, month: 1 }).await.unwrap();

        let md = std::fs::read_to_string(dir.path().join("monthly").join("2026-01.md")).unwrap();
        assert!(md.contains("## Repository Details"));
        let json = std::fs::read_to_string(dir.path().join("monthly").join("2026-01.json")).unwrap();
        assert!(json.contains("\"total_days_active\": 2"));
    }
}
