//! Achievement summaries over an arbitrary date range.
//!
//! Reads the daily JSON reports between two dates (inclusive), groups
//! commit messages by intent, and renders a stand-up style summary plus
//! per-repository message blocks sized for a single Discord message.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use devmemory_core::{DailyReport, DevMemoryError, ReportArtifact, ReportStatus, Result};
use serde::{Deserialize, Serialize};

/// Longest range accepted, in days between start and end.
pub const MAX_RANGE_DAYS: i64 = 365;

/// Discord message budget for one repository block.
pub const BLOCK_LIMIT: usize = 1800;

const TOP_LIMIT: usize = 10;
const SECTION_LIMIT: usize = 6;
const CONTINUED: &str = "(continued...)";
const CONVENTIONAL_PREFIXES: [&str; 7] = ["feat:", "fix:", "refactor:", "test:", "chore:", "perf:", "ci:"];

/// What a single commit message set out to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Chore,
    Feature,
    Fix,
    Infra,
    Performance,
    Refactor,
    Test,
    Validation,
}

impl Intent {
    pub fn action_verbs(&self) -> &'static [&'static str] {
        match self {
            Self::Feature => &["implemented", "added", "created", "integrated"],
            Self::Fix => &["fixed", "resolved", "stabilized"],
            Self::Refactor => &["refactored", "simplified", "restructured"],
            Self::Test => &["added tests", "validated"],
            Self::Chore => &["updated", "adjusted"],
            Self::Infra => &["configured", "automated"],
            Self::Validation => &["introduced validation", "added safeguards"],
            Self::Performance => &["optimized", "improved performance"],
        }
    }
}

/// Keyword classification of a commit message. Keywords match whole words,
/// earlier groups win.
pub fn classify_intent(message: &str) -> Intent {
    let lower = message.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |keys: &[&str]| words.iter().any(|w| keys.contains(w));

    if has(&["validate", "validation", "sanitize", "guard", "constraint"]) {
        Intent::Validation
    } else if has(&["optimize", "perf", "performance", "speed", "latency", "cache"]) {
        Intent::Performance
    } else if has(&["infra", "ci", "cd", "pipeline", "docker", "k8s", "deploy"]) {
        Intent::Infra
    } else if has(&["refactor", "cleanup", "simplify", "restructure"]) {
        Intent::Refactor
    } else if has(&["test", "tests"]) {
        Intent::Test
    } else if has(&["fix", "bug", "issue", "hotfix", "patch"]) {
        Intent::Fix
    } else if has(&["feat", "add", "implement", "create", "introduce", "integrate", "build"]) {
        Intent::Feature
    } else {
        Intent::Chore
    }
}

/// Strip a conventional-commit tag (`feat:`, `fix:`, ...).
pub fn clean_message(message: &str) -> &str {
    let trimmed = message.trim();
    for prefix in CONVENTIONAL_PREFIXES {
        if trimmed.len() >= prefix.len()
            && trimmed.is_char_boundary(prefix.len())
            && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            return trimmed[prefix.len()..].trim();
        }
    }
    trimmed
}

/// One distinct piece of work, merged across days and repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeItem {
    #[serde(rename = "type")]
    pub intent: Intent,
    pub description: String,
    pub repos: Vec<String>,
    pub files: Vec<String>,
    pub action_verbs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSummary {
    /// First and last active day actually found, not the requested bounds.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_days: u32,
    pub total_commits: u32,
    pub total_files_changed: u32,
    pub total_insertions: u32,
    pub total_deletions: u32,
    pub top_directories: Vec<String>,
    pub top_file_types: Vec<String>,
    pub files_by_directory: BTreeMap<String, Vec<String>>,
    /// Sorted by intent, then description.
    pub detailed_changes: Vec<ChangeItem>,
}

impl RangeSummary {
    pub fn is_empty(&self) -> bool {
        self.detailed_changes.is_empty()
    }
}

/// Reject reversed ranges, dates after `today`, and ranges longer than
/// [`MAX_RANGE_DAYS`].
pub fn validate_range(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<()> {
    if start > end {
        return Err(DevMemoryError::InvalidRange(format!("start {start} is after end {end}")));
    }
    if end > today {
        return Err(DevMemoryError::InvalidRange(format!("{end} is in the future")));
    }
    if (end - start).num_days() > MAX_RANGE_DAYS {
        return Err(DevMemoryError::InvalidRange(format!(
            "{start}..{end} exceeds {MAX_RANGE_DAYS} days"
        )));
    }
    Ok(())
}

/// Daily reports for every date in `start..=end` that has a readable JSON
/// file. Missing days are skipped silently, unreadable ones with a warning.
pub fn reports_in_range(data_dir: &Path, start: NaiveDate, end: NaiveDate) -> Vec<DailyReport> {
    let mut reports = Vec::new();
    for day in start.iter_days().take_while(|d| *d <= end) {
        let path = ReportArtifact::locate(data_dir, day).json_path;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                tracing::warn!("⚠️ Cannot read {}: {e}", path.display());
                continue;
            }
        };
        match serde_json::from_str::<DailyReport>(&raw) {
            Ok(report) => reports.push(report),
            Err(e) => tracing::warn!("⚠️ Skipping unreadable daily report {}: {e}", path.display()),
        }
    }
    reports
}

fn directory_of(file: &str) -> Option<&str> {
    let file = file.trim().trim_start_matches('/');
    file.split_once('/').map(|(head, _)| head).filter(|h| !h.is_empty())
}

fn extension_of(file: &str) -> Option<String> {
    Path::new(file.trim())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
}

fn rank(counts: BTreeMap<String, u32>) -> Vec<String> {
    let mut items: Vec<(String, u32)> = counts.into_iter().collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items.into_iter().take(TOP_LIMIT).map(|(k, _)| k).collect()
}

/// Fold daily reports into one summary. `no_activity` days are ignored;
/// identical messages with the same intent collapse into one item.
pub fn aggregate_reports(reports: &[DailyReport]) -> RangeSummary {
    let mut summary = RangeSummary::default();
    let mut days: Vec<NaiveDate> = Vec::new();
    let mut dir_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut ext_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut changes: BTreeMap<(Intent, String), ChangeItem> = BTreeMap::new();

    for report in reports.iter().filter(|r| r.status != ReportStatus::NoActivity) {
        days.push(report.date);

        for repo in &report.committed {
            summary.total_commits += repo.commits_count;
            summary.total_files_changed += repo.files_changed;
            summary.total_insertions += repo.insertions;
            summary.total_deletions += repo.deletions;

            for commit in &repo.commit_details {
                let message = commit.message.trim();
                let files: Vec<&str> = commit
                    .files
                    .iter()
                    .map(|f| f.trim())
                    .filter(|f| !f.is_empty())
                    .collect();
                if message.is_empty() && files.is_empty() {
                    continue;
                }

                let intent = classify_intent(message);
                let item = changes
                    .entry((intent, message.to_string()))
                    .or_insert_with(|| ChangeItem {
                        intent,
                        description: message.to_string(),
                        repos: Vec::new(),
                        files: Vec::new(),
                        action_verbs: intent.action_verbs().iter().map(|v| v.to_string()).collect(),
                    });
                let repo_name = repo.repo_name.trim();
                if !repo_name.is_empty() && !item.repos.iter().any(|r| r == repo_name) {
                    item.repos.push(repo_name.to_string());
                    item.repos.sort();
                }

                for file in files {
                    if !item.files.iter().any(|f| f == file) {
                        item.files.push(file.to_string());
                    }
                    let bucket = directory_of(file).map(|d| format!("{d}/"));
                    if let Some(dir) = &bucket {
                        *dir_counts.entry(dir.clone()).or_insert(0) += 1;
                    }
                    if let Some(ext) = extension_of(file) {
                        *ext_counts.entry(ext).or_insert(0) += 1;
                    }
                    let grouped = summary
                        .files_by_directory
                        .entry(bucket.unwrap_or_else(|| "(root)".into()))
                        .or_default();
                    if !grouped.iter().any(|f| f == file) {
                        grouped.push(file.to_string());
                    }
                }
                item.files.sort();
            }
        }
    }

    days.sort();
    days.dedup();
    summary.start_date = days.first().copied();
    summary.end_date = days.last().copied();
    summary.total_days = days.len() as u32;
    summary.top_directories = rank(dir_counts);
    summary.top_file_types = rank(ext_counts);
    for files in summary.files_by_directory.values_mut() {
        files.sort();
    }
    summary.detailed_changes = changes.into_values().collect();
    summary
}

fn take_section<'a>(summary: &'a RangeSummary, intents: &[Intent]) -> Vec<&'a ChangeItem> {
    intents
        .iter()
        .flat_map(|intent| summary.detailed_changes.iter().filter(move |c| c.intent == *intent))
        .take(SECTION_LIMIT)
        .collect()
}

/// Stand-up style summary without any model in the loop.
pub fn render_standup(summary: &RangeSummary) -> String {
    let sections: [(&str, &[Intent]); 3] = [
        ("### What I Built", &[Intent::Feature, Intent::Infra]),
        ("### What I Improved", &[Intent::Refactor, Intent::Performance]),
        ("### Safeguards & Quality", &[Intent::Validation, Intent::Test, Intent::Fix]),
    ];

    let mut out: Vec<String> = Vec::new();
    for (title, intents) in sections {
        let items = take_section(summary, intents);
        if items.is_empty() {
            continue;
        }
        out.push(title.to_string());
        for item in items {
            let text = clean_message(&item.description);
            if !text.is_empty() {
                out.push(format!("- {text}"));
            }
        }
        out.push(String::new());
    }

    if out.is_empty() {
        return "No development activity found in the selected range.".into();
    }
    out.join("\n").trim().to_string()
}

/// Task lines per repository, one `- <message>` line per distinct change.
pub fn repo_task_lines(summary: &RangeSummary) -> BTreeMap<String, Vec<String>> {
    let mut by_repo: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in &summary.detailed_changes {
        let text = clean_message(&item.description);
        let text = if text.is_empty() { "made code changes" } else { text };
        for repo in &item.repos {
            by_repo.entry(repo.clone()).or_default().push(format!("- {text}"));
        }
    }
    by_repo
}

fn char_len(lines: &[String]) -> usize {
    lines.iter().map(|l| l.chars().count()).sum::<usize>() + lines.len().saturating_sub(1)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Split a repository heading plus task lines into messages of at most
/// `limit` characters. Every chunk repeats the heading; chunks after the
/// first carry a continuation marker, which may push them past `limit` by
/// its own length. A single line too long for any chunk is truncated.
pub fn split_repo_block(repo_name: &str, task_lines: &[String], limit: usize) -> Vec<String> {
    let heading = format!("## Repository: {repo_name}");
    let lines: Vec<&str> = task_lines
        .iter()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .collect();

    let mut chunks: Vec<Vec<String>> = Vec::new();
    let mut buf = vec![heading.clone()];
    for line in lines {
        let mut candidate = buf.clone();
        candidate.push(line.to_string());
        if char_len(&candidate) <= limit {
            buf = candidate;
            continue;
        }
        if buf.len() > 1 {
            chunks.push(std::mem::replace(&mut buf, vec![heading.clone()]));
            let candidate = vec![heading.clone(), line.to_string()];
            if char_len(&candidate) <= limit {
                buf = candidate;
                continue;
            }
        }
        let room = limit.saturating_sub(heading.chars().count() + 1);
        chunks.push(vec![heading.clone(), truncate_chars(line, room)]);
    }
    if buf.len() > 1 || chunks.is_empty() {
        chunks.push(buf);
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let text = chunk.join("\n").trim().to_string();
            if i > 0 { format!("{text}\n\n{CONTINUED}") } else { text }
        })
        .collect()
}

/// Every message needed to post the per-repository breakdown, in
/// repository order.
pub fn repo_messages(summary: &RangeSummary, limit: usize) -> Vec<String> {
    repo_task_lines(summary)
        .iter()
        .flat_map(|(repo, lines)| split_repo_block(repo, lines, limit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ReportWriter;
    use devmemory_core::{ActivityType, CommitDetail, RepoCommittedSummary};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn commit(message: &str, files: &[&str]) -> CommitDetail {
        CommitDetail {
            hash: "abc1234".into(),
            message: message.into(),
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn repo(name: &str, commits: Vec<CommitDetail>) -> RepoCommittedSummary {
        RepoCommittedSummary {
            repo_name: name.into(),
            branch: "main".into(),
            commits_count: commits.len() as u32,
            files_changed: commits.iter().map(|c| c.files.len() as u32).sum(),
            insertions: 10,
            deletions: 2,
            activity_type: ActivityType::Feature,
            commit_messages: commits.iter().map(|c| c.message.clone()).collect(),
            commit_details: commits,
        }
    }

    fn day(d: NaiveDate, committed: Vec<RepoCommittedSummary>) -> DailyReport {
        let status = if committed.is_empty() {
            ReportStatus::NoActivity
        } else {
            ReportStatus::Success
        };
        DailyReport {
            date: d,
            repos_touched: committed.len() as u32,
            committed,
            working_state: vec![],
            status,
        }
    }

    fn seeded() -> Vec<DailyReport> {
        vec![
            day(date(2, 9), vec![
                repo("api", vec![
                    commit("feat: add login endpoint", &["src/auth/login.rs", "Cargo.toml"]),
                    commit("fix: handle expired token", &["src/auth/token.rs"]),
                ]),
                repo("web", vec![commit("feat: add login endpoint", &["src/pages/login.tsx"])]),
            ]),
            day(date(2, 10), vec![]),
            day(date(2, 11), vec![repo("api", vec![
                commit("refactor: simplify router", &["src/router.rs"]),
                commit("validate request payloads", &["src/auth/login.rs"]),
            ])]),
        ]
    }

    #[test]
    fn test_classify_intent() {
        let cases = [
            ("feat: add login endpoint", Intent::Feature),
            ("fix: handle expired token", Intent::Fix),
            ("perf: speed up query", Intent::Performance),
            ("ci: pin docker image", Intent::Infra),
            ("refactor: simplify router", Intent::Refactor),
            ("add tests for parser", Intent::Test),
            ("validate request payloads", Intent::Validation),
            ("decide on naming", Intent::Chore),
            ("", Intent::Chore),
        ];
        for (message, expected) in cases {
            assert_eq!(classify_intent(message), expected, "{message}");
        }
    }

    #[test]
    fn test_clean_message() {
        assert_eq!(clean_message("feat: add login"), "add login");
        assert_eq!(clean_message("  FIX:  typo "), "typo");
        assert_eq!(clean_message("update readme"), "update readme");
    }

    #[test]
    fn test_validate_range() {
        let today = date(2, 16);
        assert!(validate_range(date(2, 1), date(2, 16), today).is_ok());
        assert!(matches!(
            validate_range(date(2, 10), date(2, 9), today),
            Err(DevMemoryError::InvalidRange(_))
        ));
        assert!(validate_range(date(2, 10), date(2, 17), today).is_err());
        let year_back = NaiveDate::from_ymd_opt(2025, 2, 15).unwrap();
        assert!(validate_range(year_back, today, today).is_err());
        assert!(validate_range(year_back.succ_opt().unwrap(), today, today).is_ok());
    }

    #[test]
    fn test_aggregate_groups_changes_and_files() {
        let summary = aggregate_reports(&seeded());

        assert_eq!(summary.start_date, Some(date(2, 9)));
        assert_eq!(summary.end_date, Some(date(2, 11)));
        assert_eq!(summary.total_days, 2);
        assert_eq!(summary.total_commits, 5);
        assert_eq!(summary.total_insertions, 30);

        let login = summary
            .detailed_changes
            .iter()
            .find(|c| c.description == "feat: add login endpoint")
            .unwrap();
        assert_eq!(login.intent, Intent::Feature);
        assert_eq!(login.repos, vec!["api", "web"]);
        assert_eq!(login.files, vec!["Cargo.toml", "src/auth/login.rs", "src/pages/login.tsx"]);
        assert_eq!(summary.detailed_changes.len(), 4);

        assert_eq!(summary.top_directories, vec!["src/"]);
        assert_eq!(summary.top_file_types[0], ".rs");
        assert_eq!(summary.files_by_directory["(root)"], vec!["Cargo.toml"]);
        assert_eq!(summary.files_by_directory["src/"].len(), 4);
    }

    #[test]
    fn test_detailed_changes_are_ordered_by_intent() {
        let summary = aggregate_reports(&seeded());
        let intents: Vec<Intent> = summary.detailed_changes.iter().map(|c| c.intent).collect();
        let mut sorted = intents.clone();
        sorted.sort();
        assert_eq!(intents, sorted);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["detailed_changes"][0]["type"], "feature");
    }

    #[test]
    fn test_render_standup() {
        let md = render_standup(&aggregate_reports(&seeded()));
        assert!(md.starts_with("### What I Built\n- add login endpoint"));
        assert!(md.contains("### What I Improved\n- simplify router"));
        assert!(md.contains("### Safeguards & Quality\n- validate request payloads\n- handle expired token"));
    }

    #[test]
    fn test_render_standup_without_activity() {
        let summary = aggregate_reports(&[day(date(2, 10), vec![])]);
        assert!(summary.is_empty());
        assert_eq!(summary.start_date, None);
        assert_eq!(
            render_standup(&summary),
            "No development activity found in the selected range."
        );
    }

    #[test]
    fn test_reports_in_range_reads_only_requested_days() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        for report in seeded() {
            writer.write_daily(&report, "# day").unwrap();
        }
        std::fs::write(ReportArtifact::locate(dir.path(), date(2, 12)).json_path, "{not json").unwrap();

        let reports = reports_in_range(dir.path(), date(2, 10), date(2, 12));
        let dates: Vec<NaiveDate> = reports.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2, 10), date(2, 11)]);
        assert!(reports_in_range(dir.path(), date(3, 1), date(3, 5)).is_empty());
    }

    #[test]
    fn test_repo_messages_follow_repository_order() {
        let messages = repo_messages(&aggregate_reports(&seeded()), BLOCK_LIMIT);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("## Repository: api\n- add login endpoint"));
        assert!(messages[1].starts_with("## Repository: web\n- add login endpoint"));
    }

    #[test]
    fn test_split_repo_block_respects_limit() {
        let lines: Vec<String> = (0..40).map(|i| format!("- task number {i:02} {}", "x".repeat(60))).collect();
        let chunks = split_repo_block("api", &lines, BLOCK_LIMIT);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(chunk.starts_with("## Repository: api\n"));
            let body = chunk.trim_end_matches(CONTINUED).trim_end();
            assert!(body.chars().count() <= BLOCK_LIMIT);
            assert_eq!(chunk.ends_with(CONTINUED), i > 0);
        }
        let total: usize = chunks.iter().map(|c| c.matches("- task number").count()).sum();
        assert_eq!(total, 40);
    }

    #[test]
    fn test_split_repo_block_truncates_oversized_line() {
        let long = vec![format!("- {}", "y".repeat(2500))];
        let chunks = split_repo_block("web", &long, BLOCK_LIMIT);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chars().count(), BLOCK_LIMIT);

        let mixed = vec!["- short".to_string(), format!("- {}", "z".repeat(2500))];
        let chunks = split_repo_block("web", &mixed, BLOCK_LIMIT);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "## Repository: web\n- short");
    }

    #[test]
    fn test_split_repo_block_heading_only() {
        assert_eq!(split_repo_block("api", &[], BLOCK_LIMIT), vec!["## Repository: api"]);
    }
}
