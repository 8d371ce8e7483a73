//! Daily Markdown rendering.

use std::collections::BTreeSet;

use devmemory_core::{DailyReport, ReportStatus};

pub fn render_daily(report: &DailyReport, narrative: Option<&str>) -> String {
    let mut out = Vec::new();
    out.push(format!("# Daily Report: {}", report.date.format("%Y-%m-%d")));
    out.push(String::new());

    if report.status == ReportStatus::NoActivity {
        out.push("No development activity detected.".into());
        out.push(String::new());
        return out.join("\n");
    }

    out.push("## Summary".into());
    out.push(format!("- Repositories touched: {}", report.repos_touched));
    out.push(format!("- Total commits: {}", report.total_commits()));
    out.push(format!("- Total files changed: {}", report.total_files_changed()));
    push_rule(&mut out);

    out.push("## Repository Breakdown".into());
    out.push(String::new());
    for repo in &report.committed {
        out.push(format!("### {}", repo.repo_name));
        out.push(format!("Branch: {}  ", repo.branch));
        out.push(format!("Commits: {}  ", repo.commits_count));
        out.push(format!("Files Changed: {}  ", repo.files_changed));
        out.push(format!("Insertions: {}  ", repo.insertions));
        out.push(format!("Deletions: {}  ", repo.deletions));
        out.push(format!("Activity Type: {}  ", repo.activity_type.as_str()));
        for message in &repo.commit_messages {
            out.push(format!("- {message}"));
        }
        out.push(String::new());
    }
    push_rule(&mut out);

    if !report.working_state.is_empty() {
        out.push("## Uncommitted Work (Carry Over)".into());
        out.push(String::new());
        for ws in &report.working_state {
            out.push(format!("### {}", ws.repo_name));
            out.push(format!("Branch: {}  ", ws.branch));
            if ws.insertions > 0 || ws.deletions > 0 {
                out.push(format!("Pending: +{} / -{}  ", ws.insertions, ws.deletions));
            }
            out.push("Modified Files:".into());
            out.extend(ws.modified_files.iter().map(|p| format!("- {p}")));
            if !ws.untracked_files.is_empty() {
                out.push("Untracked Files:".into());
                out.extend(ws.untracked_files.iter().map(|p| format!("- {p}")));
            }
            out.push(String::new());
        }
        push_rule(&mut out);
    }

    out.push("## Standup Template".into());
    out.push(String::new());
    out.push("Yesterday:".into());
    if report.committed.is_empty() {
        out.push("- No committed work".into());
    }
    for repo in &report.committed {
        out.push(format!("- Worked on {} ({})", repo.repo_name, repo.activity_type.as_str()));
    }
    out.push(String::new());

    out.push("Today:".into());
    if report.working_state.is_empty() {
        out.push("- Continue feature development".into());
    } else {
        let mut seen = BTreeSet::new();
        for ws in &report.working_state {
            if seen.insert(ws.repo_name.as_str()) {
                out.push(format!("- Continue uncommitted changes in {}", ws.repo_name));
            }
        }
    }
    out.push(String::new());
    out.push("Blockers:".into());
    out.push("- None".into());
    out.push(String::new());

    if let Some(text) = narrative.map(str::trim).filter(|t| !t.is_empty()) {
        out.push("---".into());
        out.push(String::new());
        out.push("## AI Narrative Summary".into());
        out.push(String::new());
        out.push(text.to_string());
        out.push(String::new());
    }

    out.join("\n")
}

fn push_rule(out: &mut Vec<String>) {
    out.push(String::new());
    out.push("---".into());
    out.push(String::new());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use devmemory_core::{ActivityType, RepoCommittedSummary, RepoWorkingState};

    fn report() -> DailyReport {
        DailyReport {
            date: NaiveDate::from_ymd_opt(2026, 2, 12).unwrap(),
            repos_touched: 2,
            committed: vec![RepoCommittedSummary {
                repo_name: "api".into(),
                branch: "main".into(),
                commits_count: 2,
                files_changed: 4,
                insertions: 250,
                deletions: 3,
                activity_type: ActivityType::Feature,
                commit_messages: vec!["Add billing".into(), "Wire routes".into()],
                commit_details: vec![],
            }],
            working_state: vec![RepoWorkingState {
                repo_name: "web".into(),
                branch: "dev".into(),
                modified_files: vec!["src/app.ts".into()],
                untracked_files: vec![],
                insertions: 12,
                deletions: 1,
            }],
            status: ReportStatus::Success,
        }
    }

    #[test]
    fn test_render_sections() {
        let md = render_daily(&report(), None);
        assert!(md.starts_with("# Daily Report: 2026-02-12\n"));
        assert!(md.contains("- Total commits: 2"));
        assert!(md.contains("Activity Type: feature"));
        assert!(md.contains("- Add billing"));
        assert!(md.contains("## Uncommitted Work (Carry Over)"));
        assert!(md.contains("- Continue uncommitted changes in web"));
        assert!(md.contains("- Worked on api (feature)"));
        assert!(!md.contains("AI Narrative"));
    }

    #[test]
    fn test_render_no_activity() {
        let mut r = report();
        r.status = ReportStatus::NoActivity;
        let md = render_daily(&r, Some("ignored"));
        assert_eq!(md, "# Daily Report: 2026-02-12\n\nNo development activity detected.\n");
    }

    #[test]
    fn test_blank_narrative_is_omitted() {
        assert!(!render_daily(&report(), Some("  \n")).contains("AI Narrative"));
        let md = render_daily(&report(), Some("Shipped billing."));
        assert!(md.ends_with("## AI Narrative Summary\n\nShipped billing.\n"));
    }
}
