//! Git activity collector.
//!
//! Shells out to `git` for every configured repository and folds the output
//! into a [`DailyReport`]. A repository that cannot be read is skipped with
//! a warning; collection itself never fails.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use devmemory_core::{
    CommitDetail, DailyReport, DevMemoryError, RepoCommittedSummary, RepoWorkingState,
    ReportStatus, ReportWindow, Result,
};
use tokio::process::Command;

/// Totals parsed from a `--shortstat` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShortStat {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

impl std::ops::AddAssign for ShortStat {
    fn add_assign(&mut self, rhs: Self) {
        self.files_changed += rhs.files_changed;
        self.insertions += rhs.insertions;
        self.deletions += rhs.deletions;
    }
}

/// Parse ` 3 files changed, 120 insertions(+), 20 deletions(-)`.
/// Any segment may be missing; unknown text yields zeros.
pub fn parse_shortstat(line: &str) -> ShortStat {
    let mut stat = ShortStat::default();
    for segment in line.trim().split(',') {
        let mut words = segment.split_whitespace();
        let (Some(count), Some(kind)) = (words.next(), words.next()) else {
            continue;
        };
        let Ok(count) = count.parse::<u32>() else {
            continue;
        };
        if kind.starts_with("file") {
            stat.files_changed = count;
        } else if kind.starts_with("insertion") {
            stat.insertions = count;
        } else if kind.starts_with("deletion") {
            stat.deletions = count;
        }
    }
    stat
}

/// Split `git status --porcelain` into (modified, untracked), sorted and
/// deduplicated. Only `M` in either column counts as modified.
pub fn parse_porcelain(output: &str) -> (Vec<String>, Vec<String>) {
    let mut modified = BTreeSet::new();
    let mut untracked = BTreeSet::new();
    for line in output.lines() {
        if let Some(path) = line.strip_prefix("?? ") {
            untracked.insert(path.trim().to_string());
            continue;
        }
        let mut flags = line.chars();
        let (Some(index), Some(worktree)) = (flags.next(), flags.next()) else {
            continue;
        };
        if line.len() >= 3 && (index == 'M' || worktree == 'M') {
            modified.insert(line[3..].trim().to_string());
        }
    }
    (modified.into_iter().collect(), untracked.into_iter().collect())
}

/// Parse `git log --pretty=format:%H|%s` output into (hash, subject) pairs.
pub fn parse_log(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let (hash, subject) = line.trim().split_once('|')?;
            let (hash, subject) = (hash.trim(), subject.trim());
            (!hash.is_empty() && !subject.is_empty()).then(|| (hash.to_string(), subject.to_string()))
        })
        .collect()
}

fn repo_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Collects committed and uncommitted work from a fixed set of repositories.
#[derive(Debug, Clone)]
pub struct GitCollector {
    repos: Vec<PathBuf>,
}

impl GitCollector {
    pub fn new(repos: Vec<PathBuf>) -> Self {
        Self { repos }
    }

    pub async fn collect(&self, window: &ReportWindow) -> DailyReport {
        if self.repos.is_empty() {
            tracing::warn!("⚠️ No repositories configured, report will be empty");
        }

        let mut committed = Vec::new();
        let mut working_state = Vec::new();

        for path in &self.repos {
            if !path.is_absolute() {
                tracing::warn!("⚠️ Repository path is not absolute, skipping: {}", path.display());
                continue;
            }
            if !path.join(".git").is_dir() {
                tracing::warn!("⚠️ Not a git repository, skipping: {}", path.display());
                continue;
            }
            match self.collect_repo(path, window).await {
                Ok((summary, working)) => {
                    committed.extend(summary);
                    if working.is_dirty() {
                        working_state.push(working);
                    }
                }
                Err(e) => tracing::warn!("⚠️ Skipping {}: {e}", path.display()),
            }
        }

        let touched: BTreeSet<&str> = committed
            .iter()
            .map(|c: &RepoCommittedSummary| c.repo_name.as_str())
            .chain(working_state.iter().map(|w: &RepoWorkingState| w.repo_name.as_str()))
            .collect();
        let repos_touched = touched.len() as u32;

        tracing::info!(
            "🔍 Collected {} commits across {repos_touched} repositories for {}",
            committed.iter().map(|c| c.commits_count).sum::<u32>(),
            window.report_date
        );

        DailyReport {
            date: window.report_date,
            repos_touched,
            committed,
            working_state,
            status: if repos_touched > 0 {
                ReportStatus::Success
            } else {
                ReportStatus::NoActivity
            },
        }
    }

    async fn collect_repo(
        &self,
        path: &Path,
        window: &ReportWindow,
    ) -> Result<(Option<RepoCommittedSummary>, RepoWorkingState)> {
        let name = repo_name(path);
        let branch = match git(path, &["branch", "--show-current"]).await?.trim() {
            "" => "(detached)".to_string(),
            b => b.to_string(),
        };

        let since = format!("--since={}", window.since_arg());
        let until = format!("--until={}", window.until_arg());
        let commits = match git(path, &["log", &since, &until, "--no-merges", "--pretty=format:%H|%s"]).await {
            Ok(out) => parse_log(&out),
            Err(e) => {
                tracing::warn!("⚠️ Failed to read commits for {name}: {e}");
                Vec::new()
            }
        };

        let mut summary = None;
        if !commits.is_empty() {
            let mut totals = ShortStat::default();
            let mut details = Vec::with_capacity(commits.len());
            for (hash, message) in &commits {
                match git(path, &["show", "--shortstat", "--pretty=format:", hash]).await {
                    Ok(out) => out.lines().for_each(|l| totals += parse_shortstat(l)),
                    Err(e) => tracing::warn!("⚠️ Failed to read shortstat of {hash}: {e}"),
                }
                let files = match git(path, &["show", "--name-only", "--pretty=format:", hash]).await {
                    Ok(out) => out
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from)
                        .collect(),
                    Err(e) => {
                        tracing::warn!("⚠️ Failed to read files of {hash}: {e}");
                        Vec::new()
                    }
                };
                details.push(CommitDetail {
                    hash: hash.clone(),
                    message: message.clone(),
                    files,
                });
            }
            summary = Some(RepoCommittedSummary {
                repo_name: name.clone(),
                branch: branch.clone(),
                commits_count: commits.len() as u32,
                files_changed: totals.files_changed,
                insertions: totals.insertions,
                deletions: totals.deletions,
                activity_type: Default::default(),
                commit_messages: commits.iter().map(|(_, m)| m.clone()).collect(),
                commit_details: details,
            });
        }

        let (modified_files, untracked_files) = match git(path, &["status", "--porcelain"]).await {
            Ok(out) => parse_porcelain(&out),
            Err(e) => {
                tracing::warn!("⚠️ Failed to read working state for {name}: {e}");
                Default::default()
            }
        };
        let mut delta = ShortStat::default();
        for args in [&["diff", "--shortstat"][..], &["diff", "--cached", "--shortstat"][..]] {
            match git(path, args).await {
                Ok(out) => delta += parse_shortstat(out.lines().next().unwrap_or_default()),
                Err(e) => tracing::warn!("⚠️ git {} failed for {name}: {e}", args.join(" ")),
            }
        }

        let working = RepoWorkingState {
            repo_name: name,
            branch,
            modified_files,
            untracked_files,
            insertions: delta.insertions,
            deletions: delta.deletions,
        };
        Ok((summary, working))
    }
}

async fn git(repo: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .await
        .map_err(|e| DevMemoryError::Git(format!("failed to run git: {e}")))?;
    if !output.status.success() {
        return Err(DevMemoryError::Git(format!(
            "git {} exited with {}: {}",
            args.first().copied().unwrap_or_default(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
