//! Daily stand-up delivery: turns a finished report artifact into a Discord
//! post and hands it to the [`DiscordClient`].

use async_trait::async_trait;
use chrono::Local;
use devmemory_core::config::DiscordConfig;
use devmemory_core::traits::Notifier;
use devmemory_core::{DailyReport, DeliveryAttempt, DeliveryMode, DevMemoryError, ReportArtifact};

use crate::discord::{DELIVERY_TARGET, DiscordClient, DiscordPayload};

/// Headline numbers shown above the report body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandupStats {
    pub repos: u32,
    pub commits: u32,
    pub files_changed: u32,
}

impl From<&DailyReport> for StandupStats {
    fn from(report: &DailyReport) -> Self {
        Self {
            repos: report.repos_touched,
            commits: report.total_commits(),
            files_changed: report.total_files_changed(),
        }
    }
}

/// Inline up to and including `limit` characters, attachment beyond.
pub fn select_mode(markdown: &str, limit: usize) -> DeliveryMode {
    if markdown.chars().count() <= limit {
        DeliveryMode::Inline
    } else {
        DeliveryMode::Attachment
    }
}

pub fn header(artifact: &ReportArtifact, stats: StandupStats) -> String {
    format!(
        "📊 **Daily Standup: {}**\n📁 Repos: {} · 🔨 Commits: {} · 📄 Files changed: {}",
        artifact.report_date.format("%Y-%m-%d"),
        stats.repos,
        stats.commits,
        stats.files_changed
    )
}

/// Build the primary payload for `markdown` in the given mode.
pub fn compose(artifact: &ReportArtifact, markdown: &str, stats: StandupStats, mode: DeliveryMode) -> DiscordPayload {
    let header = header(artifact, stats);
    match mode {
        DeliveryMode::Inline => DiscordPayload::Text {
            content: format!("{header}\n```md\n{markdown}\n```"),
        },
        DeliveryMode::Attachment => DiscordPayload::File {
            content: format!("{header}\n📎 Full report attached."),
            filename: artifact
                .markdown_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("{}.md", artifact.report_date.format("%Y-%m-%d"))),
            bytes: markdown.as_bytes().to_vec(),
        },
    }
}

/// Stats are informational; an unreadable JSON document yields zeros.
fn read_stats(artifact: &ReportArtifact) -> StandupStats {
    std::fs::read_to_string(&artifact.json_path)
        .ok()
        .and_then(|raw| serde_json::from_str::<DailyReport>(&raw).ok())
        .map(|report| StandupStats::from(&report))
        .unwrap_or_default()
}

/// [`Notifier`] that posts the daily report to a Discord channel.
pub struct StandupNotifier {
    client: DiscordClient,
    mention_user_id: Option<String>,
    inline_limit: usize,
}

impl StandupNotifier {
    pub fn new(client: DiscordClient, config: &DiscordConfig) -> Self {
        Self {
            client,
            mention_user_id: config.mention_user_id.clone().filter(|id| !id.trim().is_empty()),
            inline_limit: config.inline_limit,
        }
    }

    pub fn from_config(config: &DiscordConfig) -> Self {
        Self::new(DiscordClient::new(config), config)
    }
}

#[async_trait]
impl Notifier for StandupNotifier {
    async fn deliver(&self, artifact: &ReportArtifact) -> DeliveryAttempt {
        let path = &artifact.markdown_path;
        let markdown = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(target: DELIVERY_TARGET, "⚠️ Report not readable at {}: {e}", path.display());
                return DeliveryAttempt::failed(DevMemoryError::ArtifactMissing(path.display().to_string()));
            }
        };
        if markdown.trim().is_empty() {
            tracing::warn!(target: DELIVERY_TARGET, "⚠️ Report is empty: {}", path.display());
            return DeliveryAttempt::failed(DevMemoryError::ArtifactEmpty(path.display().to_string()));
        }

        let mode = select_mode(&markdown, self.inline_limit);
        let payload = compose(artifact, &markdown, read_stats(artifact), mode);
        tracing::info!(
            target: DELIVERY_TARGET,
            "📤 Sending report {} ({mode:?}, {} chars)",
            artifact.report_date,
            markdown.chars().count()
        );

        let mut attempt = self.client.send(&payload, self.mention_user_id.as_deref()).await;
        attempt.mode = Some(mode);

        if attempt.is_delivered() {
            let note = format!("✅ Report delivered at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
            let confirmation = self.client.send(&DiscordPayload::text(note), None).await;
            if !confirmation.is_delivered() {
                tracing::warn!(target: DELIVERY_TARGET, "⚠️ Confirmation message not delivered");
            }
        }
        attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use devmemory_core::{ActivityType, RepoCommittedSummary, ReportStatus};
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header_regex, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> DiscordConfig {
        DiscordConfig {
            bot_token: "token-1".into(),
            channel_id: "chan-1".into(),
            api_base: server.uri(),
            ..Default::default()
        }
    }

    fn notifier(config: &DiscordConfig) -> StandupNotifier {
        let client = DiscordClient::new(config).with_retry_delay(Duration::from_millis(10));
        StandupNotifier::new(client, config)
    }

    fn write_artifact(dir: &std::path::Path, markdown: &str) -> ReportArtifact {
        let date = NaiveDate::from_ymd_opt(2026, 2, 12).unwrap();
        let artifact = ReportArtifact::locate(dir, date);
        std::fs::create_dir_all(artifact.json_path.parent().unwrap()).unwrap();
        let report = DailyReport {
            date,
            repos_touched: 2,
            committed: vec![RepoCommittedSummary {
                repo_name: "api".into(),
                branch: "main".into(),
                commits_count: 3,
                files_changed: 7,
                insertions: 120,
                deletions: 4,
                activity_type: ActivityType::Improvement,
                commit_messages: vec![],
                commit_details: vec![],
            }],
            working_state: vec![],
            status: ReportStatus::Success,
        };
        std::fs::write(&artifact.json_path, serde_json::to_string(&report).unwrap()).unwrap();
        std::fs::write(&artifact.markdown_path, markdown).unwrap();
        artifact
    }

    #[test]
    fn test_mode_boundary() {
        assert_eq!(select_mode(&"a".repeat(1800), 1800), DeliveryMode::Inline);
        assert_eq!(select_mode(&"a".repeat(1801), 1800), DeliveryMode::Attachment);
        // Characters, not bytes.
        assert_eq!(select_mode(&"é".repeat(1800), 1800), DeliveryMode::Inline);
    }

    #[test]
    fn test_header_reads_stats() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(dir.path(), "# report");
        let text = header(&artifact, read_stats(&artifact));
        assert!(text.contains("2026-02-12"));
        assert!(text.contains("Repos: 2"));
        assert!(text.contains("Commits: 3"));
        assert!(text.contains("Files changed: 7"));
    }

    #[test]
    fn test_unreadable_json_gives_zero_stats() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(dir.path(), "# report");
        std::fs::write(&artifact.json_path, "garbage").unwrap();
        assert_eq!(read_stats(&artifact), StandupStats::default());
    }

    #[tokio::test]
    async fn test_inline_at_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_regex("content-type", "^application/json"))
            .and(body_string_contains("```md"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("Report delivered at"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(dir.path(), &"x".repeat(1800));
        let attempt = notifier(&config_for(&server)).deliver(&artifact).await;

        assert!(attempt.is_delivered());
        assert_eq!(attempt.mode, Some(DeliveryMode::Inline));
    }

    #[tokio::test]
    async fn test_attachment_above_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .and(body_string_contains("filename=\"2026-02-12.md\""))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("Report delivered at"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(dir.path(), &"x".repeat(1801));
        let attempt = notifier(&config_for(&server)).deliver(&artifact).await;

        assert!(attempt.is_delivered());
        assert_eq!(attempt.mode, Some(DeliveryMode::Attachment));
    }

    #[tokio::test]
    async fn test_confirmation_failure_keeps_primary_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Report delivered at"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(dir.path(), "# short report");
        let attempt = notifier(&config_for(&server)).deliver(&artifact).await;

        assert!(attempt.is_delivered());
        assert_eq!(attempt.status_code, Some(200));
    }

    #[tokio::test]
    async fn test_no_confirmation_after_failed_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(dir.path(), "# short report");
        let attempt = notifier(&config_for(&server)).deliver(&artifact).await;

        assert!(!attempt.is_delivered());
        assert_eq!(attempt.requests, 2);
    }

    #[tokio::test]
    async fn test_missing_or_empty_markdown_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let config = config_for(&server);

        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(dir.path(), "  \n");
        let attempt = notifier(&config).deliver(&artifact).await;
        assert!(matches!(attempt.error, Some(DevMemoryError::ArtifactEmpty(_))));

        std::fs::remove_file(&artifact.markdown_path).unwrap();
        let attempt = notifier(&config).deliver(&artifact).await;
        assert!(matches!(attempt.error, Some(DevMemoryError::ArtifactMissing(_))));
    }

    #[tokio::test]
    async fn test_mention_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("\"allowed_mentions\""))
            .and(body_string_contains("<@777>"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.mention_user_id = Some("777".into());
        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(dir.path(), "# report");
        assert!(notifier(&config).deliver(&artifact).await.is_delivered());
    }
}
