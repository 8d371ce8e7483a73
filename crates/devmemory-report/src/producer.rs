//! [`ReportProducer`] backed by git history.

use async_trait::async_trait;
use devmemory_core::traits::ReportProducer;
use devmemory_core::{DevMemoryConfig, ReportArtifact, ReportStatus, ReportWindow, Result};

use crate::analyzer::classify_report;
use crate::collector::GitCollector;
use crate::markdown::render_daily;
use crate::narrative::{NarrativeClient, daily_prompt};
use crate::writer::ReportWriter;

/// collect → classify → (narrative) → render → write.
pub struct GitReportProducer {
    collector: GitCollector,
    writer: ReportWriter,
    narrator: Option<NarrativeClient>,
}

impl GitReportProducer {
    pub fn new(collector: GitCollector, writer: ReportWriter, narrator: Option<NarrativeClient>) -> Self {
        Self {
            collector,
            writer,
            narrator,
        }
    }

    pub fn from_config(config: &DevMemoryConfig) -> Self {
        Self::new(
            GitCollector::new(config.repo_paths()),
            ReportWriter::new(config.data_path()),
            NarrativeClient::from_config(&config.ai),
        )
    }
}

#[async_trait]
impl ReportProducer for GitReportProducer {
    async fn generate(&self, window: &ReportWindow) -> Result<ReportArtifact> {
        tracing::info!(
            "🛠️ Generating report for {} ({} → {})",
            window.report_date,
            window.since_arg(),
            window.until_arg()
        );
        let mut report = self.collector.collect(window).await;
        classify_report(&mut report);

        let narrative = match (&self.narrator, report.status) {
            (Some(n), ReportStatus::Success) => n.narrate(&daily_prompt(&report)).await,
            _ => None,
        };
        let markdown = render_daily(&report, narrative.as_deref());
        self.writer.write_daily(&report, &markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use devmemory_core::DailyReport;

    #[tokio::test]
    async fn test_empty_config_writes_no_activity_report() {
        let dir = tempfile::tempdir().unwrap();
        let producer = GitReportProducer::new(GitCollector::new(vec![]), ReportWriter::new(dir.path()), None);
        let date = NaiveDate::from_ymd_opt(2026, 2, 12).unwrap();
        let window = ReportWindow {
            start: date.and_hms_opt(6, 0, 0).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 2, 13).unwrap().and_hms_opt(5, 59, 59).unwrap(),
            report_date: date,
        };

        let artifact = producer.generate(&window).await.unwrap();
        assert!(artifact.exists());
        let report: DailyReport =
            serde_json::from_str(&std::fs::read_to_string(&artifact.json_path).unwrap()).unwrap();
        assert_eq!(report.status, ReportStatus::NoActivity);
        let md = std::fs::read_to_string(&artifact.markdown_path).unwrap();
        assert!(md.contains("No development activity detected."));
    }
}
