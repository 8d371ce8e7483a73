//! Seams between the orchestrator and its collaborators.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DeliveryAttempt, ReportArtifact, ReportWindow, YearMonth};

/// Produces the daily report for a window. Fails as a unit: on `Err` no
/// artifact marker may be left on disk.
#[async_trait]
pub trait ReportProducer: Send + Sync {
    async fn generate(&self, window: &ReportWindow) -> Result<ReportArtifact>;
}

/// Hands a finished artifact to an external channel. Never fails: every
/// problem is folded into the returned attempt.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, artifact: &ReportArtifact) -> DeliveryAttempt;
}

/// Rolls the daily reports of one month into a monthly report.
#[async_trait]
pub trait MonthlyAggregator: Send + Sync {
    async fn aggregate(&self, month: YearMonth) -> Result<()>;
}
