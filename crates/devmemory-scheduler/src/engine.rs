//! Orchestrator: decides whether the daily report still has to be produced
//! and drives production, state recording, delivery, and the monthly roll-up.
//!
//! Both entry points (`run_daily` from cron, `run_on_startup` from the login
//! hook) go through the same pure [`decide`] function.
//!
//! ```text
//! NOT_STARTED ──produce──▶ PRODUCED ──record──▶ RECORDED ──deliver──▶ DELIVERED
//!      ▲                      │                                  └──▶ DELIVERY_FAILED
//!      └──── retry on ────────┘ (state sync on next run)
//! ```

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use devmemory_core::config::ScheduleConfig;
use devmemory_core::{
    DeliveryAttempt, DevMemoryError, ExecutionState, MonthlyAggregator, Notifier, ReportArtifact,
    ReportProducer, ReportWindow, Result, YearMonth,
};

use crate::state::StateStore;
use crate::window;

/// What the scheduler should do for a report date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// State already records this date.
    AlreadyRecorded,
    /// The artifact exists but state lags behind (crash after production).
    SyncFromArtifact,
    /// Nothing on record; produce the report.
    Produce,
}

/// The shared idempotency rule for both entry points.
pub fn decide(state: &ExecutionState, report_date: NaiveDate, artifact_exists: bool) -> Decision {
    if state.has_executed_for(report_date) {
        Decision::AlreadyRecorded
    } else if artifact_exists {
        Decision::SyncFromArtifact
    } else {
        Decision::Produce
    }
}

pub fn needs_execution(
    state: &ExecutionState,
    report_date: NaiveDate,
    artifact_exists: bool,
) -> bool {
    decide(state, report_date, artifact_exists) == Decision::Produce
}

/// Why a run finished without producing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyRecorded,
    /// State was synchronized to an artifact left by an earlier run.
    ArtifactSynced,
    /// Startup hook found the artifact already on disk.
    ArtifactPresent,
    BeforeCutover,
    Weekend,
}

/// Result of a successful invocation.
#[derive(Debug)]
pub enum RunOutcome {
    Skipped {
        report_date: NaiveDate,
        reason: SkipReason,
    },
    Produced {
        report_date: NaiveDate,
        /// `None` when no notifier is configured.
        delivery: Option<DeliveryAttempt>,
        /// `Some` when the monthly roll-up was attempted.
        monthly: Option<(YearMonth, bool)>,
    },
}

impl RunOutcome {
    pub fn report_date(&self) -> NaiveDate {
        match self {
            Self::Skipped { report_date, .. } | Self::Produced { report_date, .. } => *report_date,
        }
    }
}

/// Drives one run-to-completion invocation.
pub struct Orchestrator {
    store: StateStore,
    data_dir: PathBuf,
    schedule: ScheduleConfig,
    producer: Box<dyn ReportProducer>,
    notifier: Option<Box<dyn Notifier>>,
    aggregator: Option<Box<dyn MonthlyAggregator>>,
}

impl Orchestrator {
    pub fn new(
        store: StateStore,
        data_dir: impl Into<PathBuf>,
        producer: Box<dyn ReportProducer>,
    ) -> Self {
        Self {
            store,
            data_dir: data_dir.into(),
            schedule: ScheduleConfig::default(),
            producer,
            notifier: None,
            aggregator: None,
        }
    }

    pub fn with_schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_aggregator(mut self, aggregator: Box<dyn MonthlyAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn window_for(&self, now: NaiveDateTime) -> ReportWindow {
        window::compute_window_with_cutover(now, self.schedule.cutover_hour)
    }

    /// Snapshot of what a run at `now` would decide, without side effects.
    pub fn preview(&self, now: NaiveDateTime) -> (ReportWindow, ExecutionState, bool, Decision) {
        let window = self.window_for(now);
        let state = self.store.read();
        let exists = ReportArtifact::locate(&self.data_dir, window.report_date).exists();
        let decision = decide(&state, window.report_date, exists);
        (window, state, exists, decision)
    }

    /// Cron-triggered entry point.
    ///
    /// Returns `Err` only when report production fails; state is then left
    /// untouched so the next trigger retries the same date.
    pub async fn run_daily(&self, now: NaiveDateTime) -> Result<RunOutcome> {
        let window = self.window_for(now);
        if self.schedule.weekdays_only && window::is_weekend(now.date()) {
            tracing::info!("📅 Weekend invocation for {}, nothing to do", window.report_date);
            return Ok(RunOutcome::Skipped {
                report_date: window.report_date,
                reason: SkipReason::Weekend,
            });
        }
        let state = self.store.read();
        self.execute(now, window, state).await
    }

    /// Startup-hook entry point: recovers a missed cron run.
    pub async fn run_on_startup(&self, now: NaiveDateTime) -> Result<RunOutcome> {
        tracing::info!("🔌 Startup detected");
        let window = self.window_for(now);
        let report_date = window.report_date;

        if window::is_before_cutover(now, self.schedule.cutover_hour) {
            tracing::info!(
                "🌙 Startup before {:02}:00, no recovery needed",
                self.schedule.cutover_hour
            );
            return Ok(RunOutcome::Skipped {
                report_date,
                reason: SkipReason::BeforeCutover,
            });
        }
        if self.schedule.weekdays_only && window::is_weekend(now.date()) {
            tracing::info!("📅 Weekend startup for {report_date}, nothing to do");
            return Ok(RunOutcome::Skipped {
                report_date,
                reason: SkipReason::Weekend,
            });
        }

        let state = self.store.read();
        if state.has_executed_for(report_date) {
            tracing::info!("✅ Already executed for {report_date} (state), exit");
            return Ok(RunOutcome::Skipped {
                report_date,
                reason: SkipReason::AlreadyRecorded,
            });
        }
        if ReportArtifact::locate(&self.data_dir, report_date).exists() {
            tracing::info!("✅ Daily report already exists for {report_date}, exit");
            return Ok(RunOutcome::Skipped {
                report_date,
                reason: SkipReason::ArtifactPresent,
            });
        }

        tracing::warn!("⏰ Missed scheduled execution detected for {report_date}");
        tracing::info!("🔄 Running recovery job");
        match self.execute(now, window, state).await {
            Ok(outcome) => {
                tracing::info!("✅ Recovery completed successfully");
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!("❌ Recovery job failed: {e}");
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        now: NaiveDateTime,
        window: ReportWindow,
        state: ExecutionState,
    ) -> Result<RunOutcome> {
        let report_date = window.report_date;
        let artifact = ReportArtifact::locate(&self.data_dir, report_date);

        match decide(&state, report_date, artifact.exists()) {
            Decision::AlreadyRecorded => {
                tracing::info!("✅ Already executed for {report_date}, exit");
                return Ok(RunOutcome::Skipped {
                    report_date,
                    reason: SkipReason::AlreadyRecorded,
                });
            }
            Decision::SyncFromArtifact => {
                tracing::warn!(
                    "🔁 Report for {report_date} exists but state lags ({:?}), synchronizing",
                    state.last_daily_execution
                );
                self.record(report_date);
                return Ok(RunOutcome::Skipped {
                    report_date,
                    reason: SkipReason::ArtifactSynced,
                });
            }
            Decision::Produce => {}
        }

        tracing::info!(
            "🚀 Generating daily report for {report_date} (window {} → {})",
            window.since_arg(),
            window.until_arg()
        );
        let artifact = match self.producer.generate(&window).await {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::error!("❌ Daily report failed for {report_date}: {e}");
                return Err(match e {
                    DevMemoryError::Production(_) => e,
                    other => DevMemoryError::Production(other.to_string()),
                });
            }
        };
        tracing::info!("📝 Daily report written: {}", artifact.markdown_path.display());
        self.record(report_date);

        let delivery = match &self.notifier {
            Some(notifier) => {
                let attempt = notifier.deliver(&artifact).await;
                if attempt.is_delivered() {
                    tracing::info!("📨 Delivered report for {report_date}");
                } else {
                    tracing::warn!(
                        "⚠️ Delivery failed for {report_date} (status={:?} retries={}): {}",
                        attempt.status_code,
                        attempt.retry_count,
                        attempt
                            .error
                            .as_ref()
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "unknown".into())
                    );
                }
                Some(attempt)
            }
            None => None,
        };

        let monthly = self.maybe_aggregate(now.date()).await;

        Ok(RunOutcome::Produced {
            report_date,
            delivery,
            monthly,
        })
    }

    /// Best-effort: state write failures are logged; the artifact on disk lets
    /// the next run re-synchronize.
    fn record(&self, report_date: NaiveDate) {
        if let Err(e) = self.store.write(&ExecutionState::recorded(report_date)) {
            tracing::error!(
                "❌ Failed to record execution for {report_date} in {}: {e}",
                self.store.path().display()
            );
        }
    }

    async fn maybe_aggregate(&self, today: NaiveDate) -> Option<(YearMonth, bool)> {
        let aggregator = self.aggregator.as_ref()?;
        if !window::is_first_weekday_of_month(today) {
            return None;
        }
        let month = YearMonth::of(today).previous();
        tracing::info!("🗓️ First weekday of the month, aggregating {month}");
        match aggregator.aggregate(month).await {
            Ok(()) => Some((month, true)),
            Err(e) => {
                tracing::warn!("⚠️ Monthly aggregation failed for {month}: {e}");
                Some((month, false))
            }
        }
    }
}
