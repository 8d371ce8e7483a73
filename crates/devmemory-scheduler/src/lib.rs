//! # DevMemory Scheduler
//!
//! Decides, for any invocation time, whether the daily report still has to
//! be produced, and keeps that decision idempotent across two unreliable
//! triggers.
//!
//! ## Architecture
//! ```text
//! cron (06:00 Mon–Fri) ──▶ run_daily ──────┐
//! login hook ───────────▶ run_on_startup ──┤
//!                                          ▼
//!                          window::compute_window(now)
//!                                          ▼
//!                    engine::decide(state, report_date, artifact)
//!                       ├── AlreadyRecorded  → exit
//!                       ├── SyncFromArtifact → write state, exit
//!                       └── Produce → ReportProducer → StateStore.write
//!                                       → Notifier (best effort)
//!                                       → MonthlyAggregator (first weekday)
//! ```

pub mod engine;
pub mod install;
pub mod state;
pub mod window;

pub use engine::{Decision, Orchestrator, RunOutcome, SkipReason, decide, needs_execution};
pub use install::InstallOutcome;
pub use state::StateStore;
pub use window::{compute_window, compute_window_with_cutover};
