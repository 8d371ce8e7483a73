//! # DevMemory Core
//! Shared data model, collaborator traits, configuration, and error taxonomy.

pub mod config;
pub mod error;
pub mod fsutil;
pub mod traits;
pub mod types;

pub use config::DevMemoryConfig;
pub use error::{DevMemoryError, Result};
pub use fsutil::write_atomic;
pub use traits::{MonthlyAggregator, Notifier, ReportProducer};
pub use types::{
    ActivityType, CommitDetail, DailyReport, DeliveryAttempt, DeliveryMode, ExecutionState,
    RepoCommittedSummary, RepoWorkingState, ReportArtifact, ReportStatus, ReportWindow, YearMonth,
};
