//! # DevMemory Report
//!
//! Turns git history into the daily report artifact and rolls daily reports
//! up into monthly ones.
//!
//! ```text
//! repos ──▶ collector ──▶ analyzer ──▶ markdown ──▶ writer ──▶ data/daily/<date>.{md,json}
//!                                          ▲
//!                              narrative (optional)
//!
//! data/daily/<YYYY-MM>-*.json ──▶ monthly ──▶ writer ──▶ data/monthly/<YYYY-MM>.{md,json}
//!
//! data/daily/<start..=end>.json ──▶ range ──▶ stand-up summary + per-repo blocks
//! ```

pub mod analyzer;
pub mod collector;
pub mod markdown;
pub mod monthly;
pub mod narrative;
pub mod producer;
pub mod range;
pub mod writer;

pub use collector::GitCollector;
pub use monthly::{MonthlyReporter, MonthlySummary};
pub use narrative::NarrativeClient;
pub use producer::GitReportProducer;
pub use range::RangeSummary;
pub use writer::ReportWriter;
