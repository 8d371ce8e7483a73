//! Report window calculation.
//!
//! Maps an invocation time to the commit window and the logical report date.
//! Pure: callers inject `now`, so every rule is testable without a clock.
//!
//! ```text
//! Tue 06:00 ─────────── window for Tue ─────────── Wed 05:59:59   (run Wed)
//! Fri 06:00 ─ Fri ─ Sat ─ Sun ─ window for Sun ─── Mon 05:59:59   (run Mon)
//! ```

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use devmemory_core::ReportWindow;

/// Hour at which a new window opens unless configured otherwise.
pub const DEFAULT_CUTOVER_HOUR: u32 = 6;

/// Compute the window using the default 06:00 cutover.
pub fn compute_window(now: NaiveDateTime) -> ReportWindow {
    compute_window_with_cutover(now, DEFAULT_CUTOVER_HOUR)
}

/// Compute the window for `now` with a custom cutover hour.
///
/// The report date is always the day before `now`. On Mondays the window
/// reaches back to Friday's cutover so weekend commits are not lost.
pub fn compute_window_with_cutover(now: NaiveDateTime, cutover_hour: u32) -> ReportWindow {
    let today = now.date();
    let report_date = today - Duration::days(1);

    let start_day = if today.weekday() == Weekday::Mon {
        today - Duration::days(3)
    } else {
        report_date
    };

    let cutover = cutover_time(cutover_hour);
    let start = start_day.and_time(cutover);
    let end = today.and_time(cutover) - Duration::seconds(1);

    ReportWindow {
        start,
        end,
        report_date,
    }
}

/// Whether `now` is earlier than the cutover on its own day.
pub fn is_before_cutover(now: NaiveDateTime, cutover_hour: u32) -> bool {
    now.time() < cutover_time(cutover_hour)
}

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Whether `day` is the first Monday–Friday date of its month.
pub fn is_first_weekday_of_month(day: NaiveDate) -> bool {
    let Some(mut first) = day.with_day(1) else {
        return false;
    };
    while is_weekend(first) {
        first += Duration::days(1);
    }
    day == first
}

fn cutover_time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN)
}
