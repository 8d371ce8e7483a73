//! Rule-based activity classification.

use devmemory_core::{ActivityType, DailyReport, ReportStatus};

/// Classify one repository's committed totals.
///
/// Rules are checked in order: no commits, large insertions, small touch,
/// net deletion, everything else.
pub fn classify(commits: u32, files_changed: u32, insertions: u32, deletions: u32) -> ActivityType {
    if commits == 0 {
        ActivityType::NoActivity
    } else if insertions > 200 {
        ActivityType::Feature
    } else if files_changed <= 2 && insertions < 50 {
        ActivityType::Bugfix
    } else if deletions > insertions {
        ActivityType::Refactor
    } else {
        ActivityType::Improvement
    }
}

/// Stamp every committed summary with its activity type.
pub fn classify_report(report: &mut DailyReport) {
    if report.status == ReportStatus::NoActivity {
        return;
    }
    for summary in &mut report.committed {
        summary.activity_type = classify(
            summary.commits_count,
            summary.files_changed,
            summary.insertions,
            summary.deletions,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_rules() {
        assert_eq!(classify(0, 10, 500, 0), ActivityType::NoActivity);
        assert_eq!(classify(1, 20, 201, 0), ActivityType::Feature);
        assert_eq!(classify(1, 2, 49, 0), ActivityType::Bugfix);
        assert_eq!(classify(1, 3, 49, 0), ActivityType::Improvement);
        assert_eq!(classify(2, 5, 40, 90), ActivityType::Refactor);
        assert_eq!(classify(3, 5, 200, 10), ActivityType::Improvement);
        // Small-touch wins over net deletion.
        assert_eq!(classify(1, 1, 10, 300), ActivityType::Bugfix);
    }
}
