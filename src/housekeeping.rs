//! Retention cleanup of old briefings.
//!
//! Briefings older than the retention window are deleted together with their
//! cards, sources and feedback. A briefing with any bookmarked card is kept.

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::storage::Database;
use crate::{Error, Result};

pub const NEVER_DELETE_REASON: &str = "Retention is set to 'Never delete'";

/// Outcome of a cleanup pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupResult {
    pub deleted_count: usize,
    pub remaining_count: usize,
    pub skipped_reason: Option<String>,
}

fn cutoff_ids(db: &Database, older_than_days: i64) -> Result<Vec<i64>> {
    if older_than_days < 1 {
        return Err(Error::Validation(format!(
            "retention must be at least 1 day, got {}",
            older_than_days
        )));
    }
    let cutoff = Duration::try_days(older_than_days)
        .and_then(|window| Utc::now().checked_sub_signed(window));
    match cutoff {
        Some(cutoff) => db.cleanup_candidates_before(cutoff),
        // a window reaching past the earliest representable time selects nothing
        None => Ok(Vec::new()),
    }
}

/// Delete unbookmarked briefings older than `older_than_days`
pub fn cleanup(db: &Database, older_than_days: i64) -> Result<CleanupResult> {
    let before = db.count_briefings()?;
    let ids = cutoff_ids(db, older_than_days)?;

    let mut deleted_count = 0;
    for id in ids {
        deleted_count += db.delete_briefing(id)?;
    }
    let remaining_count = db.count_briefings()?;

    if deleted_count > 0 {
        info!(
            "Housekeeping: deleted {} briefing(s) older than {} days ({} remaining)",
            deleted_count, older_than_days, remaining_count
        );
    } else {
        info!(
            "Housekeeping: nothing to clean up (retention: {} days, {} total)",
            older_than_days, before
        );
    }

    Ok(CleanupResult {
        deleted_count,
        remaining_count,
        skipped_reason: None,
    })
}

/// How many briefings `cleanup` would delete, without deleting them
pub fn count_cleanup_candidates(db: &Database, older_than_days: i64) -> Result<usize> {
    Ok(cutoff_ids(db, older_than_days)?.len())
}

/// Clean up according to a configured retention; `None` keeps everything
pub fn run_cleanup(db: &Database, retention_days: Option<i64>) -> Result<CleanupResult> {
    match retention_days {
        Some(days) => cleanup(db, days),
        None => {
            info!("Housekeeping: retention_days is unset, skipping cleanup");
            Ok(CleanupResult {
                deleted_count: 0,
                remaining_count: db.count_briefings()?,
                skipped_reason: Some(NEVER_DELETE_REASON.to_string()),
            })
        }
    }
}

/// Cleanup for startup paths: failures are logged, never raised
pub fn run_startup_cleanup(db: &Database, retention_days: Option<i64>) -> Option<CleanupResult> {
    match run_cleanup(db, retention_days) {
        Ok(result) => Some(result),
        Err(e) => {
            warn!("Startup cleanup failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefing::{CreateBriefing, NewCard};
    use crate::feedback::NewFeedback;

    fn briefing_aged(db: &Database, days_ago: i64) -> i64 {
        let data = CreateBriefing::new(vec!["rust".to_string()], format!("{} days old", days_ago))
            .with_card(NewCard::new("Card", "rust", "body"))
            .with_created_at(Utc::now() - Duration::days(days_ago));
        db.create_briefing(&data).unwrap().id
    }

    #[test]
    fn test_cleanup_skipped_when_retention_unset() {
        let db = Database::open_in_memory().unwrap();
        briefing_aged(&db, 400);

        let result = run_cleanup(&db, None).unwrap();
        assert_eq!(result.deleted_count, 0);
        assert_eq!(result.remaining_count, 1);
        assert_eq!(result.skipped_reason.as_deref(), Some(NEVER_DELETE_REASON));
    }

    #[test]
    fn test_cleanup_deletes_old_briefings() {
        let db = Database::open_in_memory().unwrap();
        let old = briefing_aged(&db, 100);
        let recent = briefing_aged(&db, 0);
        db.add_feedback(&NewFeedback::new(old, 3)).unwrap();

        assert_eq!(count_cleanup_candidates(&db, 30).unwrap(), 1);
        let result = run_cleanup(&db, Some(30)).unwrap();

        assert_eq!(result.deleted_count, 1);
        assert_eq!(result.remaining_count, 1);
        assert!(result.skipped_reason.is_none());
        assert!(db.get_briefing(old).unwrap().is_none());
        assert!(db.get_feedback_for_briefing(old).unwrap().is_empty());
        assert!(db.get_briefing(recent).unwrap().is_some());
    }

    #[test]
    fn test_cleanup_preserves_bookmarked_briefings() {
        let db = Database::open_in_memory().unwrap();
        let kept = briefing_aged(&db, 100);
        let dropped = briefing_aged(&db, 90);
        db.add_bookmark(kept, 0).unwrap();

        let result = cleanup(&db, 30).unwrap();
        assert_eq!(result.deleted_count, 1);
        assert!(db.get_briefing(kept).unwrap().is_some());
        assert!(db.get_briefing(dropped).unwrap().is_none());
    }

    #[test]
    fn test_cleanup_rejects_non_positive_window() {
        let db = Database::open_in_memory().unwrap();
        briefing_aged(&db, 10);

        assert!(matches!(cleanup(&db, 0), Err(Error::Validation(_))));
        assert!(matches!(count_cleanup_candidates(&db, -5), Err(Error::Validation(_))));
        assert!(run_startup_cleanup(&db, Some(0)).is_none());
        assert_eq!(db.count_briefings().unwrap(), 1);
    }

    #[test]
    fn test_startup_cleanup_applies_retention() {
        let db = Database::open_in_memory().unwrap();
        briefing_aged(&db, 60);
        let recent = briefing_aged(&db, 1);

        let result = run_startup_cleanup(&db, Some(30)).unwrap();
        assert_eq!(result.deleted_count, 1);
        assert_eq!(db.get_all_briefings().unwrap()[0].id, recent);

        let skipped = run_startup_cleanup(&db, None).unwrap();
        assert_eq!(skipped.skipped_reason.as_deref(), Some(NEVER_DELETE_REASON));
        assert_eq!(db.count_briefings().unwrap(), 1);
    }

    #[test]
    fn test_cleanup_with_huge_window_deletes_nothing() {
        let db = Database::open_in_memory().unwrap();
        briefing_aged(&db, 5000);

        let result = cleanup(&db, i64::MAX).unwrap();
        assert_eq!(result.deleted_count, 0);
        assert_eq!(result.remaining_count, 1);
    }
}
