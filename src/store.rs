//! Store functions over the process-wide handle.
//!
//! Each call acquires the handle from [`crate::handle`], runs as one
//! transaction and persists before returning. They fail with
//! `NotInitialized` until [`crate::init_database`] has been called.

use crate::briefing::{Briefing, CreateBriefing};
use crate::feedback::{Feedback, FeedbackPattern, FeedbackStats, NewFeedback, RecordedFeedback};
use crate::handle::get_database;
use crate::storage::Bookmark;
use crate::Result;

// ========== Briefings ==========

pub fn create_briefing(data: &CreateBriefing) -> Result<Briefing> {
    get_database()?.create_briefing(data)
}

pub fn create_briefings(batch: &[CreateBriefing]) -> Result<Vec<Briefing>> {
    get_database()?.create_briefings(batch)
}

pub fn get_briefing(id: i64) -> Result<Option<Briefing>> {
    get_database()?.get_briefing(id)
}

pub fn get_briefings_by_date(days: i64) -> Result<Vec<Briefing>> {
    get_database()?.get_briefings_by_date(days)
}

pub fn search_briefings(query: &str) -> Result<Vec<Briefing>> {
    get_database()?.search_briefings(query)
}

pub fn delete_briefing(id: i64) -> Result<usize> {
    get_database()?.delete_briefing(id)
}

pub fn get_all_briefings() -> Result<Vec<Briefing>> {
    get_database()?.get_all_briefings()
}

// ========== Feedback ==========

pub fn add_feedback(data: &NewFeedback) -> Result<Feedback> {
    get_database()?.add_feedback(data)
}

pub fn record_feedback(data: &NewFeedback) -> Result<RecordedFeedback> {
    get_database()?.record_feedback(data)
}

pub fn get_feedback_for_briefing(briefing_id: i64) -> Result<Vec<Feedback>> {
    get_database()?.get_feedback_for_briefing(briefing_id)
}

pub fn delete_feedback_for_briefing(briefing_id: i64) -> Result<usize> {
    get_database()?.delete_feedback_for_briefing(briefing_id)
}

pub fn get_feedback_stats() -> Result<FeedbackStats> {
    get_database()?.get_feedback_stats()
}

// ========== Patterns ==========

pub fn get_feedback_patterns() -> Result<Vec<FeedbackPattern>> {
    get_database()?.get_feedback_patterns()
}

pub fn get_feedback_pattern(topic: &str) -> Result<Option<FeedbackPattern>> {
    get_database()?.get_feedback_pattern(topic)
}

pub fn update_feedback_pattern(topic: &str, is_positive: bool) -> Result<FeedbackPattern> {
    get_database()?.update_feedback_pattern(topic, is_positive)
}

pub fn reset_feedback_pattern(topic: &str) -> Result<bool> {
    get_database()?.reset_feedback_pattern(topic)
}

// ========== Bookmarks ==========

pub fn add_bookmark(briefing_id: i64, card_index: i64) -> Result<()> {
    get_database()?.add_bookmark(briefing_id, card_index)
}

pub fn remove_bookmark(briefing_id: i64, card_index: i64) -> Result<bool> {
    get_database()?.remove_bookmark(briefing_id, card_index)
}

pub fn is_bookmarked(briefing_id: i64, card_index: i64) -> Result<bool> {
    get_database()?.is_bookmarked(briefing_id, card_index)
}

pub fn toggle_bookmark(briefing_id: i64, card_index: i64) -> Result<bool> {
    get_database()?.toggle_bookmark(briefing_id, card_index)
}

pub fn get_all_bookmarks() -> Result<Vec<Bookmark>> {
    get_database()?.get_all_bookmarks()
}
