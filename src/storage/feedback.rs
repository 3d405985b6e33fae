//! Feedback operations and the per-topic pattern aggregation

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use super::sqlite::{Database, decode_timestamp, encode_timestamp};
use crate::feedback::{Feedback, FeedbackPattern, FeedbackStats, NewFeedback, RecordedFeedback};
use crate::{Error, Result};

const FEEDBACK_COLUMNS: &str = "id, briefing_id, card_index, rating, reason, created_at";
const PATTERN_COLUMNS: &str = "topic, positive_count, negative_count, last_updated";

impl Database {
    // ========== Feedback Operations ==========

    /// Insert a rating against an existing briefing (and card, when given)
    pub fn add_feedback(&self, data: &NewFeedback) -> Result<Feedback> {
        let feedback = self.write(|conn| insert_feedback(conn, data))?;
        info!(
            "Recorded feedback {} on briefing {} (rating {})",
            feedback.id, feedback.briefing_id, feedback.rating
        );
        Ok(feedback)
    }

    /// Insert a rating and feed it into the topic patterns in the same transaction.
    ///
    /// A rated card teaches its own topic; a whole-briefing rating teaches every
    /// briefing topic. Neutral ratings leave the patterns untouched.
    pub fn record_feedback(&self, data: &NewFeedback) -> Result<RecordedFeedback> {
        let recorded = self.write(|conn| {
            let feedback = insert_feedback(conn, data)?;

            let mut patterns = Vec::new();
            if feedback.rating != 0 {
                let is_positive = feedback.rating > 0;
                for topic in rated_topics(conn, feedback.briefing_id, feedback.card_index)? {
                    patterns.push(upsert_pattern(conn, &topic, is_positive)?);
                }
            }
            Ok(RecordedFeedback { feedback, patterns })
        })?;

        info!(
            "Recorded feedback {} on briefing {} (rating {}, {} patterns updated)",
            recorded.feedback.id,
            recorded.feedback.briefing_id,
            recorded.feedback.rating,
            recorded.patterns.len()
        );
        Ok(recorded)
    }

    /// All feedback for a briefing, newest first
    pub fn get_feedback_for_briefing(&self, briefing_id: i64) -> Result<Vec<Feedback>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM feedback WHERE briefing_id = ?1 ORDER BY created_at DESC, id DESC",
                FEEDBACK_COLUMNS
            ))?;
            let feedback = stmt
                .query_map([briefing_id], row_to_feedback)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(feedback)
        })
    }

    /// Delete all feedback for a briefing, returning how many rows went
    pub fn delete_feedback_for_briefing(&self, briefing_id: i64) -> Result<usize> {
        let deleted = self.write(|conn| {
            Ok(conn.execute("DELETE FROM feedback WHERE briefing_id = ?1", [briefing_id])?)
        })?;
        debug!("Deleted {} feedback rows for briefing {}", deleted, briefing_id);
        Ok(deleted)
    }

    /// Totals split by rating sign; all zero on an empty table
    pub fn get_feedback_stats(&self) -> Result<FeedbackStats> {
        self.read(|conn| {
            let stats = conn.query_row(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(rating > 0), 0),
                       COALESCE(SUM(rating < 0), 0),
                       COALESCE(SUM(rating = 0), 0)
                FROM feedback
                "#,
                [],
                |row| {
                    Ok(FeedbackStats {
                        total: row.get(0)?,
                        positive: row.get(1)?,
                        negative: row.get(2)?,
                        neutral: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }

    // ========== Pattern Operations ==========

    /// Every pattern by engagement (positive + negative) descending, then
    /// topic alphabetically ignoring ASCII case. Topics differing only in case
    /// fall back to byte order so the listing stays deterministic.
    pub fn get_feedback_patterns(&self) -> Result<Vec<FeedbackPattern>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM feedback_patterns
                 ORDER BY (positive_count + negative_count) DESC, topic COLLATE NOCASE ASC, topic ASC",
                PATTERN_COLUMNS
            ))?;
            let patterns = stmt
                .query_map([], row_to_pattern)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(patterns)
        })
    }

    /// Exact-match lookup; `None` when the topic has never been rated
    pub fn get_feedback_pattern(&self, topic: &str) -> Result<Option<FeedbackPattern>> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Ok(None);
        }
        self.read(|conn| load_pattern(conn, topic))
    }

    /// Add one positive or negative vote to a topic, creating its row on first use
    pub fn update_feedback_pattern(&self, topic: &str, is_positive: bool) -> Result<FeedbackPattern> {
        let topic = normalize_topic(topic)?;
        let pattern = self.write(|conn| upsert_pattern(conn, topic, is_positive))?;
        debug!(
            "Pattern '{}' now +{} / -{}",
            pattern.topic, pattern.positive_count, pattern.negative_count
        );
        Ok(pattern)
    }

    /// Zero both counters of a topic. Returns false when the topic is unknown.
    pub fn reset_feedback_pattern(&self, topic: &str) -> Result<bool> {
        let topic = normalize_topic(topic)?;
        let now = encode_timestamp(&Utc::now());
        let updated = self.write(|conn| {
            Ok(conn.execute(
                "UPDATE feedback_patterns
                 SET positive_count = 0, negative_count = 0, last_updated = ?2
                 WHERE topic = ?1",
                params![topic, now],
            )?)
        })?;
        if updated > 0 {
            info!("Reset feedback pattern '{}'", topic);
        }
        Ok(updated > 0)
    }
}

fn normalize_topic(topic: &str) -> Result<&str> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(Error::Validation("feedback pattern topic must not be blank".to_string()));
    }
    Ok(topic)
}

fn ensure_target_exists(conn: &Connection, briefing_id: i64, card_index: Option<i64>) -> Result<()> {
    let briefing_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM briefings WHERE id = ?1)",
        [briefing_id],
        |row| row.get(0),
    )?;
    if !briefing_exists {
        return Err(Error::ForeignKeyViolation(format!(
            "briefing {} does not exist",
            briefing_id
        )));
    }

    if let Some(card_index) = card_index {
        let card_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM briefing_cards WHERE briefing_id = ?1 AND card_index = ?2)",
            [briefing_id, card_index],
            |row| row.get(0),
        )?;
        if !card_exists {
            return Err(Error::ForeignKeyViolation(format!(
                "briefing {} has no card {}",
                briefing_id, card_index
            )));
        }
    }
    Ok(())
}

fn insert_feedback(conn: &Connection, data: &NewFeedback) -> Result<Feedback> {
    ensure_target_exists(conn, data.briefing_id, data.card_index)?;

    let reason = data
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    conn.execute(
        r#"
        INSERT INTO feedback (briefing_id, card_index, rating, reason, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            data.briefing_id,
            data.card_index,
            data.rating,
            reason,
            encode_timestamp(&Utc::now()),
        ],
    )?;
    let id = conn.last_insert_rowid();

    let feedback = conn.query_row(
        &format!("SELECT {} FROM feedback WHERE id = ?1", FEEDBACK_COLUMNS),
        [id],
        row_to_feedback,
    )?;
    Ok(feedback)
}

/// Topics a rating should teach, without duplicates
fn rated_topics(conn: &Connection, briefing_id: i64, card_index: Option<i64>) -> Result<Vec<String>> {
    if let Some(card_index) = card_index {
        let card_topic: Option<String> = conn
            .query_row(
                "SELECT topic FROM briefing_cards WHERE briefing_id = ?1 AND card_index = ?2",
                [briefing_id, card_index],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(topic) = card_topic.filter(|t| !t.trim().is_empty()) {
            return Ok(vec![topic.trim().to_string()]);
        }
    }

    let topics_json: String = conn.query_row(
        "SELECT topics FROM briefings WHERE id = ?1",
        [briefing_id],
        |row| row.get(0),
    )?;
    let topics: Vec<String> = serde_json::from_str(&topics_json).map_err(|e| {
        Error::StorageUnavailable(format!("briefing {} has malformed topics: {}", briefing_id, e))
    })?;

    let mut unique: Vec<String> = Vec::with_capacity(topics.len());
    for topic in topics {
        let topic = topic.trim().to_string();
        if !topic.is_empty() && !unique.contains(&topic) {
            unique.push(topic);
        }
    }
    Ok(unique)
}

fn upsert_pattern(conn: &Connection, topic: &str, is_positive: bool) -> Result<FeedbackPattern> {
    let (positive, negative) = if is_positive { (1, 0) } else { (0, 1) };

    conn.execute(
        r#"
        INSERT INTO feedback_patterns (topic, positive_count, negative_count, last_updated)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(topic) DO UPDATE SET
            positive_count = positive_count + excluded.positive_count,
            negative_count = negative_count + excluded.negative_count,
            last_updated = excluded.last_updated
        "#,
        params![topic, positive, negative, encode_timestamp(&Utc::now())],
    )?;

    load_pattern(conn, topic)?.ok_or_else(|| {
        Error::StorageUnavailable(format!("pattern '{}' missing after upsert", topic))
    })
}

fn load_pattern(conn: &Connection, topic: &str) -> Result<Option<FeedbackPattern>> {
    let pattern = conn
        .query_row(
            &format!("SELECT {} FROM feedback_patterns WHERE topic = ?1", PATTERN_COLUMNS),
            [topic],
            row_to_pattern,
        )
        .optional()?;
    Ok(pattern)
}

/// Helper to convert a row to Feedback
fn row_to_feedback(row: &rusqlite::Row) -> rusqlite::Result<Feedback> {
    Ok(Feedback {
        id: row.get(0)?,
        briefing_id: row.get(1)?,
        card_index: row.get(2)?,
        rating: row.get(3)?,
        reason: row.get(4)?,
        created_at: decode_timestamp(row, 5)?,
    })
}

/// Helper to convert a row to a FeedbackPattern
fn row_to_pattern(row: &rusqlite::Row) -> rusqlite::Result<FeedbackPattern> {
    let positive_count: i64 = row.get(1)?;
    let negative_count: i64 = row.get(2)?;
    if positive_count < 0 || negative_count < 0 {
        return Err(rusqlite::Error::FromSqlConversionFailure(
            if positive_count < 0 { 1 } else { 2 },
            Type::Integer,
            "negative feedback count".into(),
        ));
    }

    Ok(FeedbackPattern {
        topic: row.get(0)?,
        positive_count,
        negative_count,
        last_updated: decode_timestamp(row, 3)?,
    })
}
