//! Briefing operations: create, lookup, date range, search, delete

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Params, params};
use tracing::{debug, info};

use super::sqlite::{Database, decode_timestamp, encode_timestamp};
use crate::briefing::{Briefing, BriefingCard, CreateBriefing, Source, SourceKind};
use crate::{Error, Result};

const BRIEFING_COLUMNS: &str =
    "id, created_at, title, topics, summary, model_used, research_time_ms, total_tokens";

const TOPIC_WEIGHT: usize = 3;
const TITLE_WEIGHT: usize = 2;
const SUMMARY_WEIGHT: usize = 1;

impl Database {
    // ========== Briefing Operations ==========

    /// Insert a briefing with all of its cards and sources in one transaction
    pub fn create_briefing(&self, data: &CreateBriefing) -> Result<Briefing> {
        data.validate()?;

        let briefing = self.write(|conn| insert_briefing(conn, data))?;

        info!(
            "Created briefing {} ({} cards, {} sources)",
            briefing.id,
            briefing.cards.len(),
            briefing.sources.len()
        );
        Ok(briefing)
    }

    /// Insert several briefings as one transaction; either all land or none do
    pub fn create_briefings(&self, batch: &[CreateBriefing]) -> Result<Vec<Briefing>> {
        for (index, data) in batch.iter().enumerate() {
            data.validate()
                .map_err(|e| Error::Validation(format!("entry {}: {}", index, e)))?;
        }

        let created = self.write(|conn| {
            batch
                .iter()
                .map(|data| insert_briefing(conn, data))
                .collect::<Result<Vec<_>>>()
        })?;

        info!("Created {} briefings in one batch", created.len());
        Ok(created)
    }

    /// Get a briefing by id; `None` when absent
    pub fn get_briefing(&self, id: i64) -> Result<Option<Briefing>> {
        self.read(|conn| load_briefing(conn, id))
    }

    /// Briefings created within the last `days` days, newest first
    pub fn get_briefings_by_date(&self, days: i64) -> Result<Vec<Briefing>> {
        if days <= 0 {
            return Ok(Vec::new());
        }

        let cutoff = Duration::try_days(days).and_then(|d| Utc::now().checked_sub_signed(d));
        match cutoff {
            Some(cutoff) => self.read(|conn| {
                query_briefings(conn, "WHERE created_at >= ?1", [encode_timestamp(&cutoff)])
            }),
            None => self.get_all_briefings(),
        }
    }

    /// Case-insensitive substring search over title, topics and summary.
    ///
    /// Results are ordered by relevance, then recency. A blank query matches nothing.
    pub fn search_briefings(&self, query: &str) -> Result<Vec<Briefing>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        // SQLite's LIKE only folds ASCII case. Topics are matched per element
        // through json_each, since the stored JSON escapes quotes and backslashes.
        let candidates = if needle.is_ascii() {
            let pattern = format!("%{}%", escape_like(&needle));
            self.read(|conn| {
                query_briefings(
                    conn,
                    r"WHERE title LIKE ?1 ESCAPE '\'
                        OR summary LIKE ?1 ESCAPE '\'
                        OR EXISTS (SELECT 1 FROM json_each(briefings.topics) AS t WHERE t.value LIKE ?1 ESCAPE '\')",
                    [pattern],
                )
            })?
        } else {
            self.get_all_briefings()?
        };

        let mut scored: Vec<(usize, Briefing)> = candidates
            .into_iter()
            .map(|b| (relevance(&b, &needle), b))
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| {
            sb.cmp(sa)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });

        debug!("Search '{}' matched {} briefings", query, scored.len());
        Ok(scored.into_iter().map(|(_, b)| b).collect())
    }

    /// Delete a briefing and everything that hangs off it.
    ///
    /// Returns the number of briefings deleted (0 or 1).
    pub fn delete_briefing(&self, id: i64) -> Result<usize> {
        let deleted = self.write(|conn| Ok(conn.execute("DELETE FROM briefings WHERE id = ?1", [id])?))?;
        if deleted > 0 {
            info!("Deleted briefing {}", id);
        }
        Ok(deleted)
    }

    /// Every briefing, newest first
    pub fn get_all_briefings(&self) -> Result<Vec<Briefing>> {
        self.read(|conn| query_briefings(conn, "", []))
    }

    /// Count all briefings
    pub fn count_briefings(&self) -> Result<usize> {
        self.read(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM briefings", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Count cards across all briefings
    pub fn count_cards(&self) -> Result<usize> {
        self.read(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM briefing_cards", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Ids of unbookmarked briefings created before `cutoff`, oldest first
    pub fn cleanup_candidates_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM briefings
                 WHERE created_at < ?1
                   AND id NOT IN (SELECT DISTINCT briefing_id FROM bookmarks)
                 ORDER BY created_at ASC, id ASC",
            )?;
            let ids = stmt
                .query_map([encode_timestamp(&cutoff)], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }
}

/// Insert one validated briefing with its cards and sources
fn insert_briefing(conn: &Connection, data: &CreateBriefing) -> Result<Briefing> {
    let topics = serde_json::to_string(&data.normalized_topics())?;
    let created_at = encode_timestamp(&data.created_at.unwrap_or_else(Utc::now));

    conn.execute(
        r#"
        INSERT INTO briefings (created_at, title, topics, summary, model_used, research_time_ms, total_tokens)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            created_at,
            data.title,
            topics,
            data.summary,
            data.model_used,
            data.research_time_ms,
            data.total_tokens,
        ],
    )?;
    let id = conn.last_insert_rowid();

    for (index, card) in data.cards.iter().enumerate() {
        conn.execute(
            r#"
            INSERT INTO briefing_cards (briefing_id, card_index, title, topic, summary, detailed_content, relevance, suggested_next)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                id,
                index as i64,
                card.title,
                card.topic.trim(),
                card.summary,
                card.detailed_content,
                card.relevance,
                card.suggested_next,
            ],
        )?;
    }

    for source in &data.sources {
        conn.execute(
            "INSERT INTO sources (briefing_id, kind, url, title) VALUES (?1, ?2, ?3, ?4)",
            params![id, source.kind.as_str(), source.url.trim(), source.title],
        )?;
    }

    load_briefing(conn, id)?
        .ok_or_else(|| Error::StorageUnavailable(format!("briefing {} missing after insert", id)))
}

pub(super) fn load_briefing(conn: &Connection, id: i64) -> Result<Option<Briefing>> {
    let header = conn
        .query_row(
            &format!("SELECT {} FROM briefings WHERE id = ?1", BRIEFING_COLUMNS),
            [id],
            row_to_briefing,
        )
        .optional()?;

    match header {
        Some(mut briefing) => {
            hydrate(conn, &mut briefing)?;
            Ok(Some(briefing))
        }
        None => Ok(None),
    }
}

fn query_briefings<P: Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<Briefing>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM briefings {} ORDER BY created_at DESC, id DESC",
        BRIEFING_COLUMNS, filter
    ))?;

    let mut briefings = stmt
        .query_map(params, row_to_briefing)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for briefing in &mut briefings {
        hydrate(conn, briefing)?;
    }
    Ok(briefings)
}

fn hydrate(conn: &Connection, briefing: &mut Briefing) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT id, briefing_id, card_index, title, topic, summary, detailed_content, relevance, suggested_next
         FROM briefing_cards WHERE briefing_id = ?1 ORDER BY card_index ASC",
    )?;
    briefing.cards = stmt
        .query_map([briefing.id], row_to_card)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, briefing_id, kind, url, title FROM sources WHERE briefing_id = ?1 ORDER BY id ASC",
    )?;
    briefing.sources = stmt
        .query_map([briefing.id], row_to_source)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(())
}

/// Helper to convert a row to a Briefing (cards and sources left empty)
fn row_to_briefing(row: &rusqlite::Row) -> rusqlite::Result<Briefing> {
    let topics_json: String = row.get(3)?;
    let topics: Vec<String> = serde_json::from_str(&topics_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
    })?;

    Ok(Briefing {
        id: row.get(0)?,
        created_at: decode_timestamp(row, 1)?,
        title: row.get(2)?,
        topics,
        summary: row.get(4)?,
        model_used: row.get(5)?,
        research_time_ms: row.get(6)?,
        total_tokens: row.get(7)?,
        cards: Vec::new(),
        sources: Vec::new(),
    })
}

/// Helper to convert a row to a BriefingCard
fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<BriefingCard> {
    Ok(BriefingCard {
        id: row.get(0)?,
        briefing_id: row.get(1)?,
        card_index: row.get(2)?,
        title: row.get(3)?,
        topic: row.get(4)?,
        summary: row.get(5)?,
        detailed_content: row.get(6)?,
        relevance: row.get(7)?,
        suggested_next: row.get(8)?,
    })
}

/// Helper to convert a row to a Source
fn row_to_source(row: &rusqlite::Row) -> rusqlite::Result<Source> {
    let kind_str: String = row.get(2)?;
    let kind: SourceKind = kind_str.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
    })?;

    Ok(Source {
        id: row.get(0)?,
        briefing_id: row.get(1)?,
        kind,
        url: row.get(3)?,
        title: row.get(4)?,
    })
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Weighted occurrence count of an already lowercased needle
fn relevance(briefing: &Briefing, needle: &str) -> usize {
    let hits = |text: &str| text.to_lowercase().matches(needle).count();

    let topic_hits: usize = briefing.topics.iter().map(|t| hits(t.as_str())).sum();
    topic_hits * TOPIC_WEIGHT + hits(&briefing.title) * TITLE_WEIGHT + hits(&briefing.summary) * SUMMARY_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefing::{NewCard, NewSource};
    use crate::feedback::NewFeedback;

    fn sample(topics: &[&str], summary: &str, cards: usize) -> CreateBriefing {
        let mut data = CreateBriefing::new(topics.iter().map(|t| t.to_string()).collect(), summary)
            .with_title("Daily briefing")
            .with_source(NewSource::new(SourceKind::Web, "https://example.com/a"))
            .with_source(NewSource::new(SourceKind::Paper, "https://arxiv.org/abs/1234"));
        for i in 0..cards {
            data = data.with_card(NewCard::new(format!("Card {}", i), topics[0], format!("Insight {}", i)));
        }
        data
    }

    #[test]
    fn test_create_and_get_briefing() {
        let db = Database::open_in_memory().unwrap();

        let created = db.create_briefing(&sample(&["rust", "databases"], "SQLite news", 4)).unwrap();
        assert!(created.id > 0);
        assert_eq!(created.topics, vec!["rust", "databases"]);

        let fetched = db.get_briefing(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.cards.len(), 4);
        let indexes: Vec<i64> = fetched.cards.iter().map(|c| c.card_index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3]);
        assert_eq!(fetched.sources.len(), 2);
        assert_eq!(fetched.sources[1].kind, SourceKind::Paper);
    }

    #[test]
    fn test_create_without_cards() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_briefing(&sample(&["rust"], "quiet day", 0)).unwrap();
        assert!(created.cards.is_empty());
    }

    #[test]
    fn test_create_validation_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let err = db.create_briefing(&CreateBriefing::new(vec![], "summary")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = db.create_briefing(&CreateBriefing::new(vec!["rust".into()], "")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        assert_eq!(db.count_briefings().unwrap(), 0);
    }

    #[test]
    fn test_get_missing_briefing_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_briefing(42).unwrap().is_none());
    }

    #[test]
    fn test_get_briefings_by_date() {
        let db = Database::open_in_memory().unwrap();
        let old = db
            .create_briefing(&sample(&["rust"], "old", 1).with_created_at(Utc::now() - Duration::days(10)))
            .unwrap();
        let recent = db
            .create_briefing(&sample(&["rust"], "recent", 1).with_created_at(Utc::now() - Duration::days(2)))
            .unwrap();
        let today = db.create_briefing(&sample(&["rust"], "today", 1)).unwrap();

        let week: Vec<i64> = db.get_briefings_by_date(7).unwrap().iter().map(|b| b.id).collect();
        assert_eq!(week, vec![today.id, recent.id]);

        let month: Vec<i64> = db.get_briefings_by_date(30).unwrap().iter().map(|b| b.id).collect();
        assert_eq!(month, vec![today.id, recent.id, old.id]);

        assert!(db.get_briefings_by_date(0).unwrap().is_empty());
        assert!(db.get_briefings_by_date(-3).unwrap().is_empty());
        assert_eq!(db.get_briefings_by_date(i64::MAX).unwrap().len(), 3);
    }

    #[test]
    fn test_get_all_briefings_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let a = db
            .create_briefing(&sample(&["a"], "first", 0).with_created_at(Utc::now() - Duration::hours(5)))
            .unwrap();
        let b = db.create_briefing(&sample(&["b"], "second", 0)).unwrap();

        let ids: Vec<i64> = db.get_all_briefings().unwrap().iter().map(|x| x.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_search_empty_query_returns_nothing() {
        let db = Database::open_in_memory().unwrap();
        db.create_briefing(&sample(&["rust"], "anything", 1)).unwrap();
        assert!(db.search_briefings("").unwrap().is_empty());
        assert!(db.search_briefings("   ").unwrap().is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive_and_ranked() {
        let db = Database::open_in_memory().unwrap();
        let topic_hit = db
            .create_briefing(
                &sample(&["Quantum Computing"], "A quantum leap", 0)
                    .with_created_at(Utc::now() - Duration::days(3)),
            )
            .unwrap();
        let summary_hit = db
            .create_briefing(&sample(&["physics"], "Notes on QUANTUM sensors", 0))
            .unwrap();
        db.create_briefing(&sample(&["gardening"], "Tomatoes", 0)).unwrap();

        let ids: Vec<i64> = db.search_briefings("quantum").unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![topic_hit.id, summary_hit.id]);
    }

    #[test]
    fn test_search_equal_relevance_prefers_recent() {
        let db = Database::open_in_memory().unwrap();
        let older = db
            .create_briefing(&sample(&["ml"], "transformers", 0).with_created_at(Utc::now() - Duration::days(1)))
            .unwrap();
        let newer = db.create_briefing(&sample(&["ml"], "transformers", 0)).unwrap();

        let ids: Vec<i64> = db.search_briefings("Transformers").unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let db = Database::open_in_memory().unwrap();
        db.create_briefing(&sample(&["rust"], "plain text", 0)).unwrap();
        let hit = db.create_briefing(&sample(&["rust"], "grew 100% this year", 0)).unwrap();

        let results = db.search_briefings("%").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, hit.id);
        assert!(db.search_briefings("_").unwrap().is_empty());
    }

    #[test]
    fn test_search_non_ascii() {
        let db = Database::open_in_memory().unwrap();
        let hit = db.create_briefing(&sample(&["Über Design"], "notes", 0)).unwrap();
        let results = db.search_briefings("über").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, hit.id);
    }

    #[test]
    fn test_search_topics_with_json_escaped_characters() {
        let db = Database::open_in_memory().unwrap();
        let quoted = db.create_briefing(&sample(&["the \"rust\" book"], "reading list", 0)).unwrap();
        let slashed = db.create_briefing(&sample(&["C\\C++ interop"], "bindings", 0)).unwrap();
        let both = db
            .create_briefing(&sample(&["ffi", "c\\c++ toolchains"], "build notes", 0))
            .unwrap();

        let ids: Vec<i64> = db.search_briefings("\"rust\"").unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![quoted.id]);

        let mut ids: Vec<i64> = db.search_briefings("c\\c++").unwrap().iter().map(|b| b.id).collect();
        ids.sort();
        assert_eq!(ids, vec![slashed.id, both.id]);
    }

    #[test]
    fn test_create_briefings_batch() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .create_briefings(&[sample(&["a"], "one", 1), sample(&["b"], "two", 2)])
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[1].cards.len(), 2);
        assert_eq!(db.count_briefings().unwrap(), 2);

        let err = db
            .create_briefings(&[sample(&["c"], "three", 0), CreateBriefing::new(vec![], "no topics")])
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(db.count_briefings().unwrap(), 2);
    }

    #[test]
    fn test_cleanup_candidates_skip_bookmarked() {
        let db = Database::open_in_memory().unwrap();
        let old = Utc::now() - Duration::days(40);
        let kept = db.create_briefing(&sample(&["a"], "kept", 1).with_created_at(old)).unwrap();
        let dropped = db.create_briefing(&sample(&["b"], "dropped", 1).with_created_at(old)).unwrap();
        db.create_briefing(&sample(&["c"], "fresh", 1)).unwrap();
        db.add_bookmark(kept.id, 0).unwrap();

        let ids = db.cleanup_candidates_before(Utc::now() - Duration::days(30)).unwrap();
        assert_eq!(ids, vec![dropped.id]);
    }

    #[test]
    fn test_delete_briefing_cascades() {
        let db = Database::open_in_memory().unwrap();
        let briefing = db.create_briefing(&sample(&["rust"], "digest", 3)).unwrap();
        db.add_feedback(&NewFeedback::new(briefing.id, 4)).unwrap();
        db.add_feedback(&NewFeedback::new(briefing.id, -1).for_card(2)).unwrap();

        assert_eq!(db.delete_briefing(briefing.id).unwrap(), 1);
        assert!(db.get_briefing(briefing.id).unwrap().is_none());
        assert!(db.get_feedback_for_briefing(briefing.id).unwrap().is_empty());

        let stats = db.stats().unwrap();
        assert_eq!(stats.cards, 0);
        assert_eq!(stats.sources, 0);
        assert_eq!(stats.feedback, 0);

        assert_eq!(db.delete_briefing(briefing.id).unwrap(), 0);
    }

    #[test]
    fn test_counts() {
        let db = Database::open_in_memory().unwrap();
        db.create_briefing(&sample(&["a"], "one", 2)).unwrap();
        db.create_briefing(&sample(&["b"], "two", 3)).unwrap();
        assert_eq!(db.count_briefings().unwrap(), 2);
        assert_eq!(db.count_cards().unwrap(), 5);
    }

    #[test]
    fn test_malformed_row_is_storage_unavailable() {
        let db = Database::open_in_memory().unwrap();
        db.write(|conn| {
            conn.execute(
                "INSERT INTO briefings (created_at, topics, summary) VALUES ('yesterday-ish', '[]', 'x')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let err = db.get_all_briefings().unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable(_)), "got {:?}", err);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like(r"50%_a\b"), r"50\%\_a\\b");
    }
}
