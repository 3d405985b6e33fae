//! Card bookmarks. A bookmarked card keeps its briefing out of cleanup.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::info;

use super::sqlite::{Database, decode_timestamp, encode_timestamp};
use crate::{Error, Result};

/// A saved card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bookmark {
    pub id: i64,
    pub briefing_id: i64,
    pub card_index: i64,
    pub created_at: DateTime<Utc>,
}

impl Database {
    /// Bookmark a card. Bookmarking an already bookmarked card is a no-op.
    pub fn add_bookmark(&self, briefing_id: i64, card_index: i64) -> Result<()> {
        self.write(|conn| insert_bookmark(conn, briefing_id, card_index))?;
        info!("Bookmarked card {} of briefing {}", card_index, briefing_id);
        Ok(())
    }

    /// Returns true when a bookmark was removed
    pub fn remove_bookmark(&self, briefing_id: i64, card_index: i64) -> Result<bool> {
        let removed = self.write(|conn| delete_bookmark(conn, briefing_id, card_index))?;
        if removed {
            info!("Removed bookmark on card {} of briefing {}", card_index, briefing_id);
        }
        Ok(removed)
    }

    pub fn is_bookmarked(&self, briefing_id: i64, card_index: i64) -> Result<bool> {
        self.read(|conn| bookmark_exists(conn, briefing_id, card_index))
    }

    /// Flip the bookmark on a card. Returns true if it is now bookmarked.
    pub fn toggle_bookmark(&self, briefing_id: i64, card_index: i64) -> Result<bool> {
        let added = self.write(|conn| {
            if bookmark_exists(conn, briefing_id, card_index)? {
                delete_bookmark(conn, briefing_id, card_index)?;
                Ok(false)
            } else {
                insert_bookmark(conn, briefing_id, card_index)?;
                Ok(true)
            }
        })?;
        info!(
            "{} card {} of briefing {}",
            if added { "Bookmarked" } else { "Unbookmarked" },
            card_index,
            briefing_id
        );
        Ok(added)
    }

    /// Every bookmark, newest first
    pub fn get_all_bookmarks(&self) -> Result<Vec<Bookmark>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, briefing_id, card_index, created_at FROM bookmarks
                 ORDER BY created_at DESC, id DESC",
            )?;
            let bookmarks = stmt
                .query_map([], |row| {
                    Ok(Bookmark {
                        id: row.get(0)?,
                        briefing_id: row.get(1)?,
                        card_index: row.get(2)?,
                        created_at: decode_timestamp(row, 3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(bookmarks)
        })
    }
}

fn insert_bookmark(conn: &Connection, briefing_id: i64, card_index: i64) -> Result<()> {
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

    conn.execute(
        "INSERT OR IGNORE INTO bookmarks (briefing_id, card_index, created_at) VALUES (?1, ?2, ?3)",
        params![briefing_id, card_index, encode_timestamp(&Utc::now())],
    )?;
    Ok(())
}

fn delete_bookmark(conn: &Connection, briefing_id: i64, card_index: i64) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM bookmarks WHERE briefing_id = ?1 AND card_index = ?2",
        [briefing_id, card_index],
    )?;
    Ok(removed > 0)
}

fn bookmark_exists(conn: &Connection, briefing_id: i64, card_index: i64) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM bookmarks WHERE briefing_id = ?1 AND card_index = ?2)",
        [briefing_id, card_index],
        |row| row.get(0),
    )?;
    Ok(exists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefing::{CreateBriefing, NewCard};

    fn briefing(db: &Database) -> i64 {
        let data = CreateBriefing::new(vec!["rust".to_string()], "digest")
            .with_card(NewCard::new("One", "rust", "first"))
            .with_card(NewCard::new("Two", "rust", "second"));
        db.create_briefing(&data).unwrap().id
    }

    #[test]
    fn test_add_bookmark_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let id = briefing(&db);

        db.add_bookmark(id, 0).unwrap();
        db.add_bookmark(id, 0).unwrap();
        assert!(db.is_bookmarked(id, 0).unwrap());
        assert!(!db.is_bookmarked(id, 1).unwrap());
        assert_eq!(db.get_all_bookmarks().unwrap().len(), 1);
    }

    #[test]
    fn test_bookmark_missing_card() {
        let db = Database::open_in_memory().unwrap();
        let id = briefing(&db);

        let err = db.add_bookmark(id, 5).unwrap_err();
        assert!(matches!(err, Error::ForeignKeyViolation(_)));
        let err = db.toggle_bookmark(id + 1, 0).unwrap_err();
        assert!(matches!(err, Error::ForeignKeyViolation(_)));
        assert!(db.get_all_bookmarks().unwrap().is_empty());
    }

    #[test]
    fn test_toggle_and_remove() {
        let db = Database::open_in_memory().unwrap();
        let id = briefing(&db);

        assert!(db.toggle_bookmark(id, 1).unwrap());
        assert!(db.is_bookmarked(id, 1).unwrap());
        assert!(!db.toggle_bookmark(id, 1).unwrap());
        assert!(!db.is_bookmarked(id, 1).unwrap());

        db.add_bookmark(id, 0).unwrap();
        assert!(db.remove_bookmark(id, 0).unwrap());
        assert!(!db.remove_bookmark(id, 0).unwrap());
    }

    #[test]
    fn test_bookmarks_newest_first_and_cascade() {
        let db = Database::open_in_memory().unwrap();
        let id = briefing(&db);
        db.add_bookmark(id, 0).unwrap();
        db.add_bookmark(id, 1).unwrap();

        let cards: Vec<i64> = db.get_all_bookmarks().unwrap().iter().map(|b| b.card_index).collect();
        assert_eq!(cards, vec![1, 0]);

        db.delete_briefing(id).unwrap();
        assert!(db.get_all_bookmarks().unwrap().is_empty());
    }
}
