//! SQLite storage implementation
//!
//! The live store is an in-memory SQLite connection. When a backing file is
//! configured, its image is restored at open time and written back in full
//! after every committed write.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::backup::Progress;
use rusqlite::types::Type;
use rusqlite::{Connection, DatabaseName, Row};
use tracing::{debug, info, warn};

use super::schema;
use crate::{Error, Result};

/// Handle to the embedded briefing store
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open a database file, creating it if it doesn't exist
    pub fn open(path: &Path) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        let existed = path.exists();

        if existed {
            conn.restore(DatabaseName::Main, path, None::<fn(Progress)>)
                .map_err(|e| {
                    Error::StorageUnavailable(format!("cannot read {}: {}", path.display(), e))
                })?;
            check_integrity(&conn, path)?;
        }

        let db = Self::from_connection(conn, Some(path.to_path_buf()))?;
        if existed {
            info!("Opened database at {}", path.display());
        } else {
            db.save()?;
            info!("Created database at {}", path.display());
        }
        Ok(db)
    }

    /// Open an ephemeral in-memory database (nothing is persisted)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        configure(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Backing file, `None` for an in-memory store
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Serialize the whole store image over the backing file
    pub fn save(&self) -> Result<()> {
        let conn = self.lock()?;
        self.persist(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::StorageUnavailable(format!("database lock poisoned: {}", e)))
    }

    /// Run read-only statements against the store
    pub(crate) fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run a mutation as one transaction, then persist.
    ///
    /// An error from `f` rolls the transaction back. A failed persist reloads
    /// the image from disk so the mutation is not observed as committed.
    pub(crate) fn write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&*tx)?;
        tx.commit()?;

        if let Err(err) = self.persist(&conn) {
            warn!("Persist failed, discarding in-memory changes: {}", err);
            if let Some(path) = &self.path {
                reload(&mut conn, path)?;
            }
            return Err(err);
        }
        Ok(value)
    }

    fn persist(&self, conn: &Connection) -> Result<()> {
        match &self.path {
            Some(path) => write_image(conn, path),
            None => Ok(()),
        }
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        self.read(|conn| {
            Ok(DbStats {
                briefings: count_rows(conn, "briefings")?,
                cards: count_rows(conn, "briefing_cards")?,
                sources: count_rows(conn, "sources")?,
                feedback: count_rows(conn, "feedback")?,
                patterns: count_rows(conn, "feedback_patterns")?,
                bookmarks: count_rows(conn, "bookmarks")?,
            })
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    initialize_schema(conn)
}

/// Replace the live image with the file's. A backing file that has gone
/// missing holds nothing, so the store restarts empty.
fn reload(conn: &mut Connection, path: &Path) -> Result<()> {
    if path.exists() {
        conn.restore(DatabaseName::Main, path, None::<fn(Progress)>)?;
    } else {
        warn!("{} is gone; resetting the store to empty", path.display());
        *conn = Connection::open_in_memory()?;
        configure(conn)?;
    }
    Ok(())
}

fn initialize_schema(conn: &Connection) -> Result<()> {
    for stmt in schema::all_schema_statements() {
        conn.execute(stmt, [])?;
    }
    Ok(())
}

fn check_integrity(conn: &Connection, path: &Path) -> Result<()> {
    let verdict: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(|e| Error::StorageUnavailable(format!("cannot verify {}: {}", path.display(), e)))?;
    if verdict != "ok" {
        return Err(Error::StorageUnavailable(format!(
            "{} failed integrity check: {}",
            path.display(),
            verdict
        )));
    }
    Ok(())
}

/// Back up to a sibling temp file, then rename it over the target
fn write_image(conn: &Connection, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = temp_path(path);
    if tmp.exists() {
        std::fs::remove_file(&tmp)?;
    }
    conn.backup(DatabaseName::Main, &tmp, None)?;
    std::fs::rename(&tmp, path)?;

    debug!("Saved database image to {}", path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "briefly.db".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Fixed-width RFC 3339 (millisecond, `Z`) so text order is time order
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Database statistics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DbStats {
    pub briefings: usize,
    pub cards: usize,
    pub sources: usize,
    pub feedback: usize,
    pub patterns: usize,
    pub bookmarks: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Briefings: {}", self.briefings)?;
        writeln!(f, "  Cards: {}", self.cards)?;
        writeln!(f, "  Sources: {}", self.sources)?;
        writeln!(f, "  Feedback: {}", self.feedback)?;
        writeln!(f, "  Patterns: {}", self.patterns)?;
        writeln!(f, "  Bookmarks: {}", self.bookmarks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn insert_raw_briefing(db: &Database) -> i64 {
        db.write(|conn| {
            conn.execute(
                "INSERT INTO briefings (created_at, topics, summary) VALUES (?1, '[\"rust\"]', 'digest')",
                [encode_timestamp(&Utc::now())],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .unwrap()
    }

    #[test]
    fn test_in_memory_schema() {
        let db = Database::open_in_memory().unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.briefings, 0);
        assert_eq!(stats.patterns, 0);
        assert!(db.path().is_none());
    }

    #[test]
    fn test_schema_reapply_is_noop() {
        let db = Database::open_in_memory().unwrap();
        insert_raw_briefing(&db);
        db.read(initialize_schema).unwrap();
        db.read(initialize_schema).unwrap();
        assert_eq!(db.stats().unwrap().briefings, 1);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("briefly.db");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        insert_raw_briefing(&db);
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.stats().unwrap().briefings, 1);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_corrupt_file_is_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.db");
        std::fs::write(&path, b"not an sqlite image ".repeat(256)).unwrap();

        let err = Database::open(&path).unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable(_)), "got {:?}", err);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.write(|conn| {
            conn.execute(
                "INSERT INTO briefings (created_at, topics, summary) VALUES ('2026-01-01T00:00:00.000Z', '[]', 'x')",
                [],
            )?;
            Err(Error::Validation("abort".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(db.stats().unwrap().briefings, 0);
    }

    fn block_temp_file(path: &Path) {
        let tmp = temp_path(path);
        std::fs::create_dir_all(&tmp).unwrap();
        std::fs::write(tmp.join("occupied"), b"x").unwrap();
    }

    #[test]
    fn test_persist_failure_discards_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.db");
        let db = Database::open(&path).unwrap();
        insert_raw_briefing(&db);

        block_temp_file(&path);
        let result: Result<()> = db.write(|conn| {
            conn.execute(
                "INSERT INTO briefings (created_at, topics, summary) VALUES ('2026-01-01T00:00:00.000Z', '[]', 'lost')",
                [],
            )?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(db.stats().unwrap().briefings, 1);
        drop(db);
        std::fs::remove_dir_all(temp_path(&path)).unwrap();
        assert_eq!(Database::open(&path).unwrap().stats().unwrap().briefings, 1);
    }

    #[test]
    fn test_persist_failure_with_missing_file_resets_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.db");
        let db = Database::open(&path).unwrap();
        insert_raw_briefing(&db);

        std::fs::remove_file(&path).unwrap();
        block_temp_file(&path);
        let result: Result<()> = db.write(|conn| {
            conn.execute("DELETE FROM briefings", [])?;
            Ok(())
        });

        assert!(result.is_err());
        let stats = db.stats().unwrap();
        assert_eq!(stats.briefings, 0);
        assert_eq!(stats.patterns, 0);
    }

    #[test]
    fn test_timestamp_encoding_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::milliseconds(7);
        assert_eq!(encode_timestamp(&a), "2026-01-02T03:04:05.000Z");
        assert!(encode_timestamp(&a) < encode_timestamp(&b));
    }
}
