//! Process-wide database handle

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::storage::Database;
use crate::{Error, Result};

static HANDLE: Mutex<Option<Arc<Database>>> = Mutex::new(None);

fn slot() -> Result<MutexGuard<'static, Option<Arc<Database>>>> {
    HANDLE
        .lock()
        .map_err(|e| Error::StorageUnavailable(format!("database handle lock poisoned: {}", e)))
}

/// Open (or create) the store and install it as the process-wide handle.
///
/// With no path an ephemeral in-memory store is used. Calling again before
/// [`close_database`] returns the handle that is already open.
pub fn init_database(path: Option<&Path>) -> Result<Arc<Database>> {
    let mut slot = slot()?;

    if let Some(db) = slot.as_ref() {
        if db.path() != path {
            warn!(
                "Database already open at {:?}; ignoring request for {:?}",
                db.path(),
                path
            );
        }
        return Ok(Arc::clone(db));
    }

    let db = match path {
        Some(path) => Database::open(path)?,
        None => Database::open_in_memory()?,
    };
    let db = Arc::new(db);
    *slot = Some(Arc::clone(&db));

    info!("Database handle initialized");
    Ok(db)
}

/// The live handle; `NotInitialized` before init or after close
pub fn get_database() -> Result<Arc<Database>> {
    slot()?.as_ref().map(Arc::clone).ok_or(Error::NotInitialized)
}

/// Write the full store image to its backing file
pub fn save_database() -> Result<()> {
    get_database()?.save()
}

/// Release the handle. Returns whether one was open.
pub fn close_database() -> bool {
    let closed = match HANDLE.lock() {
        Ok(mut slot) => slot.take().is_some(),
        Err(poisoned) => poisoned.into_inner().take().is_some(),
    };
    if closed {
        debug!("Database handle closed");
    }
    closed
}

/// Serializes tests that touch the process-wide handle
#[cfg(test)]
pub(crate) static TEST_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefing::CreateBriefing;

    fn guard() -> MutexGuard<'static, ()> {
        TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_get_before_init_fails() {
        let _guard = guard();
        close_database();

        assert!(matches!(get_database(), Err(Error::NotInitialized)));
        assert!(matches!(save_database(), Err(Error::NotInitialized)));
        assert!(!close_database());
    }

    #[test]
    fn test_init_is_idempotent() {
        let _guard = guard();
        close_database();

        let first = init_database(None).unwrap();
        let second = init_database(None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &get_database().unwrap()));

        assert!(close_database());
        assert!(matches!(get_database(), Err(Error::NotInitialized)));
    }

    #[test]
    fn test_data_survives_close_and_reinit() {
        let _guard = guard();
        close_database();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("briefly.db");

        let db = init_database(Some(path.as_path())).unwrap();
        let created = db
            .create_briefing(&CreateBriefing::new(vec!["rust".to_string()], "persisted"))
            .unwrap();
        save_database().unwrap();
        drop(db);
        assert!(close_database());

        let db = init_database(Some(path.as_path())).unwrap();
        let loaded = db.get_briefing(created.id).unwrap().unwrap();
        assert_eq!(loaded.summary, "persisted");
        close_database();
    }

    #[test]
    fn test_corrupt_file_fails_init() {
        let _guard = guard();
        close_database();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.db");
        std::fs::write(&path, vec![0xAB; 4096]).unwrap();

        let err = init_database(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable(_)), "got {:?}", err);
        assert!(matches!(get_database(), Err(Error::NotInitialized)));
    }
}
