//! Transcript persistence behind a minimal store interface.

use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::config::ConfigManager;
use crate::error::{TranscriptError, TranscriptResult};
use crate::models::TranscriptRecord;

/// Append-only store of saved transcripts
///
/// The session core only produces `TranscriptRecord`s; engines plug in
/// behind this trait.
pub trait TranscriptStore: Send + Sync {
    /// Stores a record and returns its id
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage fails.
    fn save(&self, record: TranscriptRecord) -> TranscriptResult<Uuid>;

    /// Returns every record, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage fails.
    fn list(&self) -> TranscriptResult<Vec<TranscriptRecord>>;

    /// Removes one record
    ///
    /// # Errors
    ///
    /// Returns `TranscriptError::NotFound` if no record has this id.
    fn delete(&self, id: Uuid) -> TranscriptResult<()>;

    /// Returns one record
    ///
    /// # Errors
    ///
    /// Returns `TranscriptError::NotFound` if no record has this id.
    fn get(&self, id: Uuid) -> TranscriptResult<TranscriptRecord> {
        self.list()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| TranscriptError::NotFound(id.to_string()))
    }
}

/// Orders stored records newest first
///
/// Records are kept in insertion order, so among equal timestamps the later
/// insertion comes first.
fn newest_first(mut records: Vec<TranscriptRecord>) -> Vec<TranscriptRecord> {
    records.reverse();
    records.sort_by(|a, b| b.timestamp_millis.cmp(&a.timestamp_millis));
    records
}

fn remove_by_id(records: &mut Vec<TranscriptRecord>, id: Uuid) -> TranscriptResult<()> {
    let before = records.len();
    records.retain(|r| r.id != id);
    if records.len() == before {
        return Err(TranscriptError::NotFound(id.to_string()));
    }
    Ok(())
}

/// Store kept in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct InMemoryTranscriptStore {
    records: Mutex<Vec<TranscriptRecord>>,
}

impl InMemoryTranscriptStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Vec<TranscriptRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TranscriptStore for InMemoryTranscriptStore {
    fn save(&self, record: TranscriptRecord) -> TranscriptResult<Uuid> {
        let id = record.id;
        self.records().push(record);
        Ok(id)
    }

    fn list(&self) -> TranscriptResult<Vec<TranscriptRecord>> {
        Ok(newest_first(self.records().clone()))
    }

    fn delete(&self, id: Uuid) -> TranscriptResult<()> {
        remove_by_id(&mut self.records(), id)
    }
}

/// Store persisted in `transcripts.toml` through a `ConfigManager`
#[derive(Debug)]
pub struct FileTranscriptStore {
    manager: ConfigManager,
    // Serializes read-modify-write cycles on the file
    write_lock: Mutex<()>,
}

impl FileTranscriptStore {
    /// Creates a store in the manager's configuration directory
    #[must_use]
    pub const fn new(manager: ConfigManager) -> Self {
        Self {
            manager,
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TranscriptStore for FileTranscriptStore {
    fn save(&self, record: TranscriptRecord) -> TranscriptResult<Uuid> {
        let _guard = self.lock();
        let id = record.id;
        let mut records = self.manager.load_transcripts()?;
        records.push(record);
        self.manager.save_transcripts(&records)?;
        tracing::debug!(transcript_id = %id, "Transcript saved");
        Ok(id)
    }

    fn list(&self) -> TranscriptResult<Vec<TranscriptRecord>> {
        let _guard = self.lock();
        Ok(newest_first(self.manager.load_transcripts()?))
    }

    fn delete(&self, id: Uuid) -> TranscriptResult<()> {
        let _guard = self.lock();
        let mut records = self.manager.load_transcripts()?;
        remove_by_id(&mut records, id)?;
        self.manager.save_transcripts(&records)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &dyn TranscriptStore) {
        let old = TranscriptRecord::with_timestamp("a.example", 1_000, "old");
        let new = TranscriptRecord::with_timestamp("b.example", 2_000, "new");
        let old_id = store.save(old).unwrap();
        let new_id = store.save(new).unwrap();

        let listed: Vec<Uuid> = store.list().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(listed, vec![new_id, old_id]);
        assert_eq!(store.get(old_id).unwrap().text, "old");

        store.delete(new_id).unwrap();
        assert!(matches!(
            store.delete(new_id),
            Err(TranscriptError::NotFound(_))
        ));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_in_memory_store() {
        exercise(&InMemoryTranscriptStore::new());
    }

    #[test]
    fn test_file_store() {
        let temp = TempDir::new().unwrap();
        let store = FileTranscriptStore::new(ConfigManager::with_config_dir(temp.path()));
        exercise(&store);

        // survives a new store over the same directory
        let reopened = FileTranscriptStore::new(ConfigManager::with_config_dir(temp.path()));
        assert_eq!(reopened.list().unwrap().len(), 1);
    }

    #[test]
    fn test_equal_timestamps_latest_insert_first() {
        let store = InMemoryTranscriptStore::new();
        let first = store
            .save(TranscriptRecord::with_timestamp("h", 5, "first"))
            .unwrap();
        let second = store
            .save(TranscriptRecord::with_timestamp("h", 5, "second"))
            .unwrap();
        let listed: Vec<Uuid> = store.list().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(listed, vec![second, first]);
    }
}
