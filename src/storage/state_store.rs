use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::fs::File;
use tracing::{debug, warn};

use crate::fs::operations::{read_if_exists, write_atomically};

use super::entities::{PersistedState, StateKey, StateRecord, LEGACY_ENABLED_KEY};

pub const STATE_FILE: &str = "state.json";
pub const LOCK_FILE: &str = "state.lock";

/// Durable key/value storage shared by both surfaces.
///
/// A write made through one handle is visible to the next read through any other handle. There is
/// no isolation beyond that: two read-modify-write sequences from different surfaces may
/// interleave, and the later write wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Returns the stored values for `keys`. Keys that were never written are absent from the
    /// result.
    async fn get(&self, keys: &[StateKey]) -> Result<StateRecord>;

    /// Merges `record` into the stored state. Either every given key is written or none is.
    async fn set(&self, record: StateRecord) -> Result<()>;
}

impl PersistedState {
    /// Reads the full state from `store`.
    pub async fn load(store: &impl StateStore) -> Result<Self> {
        let record = store.get(&StateKey::ALL).await?;
        Ok(PersistedState::from_record(record)?)
    }

    /// Same as [PersistedState::load], but an unavailable or unreadable store yields the default
    /// state (blocking enabled) instead of an error.
    pub async fn load_or_default(store: &impl StateStore) -> Self {
        match Self::load(store).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Couldn't read state, falling back to defaults: {e:?}");
                PersistedState::default()
            }
        }
    }
}

/// The main realization of [StateStore]. Keeps the record as a JSON object in a single file.
///
/// Writers hold an exclusive lock on a sidecar lock file while they read, merge and replace the
/// record. The record itself is always replaced through a rename, which is why the lock can't live
/// on the record file.
pub struct FileStateStore {
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            state_path: dir.join(STATE_FILE),
            lock_path: dir.join(LOCK_FILE),
        })
    }

    async fn open_lock(&self) -> Result<File, std::io::Error> {
        File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(&self.lock_path)
            .await
    }

    async fn read_record(&self) -> Result<StateRecord> {
        let Some(contents) = read_if_exists(&self.state_path).await? else {
            return Ok(StateRecord::new());
        };
        if contents.trim().is_empty() {
            return Ok(StateRecord::new());
        }
        let mut record: StateRecord = serde_json::from_str(&contents)?;
        migrate_legacy_keys(&mut record);
        Ok(record)
    }

    async fn merge_and_write(&self, record: StateRecord) -> Result<()> {
        let mut current = match self.read_record().await {
            Ok(v) => v,
            Err(e) => {
                // Keeping a corrupted record would make every later write fail as well.
                warn!(
                    "Stored state in {:?} is unreadable, starting over: {e}",
                    self.state_path
                );
                StateRecord::new()
            }
        };
        current.extend(record);
        let serialized = serde_json::to_vec_pretty(&current)?;
        write_atomically(&self.state_path, &serialized).await?;
        Ok(())
    }
}

/// Older versions stored the enabled flag under a different key.
fn migrate_legacy_keys(record: &mut StateRecord) {
    if let Some(legacy) = record.remove(LEGACY_ENABLED_KEY) {
        record
            .entry(StateKey::Enabled.as_str())
            .or_insert(legacy);
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, keys: &[StateKey]) -> Result<StateRecord> {
        let lock = self.open_lock().await?;
        lock.lock_shared()?;
        let result = self.read_record().await;
        lock.unlock_async().await?;

        let mut record = result?;
        record.retain(|key, _| keys.iter().any(|k| k.as_str() == key));
        debug!("Read {} of {} requested keys", record.len(), keys.len());
        Ok(record)
    }

    async fn set(&self, record: StateRecord) -> Result<()> {
        // Semi-safe acquire-release for the record
        let lock = self.open_lock().await?;
        lock.lock_exclusive()?;
        let result = self.merge_and_write(record).await;
        lock.unlock_async().await?;
        result
    }
}
