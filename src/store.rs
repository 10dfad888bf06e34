use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::SqliteStore;
use crate::error::StoreError;
use crate::record::RecallRecord;
use crate::settings::{Settings, StoreBackend};

/// Persisted snapshot of the latest aggregation run.
///
/// `save` replaces the whole snapshot atomically. `load` and `last_updated`
/// return empty / `None` when nothing has been saved yet, and an error only
/// when existing state cannot be read.
pub trait RecordStore: Send + Sync {
    fn save(&self, records: &[RecallRecord], at: DateTime<Utc>) -> Result<(), StoreError>;
    fn load(&self) -> Result<Vec<RecallRecord>, StoreError>;
    fn last_updated(&self) -> Result<Option<DateTime<Utc>>, StoreError>;
    /// Where the snapshot lives, for status output.
    fn location(&self) -> String;
}

pub fn open_store(settings: &Settings) -> Result<Arc<dyn RecordStore>, StoreError> {
    let store: Arc<dyn RecordStore> = match settings.store_backend {
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&settings.store_path)?),
        StoreBackend::Json => Arc::new(JsonFileStore::new(&settings.store_path)),
    };
    Ok(store)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotOut<'a> {
    recalls: &'a [RecallRecord],
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotIn {
    #[serde(default)]
    recalls: Vec<RecallRecord>,
    last_updated: Option<DateTime<Utc>>,
}

/// `{ "recalls": [...], "lastUpdated": "..." }` in one JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonFileStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read(&self) -> Result<Option<SnapshotIn>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }
}

impl RecordStore for JsonFileStore {
    /// Each save writes its own temp file next to the target and renames it
    /// into place, so concurrent saves never interleave bytes.
    fn save(&self, records: &[RecallRecord], at: DateTime<Utc>) -> Result<(), StoreError> {
        let dir = match self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                dir
            }
            None => Path::new("."),
        };
        let body = serde_json::to_vec_pretty(&SnapshotOut {
            recalls: records,
            last_updated: at,
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&body)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), records = records.len(), "Saved snapshot");
        Ok(())
    }

    fn load(&self) -> Result<Vec<RecallRecord>, StoreError> {
        Ok(self.read()?.map(|s| s.recalls).unwrap_or_default())
    }

    fn last_updated(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.read()?.and_then(|s| s.last_updated))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
