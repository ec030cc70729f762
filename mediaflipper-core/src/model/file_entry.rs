use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::store::{keys, Store, StoreExt};

/// What produced a `FileEntry`: thumbnail extraction, transcode, or the
/// original source media. Referenced only by id from steps/containers
/// (spec §3 Ownership).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEntryType {
    Thumbnail,
    Transcode,
    SourceMedia,
}

/// A produced output file, owned by the container that produced it.
/// Grounded in the original `models2.FileEntry`/`NewFileEntry` used by
/// `webapp/transcode/receivedata.go` to record a worker's output path
/// before linking it onto the job step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: Uuid,
    #[serde(rename = "containerId")]
    pub container_id: Uuid,
    #[serde(rename = "entryType")]
    pub entry_type: FileEntryType,
    #[serde(rename = "storagePath")]
    pub storage_path: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl FileEntry {
    pub fn new(storage_path: impl Into<String>, container_id: Uuid, entry_type: FileEntryType) -> Self {
        Self {
            id: Uuid::new_v4(),
            container_id,
            entry_type,
            storage_path: storage_path.into(),
            created_at: Utc::now(),
        }
    }

    pub async fn store(&self, store: &dyn Store) -> Result<()> {
        store.set_json(&keys::file_entry(self.id), self, None).await
    }
}
