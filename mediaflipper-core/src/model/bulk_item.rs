use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::store::{keys, Store, StoreExt};

use super::status::{BulkItemState, MediaType};

/// A single input file tracked by a `BulkList` (spec §3). Always appears in
/// exactly the state-index matching `state`, once in the global priority
/// index, and once (as `sourcePath|id`) in the filepath index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItem {
    pub id: Uuid,
    #[serde(rename = "bulkListId")]
    pub bulk_list_id: Uuid,
    #[serde(rename = "sourcePath")]
    pub source_path: String,
    pub priority: i32,
    pub state: BulkItemState,
    #[serde(rename = "type")]
    pub item_type: MediaType,
}

impl BulkItem {
    /// Builds a new item for `source_path`. `priority_override > 0` pins
    /// the priority; otherwise it is derived deterministically from the
    /// path (spec §3/§9, exact formula pinned by tests).
    pub fn new(bulk_list_id: Uuid, source_path: impl Into<String>, priority_override: i32) -> Self {
        let source_path = source_path.into();
        let priority = if priority_override > 0 {
            priority_override
        } else {
            priority_from_path(&source_path)
        };
        let item_type = media_type_from_path(&source_path);
        Self {
            id: Uuid::new_v4(),
            bulk_list_id,
            source_path,
            priority,
            state: BulkItemState::NotQueued,
            item_type,
        }
    }

    /// Key stored in the filepath index: `sourcePath|id`.
    pub fn filepath_index_entry(&self) -> String {
        format!("{}|{}", self.source_path, self.id)
    }

    pub async fn load(store: &dyn Store, id: Uuid) -> Result<Self> {
        store
            .get_json(&keys::bulk_item(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("bulk item {id}")))
    }

    pub async fn save(&self, store: &dyn Store) -> Result<()> {
        store.set_json(&keys::bulk_item(self.id), self, None).await
    }
}

/// Big-endian i32 built from the first four bytes of `path`, zero-padded
/// on the right when shorter than 4 bytes. Not semantic — purely a cheap,
/// stable per-path ordering key (spec §9).
pub fn priority_from_path(path: &str) -> i32 {
    let bytes = path.as_bytes();
    let mut buf = [0u8; 4];
    let take = bytes.len().min(4);
    buf[..take].copy_from_slice(&bytes[..take]);
    i32::from_be_bytes(buf)
}

/// MIME-derived media type, augmented with the two container extensions
/// the standard MIME database doesn't know about (spec §3).
pub fn media_type_from_path(path: &str) -> MediaType {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".mxf") || lower.ends_with(".mts") {
        return MediaType::Video;
    }
    match mime_guess::from_path(path).first() {
        Some(mime) => {
            let top_level = mime.type_();
            if top_level == mime_guess::mime::VIDEO {
                MediaType::Video
            } else if top_level == mime_guess::mime::AUDIO {
                MediaType::Audio
            } else if top_level == mime_guess::mime::IMAGE {
                MediaType::Image
            } else {
                MediaType::Other
            }
        }
        None => MediaType::Other,
    }
}
