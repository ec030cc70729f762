use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::store::{keys, Store, StoreExt};

/// A named batch of `BulkItem`s submitted together (spec §3). The list
/// itself only tracks identity and creation time; membership and per-state
/// counts live in the index keys maintained by `bulklist::Indexer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkList {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl BulkList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    /// Persists the list record and registers it in the global bulk-list
    /// registry so `all` can enumerate it (spec §4/§6 `POST /api/bulk`).
    pub async fn create(store: &dyn Store, name: impl Into<String>) -> Result<Self> {
        let list = Self::new(name);
        store.set_json(&keys::bulk_list_record(list.id), &list, None).await?;
        store.sadd(&keys::bulk_list_registry(), &list.id.to_string()).await?;
        Ok(list)
    }

    pub async fn get(store: &dyn Store, id: Uuid) -> Result<Self> {
        store
            .get_json(&keys::bulk_list_record(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("bulk list {id}")))
    }

    /// Enumerates every bulk list ever created (spec §6 `GET /api/bulk/list`).
    pub async fn all(store: &dyn Store) -> Result<Vec<Self>> {
        let ids = store.smembers(&keys::bulk_list_registry()).await?;
        let mut lists = Vec::with_capacity(ids.len());
        for id in ids {
            let Ok(uuid) = id.parse::<Uuid>() else { continue };
            if let Some(list) = store.get_json(&keys::bulk_list_record(uuid)).await? {
                lists.push(list);
            }
        }
        lists.sort_by_key(|l: &BulkList| l.created_at);
        Ok(lists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FakeStore;

    #[actix_rt::test]
    async fn create_persists_and_registers_the_list() {
        let store = FakeStore::new();
        let list = BulkList::create(&store, "batch-1").await.unwrap();
        let fetched = BulkList::get(&store, list.id).await.unwrap();
        assert_eq!(fetched.id, list.id);
        assert_eq!(fetched.name, "batch-1");
    }

    #[actix_rt::test]
    async fn all_returns_every_created_list_oldest_first() {
        let store = FakeStore::new();
        let first = BulkList::create(&store, "first").await.unwrap();
        let second = BulkList::create(&store, "second").await.unwrap();
        let all = BulkList::all(&store).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].id, second.id);
    }

    #[actix_rt::test]
    async fn get_unknown_id_returns_not_found() {
        let store = FakeStore::new();
        let err = BulkList::get(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
