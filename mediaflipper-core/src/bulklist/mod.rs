//! BulkList Indexer (spec §4.2): maintains the priority index, the
//! per-state indices, and the filepath index for a bulk list's items, and
//! is the only component allowed to move an item between state indices.
use std::collections::HashMap;

use glob::Pattern;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::model::{BulkItem, BulkItemState};
use crate::store::{keys, Store, StoreExt};

/// Writes `item`'s record and (re)indexes it: global priority index,
/// state index, filepath index. If a prior version of the item exists in
/// a different state, its stale state-index entry is removed first so an
/// item never appears in two state buckets at once (spec §4.2 AddRecord).
/// Calling this twice with an unchanged item is a no-op on index
/// cardinality, since ZADD/SADD on an unchanged member/score are idempotent.
///
/// Every write — the old-state ZREM, both ZADDs, the filepath SADD, and
/// the record SET — goes through one `Store::pipeline()` batch (spec
/// §4.1, §9), so a failure partway through can't leave, say, the priority
/// index updated while the state index still names the item's old state
/// (spec §8's "membership in `state:<S>` matches its `state` field
/// exactly").
pub async fn add_record(store: &dyn Store, item: &BulkItem) -> Result<()> {
    let mut pipeline = store.pipeline();

    if let Ok(previous) = BulkItem::load(store, item.id).await {
        if previous.state != item.state {
            pipeline = pipeline.zrem(&keys::bulk_list_state(item.bulk_list_id, previous.state.index()), &item.id.to_string());
        }
    }

    pipeline = pipeline
        .zadd(&keys::bulk_list_index(item.bulk_list_id), item.priority as f64, &item.id.to_string())
        .zadd(&keys::bulk_list_state(item.bulk_list_id, item.state.index()), item.priority as f64, &item.id.to_string())
        .sadd(&keys::bulk_list_filepath_index(item.bulk_list_id), &item.filepath_index_entry())
        .set_json(&keys::bulk_item(item.id), item)?;

    pipeline.execute(store).await
}

/// Items currently in `state`, ordered by ascending priority (spec §4.2
/// FilterRecordsByState).
pub async fn filter_records_by_state(
    store: &dyn Store,
    bulk_list_id: Uuid,
    state: BulkItemState,
) -> Result<Vec<BulkItem>> {
    let ids = store
        .zrange_by_score(&keys::bulk_list_state(bulk_list_id, state.index()), f64::MIN, f64::MAX)
        .await?;
    load_all(store, &ids).await
}

/// Items whose `sourcePath` glob-matches `pattern`, ordered by ascending
/// priority. Scans the filepath index (`sourcePath|id` entries) rather
/// than the priority index directly, then sorts the matches by priority
/// (spec §4.2 FilterRecordsByName).
pub async fn filter_records_by_name(
    store: &dyn Store,
    bulk_list_id: Uuid,
    pattern: &str,
) -> Result<Vec<BulkItem>> {
    let glob = Pattern::new(pattern).map_err(|e| AppError::BadRequest(format!("invalid glob pattern: {e}")))?;
    let entries = store.smembers(&keys::bulk_list_filepath_index(bulk_list_id)).await?;

    let mut ids = Vec::new();
    for entry in entries {
        let Some((path, id)) = entry.split_once('|') else { continue };
        if glob.matches(path) {
            ids.push(id.to_string());
        }
    }

    let mut items = load_all(store, &ids).await?;
    items.sort_by_key(|item| item.priority);
    Ok(items)
}

/// Every item in the bulk list's global priority index, ascending by
/// priority (spec §4.2 GetAllRecords).
pub async fn get_all_records(store: &dyn Store, bulk_list_id: Uuid) -> Result<Vec<BulkItem>> {
    let ids = store.zrange_by_score(&keys::bulk_list_index(bulk_list_id), f64::MIN, f64::MAX).await?;
    load_all(store, &ids).await
}

/// Cardinality of each state index for the bulk list (spec §4.2
/// CountForAllStates).
pub async fn count_for_all_states(
    store: &dyn Store,
    bulk_list_id: Uuid,
) -> Result<HashMap<BulkItemState, usize>> {
    let mut counts = HashMap::with_capacity(BulkItemState::ALL.len());
    for state in BulkItemState::ALL {
        let count = store.zcard(&keys::bulk_list_state(bulk_list_id, state.index())).await?;
        counts.insert(state, count);
    }
    Ok(counts)
}

/// Atomically moves up to `limit` of the lowest-priority items from
/// `from` to `to`, persisting each moved item's new state, and returns the
/// moved items in the order they were claimed (spec §4.2 DequeueForQueue —
/// the Dispatcher's sole admission hook).
pub async fn dequeue_for_queue(
    store: &dyn Store,
    bulk_list_id: Uuid,
    from: BulkItemState,
    to: BulkItemState,
    limit: usize,
) -> Result<Vec<BulkItem>> {
    let moved = store
        .zmove_lowest(&keys::bulk_list_state(bulk_list_id, from.index()), &keys::bulk_list_state(bulk_list_id, to.index()), limit)
        .await?;

    let mut items = Vec::with_capacity(moved.len());
    for (id, _score) in moved {
        let Ok(uuid) = id.parse::<Uuid>() else { continue };
        let mut item = BulkItem::load(store, uuid).await?;
        item.state = to;
        item.save(store).await?;
        items.push(item);
    }
    Ok(items)
}

async fn load_all(store: &dyn Store, ids: &[String]) -> Result<Vec<BulkItem>> {
    let mut items = Vec::with_capacity(ids.len());
    for id in ids {
        let Ok(uuid) = id.parse::<Uuid>() else { continue };
        items.push(BulkItem::load(store, uuid).await?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FakeStore;

    async fn seeded_fixture(store: &FakeStore, bulk_list_id: Uuid) -> Vec<BulkItem> {
        let mut items = vec![
            BulkItem::new(bulk_list_id, "path/to/file1", 1),
            BulkItem::new(bulk_list_id, "path/to/file2", 2),
            BulkItem::new(bulk_list_id, "path/to/file3", 3),
            BulkItem::new(bulk_list_id, "other/file4", 4),
        ];
        items[0].state = BulkItemState::Pending;
        items[1].state = BulkItemState::Active;
        items[2].state = BulkItemState::Completed;
        items[3].state = BulkItemState::Active;
        for item in &items {
            add_record(store, item).await.unwrap();
        }
        items
    }

    #[actix_rt::test]
    async fn filter_records_by_name_matches_glob_against_source_path_in_priority_order() {
        let store = FakeStore::new();
        let bulk_list_id = Uuid::new_v4();
        seeded_fixture(&store, bulk_list_id).await;

        let matched = filter_records_by_name(&store, bulk_list_id, "path/to*").await.unwrap();
        let paths: Vec<_> = matched.iter().map(|i| i.source_path.clone()).collect();
        assert_eq!(paths, vec!["path/to/file1", "path/to/file2", "path/to/file3"]);
    }

    #[actix_rt::test]
    async fn count_for_all_states_matches_fixture() {
        let store = FakeStore::new();
        let bulk_list_id = Uuid::new_v4();
        seeded_fixture(&store, bulk_list_id).await;

        let counts = count_for_all_states(&store, bulk_list_id).await.unwrap();
        assert_eq!(counts[&BulkItemState::Pending], 1);
        assert_eq!(counts[&BulkItemState::Active], 2);
        assert_eq!(counts[&BulkItemState::Completed], 1);
        assert_eq!(counts[&BulkItemState::Failed], 0);
    }

    #[actix_rt::test]
    async fn add_record_twice_is_a_no_op_on_index_cardinality() {
        let store = FakeStore::new();
        let bulk_list_id = Uuid::new_v4();
        let item = BulkItem::new(bulk_list_id, "path/to/file1", 1);
        add_record(&store, &item).await.unwrap();
        add_record(&store, &item).await.unwrap();

        assert_eq!(store.zcard(&keys::bulk_list_index(bulk_list_id)).await.unwrap(), 1);
        assert_eq!(store.zcard(&keys::bulk_list_state(bulk_list_id, item.state.index())).await.unwrap(), 1);
    }

    #[actix_rt::test]
    async fn add_record_moves_item_out_of_its_old_state_bucket_on_state_change() {
        let store = FakeStore::new();
        let bulk_list_id = Uuid::new_v4();
        let mut item = BulkItem::new(bulk_list_id, "path/to/file1", 1);
        item.state = BulkItemState::Pending;
        add_record(&store, &item).await.unwrap();

        item.state = BulkItemState::Active;
        add_record(&store, &item).await.unwrap();

        assert_eq!(store.zcard(&keys::bulk_list_state(bulk_list_id, BulkItemState::Pending.index())).await.unwrap(), 0);
        assert_eq!(store.zcard(&keys::bulk_list_state(bulk_list_id, BulkItemState::Active.index())).await.unwrap(), 1);
    }

    #[actix_rt::test]
    async fn dequeue_for_queue_moves_lowest_priority_items_and_persists_new_state() {
        let store = FakeStore::new();
        let bulk_list_id = Uuid::new_v4();
        let mut items = vec![
            BulkItem::new(bulk_list_id, "a", 3),
            BulkItem::new(bulk_list_id, "b", 1),
            BulkItem::new(bulk_list_id, "c", 2),
        ];
        for item in &mut items {
            item.state = BulkItemState::Pending;
            add_record(&store, item).await.unwrap();
        }

        let claimed = dequeue_for_queue(&store, bulk_list_id, BulkItemState::Pending, BulkItemState::Active, 2)
            .await
            .unwrap();
        assert_eq!(claimed.len(), 2);
        assert_eq!(claimed[0].source_path, "b");
        assert_eq!(claimed[1].source_path, "c");
        assert!(claimed.iter().all(|i| i.state == BulkItemState::Active));

        let remaining = filter_records_by_state(&store, bulk_list_id, BulkItemState::Pending).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].source_path, "a");
    }
}
