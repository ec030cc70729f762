//! Durable key/value and sorted-set persistence (spec §4.1).
//!
//! `Store` is the trait every other component depends on; `RedisStore` is
//! the production backend and `FakeStore` (in `store::fake`) is an
//! in-memory double used by tests, following the repository/port seam the
//! reference stack uses for its database adapters.
pub mod fake;
pub mod redis_store;

use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub use fake::FakeStore;
pub use redis_store::RedisStore;

/// String-level operations a backend must provide. Kept string-in/string-out
/// (rather than generic) so the trait stays object-safe; typed JSON
/// convenience lives in `StoreExt` below.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_string(&self, key: &str) -> Result<Option<String>>;
    async fn set_string(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;
    async fn del(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;

    async fn lpush(&self, key: &str, value: String) -> Result<()>;
    async fn rpush(&self, key: &str, value: String) -> Result<()>;
    /// Pop up to `limit` entries from the head of the list, returning
    /// however many were actually available (0..=limit).
    async fn lpop_n(&self, key: &str, limit: usize) -> Result<Vec<String>>;
    async fn lrem(&self, key: &str, value: &str) -> Result<()>;
    async fn llen(&self, key: &str) -> Result<usize>;

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()>;
    async fn zrem(&self, key: &str, member: &str) -> Result<()>;
    async fn zrange_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>>;
    /// Atomically move up to `limit` of the lowest-scored members from
    /// `src` into `dst` with the same score, returning the moved members
    /// (used by `DequeueForQueue`, spec §4.2).
    async fn zmove_lowest(
        &self,
        src: &str,
        dst: &str,
        limit: usize,
    ) -> Result<Vec<(String, f64)>>;
    async fn zcard(&self, key: &str) -> Result<usize>;

    async fn sadd(&self, key: &str, member: &str) -> Result<()>;
    async fn srem(&self, key: &str, member: &str) -> Result<()>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    /// Acquire a short-TTL advisory lock. Returns `true` if acquired.
    async fn try_lock(&self, name: &str, ttl: Duration) -> Result<bool>;
    async fn unlock(&self, name: &str) -> Result<()>;

    /// Runs a batch of writes as a single round trip (spec §4.1's
    /// pipelining primitive), so a network failure between two of them
    /// can't leave the store half-updated from the caller's perspective
    /// (spec §9). Backends that can batch server-side (Redis `MULTI`/
    /// `EXEC`) should; `FakeStore` applies the batch under one lock
    /// acquisition since it has no network hop to fail mid-batch.
    async fn exec_pipeline(&self, ops: Vec<PipelineOp>) -> Result<()>;

    /// A fresh builder for batching writes against this store (spec §4.1
    /// "provides pipelines"); call `.execute(&self)` to flush.
    fn pipeline(&self) -> StorePipeline {
        StorePipeline::default()
    }
}

/// One write batched by a `StorePipeline` (spec §4.1). Deliberately a
/// closed set of the primitives `AddRecord`/index-move call sites need —
/// not a generic command enum — so `exec_pipeline` implementations stay a
/// straightforward match rather than an ad-hoc command interpreter.
#[derive(Debug, Clone)]
pub enum PipelineOp {
    SetString { key: String, value: String },
    Zadd { key: String, score: f64, member: String },
    Zrem { key: String, member: String },
    Sadd { key: String, member: String },
    Srem { key: String, member: String },
}

/// Accumulates a batch of writes to flush as one `Store::exec_pipeline`
/// call (spec §4.1, §4.2 AddRecord, §9). Building the batch is infallible
/// except for JSON encoding, which `set_json` surfaces immediately rather
/// than deferring to `execute`.
#[derive(Debug, Clone, Default)]
pub struct StorePipeline {
    ops: Vec<PipelineOp>,
}

impl StorePipeline {
    pub fn set_json<T: Serialize>(mut self, key: &str, value: &T) -> Result<Self> {
        let raw = serde_json::to_string(value)
            .map_err(|e| crate::error::AppError::DbError(format!("encode {key}: {e}")))?;
        self.ops.push(PipelineOp::SetString { key: key.to_string(), value: raw });
        Ok(self)
    }

    pub fn zadd(mut self, key: &str, score: f64, member: &str) -> Self {
        self.ops.push(PipelineOp::Zadd { key: key.to_string(), score, member: member.to_string() });
        self
    }

    pub fn zrem(mut self, key: &str, member: &str) -> Self {
        self.ops.push(PipelineOp::Zrem { key: key.to_string(), member: member.to_string() });
        self
    }

    pub fn sadd(mut self, key: &str, member: &str) -> Self {
        self.ops.push(PipelineOp::Sadd { key: key.to_string(), member: member.to_string() });
        self
    }

    pub fn srem(mut self, key: &str, member: &str) -> Self {
        self.ops.push(PipelineOp::Srem { key: key.to_string(), member: member.to_string() });
        self
    }

    /// Flushes the batch in one round trip. A pipeline with no queued
    /// writes is a no-op rather than an empty network call.
    pub async fn execute(self, store: &dyn Store) -> Result<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        store.exec_pipeline(self.ops).await
    }
}

/// Typed JSON convenience built on top of the raw string operations.
/// A blanket impl over every `Store` so call sites never need to know
/// which backend they're talking to.
#[async_trait]
pub trait StoreExt: Store {
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_string(key).await? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .map_err(|e| crate::error::AppError::DbError(format!("decode {key}: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| crate::error::AppError::DbError(format!("encode {key}: {e}")))?;
        self.set_string(key, raw, ttl).await
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// Key-schema helpers, kept centralized so the layout in spec §4.1 stays
/// the single source of truth for how entities and indices are named.
pub mod keys {
    use uuid::Uuid;

    pub fn bulk_item(id: Uuid) -> String {
        format!("mediaflipper:bulkitem:{id}")
    }

    pub fn bulk_list_index(bulk_list_id: Uuid) -> String {
        format!("mediaflipper:bulklist:{bulk_list_id}:index")
    }

    pub fn bulk_list_state(bulk_list_id: Uuid, state: u8) -> String {
        format!("mediaflipper:bulklist:{bulk_list_id}:state:{state}")
    }

    pub fn bulk_list_filepath_index(bulk_list_id: Uuid) -> String {
        format!("mediaflipper:bulklist:{bulk_list_id}:filepathindex")
    }

    pub fn bulk_list_record(bulk_list_id: Uuid) -> String {
        format!("mediaflipper:bulklist:{bulk_list_id}")
    }

    pub fn bulk_list_registry() -> String {
        "mediaflipper:bulklists".to_string()
    }

    pub fn job_container(id: Uuid) -> String {
        format!("mediaflipper:jobcontainer:{id}")
    }

    pub fn file_entry(id: Uuid) -> String {
        format!("mediaflipper:fileentry:{id}")
    }

    pub fn queue(name: &str) -> String {
        format!("mediaflipper:{name}")
    }

    pub const REQUEST_QUEUE: &str = "jobrequestqueue";
    pub const RUNNING_QUEUE: &str = "jobrunningqueue";

    pub fn lock(name: &str) -> String {
        format!("mediaflipper:lock:{name}")
    }
}
