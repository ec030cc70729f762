//! Redis-backed `Store` implementation.
//!
//! Connection management (pooling, keepalive, optional Sentinel) is handled
//! by the `redis-utils` crate; this module only adds the command surface
//! the orchestration core needs on top of it, following the same
//! `Arc<Mutex<ConnectionManager>>` shape as the reference stack's
//! `media-service::cache::MediaCache`.
use crate::error::{AppError, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis_utils::SharedConnectionManager;
use std::time::Duration;

use super::{PipelineOp, Store};

/// Lua script backing `zmove_lowest`: pops the `limit` lowest-scored
/// members off `src` and re-adds them to `dst` with their original score,
/// all inside one atomic server-side evaluation so the dispatcher never
/// observes a half-moved batch.
const ZMOVE_LOWEST_SCRIPT: &str = r#"
local src = KEYS[1]
local dst = KEYS[2]
local limit = tonumber(ARGV[1])
local moved = redis.call('ZRANGE', src, 0, limit - 1, 'WITHSCORES')
local out = {}
for i = 1, #moved, 2 do
    local member = moved[i]
    local score = moved[i + 1]
    redis.call('ZREM', src, member)
    redis.call('ZADD', dst, score, member)
    table.insert(out, member)
    table.insert(out, score)
end
return out
"#;

pub struct RedisStore {
    manager: SharedConnectionManager,
}

impl RedisStore {
    pub fn new(manager: SharedConnectionManager) -> Self {
        Self { manager }
    }

    fn db_err(context: &str, err: impl std::fmt::Display) -> AppError {
        AppError::DbError(format!("{context}: {err}"))
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.get(key))
            .await
            .map_err(|e| Self::db_err("GET", e))
    }

    async fn set_string(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.manager.lock().await;
        match ttl {
            Some(ttl) => redis_utils::with_timeout(conn.set_ex(key, value, ttl.as_secs().max(1)))
                .await
                .map_err(|e| Self::db_err("SETEX", e)),
            None => redis_utils::with_timeout(conn.set(key, value))
                .await
                .map_err(|e| Self::db_err("SET", e)),
        }
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.del(key))
            .await
            .map(|_: i64| ())
            .map_err(|e| Self::db_err("DEL", e))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.exists(key))
            .await
            .map_err(|e| Self::db_err("EXISTS", e))
    }

    async fn lpush(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.lpush(key, value))
            .await
            .map(|_: i64| ())
            .map_err(|e| Self::db_err("LPUSH", e))
    }

    async fn rpush(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.rpush(key, value))
            .await
            .map(|_: i64| ())
            .map_err(|e| Self::db_err("RPUSH", e))
    }

    async fn lpop_n(&self, key: &str, limit: usize) -> Result<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.manager.lock().await;
        let count = std::num::NonZeroUsize::new(limit);
        let popped: Option<Vec<String>> = redis_utils::with_timeout(conn.lpop(key, count))
            .await
            .map_err(|e| Self::db_err("LPOP", e))?;
        Ok(popped.unwrap_or_default())
    }

    async fn lrem(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.lrem(key, 0, value))
            .await
            .map(|_: i64| ())
            .map_err(|e| Self::db_err("LREM", e))
    }

    async fn llen(&self, key: &str) -> Result<usize> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.llen(key))
            .await
            .map_err(|e| Self::db_err("LLEN", e))
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.zadd(key, member, score))
            .await
            .map(|_: i64| ())
            .map_err(|e| Self::db_err("ZADD", e))
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.zrem(key, member))
            .await
            .map(|_: i64| ())
            .map_err(|e| Self::db_err("ZREM", e))
    }

    async fn zrange_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.zrangebyscore(key, min, max))
            .await
            .map_err(|e| Self::db_err("ZRANGEBYSCORE", e))
    }

    async fn zmove_lowest(
        &self,
        src: &str,
        dst: &str,
        limit: usize,
    ) -> Result<Vec<(String, f64)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.manager.lock().await;
        let script = redis::Script::new(ZMOVE_LOWEST_SCRIPT);
        let flat: Vec<String> = redis_utils::with_timeout(
            script.key(src).key(dst).arg(limit).invoke_async(&mut *conn),
        )
        .await
        .map_err(|e| Self::db_err("ZMOVE_LOWEST", e))?;

        let mut out = Vec::with_capacity(flat.len() / 2);
        let mut iter = flat.into_iter();
        while let (Some(member), Some(score)) = (iter.next(), iter.next()) {
            let score: f64 = score
                .parse()
                .map_err(|e| Self::db_err("ZMOVE_LOWEST score parse", e))?;
            out.push((member, score));
        }
        Ok(out)
    }

    async fn zcard(&self, key: &str) -> Result<usize> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.zcard(key))
            .await
            .map_err(|e| Self::db_err("ZCARD", e))
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.sadd(key, member))
            .await
            .map(|_: i64| ())
            .map_err(|e| Self::db_err("SADD", e))
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.srem(key, member))
            .await
            .map(|_: i64| ())
            .map_err(|e| Self::db_err("SREM", e))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.manager.lock().await;
        redis_utils::with_timeout(conn.smembers(key))
            .await
            .map_err(|e| Self::db_err("SMEMBERS", e))
    }

    async fn try_lock(&self, name: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.manager.lock().await;
        let opts = redis::SetOptions::default()
            .conditional_set(redis::ExistenceCheck::NX)
            .with_expiration(redis::SetExpiry::PX(ttl.as_millis() as usize));
        let result: Option<String> = redis_utils::with_timeout(conn.set_options(
            super::keys::lock(name),
            "1",
            opts,
        ))
        .await
        .map_err(|e| Self::db_err("SET NX PX", e))?;
        Ok(result.is_some())
    }

    async fn unlock(&self, name: &str) -> Result<()> {
        self.del(&super::keys::lock(name)).await
    }

    /// Runs the batch inside `MULTI`/`EXEC` (spec §4.1, §9): either every
    /// queued write lands or, on a connection failure, none does, the
    /// same atomicity guarantee `zmove_lowest` gets from its Lua script.
    async fn exec_pipeline(&self, ops: Vec<PipelineOp>) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in &ops {
            match op {
                PipelineOp::SetString { key, value } => {
                    pipe.set(key, value);
                }
                PipelineOp::Zadd { key, score, member } => {
                    pipe.zadd(key, member, *score);
                }
                PipelineOp::Zrem { key, member } => {
                    pipe.zrem(key, member);
                }
                PipelineOp::Sadd { key, member } => {
                    pipe.sadd(key, member);
                }
                PipelineOp::Srem { key, member } => {
                    pipe.srem(key, member);
                }
            }
        }
        redis_utils::with_timeout(pipe.query_async::<()>(&mut *conn))
            .await
            .map_err(|e| Self::db_err("PIPELINE", e))
    }
}
