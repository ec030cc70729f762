//! In-memory `Store` double used by unit and integration tests, since a
//! live Redis server is not available to the test suite. Mirrors the same
//! method surface as `RedisStore` so dispatcher/intake/indexer code under
//! test never knows the difference.
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::{PipelineOp, Store};

#[derive(Default)]
struct Inner {
    strings: HashMap<String, String>,
    lists: HashMap<String, VecDeque<String>>,
    /// member -> score, kept sorted on read via BTreeMap keyed by (score, member)
    sorted_sets: HashMap<String, BTreeMap<(ordered_float::OrderedFloat, String), ()>>,
    sets: HashMap<String, HashSet<String>>,
    locks: HashSet<String>,
}

/// Tiny local substitute for a crate dependency: we only need a total
/// order over f64 scores for the BTreeMap key, never NaN in practice
/// (priorities and dispatcher timestamps), so a thin wrapper is simpler
/// than pulling in `ordered-float` for one struct.
mod ordered_float {
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct OrderedFloat(pub f64);

    impl Eq for OrderedFloat {}
    impl PartialOrd for OrderedFloat {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }
    impl Ord for OrderedFloat {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
        }
    }
}
use ordered_float::OrderedFloat;

#[derive(Default)]
pub struct FakeStore {
    inner: Mutex<Inner>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.lock().unwrap().strings.get(key).cloned())
    }

    async fn set_string(&self, key: &str, value: String, _ttl: Option<Duration>) -> Result<()> {
        self.inner.lock().unwrap().strings.insert(key.to_string(), value);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.strings.remove(key);
        inner.lists.remove(key);
        inner.sorted_sets.remove(key);
        inner.sets.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.strings.contains_key(key)
            || inner.lists.contains_key(key)
            || inner.sorted_sets.contains_key(key)
            || inner.sets.contains_key(key))
    }

    async fn lpush(&self, key: &str, value: String) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(value);
        Ok(())
    }

    async fn rpush(&self, key: &str, value: String) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value);
        Ok(())
    }

    async fn lpop_n(&self, key: &str, limit: usize) -> Result<Vec<String>> {
        let mut inner = self.inner.lock().unwrap();
        let list = inner.lists.entry(key.to_string()).or_default();
        let mut out = Vec::with_capacity(limit.min(list.len()));
        for _ in 0..limit {
            match list.pop_front() {
                Some(v) => out.push(v),
                None => break,
            }
        }
        Ok(out)
    }

    async fn lrem(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(list) = inner.lists.get_mut(key) {
            list.retain(|v| v != value);
        }
        Ok(())
    }

    async fn llen(&self, key: &str) -> Result<usize> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .lists
            .get(key)
            .map(|l| l.len())
            .unwrap_or(0))
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let set = inner.sorted_sets.entry(key.to_string()).or_default();
        set.retain(|(_, m), _| m != member);
        set.insert((OrderedFloat(score), member.to_string()), ());
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(set) = inner.sorted_sets.get_mut(key) {
            set.retain(|(_, m), _| m != member);
        }
        Ok(())
    }

    async fn zrange_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sorted_sets
            .get(key)
            .map(|set| {
                set.keys()
                    .filter(|(score, _)| score.0 >= min && score.0 <= max)
                    .map(|(_, member)| member.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn zmove_lowest(
        &self,
        src: &str,
        dst: &str,
        limit: usize,
    ) -> Result<Vec<(String, f64)>> {
        let mut inner = self.inner.lock().unwrap();
        let moved: Vec<(OrderedFloat, String)> = inner
            .sorted_sets
            .get(src)
            .map(|set| set.keys().take(limit).cloned().collect())
            .unwrap_or_default();

        if let Some(set) = inner.sorted_sets.get_mut(src) {
            for (score, member) in &moved {
                set.remove(&(*score, member.clone()));
            }
        }
        let dst_set = inner.sorted_sets.entry(dst.to_string()).or_default();
        for (score, member) in &moved {
            dst_set.insert((*score, member.clone()), ());
        }

        Ok(moved.into_iter().map(|(s, m)| (m, s.0)).collect())
    }

    async fn zcard(&self, key: &str) -> Result<usize> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sorted_sets
            .get(key)
            .map(|s| s.len())
            .unwrap_or(0))
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        if let Some(set) = self.inner.lock().unwrap().sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn try_lock(&self, name: &str, _ttl: Duration) -> Result<bool> {
        Ok(self.inner.lock().unwrap().locks.insert(name.to_string()))
    }

    async fn unlock(&self, name: &str) -> Result<()> {
        self.inner.lock().unwrap().locks.remove(name);
        Ok(())
    }

    /// Applies the whole batch under one lock acquisition. There's no
    /// network hop here to fail partway through, so holding the lock for
    /// the batch's duration is what "atomic from the caller's perspective"
    /// (spec §9) reduces to for this backend.
    async fn exec_pipeline(&self, ops: Vec<PipelineOp>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for op in ops {
            match op {
                PipelineOp::SetString { key, value } => {
                    inner.strings.insert(key, value);
                }
                PipelineOp::Zadd { key, score, member } => {
                    let set = inner.sorted_sets.entry(key).or_default();
                    set.retain(|(_, m), _| m != &member);
                    set.insert((OrderedFloat(score), member), ());
                }
                PipelineOp::Zrem { key, member } => {
                    if let Some(set) = inner.sorted_sets.get_mut(&key) {
                        set.retain(|(_, m), _| m != &member);
                    }
                }
                PipelineOp::Sadd { key, member } => {
                    inner.sets.entry(key).or_default().insert(member);
                }
                PipelineOp::Srem { key, member } => {
                    if let Some(set) = inner.sets.get_mut(&key) {
                        set.remove(&member);
                    }
                }
            }
        }
        Ok(())
    }
}
