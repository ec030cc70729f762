//! `WhenQueueAvailable` (spec §4.4): the advisory-lock primitive every
//! multi-write sequence against a named queue goes through, since the core
//! has no multi-key transaction (spec §4.1). Grounded in the same
//! `SET NX PX` pattern `RedisStore::try_lock` implements.
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::store::Store;

/// Default advisory-lock TTL (spec §5): unreleased locks self-expire after
/// this long, bounding how long a crashed holder can block a queue.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30);

const BACKOFF_START: Duration = Duration::from_millis(25);
const BACKOFF_MAX: Duration = Duration::from_millis(400);

/// Acquires the advisory lock on `queue_name`, runs `callback`, and always
/// releases the lock afterward — even if `callback` errors — so a failed
/// intake never leaves a queue wedged for its full TTL. If `blocking` is
/// true, spins with capped exponential backoff until acquired; otherwise
/// returns `AppError::LockBusy` immediately on contention (spec §4.4).
pub async fn when_queue_available<T, F, Fut>(
    store: &dyn Store,
    queue_name: &str,
    blocking: bool,
    callback: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    acquire(store, queue_name, blocking).await?;
    let result = callback().await;
    store.unlock(queue_name).await?;
    result
}

async fn acquire(store: &dyn Store, queue_name: &str, blocking: bool) -> Result<()> {
    if store.try_lock(queue_name, DEFAULT_LOCK_TTL).await? {
        return Ok(());
    }
    if !blocking {
        return Err(AppError::LockBusy(format!("queue {queue_name} is locked")));
    }

    let mut backoff = BACKOFF_START;
    loop {
        tokio::time::sleep(backoff).await;
        if store.try_lock(queue_name, DEFAULT_LOCK_TTL).await? {
            return Ok(());
        }
        backoff = (backoff * 2).min(BACKOFF_MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FakeStore;

    #[actix_rt::test]
    async fn callback_runs_under_the_lock_and_lock_is_released_after() {
        let store = FakeStore::new();
        let result = when_queue_available(&store, "jobrunningqueue", true, || async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert!(store.try_lock("jobrunningqueue", DEFAULT_LOCK_TTL).await.unwrap());
    }

    #[actix_rt::test]
    async fn lock_is_released_even_when_callback_errors() {
        let store = FakeStore::new();
        let result: Result<()> = when_queue_available(&store, "jobrunningqueue", true, || async {
            Err(AppError::Internal("boom".into()))
        })
        .await;
        assert!(result.is_err());
        assert!(store.try_lock("jobrunningqueue", DEFAULT_LOCK_TTL).await.unwrap());
    }

    #[actix_rt::test]
    async fn non_blocking_acquisition_returns_lock_busy_on_contention() {
        let store = FakeStore::new();
        assert!(store.try_lock("jobrunningqueue", DEFAULT_LOCK_TTL).await.unwrap());

        let result: Result<()> =
            when_queue_available(&store, "jobrunningqueue", false, || async { Ok(()) }).await;
        assert!(matches!(result, Err(AppError::LockBusy(_))));
    }
}
