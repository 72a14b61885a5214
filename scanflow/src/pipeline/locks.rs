//! Per-target run serialization.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// A table of async mutexes keyed by normalized target.
///
/// Two runs on the same target never overlap; runs on different targets
/// proceed concurrently. An entry lives only while some run holds or waits
/// for it. Cloning shares the table.
#[derive(Debug, Clone, Default)]
pub struct TargetLocks {
    locks: Arc<LockMap>,
}

/// Exclusive access to one target. Dropping it releases the target and
/// forgets the entry if nobody else is waiting.
#[derive(Debug)]
pub struct TargetGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: Arc<LockMap>,
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The table holds one reference; any other belongs to a waiter.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl TargetLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> TargetGuard {
        // Clone the Arc out so the shard guard is released before awaiting.
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        TargetGuard {
            guard: Some(guard),
            key: key.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Returns true if `key` is currently held.
    #[must_use]
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks
            .get(key)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Number of targets currently held or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no target is held or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = TargetLocks::new();
        let guard = locks.acquire("root").await;
        assert!(locks.is_locked("root"));

        let pending = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("root").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap();
        assert!(!locks.is_locked("root"));
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = TargetLocks::new();
        let _a = locks.acquire("src-api").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("lib"))
            .await
            .unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_targets_are_forgotten() {
        let locks = TargetLocks::new();
        for i in 0..100 {
            let _guard = locks.acquire(&format!("target-{i}")).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_a_waiter_remains() {
        let locks = TargetLocks::new();
        let guard = locks.acquire("root").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("root").await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        assert_eq!(locks.len(), 1);

        // A third caller must queue behind the waiter, not on a fresh mutex.
        let third = locks.acquire("root").await;
        drop(third);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
