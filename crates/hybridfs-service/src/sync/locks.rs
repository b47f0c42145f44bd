//! Per-key FIFO serialization for reconciliation events.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A set of named async locks created on demand.
///
/// Waiters on the same key are served in arrival order. An entry is
/// dropped from the map once its last holder or waiter is gone.
#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Held while an event for one key is applied.
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Creates an empty lock set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `key`.
    pub async fn acquire(&self, key: impl Into<String>) -> KeyGuard {
        let key = key.into();
        let mutex = self.locks.entry(key.clone()).or_default().value().clone();
        let guard = mutex.lock_owned().await;
        KeyGuard {
            key,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_key_is_serialized_in_arrival_order() {
        let locks = KeyedLocks::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = locks.acquire("k").await;
        let mut handles = Vec::new();
        for i in 0..3 {
            let locks = locks.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("k").await;
                order.lock().await.push(i);
            }));
            // Let each waiter enqueue before the next one starts.
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(order.lock().await.is_empty());
        drop(first);
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().await, vec![0, 1, 2]);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }
}
