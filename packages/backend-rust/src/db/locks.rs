use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Idle entries are dropped once the registry grows past this size
const PRUNE_THRESHOLD: usize = 1024;

type Key = (String, String);

/// Per-(user, topic) async mutex registry.
///
/// Serializes read-modify-write cycles on one key inside this process while
/// unrelated keys proceed in parallel.
#[derive(Default)]
pub struct KeyLocks {
    inner: Mutex<HashMap<Key, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user_id: &str, topic_id: &str) -> OwnedMutexGuard<()> {
        let handle = {
            let mut map = self.inner.lock();
            if map.len() > PRUNE_THRESHOLD {
                map.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            map.entry((user_id.to_string(), topic_id.to_string()))
                .or_default()
                .clone()
        };
        handle.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyLocks::new());
        let guard = locks.acquire("u1", "graphs").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("u1", "graphs").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _a = locks.acquire("u1", "graphs").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("u1", "dp"))
            .await
            .unwrap();
        assert_eq!(locks.len(), 2);
    }
}
