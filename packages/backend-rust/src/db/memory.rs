use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use prepmate_algo::{MasteryState, RetentionState, TopicSnapshot};

use crate::db::{StoreError, Versioned};

type Key = (String, String);

#[derive(Default)]
struct Tables {
    mastery: BTreeMap<Key, Versioned<MasteryState>>,
    retention: BTreeMap<Key, Versioned<RetentionState>>,
}

/// In-process store for tests and database-less runs
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

fn key(user_id: &str, topic_id: &str) -> Key {
    (user_id.to_string(), topic_id.to_string())
}

fn put<T: Clone>(
    table: &mut BTreeMap<Key, Versioned<T>>,
    user_id: &str,
    topic_id: &str,
    value: &T,
    expected_version: Option<i64>,
) -> Result<i64, StoreError> {
    let k = key(user_id, topic_id);
    let current = table.get(&k).map(|v| v.version);
    if current != expected_version {
        return Err(StoreError::Conflict {
            user_id: user_id.to_string(),
            topic_id: topic_id.to_string(),
        });
    }
    let version = current.unwrap_or(0) + 1;
    table.insert(
        k,
        Versioned {
            value: value.clone(),
            version,
        },
    );
    Ok(version)
}

fn list<T: Clone>(table: &BTreeMap<Key, Versioned<T>>, user_id: &str) -> Vec<(String, T)> {
    table
        .iter()
        .filter(|((user, _), _)| user == user_id)
        .map(|((_, topic), v)| (topic.clone(), v.value.clone()))
        .collect()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_mastery(&self, user_id: &str, topic_id: &str) -> Option<Versioned<MasteryState>> {
        self.tables.read().mastery.get(&key(user_id, topic_id)).cloned()
    }

    pub fn put_mastery(
        &self,
        user_id: &str,
        topic_id: &str,
        state: &MasteryState,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        put(&mut self.tables.write().mastery, user_id, topic_id, state, expected_version)
    }

    pub fn list_mastery(&self, user_id: &str) -> Vec<(String, MasteryState)> {
        list(&self.tables.read().mastery, user_id)
    }

    pub fn get_retention(&self, user_id: &str, topic_id: &str) -> Option<Versioned<RetentionState>> {
        self.tables.read().retention.get(&key(user_id, topic_id)).cloned()
    }

    pub fn put_retention(
        &self,
        user_id: &str,
        topic_id: &str,
        state: &RetentionState,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        put(&mut self.tables.write().retention, user_id, topic_id, state, expected_version)
    }

    pub fn list_retention(&self, user_id: &str) -> Vec<(String, RetentionState)> {
        list(&self.tables.read().retention, user_id)
    }

    pub fn user_snapshot(&self, user_id: &str) -> Vec<TopicSnapshot> {
        let tables = self.tables.read();
        list(&tables.mastery, user_id)
            .into_iter()
            .map(|(topic_id, mastery)| {
                let retention = tables
                    .retention
                    .get(&key(user_id, &topic_id))
                    .map(|v| v.value.clone());
                TopicSnapshot::new(topic_id, mastery, retention)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prepmate_algo::ModelConfig;

    fn state() -> MasteryState {
        MasteryState::initial(&ModelConfig::default(), Utc::now())
    }

    #[test]
    fn test_versioned_writes() {
        let store = MemoryStore::new();
        assert_eq!(store.put_mastery("u1", "dp", &state(), None).unwrap(), 1);
        assert!(matches!(
            store.put_mastery("u1", "dp", &state(), None),
            Err(StoreError::Conflict { .. })
        ));
        assert_eq!(store.put_mastery("u1", "dp", &state(), Some(1)).unwrap(), 2);
        assert!(store.put_mastery("u1", "dp", &state(), Some(1)).is_err());
        assert_eq!(store.get_mastery("u1", "dp").map(|v| v.version), Some(2));
    }

    #[test]
    fn test_lists_are_per_user_and_sorted() {
        let store = MemoryStore::new();
        store.put_mastery("u1", "trees", &state(), None).unwrap();
        store.put_mastery("u1", "arrays", &state(), None).unwrap();
        store.put_mastery("u2", "graphs", &state(), None).unwrap();

        let topics: Vec<_> = store.list_mastery("u1").into_iter().map(|(t, _)| t).collect();
        assert_eq!(topics, vec!["arrays", "trees"]);
        assert!(store.user_snapshot("nobody").is_empty());
    }
}
