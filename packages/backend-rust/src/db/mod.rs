//! Learner state persistence.
//!
//! Mastery and retention states are stored per `(user, topic)` with a row
//! version. Writes are conditional on the version that was read; a stale
//! write surfaces as [`StoreError::Conflict`] for the service to retry.

pub mod locks;
pub mod memory;
pub mod schema;
pub mod sqlite;

use std::sync::Arc;

use prepmate_algo::{MasteryState, RetentionState, TopicSnapshot};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

use crate::config::{DatabaseConfig, DatabaseTarget};
use crate::db::locks::KeyLocks;
use crate::db::memory::MemoryStore;
use crate::db::sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("state serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("version conflict on {user_id}/{topic_id}")]
    Conflict { user_id: String, topic_id: String },
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("store initialization failed: {0}")]
    Init(String),
}

/// A stored value with the row version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: i64,
}

#[derive(Clone)]
enum Backend {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

#[derive(Clone)]
pub struct LearnerStore {
    backend: Backend,
    locks: Arc<KeyLocks>,
}

impl LearnerStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let backend = match &config.target {
            DatabaseTarget::Memory => Backend::Memory(MemoryStore::new()),
            DatabaseTarget::Sqlite(url) => {
                Backend::Sqlite(SqliteStore::connect(url, config.busy_timeout).await?)
            }
        };
        Ok(Self::with_backend(backend))
    }

    pub fn memory() -> Self {
        Self::with_backend(Backend::Memory(MemoryStore::new()))
    }

    pub fn sqlite(store: SqliteStore) -> Self {
        Self::with_backend(Backend::Sqlite(store))
    }

    fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            locks: Arc::new(KeyLocks::new()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            Backend::Sqlite(_) => "sqlite",
            Backend::Memory(_) => "memory",
        }
    }

    /// Exclusive in-process access to one key for a read-modify-write cycle.
    pub async fn lock(&self, user_id: &str, topic_id: &str) -> OwnedMutexGuard<()> {
        self.locks.acquire(user_id, topic_id).await
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Sqlite(s) => s.ping().await,
            Backend::Memory(_) => Ok(()),
        }
    }

    pub async fn get_mastery(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<Versioned<MasteryState>>, StoreError> {
        match &self.backend {
            Backend::Sqlite(s) => s.get_mastery(user_id, topic_id).await,
            Backend::Memory(m) => Ok(m.get_mastery(user_id, topic_id)),
        }
    }

    /// Write a mastery state. `expected_version` is the version read before
    /// the update, `None` for a key that did not exist. Returns the new version.
    pub async fn put_mastery(
        &self,
        user_id: &str,
        topic_id: &str,
        state: &MasteryState,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        match &self.backend {
            Backend::Sqlite(s) => s.put_mastery(user_id, topic_id, state, expected_version).await,
            Backend::Memory(m) => m.put_mastery(user_id, topic_id, state, expected_version),
        }
    }

    pub async fn list_mastery(&self, user_id: &str) -> Result<Vec<(String, MasteryState)>, StoreError> {
        match &self.backend {
            Backend::Sqlite(s) => s.list_mastery(user_id).await,
            Backend::Memory(m) => Ok(m.list_mastery(user_id)),
        }
    }

    pub async fn get_retention(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<Versioned<RetentionState>>, StoreError> {
        match &self.backend {
            Backend::Sqlite(s) => s.get_retention(user_id, topic_id).await,
            Backend::Memory(m) => Ok(m.get_retention(user_id, topic_id)),
        }
    }

    pub async fn put_retention(
        &self,
        user_id: &str,
        topic_id: &str,
        state: &RetentionState,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        match &self.backend {
            Backend::Sqlite(s) => s.put_retention(user_id, topic_id, state, expected_version).await,
            Backend::Memory(m) => m.put_retention(user_id, topic_id, state, expected_version),
        }
    }

    pub async fn list_retention(&self, user_id: &str) -> Result<Vec<(String, RetentionState)>, StoreError> {
        match &self.backend {
            Backend::Sqlite(s) => s.list_retention(user_id).await,
            Backend::Memory(m) => Ok(m.list_retention(user_id)),
        }
    }

    /// Every mastered topic of a user paired with its retention state, read
    /// from one consistent snapshot. Ordered by topic id.
    pub async fn user_snapshot(&self, user_id: &str) -> Result<Vec<TopicSnapshot>, StoreError> {
        match &self.backend {
            Backend::Sqlite(s) => s.user_snapshot(user_id).await,
            Backend::Memory(m) => Ok(m.user_snapshot(user_id)),
        }
    }
}
