use std::sync::Arc;
use std::time::{Instant, SystemTime};

use prepmate_algo::ModelConfig;

use crate::db::LearnerStore;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    store: LearnerStore,
    model: Arc<ModelConfig>,
}

impl AppState {
    pub fn new(store: LearnerStore, model: ModelConfig) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            store,
            model: Arc::new(model),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn store(&self) -> &LearnerStore {
        &self.store
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }
}
