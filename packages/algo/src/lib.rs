//! # prepmate-algo - learner modeling engines
//!
//! Pure, synchronous models behind interview preparation:
//!
//! - **Mastery** - Bayesian Knowledge Tracing over attempt sequences
//! - **Retention** - Ebbinghaus forgetting curve with revision-driven stability
//! - **Weakness** - weighted risk scoring over mastery and retention
//! - **Planner** - learning-gain ranked daily tasks under a time budget
//! - **Readiness** - weighted-feature logistic readiness estimate
//! - **Simulator** - projected mastery curves for a study scenario
//!
//! Every engine is a function of `(prior state, inputs, now, config)` and
//! returns new state; nothing here performs I/O or keeps global state.
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use prepmate_algo::{update_mastery, AttemptRecord, ModelConfig};
//!
//! let config = ModelConfig::default();
//! let attempts = [AttemptRecord::new(true, 3), AttemptRecord::new(true, 3)];
//! let update = update_mastery(None, &attempts, Utc::now(), &config).unwrap();
//! assert!(update.state.mastery_probability > 0.9);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod error;
pub mod sanitize;
pub mod snapshot;
pub mod types;

pub mod mastery;
pub mod planner;
pub mod readiness;
pub mod retention;
pub mod simulator;
pub mod weakness;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use config::ModelConfig;
pub use error::{ValidationError, ValidationResult};
pub use snapshot::TopicSnapshot;

pub use mastery::{
    parse_attempts, summarize_profile, update_mastery, AttemptInput, AttemptRecord,
    MasteryProfile, MasteryState, MasteryUpdate,
};

pub use retention::{
    order_revision_queue, update_retention, RetentionSnapshot, RetentionState, RetentionUpdate,
    RevisionQueueItem,
};

pub use weakness::{analyze_weaknesses, TopicRisk, WeaknessReport};

pub use planner::{generate_plan, AdaptivePlan, PlanRequest, TaskRecommendation};

pub use readiness::{predict_readiness, ReadinessPrediction, ReadinessRequest};

pub use simulator::{run_simulation, SimulationResult, SimulationScenario};
