//! Common Types and Constants
//!
//! Shared enums and small value types used across the engine modules.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Numerical stability epsilon for probabilities entering a division
pub const EPSILON: f64 = 1e-6;

/// Lowest valid attempt difficulty
pub const MIN_DIFFICULTY: u8 = 1;

/// Highest valid attempt difficulty
pub const MAX_DIFFICULTY: u8 = 5;

/// Valid `time_factor` range (inclusive)
pub const TIME_FACTOR_RANGE: (f64, f64) = (0.5, 2.0);

/// Hours in a day, for forgetting-curve time conversion
pub const HOURS_PER_DAY: f64 = 24.0;

// ==================== Mastery ====================

/// Direction of recent performance for a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImprovementTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl ImprovementTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
        }
    }
}

// ==================== Retention ====================

/// Revision urgency bucket derived from retention probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl UrgencyLevel {
    /// Lower rank sorts first in the revision queue
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

// ==================== Weakness ====================

/// Primary weak signal of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    MasteryGap,
    RetentionDecay,
    PerformanceVariance,
    GeneralWeakness,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MasteryGap => "mastery_gap",
            Self::RetentionDecay => "retention_decay",
            Self::PerformanceVariance => "performance_variance",
            Self::GeneralWeakness => "general_weakness",
        }
    }
}

/// Whether a weakness analysis had enough data to score anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Analyzed,
    InsufficientData,
}

// ==================== Planner ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Practice,
    Study,
    Revision,
    MockInterview,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Practice => "practice",
            Self::Study => "study",
            Self::Revision => "revision",
            Self::MockInterview => "mock_interview",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskDifficulty {
    Easy,
    Medium,
    Hard,
}

/// How regularly a simulated learner keeps to the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StudyConsistency {
    #[default]
    High,
    Medium,
    Low,
}

impl StudyConsistency {
    pub fn factor(&self) -> f64 {
        match self {
            Self::High => 1.2,
            Self::Medium => 1.0,
            Self::Low => 0.7,
        }
    }
}

// ==================== Explainability ====================

/// Human-readable account of how a result was produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub model: String,
    pub reason: String,
    pub factors: Vec<String>,
}
