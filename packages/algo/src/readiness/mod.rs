//! Readiness Model
//!
//! Weighted-feature logistic estimate of interview readiness.
//!
//! Features, each normalised to [0, 1]:
//! - average mastery
//! - mean stability / max stability
//! - fraction of improving topics
//! - difficulty progression
//! - mock interview score
//! - completion rate (topics above the completion mastery)
//! - days prepared / full preparation period

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{ValidationError, ValidationResult};
use crate::sanitize::{clamp_range, clamp_unit, mean, sigmoid, std_dev};
use crate::snapshot::TopicSnapshot;
use crate::types::{Explanation, ImprovementTrend, MAX_DIFFICULTY, MIN_DIFFICULTY};

const MODEL_NAME: &str = "Weighted Logistic Readiness";
const PRIMARY_GAP_COUNT: usize = 3;
const DEFAULT_DAYS_PREPARED: u32 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadinessRequest {
    pub user_id: String,
    #[serde(default)]
    pub target_company: Option<String>,
    #[serde(default)]
    pub mock_interview_score: Option<f64>,
    #[serde(default)]
    pub days_prepared: Option<u32>,
}

impl ReadinessRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::new("user_id", "must not be empty"));
        }
        if let Some(score) = self.mock_interview_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(ValidationError::new(
                    "mock_interview_score",
                    format!("must be between 0 and 1, got {score}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessFeatures {
    pub avg_mastery: f64,
    pub stability: f64,
    pub consistency: f64,
    pub difficulty_progression: f64,
    pub mock_interview: f64,
    pub completion_rate: f64,
    pub days_prepared: f64,
}

impl ReadinessFeatures {
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.avg_mastery,
            self.stability,
            self.consistency,
            self.difficulty_progression,
            self.mock_interview,
            self.completion_rate,
            self.days_prepared,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessPrediction {
    pub readiness_score: f64,
    pub confidence_score: f64,
    pub probability_passing: f64,
    pub time_to_readiness_days: u32,
    pub estimated_readiness_date: DateTime<Utc>,
    pub primary_gaps: Vec<String>,
    pub target_company: Option<String>,
    pub features: ReadinessFeatures,
    pub explanation: Explanation,
}

pub fn extract_features(topics: &[TopicSnapshot], request: &ReadinessRequest, config: &ModelConfig) -> ReadinessFeatures {
    let params = &config.readiness;
    let count = topics.len().max(1) as f64;

    let masteries: Vec<f64> = topics.iter().map(|t| t.mastery.mastery_probability).collect();
    let stabilities: Vec<f64> = topics
        .iter()
        .filter_map(|t| t.retention.as_ref().map(|r| r.stability_days))
        .collect();
    let improving = topics
        .iter()
        .filter(|t| t.mastery.improvement_trend == ImprovementTrend::Improving)
        .count() as f64;
    let difficulties: Vec<f64> = topics
        .iter()
        .map(|t| t.mastery.recommended_difficulty as f64)
        .collect();
    let completed = masteries.iter().filter(|&&m| m > params.completion_mastery).count() as f64;
    let days = request.days_prepared.unwrap_or(DEFAULT_DAYS_PREPARED) as f64;

    let span = (MAX_DIFFICULTY - MIN_DIFFICULTY) as f64;
    let difficulty_progression = if difficulties.is_empty() {
        0.0
    } else {
        clamp_unit((mean(&difficulties) - MIN_DIFFICULTY as f64) / span)
    };

    ReadinessFeatures {
        avg_mastery: mean(&masteries),
        stability: clamp_unit(mean(&stabilities) / config.retention.max_stability_days),
        consistency: improving / count,
        difficulty_progression,
        mock_interview: request.mock_interview_score.unwrap_or(params.default_mock_score),
        completion_rate: completed / count,
        days_prepared: (days / params.full_preparation_days).min(1.0),
    }
}

pub fn predict_readiness(
    request: &ReadinessRequest,
    topics: &[TopicSnapshot],
    now: DateTime<Utc>,
    config: &ModelConfig,
) -> ValidationResult<ReadinessPrediction> {
    request.validate()?;
    let params = &config.readiness;

    let features = extract_features(topics, request, config);
    let values = features.as_array();
    let weighted: f64 = values
        .iter()
        .zip(params.feature_weights.iter())
        .map(|(x, w)| x * w)
        .sum();

    let readiness_score = 100.0 * sigmoid(params.logistic_steepness * (weighted - 0.5));
    let confidence_score = clamp_range(1.0 - 0.5 * std_dev(&values), 0.3, 0.95);
    let gap = (params.target_readiness - readiness_score).max(0.0);
    let time_to_readiness_days = (gap / params.points_per_day).floor() as u32;
    let probability_passing =
        clamp_unit(sigmoid(params.passing_steepness * (readiness_score / 100.0 - 0.5)));

    let primary_gaps: Vec<String> = topics
        .iter()
        .filter(|t| t.mastery.mastery_probability < params.gap_mastery)
        .take(PRIMARY_GAP_COUNT)
        .map(|t| t.topic_id.clone())
        .collect();

    let explanation = Explanation {
        model: MODEL_NAME.to_string(),
        reason: if primary_gaps.is_empty() {
            "Maintain current progress".to_string()
        } else {
            format!("Increase mastery in: {}", primary_gaps.join(", "))
        },
        factors: vec![
            format!("average mastery {:.1}%", features.avg_mastery * 100.0),
            format!("stability {:.1}%", features.stability * 100.0),
            format!("improving topics {:.0}%", features.consistency * 100.0),
            format!("difficulty progression {:.0}%", features.difficulty_progression * 100.0),
            format!("mock interview score {:.0}%", features.mock_interview * 100.0),
            format!("completion rate {:.0}%", features.completion_rate * 100.0),
            format!("preparation {:.0}%", features.days_prepared * 100.0),
        ],
    };

    Ok(ReadinessPrediction {
        readiness_score,
        confidence_score,
        probability_passing,
        time_to_readiness_days,
        estimated_readiness_date: now + Duration::days(time_to_readiness_days as i64),
        primary_gaps,
        target_company: request.target_company.clone(),
        features,
        explanation,
    })
}
