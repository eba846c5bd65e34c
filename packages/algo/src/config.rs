use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BktParams {
    pub p_init: f64,
    pub p_learn: f64,
    pub p_guess: f64,
    pub p_slip: f64,
}

impl Default for BktParams {
    fn default() -> Self {
        Self {
            p_init: 0.10,
            p_learn: 0.15,
            p_guess: 0.10,
            p_slip: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendParams {
    pub window_size: usize,
    pub history_capacity: usize,
    pub improving_threshold: f64,
    pub declining_threshold: f64,
    pub min_baseline_samples: usize,
    pub mastery_delta_threshold: f64,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            window_size: 10,
            history_capacity: 40,
            improving_threshold: 0.1,
            declining_threshold: -0.1,
            min_baseline_samples: 3,
            mastery_delta_threshold: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceParams {
    pub attempt_scale: f64,
    pub matched_bonus: f64,
    pub hint_penalty_per_hint: f64,
    pub max_hint_penalty: f64,
    pub time_penalty_per_unit: f64,
    pub max_time_penalty: f64,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            attempt_scale: 10.0,
            matched_bonus: 0.5,
            hint_penalty_per_hint: 0.15,
            max_hint_penalty: 0.5,
            time_penalty_per_unit: 0.5,
            max_time_penalty: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionParams {
    pub initial_stability_days: f64,
    pub min_stability_days: f64,
    pub max_stability_days: f64,
    pub success_factor: f64,
    pub failure_factor: f64,
    pub critical_below: f64,
    pub high_below: f64,
    pub medium_below: f64,
    pub default_queue_limit: usize,
}

impl Default for RetentionParams {
    fn default() -> Self {
        Self {
            initial_stability_days: 1.0,
            min_stability_days: 1.0,
            max_stability_days: 30.0,
            success_factor: 1.3,
            failure_factor: 0.5,
            critical_below: 0.30,
            high_below: 0.50,
            medium_below: 0.75,
            default_queue_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaknessParams {
    pub mastery_target: f64,
    pub retention_amplification: f64,
    pub difficulty_target: f64,
    pub mastery_weight: f64,
    pub retention_weight: f64,
    pub difficulty_weight: f64,
    pub consistency_weight: f64,
    pub risk_threshold: f64,
    pub min_attempts: u32,
    pub factor_threshold: f64,
    pub signal_threshold: f64,
    pub focus_count: usize,
    pub consistency_block_size: usize,
    pub default_retention: f64,
}

impl Default for WeaknessParams {
    fn default() -> Self {
        Self {
            mastery_target: 0.6,
            retention_amplification: 3.0,
            difficulty_target: 0.75,
            mastery_weight: 0.35,
            retention_weight: 0.25,
            difficulty_weight: 0.25,
            consistency_weight: 0.15,
            risk_threshold: 30.0,
            min_attempts: 20,
            factor_threshold: 0.4,
            signal_threshold: 0.3,
            focus_count: 3,
            consistency_block_size: 5,
            default_retention: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDurations {
    pub practice: u32,
    pub study: u32,
    pub revision: u32,
    pub mock_interview: u32,
}

impl Default for TaskDurations {
    fn default() -> Self {
        Self {
            practice: 45,
            study: 30,
            revision: 20,
            mock_interview: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerParams {
    pub durations: TaskDurations,
    pub topic_importance: Vec<(String, f64)>,
    pub default_importance: f64,
    pub low_retention_multiplier: f64,
    pub matched_difficulty_multiplier: f64,
    pub difficulty_match_threshold: f64,
    pub gain_weight: f64,
    pub urgency_weight: f64,
    pub low_mastery_boost: f64,
    pub low_mastery_threshold: f64,
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            durations: TaskDurations::default(),
            topic_importance: vec![
                ("data_structures".to_string(), 0.95),
                ("algorithms".to_string(), 0.93),
                ("system_design".to_string(), 0.85),
                ("databases".to_string(), 0.70),
                ("oop".to_string(), 0.65),
                ("networking".to_string(), 0.50),
            ],
            default_importance: 0.6,
            low_retention_multiplier: 1.5,
            matched_difficulty_multiplier: 1.2,
            difficulty_match_threshold: 0.7,
            gain_weight: 0.6,
            urgency_weight: 0.4,
            low_mastery_boost: 1.3,
            low_mastery_threshold: 0.4,
        }
    }
}

impl PlannerParams {
    pub fn importance_of(&self, topic_id: &str) -> f64 {
        self.topic_importance
            .iter()
            .find(|(id, _)| id == topic_id)
            .map(|(_, weight)| *weight)
            .unwrap_or(self.default_importance)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessParams {
    /// avg_mastery, stability, consistency, difficulty_progression,
    /// mock_interview, completion_rate, days_prepared
    pub feature_weights: [f64; 7],
    pub logistic_steepness: f64,
    pub target_readiness: f64,
    pub points_per_day: f64,
    pub passing_steepness: f64,
    pub completion_mastery: f64,
    pub gap_mastery: f64,
    pub full_preparation_days: f64,
    pub default_mock_score: f64,
}

impl Default for ReadinessParams {
    fn default() -> Self {
        Self {
            feature_weights: [0.25, 0.15, 0.15, 0.15, 0.15, 0.10, 0.05],
            logistic_steepness: 10.0,
            target_readiness: 80.0,
            points_per_day: 2.0,
            passing_steepness: 5.0,
            completion_mastery: 0.6,
            gap_mastery: 0.6,
            full_preparation_days: 60.0,
            default_mock_score: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub bkt: BktParams,
    pub trend: TrendParams,
    pub confidence: ConfidenceParams,
    pub retention: RetentionParams,
    pub weakness: WeaknessParams,
    pub planner: PlannerParams,
    pub readiness: ReadinessParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weakness_weights_sum_to_one() {
        let w = WeaknessParams::default();
        let total = w.mastery_weight + w.retention_weight + w.difficulty_weight + w.consistency_weight;
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_readiness_weights_sum_to_one() {
        let total: f64 = ReadinessParams::default().feature_weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_importance_lookup_falls_back_to_default() {
        let params = PlannerParams::default();
        assert!((params.importance_of("algorithms") - 0.93).abs() < 1e-12);
        assert!((params.importance_of("graphs") - 0.6).abs() < 1e-12);
    }
}
