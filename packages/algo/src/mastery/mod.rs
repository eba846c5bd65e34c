//! Mastery Engine
//!
//! Per-topic mastery tracking on top of Bayesian Knowledge Tracing.
//!
//! A batch of attempts is validated in full before any state changes, then
//! applied in order. Besides the BKT belief the engine maintains:
//! - bounded outcome history for windowed performance and trend
//! - confidence from evidence volume, hint reliance and pacing
//! - next recommended difficulty

pub mod bkt;
pub mod trend;

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ConfidenceParams, ModelConfig};
use crate::error::{ValidationError, ValidationResult};
use crate::sanitize::{clamp_unit, mean};
use crate::types::{
    Explanation, ImprovementTrend, MAX_DIFFICULTY, MIN_DIFFICULTY, TIME_FACTOR_RANGE,
};

pub use bkt::{bkt_step, posterior_given_evidence};
pub use trend::{classify_trend, consistency_score, OutcomeSample};

/// Topics above this mastery are reported as strong
pub const STRONG_MASTERY: f64 = 0.7;
/// Topics below this mastery are reported as weak
pub const WEAK_MASTERY: f64 = 0.4;

const MODEL_NAME: &str = "Bayesian Knowledge Tracing";

// ==================== Attempts ====================

/// Attempt as received from a caller, before validation.
///
/// Every field is optional so a missing value surfaces as a field-level
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptInput {
    pub correct: Option<bool>,
    pub difficulty: Option<i64>,
    pub hints_used: Option<i64>,
    pub time_factor: Option<f64>,
    pub attempted_at: Option<DateTime<Utc>>,
}

impl AttemptInput {
    pub fn into_record(self, index: usize) -> ValidationResult<AttemptRecord> {
        let field = |name: &str| format!("attempts[{index}].{name}");

        let correct = self.correct.ok_or_else(|| ValidationError::missing(field("correct")))?;
        let difficulty = self
            .difficulty
            .ok_or_else(|| ValidationError::missing(field("difficulty")))?;
        if !(MIN_DIFFICULTY as i64..=MAX_DIFFICULTY as i64).contains(&difficulty) {
            return Err(ValidationError::new(
                field("difficulty"),
                format!("must be between {MIN_DIFFICULTY} and {MAX_DIFFICULTY}, got {difficulty}"),
            ));
        }
        let hints_used = self.hints_used.unwrap_or(0);
        if hints_used < 0 {
            return Err(ValidationError::new(
                field("hints_used"),
                format!("must be non-negative, got {hints_used}"),
            ));
        }
        let hints_used = u32::try_from(hints_used).map_err(|_| {
            ValidationError::new(field("hints_used"), format!("is too large: {hints_used}"))
        })?;

        let record = AttemptRecord {
            correct,
            difficulty: difficulty as u8,
            hints_used,
            time_factor: self.time_factor.unwrap_or(1.0),
            attempted_at: self.attempted_at,
        };
        record.validate(index)?;
        Ok(record)
    }
}

/// Validated attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub correct: bool,
    pub difficulty: u8,
    pub hints_used: u32,
    pub time_factor: f64,
    pub attempted_at: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    pub fn new(correct: bool, difficulty: u8) -> Self {
        Self {
            correct,
            difficulty,
            hints_used: 0,
            time_factor: 1.0,
            attempted_at: None,
        }
    }

    pub fn with_hints(mut self, hints_used: u32) -> Self {
        self.hints_used = hints_used;
        self
    }

    pub fn with_time_factor(mut self, time_factor: f64) -> Self {
        self.time_factor = time_factor;
        self
    }

    pub fn at(mut self, attempted_at: DateTime<Utc>) -> Self {
        self.attempted_at = Some(attempted_at);
        self
    }

    pub fn validate(&self, index: usize) -> ValidationResult<()> {
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty) {
            return Err(ValidationError::new(
                format!("attempts[{index}].difficulty"),
                format!(
                    "must be between {MIN_DIFFICULTY} and {MAX_DIFFICULTY}, got {}",
                    self.difficulty
                ),
            ));
        }
        let (lo, hi) = TIME_FACTOR_RANGE;
        if !self.time_factor.is_finite() || self.time_factor < lo || self.time_factor > hi {
            return Err(ValidationError::new(
                format!("attempts[{index}].time_factor"),
                format!("must be between {lo} and {hi}, got {}", self.time_factor),
            ));
        }
        Ok(())
    }
}

/// Validate a raw batch. Fails on the first offending field.
pub fn parse_attempts(inputs: Vec<AttemptInput>) -> ValidationResult<Vec<AttemptRecord>> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| input.into_record(i))
        .collect()
}

fn validate_batch(attempts: &[AttemptRecord]) -> ValidationResult<()> {
    if attempts.is_empty() {
        return Err(ValidationError::new("attempts", "must contain at least one attempt"));
    }
    let mut last_seen: Option<DateTime<Utc>> = None;
    for (i, attempt) in attempts.iter().enumerate() {
        attempt.validate(i)?;
        if let Some(at) = attempt.attempted_at {
            if let Some(prev) = last_seen {
                if at < prev {
                    return Err(ValidationError::new(
                        format!("attempts[{i}].attempted_at"),
                        "attempts must be in chronological order",
                    ));
                }
            }
            last_seen = Some(at);
        }
    }
    Ok(())
}

// ==================== State ====================

/// Persisted per-(user, topic) mastery state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryState {
    pub mastery_probability: f64,
    pub confidence_score: f64,
    pub attempt_count: u32,
    pub success_count: u32,
    pub recent_performance: f64,
    pub improvement_trend: ImprovementTrend,
    pub recommended_difficulty: u8,
    pub hints_total: u64,
    pub time_deviation_total: f64,
    pub matched_difficulty_count: u32,
    #[serde(default)]
    pub recent_outcomes: VecDeque<OutcomeSample>,
    pub last_updated: DateTime<Utc>,
}

impl MasteryState {
    /// State of a topic never attempted before.
    pub fn initial(config: &ModelConfig, now: DateTime<Utc>) -> Self {
        let mastery = config.bkt.p_init;
        Self {
            mastery_probability: mastery,
            confidence_score: 0.0,
            attempt_count: 0,
            success_count: 0,
            recent_performance: 0.0,
            improvement_trend: ImprovementTrend::Stable,
            recommended_difficulty: recommend_difficulty(mastery, 0.0, 0),
            hints_total: 0,
            time_deviation_total: 0.0,
            matched_difficulty_count: 0,
            recent_outcomes: VecDeque::new(),
            last_updated: now,
        }
    }

    /// Lifetime success rate, 0 before any attempt.
    pub fn success_rate(&self) -> f64 {
        if self.attempt_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.attempt_count as f64
        }
    }

    pub fn consistency(&self, block_size: usize) -> f64 {
        consistency_score(&self.recent_outcomes, self.improvement_trend, block_size)
    }
}

/// Result of applying one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryUpdate {
    pub state: MasteryState,
    pub explanation: Explanation,
}

// ==================== Update ====================

/// Next difficulty to serve given current mastery and recent accuracy.
///
/// Recent performance only shifts the mastery bucket once at least three
/// recent samples exist.
pub fn recommend_difficulty(mastery: f64, recent_performance: f64, recent_samples: usize) -> u8 {
    let base: i32 = if mastery < 0.2 {
        1
    } else if mastery < 0.4 {
        2
    } else if mastery < 0.6 {
        3
    } else if mastery < 0.8 {
        4
    } else {
        5
    };
    let shift = if recent_samples < 3 {
        0
    } else if recent_performance >= 0.85 {
        1
    } else if recent_performance <= 0.4 {
        -1
    } else {
        0
    };
    (base + shift).clamp(MIN_DIFFICULTY as i32, MAX_DIFFICULTY as i32) as u8
}

fn confidence(state: &MasteryState, params: &ConfidenceParams) -> f64 {
    if state.attempt_count == 0 {
        return 0.0;
    }
    let n = state.attempt_count as f64;
    let n_eff = n + params.matched_bonus * state.matched_difficulty_count as f64;
    let evidence = 1.0 - (-n_eff / params.attempt_scale).exp();

    let avg_hints = state.hints_total as f64 / n;
    let hint_penalty = (params.hint_penalty_per_hint * avg_hints).min(params.max_hint_penalty);

    let avg_deviation = state.time_deviation_total / n;
    let time_penalty = (params.time_penalty_per_unit * avg_deviation).min(params.max_time_penalty);

    clamp_unit(evidence * (1.0 - hint_penalty) * (1.0 - time_penalty))
}

/// Apply a batch of attempts to a topic's mastery state.
///
/// `prior` is `None` for a topic the learner has never attempted. The batch
/// is rejected as a whole if any attempt is invalid; the prior is never
/// modified.
pub fn update_mastery(
    prior: Option<&MasteryState>,
    attempts: &[AttemptRecord],
    now: DateTime<Utc>,
    config: &ModelConfig,
) -> ValidationResult<MasteryUpdate> {
    validate_batch(attempts)?;

    let mut state = prior
        .cloned()
        .unwrap_or_else(|| MasteryState::initial(config, now));
    let mastery_before = state.mastery_probability;
    let window = config.trend.window_size;
    let mut p = mastery_before;

    for attempt in attempts {
        let in_force = recommend_difficulty(
            p,
            trend::recent_rate(&state.recent_outcomes, window),
            trend::recent_len(&state.recent_outcomes, window),
        );
        if attempt.difficulty.abs_diff(in_force) <= 1 {
            state.matched_difficulty_count += 1;
        }

        p = bkt_step(p, attempt.correct, &config.bkt);

        state.attempt_count += 1;
        if attempt.correct {
            state.success_count += 1;
        }
        state.hints_total += attempt.hints_used as u64;
        state.time_deviation_total += (attempt.time_factor - 1.0).abs();
        trend::push_outcome(
            &mut state.recent_outcomes,
            OutcomeSample {
                correct: attempt.correct,
                difficulty: attempt.difficulty,
            },
            config.trend.history_capacity,
        );
    }

    state.mastery_probability = clamp_unit(p);
    state.recent_performance = trend::recent_rate(&state.recent_outcomes, window);
    state.improvement_trend =
        classify_trend(&state.recent_outcomes, mastery_before, p, &config.trend);
    state.confidence_score = confidence(&state, &config.confidence);
    state.recommended_difficulty = recommend_difficulty(
        state.mastery_probability,
        state.recent_performance,
        trend::recent_len(&state.recent_outcomes, window),
    );
    state.last_updated = now;

    let explanation = explain(&state, mastery_before, attempts);
    Ok(MasteryUpdate { state, explanation })
}

fn explain(state: &MasteryState, mastery_before: f64, attempts: &[AttemptRecord]) -> Explanation {
    let correct = attempts.iter().filter(|a| a.correct).count();
    let delta = state.mastery_probability - mastery_before;
    Explanation {
        model: MODEL_NAME.to_string(),
        reason: format!(
            "Mastery estimated at {:.1}% after {} total attempts",
            state.mastery_probability * 100.0,
            state.attempt_count
        ),
        factors: vec![
            format!("{correct}/{} correct in this batch", attempts.len()),
            format!("mastery changed by {:+.1} points", delta * 100.0),
            format!("recent performance {:.0}%", state.recent_performance * 100.0),
            format!("confidence {:.2}", state.confidence_score),
            format!("trend {}", state.improvement_trend.as_str()),
        ],
    }
}

// ==================== Profile ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicMasterySummary {
    pub topic_id: String,
    pub mastery_probability: f64,
    pub confidence_score: f64,
    pub improvement_trend: ImprovementTrend,
    pub attempt_count: u32,
    pub recommended_difficulty: u8,
}

/// Aggregate view of one learner's topics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryProfile {
    pub average_mastery: f64,
    pub topics_count: usize,
    pub strong_topics: Vec<String>,
    pub weak_topics: Vec<String>,
    pub topics: Vec<TopicMasterySummary>,
}

pub fn summarize_profile(topics: &[(String, MasteryState)]) -> MasteryProfile {
    let masteries: Vec<f64> = topics.iter().map(|(_, s)| s.mastery_probability).collect();
    let pick = |keep: fn(f64) -> bool| -> Vec<String> {
        topics
            .iter()
            .filter(|(_, s)| keep(s.mastery_probability))
            .map(|(id, _)| id.clone())
            .collect()
    };

    MasteryProfile {
        average_mastery: mean(&masteries),
        topics_count: topics.len(),
        strong_topics: pick(|m| m > STRONG_MASTERY),
        weak_topics: pick(|m| m < WEAK_MASTERY),
        topics: topics
            .iter()
            .map(|(id, s)| TopicMasterySummary {
                topic_id: id.clone(),
                mastery_probability: s.mastery_probability,
                confidence_score: s.confidence_score,
                improvement_trend: s.improvement_trend,
                attempt_count: s.attempt_count,
                recommended_difficulty: s.recommended_difficulty,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const TOL: f64 = 1e-9;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn apply(prior: Option<&MasteryState>, attempts: &[AttemptRecord]) -> MasteryState {
        update_mastery(prior, attempts, now(), &ModelConfig::default())
            .unwrap()
            .state
    }

    #[test]
    fn test_two_correct_attempts_from_nothing() {
        let state = apply(None, &[AttemptRecord::new(true, 3), AttemptRecord::new(true, 3)]);
        assert!((state.mastery_probability - 0.941_273_425_152_404_6).abs() < TOL);
        assert_eq!(state.attempt_count, 2);
        assert_eq!(state.success_count, 2);
        assert_eq!(state.recent_performance, 1.0);
        assert_eq!(state.improvement_trend, ImprovementTrend::Improving);
        // bucket 5, no recent shift with fewer than 3 samples
        assert_eq!(state.recommended_difficulty, 5);
    }

    #[test]
    fn test_order_of_attempts_matters() {
        let a = apply(None, &[AttemptRecord::new(true, 2), AttemptRecord::new(false, 2)]);
        let b = apply(None, &[AttemptRecord::new(false, 2), AttemptRecord::new(true, 2)]);
        assert!((a.mastery_probability - 0.212_083_473_577_919_87).abs() < TOL);
        assert!((b.mastery_probability - 0.586_486_486_486_486_5).abs() < TOL);
    }

    #[test]
    fn test_incorrect_attempts_never_raise_mastery() {
        let mut prior = MasteryState::initial(&ModelConfig::default(), now());
        prior.mastery_probability = 0.5;
        let state = apply(Some(&prior), &[AttemptRecord::new(false, 3), AttemptRecord::new(false, 3)]);
        assert!((state.mastery_probability - 0.161_268_362_594_052_3).abs() < TOL);
        assert_eq!(state.improvement_trend, ImprovementTrend::Declining);
    }

    #[test]
    fn test_prior_is_not_mutated() {
        let first = apply(None, &[AttemptRecord::new(true, 1)]);
        let snapshot = first.clone();
        let _ = apply(Some(&first), &[AttemptRecord::new(false, 1)]);
        assert_eq!(first, snapshot);
    }

    #[test]
    fn test_empty_batch_rejected() {
        let err = update_mastery(None, &[], now(), &ModelConfig::default()).unwrap_err();
        assert_eq!(err.field, "attempts");
    }

    #[test]
    fn test_out_of_range_difficulty_names_field() {
        let attempts = [AttemptRecord::new(true, 3), AttemptRecord::new(true, 7)];
        let err = update_mastery(None, &attempts, now(), &ModelConfig::default()).unwrap_err();
        assert_eq!(err.field, "attempts[1].difficulty");
    }

    #[test]
    fn test_time_factor_bounds() {
        let ok = [AttemptRecord::new(true, 3).with_time_factor(0.5)];
        assert!(update_mastery(None, &ok, now(), &ModelConfig::default()).is_ok());
        let bad = [AttemptRecord::new(true, 3).with_time_factor(2.5)];
        let err = update_mastery(None, &bad, now(), &ModelConfig::default()).unwrap_err();
        assert_eq!(err.field, "attempts[0].time_factor");
    }

    #[test]
    fn test_out_of_order_timestamps_rejected() {
        let attempts = [
            AttemptRecord::new(true, 3).at(now()),
            AttemptRecord::new(true, 3).at(now() - Duration::minutes(5)),
        ];
        let err = update_mastery(None, &attempts, now(), &ModelConfig::default()).unwrap_err();
        assert_eq!(err.field, "attempts[1].attempted_at");
    }

    #[test]
    fn test_input_defaults_and_missing_fields() {
        let record = AttemptInput {
            correct: Some(true),
            difficulty: Some(2),
            ..Default::default()
        }
        .into_record(0)
        .unwrap();
        assert_eq!(record.hints_used, 0);
        assert_eq!(record.time_factor, 1.0);

        let err = AttemptInput {
            difficulty: Some(2),
            ..Default::default()
        }
        .into_record(4)
        .unwrap_err();
        assert_eq!(err.field, "attempts[4].correct");

        let err = AttemptInput {
            correct: Some(false),
            difficulty: Some(2),
            hints_used: Some(-1),
            ..Default::default()
        }
        .into_record(0)
        .unwrap_err();
        assert_eq!(err.field, "attempts[0].hints_used");
    }

    #[test]
    fn test_history_is_bounded() {
        let config = ModelConfig::default();
        let attempts: Vec<_> = (0..100).map(|i| AttemptRecord::new(i % 3 != 0, 3)).collect();
        let state = update_mastery(None, &attempts, now(), &config).unwrap().state;
        assert_eq!(state.recent_outcomes.len(), config.trend.history_capacity);
        assert_eq!(state.attempt_count, 100);
    }

    #[test]
    fn test_hints_and_pacing_lower_confidence() {
        let clean: Vec<_> = (0..10).map(|_| AttemptRecord::new(true, 3)).collect();
        let assisted: Vec<_> = (0..10)
            .map(|_| AttemptRecord::new(true, 3).with_hints(3).with_time_factor(2.0))
            .collect();
        let a = apply(None, &clean);
        let b = apply(None, &assisted);
        assert!(b.confidence_score < a.confidence_score);
        assert!(a.confidence_score > 0.0 && a.confidence_score <= 1.0);
    }

    #[test]
    fn test_recommend_difficulty_buckets_and_shift() {
        assert_eq!(recommend_difficulty(0.1, 0.0, 0), 1);
        assert_eq!(recommend_difficulty(0.5, 0.5, 10), 3);
        assert_eq!(recommend_difficulty(0.5, 0.9, 10), 4);
        assert_eq!(recommend_difficulty(0.5, 0.3, 10), 2);
        assert_eq!(recommend_difficulty(0.95, 1.0, 10), 5);
        assert_eq!(recommend_difficulty(0.05, 0.0, 10), 1);
        assert_eq!(recommend_difficulty(0.5, 0.0, 2), 3);
    }

    #[test]
    fn test_explanation_mentions_model() {
        let update = update_mastery(None, &[AttemptRecord::new(true, 2)], now(), &ModelConfig::default())
            .unwrap();
        assert_eq!(update.explanation.model, "Bayesian Knowledge Tracing");
        assert!(update.explanation.factors[0].starts_with("1/1 correct"));
    }

    #[test]
    fn test_summarize_profile_partitions_topics() {
        let mut strong = MasteryState::initial(&ModelConfig::default(), now());
        strong.mastery_probability = 0.9;
        let mut middle = strong.clone();
        middle.mastery_probability = 0.5;
        let mut weak = strong.clone();
        weak.mastery_probability = 0.1;

        let profile = summarize_profile(&[
            ("graphs".to_string(), strong),
            ("dp".to_string(), middle),
            ("trees".to_string(), weak),
        ]);
        assert_eq!(profile.topics_count, 3);
        assert_eq!(profile.strong_topics, vec!["graphs"]);
        assert_eq!(profile.weak_topics, vec!["trees"]);
        assert!((profile.average_mastery - 0.5).abs() < TOL);

        let empty = summarize_profile(&[]);
        assert_eq!(empty.average_mastery, 0.0);
    }
}
