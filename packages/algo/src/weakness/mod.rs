//! Weakness Detection
//!
//! Weighted risk scoring over mastery, retention, difficulty fit and
//! performance consistency. Read-only over the model states.
//!
//! ```text
//! risk = 100 · (0.35·mastery_gap + 0.25·retention_risk
//!             + 0.25·difficulty_gap + 0.15·(1 − consistency))
//! ```
//!
//! Only topics with enough attempts are scored, and only those strictly
//! above the risk threshold are reported.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, WeaknessParams};
use crate::sanitize::{clamp_range, clamp_unit, mean};
use crate::snapshot::TopicSnapshot;
use crate::types::{AnalysisStatus, Explanation, SignalType};

const MODEL_NAME: &str = "Weighted Risk Scoring";

/// Reported risk above which a topic counts as "at risk" in the metrics
const AT_RISK_SCORE: f64 = 40.0;

pub fn mastery_gap(mastery: f64, params: &WeaknessParams) -> f64 {
    ((params.mastery_target - mastery) / params.mastery_target).max(0.0)
}

/// Exponentially amplified forgetting risk, no threshold gating.
pub fn retention_risk(retention: f64, params: &WeaknessParams) -> f64 {
    clamp_unit(1.0 - (-params.retention_amplification * (1.0 - retention)).exp())
}

pub fn difficulty_gap(recent_success: f64, params: &WeaknessParams) -> f64 {
    (recent_success - params.difficulty_target).abs() / params.difficulty_target
}

pub fn risk_score(
    mastery_gap: f64,
    retention_risk: f64,
    difficulty_gap: f64,
    consistency: f64,
    params: &WeaknessParams,
) -> f64 {
    let weighted = params.mastery_weight * mastery_gap
        + params.retention_weight * retention_risk
        + params.difficulty_weight * difficulty_gap
        + params.consistency_weight * (1.0 - consistency);
    clamp_range(100.0 * weighted, 0.0, 100.0)
}

fn signal_type(mg: f64, rr: f64, dg: f64, threshold: f64) -> SignalType {
    let max = mg.max(rr).max(dg);
    if max == mg && mg > threshold {
        SignalType::MasteryGap
    } else if max == rr && rr > threshold {
        SignalType::RetentionDecay
    } else if max == dg && dg > threshold {
        SignalType::PerformanceVariance
    } else {
        SignalType::GeneralWeakness
    }
}

fn recommendation(signal: SignalType, mastery: f64, retention: f64, params: &WeaknessParams) -> String {
    match signal {
        SignalType::MasteryGap => format!(
            "Increase practice: current {:.0}% vs target {:.0}%",
            mastery * 100.0,
            params.mastery_target * 100.0
        ),
        SignalType::RetentionDecay => {
            format!("Urgent review needed: retention at {:.0}%", retention * 100.0)
        }
        SignalType::PerformanceVariance => "Mixed performance, focus on fundamentals".to_string(),
        SignalType::GeneralWeakness => "Targeted practice recommended".to_string(),
    }
}

/// Scored weak topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRisk {
    pub topic_id: String,
    pub risk_score: f64,
    pub mastery_gap: f64,
    pub retention_risk: f64,
    pub difficulty_gap: f64,
    pub consistency_score: f64,
    pub factors: Vec<String>,
    pub signal_type: SignalType,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeaknessMetrics {
    pub average_risk: f64,
    pub max_risk: f64,
    pub topics_at_risk: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaknessReport {
    pub status: AnalysisStatus,
    pub weak_topics: Vec<TopicRisk>,
    pub focus_areas: Vec<String>,
    pub intervention_priority_score: f64,
    pub insufficient_data_topics: Vec<String>,
    pub metrics: WeaknessMetrics,
    pub explanation: Explanation,
}

/// Score one topic, `None` if it has too few attempts or too little risk.
pub fn score_topic(topic: &TopicSnapshot, now: DateTime<Utc>, params: &WeaknessParams) -> Option<TopicRisk> {
    let state = &topic.mastery;
    if state.attempt_count <= params.min_attempts {
        return None;
    }

    let retention = topic
        .retention
        .as_ref()
        .map(|r| r.retention_at(now))
        .unwrap_or(params.default_retention);
    let consistency = state.consistency(params.consistency_block_size);

    let mg = mastery_gap(state.mastery_probability, params);
    let rr = retention_risk(retention, params);
    let dg = difficulty_gap(state.recent_performance, params);
    let risk = risk_score(mg, rr, dg, consistency, params);
    if risk <= params.risk_threshold {
        return None;
    }

    let factors = [
        ("mastery_gap", mg),
        ("retention_risk", rr),
        ("difficulty_gap", dg),
        ("consistency_score", 1.0 - consistency),
    ]
    .into_iter()
    .filter(|(_, value)| *value > params.factor_threshold)
    .map(|(name, _)| name.to_string())
    .collect();

    let signal = signal_type(mg, rr, dg, params.signal_threshold);
    Some(TopicRisk {
        topic_id: topic.topic_id.clone(),
        risk_score: risk,
        mastery_gap: mg,
        retention_risk: rr,
        difficulty_gap: dg,
        consistency_score: consistency,
        factors,
        signal_type: signal,
        recommendation: recommendation(signal, state.mastery_probability, retention, params),
    })
}

/// Rank a learner's weak topics.
///
/// Topics are scored independently in parallel; the report order is risk
/// descending, ties keeping input order.
pub fn analyze_weaknesses(topics: &[TopicSnapshot], now: DateTime<Utc>, config: &ModelConfig) -> WeaknessReport {
    let params = &config.weakness;

    let insufficient_data_topics: Vec<String> = topics
        .iter()
        .filter(|t| t.mastery.attempt_count <= params.min_attempts)
        .map(|t| t.topic_id.clone())
        .collect();
    let scored_count = topics.len() - insufficient_data_topics.len();

    let mut weak_topics: Vec<TopicRisk> = topics
        .par_iter()
        .filter_map(|topic| score_topic(topic, now, params))
        .collect();
    weak_topics.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));

    let top: Vec<&TopicRisk> = weak_topics.iter().take(params.focus_count).collect();
    let focus_areas: Vec<String> = top.iter().map(|t| t.topic_id.clone()).collect();
    let top_risks: Vec<f64> = top.iter().map(|t| t.risk_score).collect();
    let intervention_priority_score = clamp_unit(mean(&top_risks) / 100.0);

    let risks: Vec<f64> = weak_topics.iter().map(|t| t.risk_score).collect();
    let metrics = WeaknessMetrics {
        average_risk: mean(&risks),
        max_risk: risks.iter().copied().fold(0.0, f64::max),
        topics_at_risk: risks.iter().filter(|&&r| r > AT_RISK_SCORE).count(),
    };

    let status = if scored_count == 0 {
        AnalysisStatus::InsufficientData
    } else {
        AnalysisStatus::Analyzed
    };

    let explanation = Explanation {
        model: MODEL_NAME.to_string(),
        reason: match status {
            AnalysisStatus::InsufficientData => format!(
                "No topic has more than {} attempts yet, keep practicing",
                params.min_attempts
            ),
            AnalysisStatus::Analyzed => format!(
                "{} of {} scored topics above risk {:.0}",
                weak_topics.len(),
                scored_count,
                params.risk_threshold
            ),
        },
        factors: weak_topics
            .iter()
            .take(params.focus_count)
            .map(|t| format!("{}: {}", t.topic_id, t.signal_type.as_str()))
            .collect(),
    };

    WeaknessReport {
        status,
        weak_topics,
        focus_areas,
        intervention_priority_score,
        insufficient_data_topics,
        metrics,
        explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mastery::{update_mastery, AttemptRecord, MasteryState};
    use crate::retention::update_retention;
    use chrono::TimeZone;

    const TOL: f64 = 1e-9;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap()
    }

    fn topic(id: &str, mastery: f64, recent: f64, attempts: u32) -> TopicSnapshot {
        let mut state = MasteryState::initial(&ModelConfig::default(), now());
        state.mastery_probability = mastery;
        state.recent_performance = recent;
        state.attempt_count = attempts;
        state.success_count = attempts / 2;
        TopicSnapshot::new(id, state, None)
    }

    #[test]
    fn test_component_formulas() {
        let p = WeaknessParams::default();
        assert_eq!(mastery_gap(0.8, &p), 0.0);
        assert!((mastery_gap(0.3, &p) - 0.5).abs() < TOL);
        assert!((retention_risk(0.5, &p) - 0.776_869_839_851_570_2).abs() < TOL);
        assert!(retention_risk(1.0, &p).abs() < TOL);
        assert!(difficulty_gap(0.75, &p).abs() < TOL);
        assert!((difficulty_gap(0.0, &p) - 1.0).abs() < TOL);
    }

    #[test]
    fn test_risk_score_weighting() {
        let p = WeaknessParams::default();
        let risk = risk_score(1.0, 1.0, 1.0, 0.0, &p);
        assert!((risk - 100.0).abs() < TOL);
        let risk = risk_score(0.5, 0.0, 0.0, 1.0, &p);
        assert!((risk - 17.5).abs() < TOL);
    }

    #[test]
    fn test_empty_input_is_insufficient_data() {
        let report = analyze_weaknesses(&[], now(), &ModelConfig::default());
        assert_eq!(report.status, AnalysisStatus::InsufficientData);
        assert!(report.weak_topics.is_empty());
        assert_eq!(report.intervention_priority_score, 0.0);
    }

    #[test]
    fn test_low_attempt_topics_are_excluded() {
        let topics = vec![topic("dp", 0.1, 0.2, 20), topic("graphs", 0.1, 0.2, 21)];
        let report = analyze_weaknesses(&topics, now(), &ModelConfig::default());
        assert_eq!(report.status, AnalysisStatus::Analyzed);
        assert_eq!(report.insufficient_data_topics, vec!["dp"]);
        assert_eq!(report.focus_areas, vec!["graphs"]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let t = topic("trees", 0.5, 0.6, 30);
        let params = WeaknessParams::default();
        let risk = score_topic(&t, now(), &WeaknessParams {
            risk_threshold: 0.0,
            ..params.clone()
        })
        .unwrap()
        .risk_score;

        let mut config = ModelConfig::default();
        config.weakness.risk_threshold = risk;
        assert!(analyze_weaknesses(&[t.clone()], now(), &config).weak_topics.is_empty());

        config.weakness.risk_threshold = risk - 0.01;
        assert_eq!(analyze_weaknesses(&[t], now(), &config).weak_topics.len(), 1);
    }

    #[test]
    fn test_missing_retention_defaults_to_half() {
        let t = topic("sql", 0.6, 0.75, 25);
        let params = WeaknessParams {
            risk_threshold: 0.0,
            ..WeaknessParams::default()
        };
        let risk = score_topic(&t, now(), &params).unwrap();
        assert!((risk.retention_risk - 0.776_869_839_851_570_2).abs() < TOL);
        // mg = 0, dg = 0, trend fallback consistency 0.6
        let expected = 100.0 * (0.25 * 0.776_869_839_851_570_2 + 0.15 * 0.4);
        assert!((risk.risk_score - expected).abs() < 1e-6);
        assert!(risk.factors.contains(&"retention_risk".to_string()));
        assert!(!risk.factors.contains(&"mastery_gap".to_string()));
        assert_eq!(risk.signal_type, SignalType::RetentionDecay);
    }

    #[test]
    fn test_erratic_blocks_flag_consistency_score() {
        let attempts: Vec<AttemptRecord> = (0..30)
            .map(|i| AttemptRecord::new((i / 5) % 2 == 0, 3))
            .collect();
        let config = ModelConfig::default();
        let state = update_mastery(None, &attempts, now(), &config).unwrap().state;
        let t = TopicSnapshot::new("graphs", state, None);
        let params = WeaknessParams {
            risk_threshold: 0.0,
            ..config.weakness.clone()
        };

        let risk = score_topic(&t, now(), &params).unwrap();
        assert!(risk.consistency_score < TOL);
        assert!(risk.factors.contains(&"consistency_score".to_string()));
        assert!(risk
            .factors
            .iter()
            .all(|f| ["mastery_gap", "retention_risk", "difficulty_gap", "consistency_score"].contains(&f.as_str())));
    }

    #[test]
    fn test_fresh_revision_lowers_retention_risk() {
        let mut t = topic("sql", 0.6, 0.75, 25);
        let revision = update_retention(None, true, 0.0, now(), &Default::default()).unwrap();
        t.retention = Some(revision.state);
        assert!(score_topic(&t, now(), &WeaknessParams::default()).is_none());
    }

    #[test]
    fn test_sorted_by_risk_and_focus_limited() {
        let topics = vec![
            topic("a", 0.5, 0.6, 30),
            topic("b", 0.1, 0.3, 30),
            topic("c", 0.3, 0.3, 30),
            topic("d", 0.2, 0.2, 30),
        ];
        let report = analyze_weaknesses(&topics, now(), &ModelConfig::default());
        let ids: Vec<_> = report.weak_topics.iter().map(|t| t.topic_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "c", "a"]);
        assert_eq!(report.focus_areas, vec!["b", "d", "c"]);

        let top3 = mean(
            &report.weak_topics[..3]
                .iter()
                .map(|t| t.risk_score)
                .collect::<Vec<_>>(),
        );
        assert!((report.intervention_priority_score - top3 / 100.0).abs() < TOL);
        assert_eq!(report.weak_topics[0].signal_type, SignalType::MasteryGap);
        assert!(report.weak_topics[0].recommendation.starts_with("Increase practice"));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let topics = vec![topic("x", 0.2, 0.2, 30), topic("y", 0.2, 0.2, 30)];
        let report = analyze_weaknesses(&topics, now(), &ModelConfig::default());
        assert_eq!(report.focus_areas, vec!["x", "y"]);
    }
}
