//! Preparation Simulator
//!
//! Projects per-topic mastery curves and a readiness trajectory for a study
//! scenario. Focused topics gain with study time, the rest drift up slowly.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::snapshot::TopicSnapshot;
use crate::types::StudyConsistency;

const BASELINE_STUDY_HOURS: f64 = 2.0;
const FOCUS_DAILY_GAIN: f64 = 0.02;
const PASSIVE_DAILY_GAIN: f64 = 0.005;
const COMPLETION_READINESS: f64 = 80.0;
const MAX_TIMELINE_DAYS: u32 = 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationScenario {
    pub daily_study_hours: f64,
    #[serde(default)]
    pub focus_topics: Vec<String>,
    pub timeline_days: u32,
    #[serde(default)]
    pub consistency: StudyConsistency,
}

impl SimulationScenario {
    pub fn validate(&self) -> ValidationResult<()> {
        if !self.daily_study_hours.is_finite() || self.daily_study_hours <= 0.0 {
            return Err(ValidationError::new(
                "daily_study_hours",
                format!("must be positive, got {}", self.daily_study_hours),
            ));
        }
        if self.timeline_days == 0 || self.timeline_days > MAX_TIMELINE_DAYS {
            return Err(ValidationError::new(
                "timeline_days",
                format!("must be between 1 and {MAX_TIMELINE_DAYS}, got {}", self.timeline_days),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub scenario: SimulationScenario,
    pub projected_readiness_trajectory: Vec<f64>,
    pub projected_mastery_curves: BTreeMap<String, Vec<f64>>,
    /// First day the projected readiness reaches the completion mark
    pub completion_forecast_date: Option<DateTime<Utc>>,
    pub confidence_score: f64,
}

pub fn run_simulation(
    scenario: &SimulationScenario,
    topics: &[TopicSnapshot],
    now: DateTime<Utc>,
) -> ValidationResult<SimulationResult> {
    scenario.validate()?;

    let consistency = scenario.consistency.factor();
    let study = scenario.daily_study_hours / BASELINE_STUDY_HOURS;
    let focus: HashSet<&str> = scenario.focus_topics.iter().map(String::as_str).collect();

    let mut current: Vec<f64> = topics.iter().map(|t| t.mastery.mastery_probability).collect();
    let daily_gain: Vec<f64> = topics
        .iter()
        .map(|t| {
            if focus.contains(t.topic_id.as_str()) {
                FOCUS_DAILY_GAIN * study * consistency
            } else {
                PASSIVE_DAILY_GAIN * consistency
            }
        })
        .collect();

    let days = scenario.timeline_days as usize;
    let mut curves: Vec<Vec<f64>> = vec![Vec::with_capacity(days); topics.len()];
    let mut trajectory = Vec::with_capacity(if topics.is_empty() { 0 } else { days });

    for _ in 0..days {
        for (i, mastery) in current.iter_mut().enumerate() {
            *mastery = (*mastery + daily_gain[i]).min(1.0);
            curves[i].push(*mastery);
        }
        if !current.is_empty() {
            trajectory.push(current.iter().sum::<f64>() / current.len() as f64 * 100.0);
        }
    }

    let completion_forecast_date = trajectory
        .iter()
        .position(|&r| r >= COMPLETION_READINESS)
        .map(|day| now + Duration::days(day as i64));

    Ok(SimulationResult {
        scenario: scenario.clone(),
        projected_readiness_trajectory: trajectory,
        projected_mastery_curves: topics
            .iter()
            .map(|t| t.topic_id.clone())
            .zip(curves)
            .collect(),
        completion_forecast_date,
        confidence_score: (0.7 + 0.2 * consistency).min(0.95),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::mastery::MasteryState;
    use chrono::TimeZone;

    const TOL: f64 = 1e-9;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap()
    }

    fn topic(id: &str, mastery: f64) -> TopicSnapshot {
        let mut state = MasteryState::initial(&ModelConfig::default(), now());
        state.mastery_probability = mastery;
        TopicSnapshot::new(id, state, None)
    }

    fn scenario(hours: f64, focus: &[&str], days: u32, consistency: StudyConsistency) -> SimulationScenario {
        SimulationScenario {
            daily_study_hours: hours,
            focus_topics: focus.iter().map(|s| s.to_string()).collect(),
            timeline_days: days,
            consistency,
        }
    }

    #[test]
    fn test_focus_topics_grow_faster_and_accumulate() {
        let topics = vec![topic("graphs", 0.2), topic("sql", 0.2)];
        let result = run_simulation(
            &scenario(2.0, &["graphs"], 3, StudyConsistency::Medium),
            &topics,
            now(),
        )
        .unwrap();

        let graphs = &result.projected_mastery_curves["graphs"];
        let sql = &result.projected_mastery_curves["sql"];
        assert_eq!(graphs.len(), 3);
        assert!((graphs[0] - 0.22).abs() < TOL);
        assert!((graphs[2] - 0.26).abs() < TOL);
        assert!((sql[2] - 0.215).abs() < TOL);
        assert!((result.projected_readiness_trajectory[2] - (0.26 + 0.215) / 2.0 * 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_mastery_capped_at_one() {
        let topics = vec![topic("graphs", 0.99)];
        let result = run_simulation(&scenario(8.0, &["graphs"], 5, StudyConsistency::High), &topics, now()).unwrap();
        assert!(result.projected_mastery_curves["graphs"].iter().all(|&m| m <= 1.0));
        assert_eq!(result.projected_mastery_curves["graphs"][4], 1.0);
    }

    #[test]
    fn test_completion_forecast() {
        let topics = vec![topic("graphs", 0.79)];
        let result = run_simulation(&scenario(2.0, &["graphs"], 10, StudyConsistency::Medium), &topics, now()).unwrap();
        assert_eq!(result.completion_forecast_date, Some(now()));

        let topics = vec![topic("graphs", 0.1)];
        let result = run_simulation(&scenario(1.0, &[], 10, StudyConsistency::Low), &topics, now()).unwrap();
        assert_eq!(result.completion_forecast_date, None);
    }

    #[test]
    fn test_confidence_by_consistency() {
        let run = |c| run_simulation(&scenario(2.0, &[], 1, c), &[], now()).unwrap().confidence_score;
        assert!((run(StudyConsistency::High) - 0.94).abs() < TOL);
        assert!((run(StudyConsistency::Medium) - 0.9).abs() < TOL);
        assert!((run(StudyConsistency::Low) - 0.84).abs() < TOL);
    }

    #[test]
    fn test_invalid_scenarios_rejected() {
        let err = run_simulation(&scenario(0.0, &[], 10, StudyConsistency::High), &[], now()).unwrap_err();
        assert_eq!(err.field, "daily_study_hours");
        let err = run_simulation(&scenario(2.0, &[], 0, StudyConsistency::High), &[], now()).unwrap_err();
        assert_eq!(err.field, "timeline_days");
    }
}
