//! Adaptive Planner
//!
//! Turns model state into a ranked task list for one day:
//!
//! 1. one candidate task per topic, typed by mastery band
//! 2. expected learning gain `(1 − m) · importance · multiplier`, clipped to [0, 1]
//! 3. priority `0.6 · gain + 0.4 · urgency`, boosted for low mastery
//! 4. greedy fill of the daily budget in priority order

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, PlannerParams};
use crate::error::{ValidationError, ValidationResult};
use crate::sanitize::clamp_unit;
use crate::snapshot::TopicSnapshot;
use crate::types::{Explanation, TaskDifficulty, TaskType};
use crate::weakness::difficulty_gap;

const STRATEGY: &str = "Bayesian mastery + retention-aware task sequencing";
const MAX_DAILY_MINUTES: u32 = 24 * 60;
const WEEK_DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub user_id: String,
    pub daily_study_minutes: u32,
    #[serde(default)]
    pub preparation_days: Option<u32>,
}

impl PlanRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::new("user_id", "must not be empty"));
        }
        if self.daily_study_minutes == 0 || self.daily_study_minutes > MAX_DAILY_MINUTES {
            return Err(ValidationError::new(
                "daily_study_minutes",
                format!(
                    "must be between 1 and {MAX_DAILY_MINUTES}, got {}",
                    self.daily_study_minutes
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecommendation {
    pub task_id: String,
    pub topic_id: String,
    pub task_type: TaskType,
    pub difficulty: TaskDifficulty,
    pub priority: f64,
    pub urgency: f64,
    pub estimated_time_minutes: u32,
    pub expected_learning_gain: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: String,
    pub focus_count: usize,
    pub study_minutes: u32,
    pub recommended_mix: Vec<TaskType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptivePlan {
    pub user_id: String,
    pub plan_date: NaiveDate,
    pub total_study_minutes: u32,
    pub tasks_today: Vec<TaskRecommendation>,
    pub weekly_focus: Vec<String>,
    pub weekly_structure: Vec<DayPlan>,
    pub candidates_considered: usize,
    pub explanation: Explanation,
}

pub fn learning_gain(mastery: f64, importance: f64, retention: f64, difficulty_match: f64, params: &PlannerParams) -> f64 {
    let multiplier = if retention < 0.5 {
        params.low_retention_multiplier
    } else if difficulty_match > params.difficulty_match_threshold {
        params.matched_difficulty_multiplier
    } else {
        1.0
    };
    clamp_unit((1.0 - mastery) * importance * multiplier)
}

pub fn task_priority(gain: f64, urgency: f64, mastery: f64, params: &PlannerParams) -> f64 {
    let priority = params.gain_weight * gain + params.urgency_weight * urgency;
    if mastery < params.low_mastery_threshold {
        priority * params.low_mastery_boost
    } else {
        priority
    }
}

fn urgency(is_focus: bool, mastery: f64, retention: f64) -> f64 {
    if is_focus {
        0.9
    } else if mastery < 0.5 {
        0.7
    } else if retention < 0.5 {
        0.6
    } else {
        0.3
    }
}

fn task_shape(mastery: f64, retention: f64) -> (TaskType, TaskDifficulty) {
    if mastery < 0.4 {
        (TaskType::Study, TaskDifficulty::Easy)
    } else if mastery < 0.7 {
        (TaskType::Practice, TaskDifficulty::Medium)
    } else if retention < 0.7 {
        (TaskType::Revision, TaskDifficulty::Hard)
    } else {
        (TaskType::MockInterview, TaskDifficulty::Hard)
    }
}

fn duration_of(task_type: TaskType, params: &PlannerParams) -> u32 {
    match task_type {
        TaskType::Practice => params.durations.practice,
        TaskType::Study => params.durations.study,
        TaskType::Revision => params.durations.revision,
        TaskType::MockInterview => params.durations.mock_interview,
    }
}

fn rationale(topic_id: &str, is_focus: bool, mastery: f64, task_type: TaskType) -> String {
    if is_focus {
        format!("Priority weak area: {topic_id} at {:.0}% mastery", mastery * 100.0)
    } else if mastery < 0.4 {
        format!("Foundational learning: {topic_id} needs strengthening")
    } else if mastery < 0.7 {
        format!("Skill consolidation: practice {topic_id} to reach proficiency")
    } else {
        format!("Maintenance: {} to sustain {topic_id} knowledge", task_type.as_str())
    }
}

fn candidate(
    user_id: &str,
    topic: &TopicSnapshot,
    focus_areas: &[String],
    now: DateTime<Utc>,
    config: &ModelConfig,
) -> TaskRecommendation {
    let params = &config.planner;
    let mastery = topic.mastery.mastery_probability;
    let retention = topic
        .retention
        .as_ref()
        .map(|r| r.retention_at(now))
        .unwrap_or(config.weakness.default_retention);
    let is_focus = focus_areas.iter().any(|f| f == &topic.topic_id);

    let (task_type, difficulty) = task_shape(mastery, retention);
    let difficulty_match = clamp_unit(1.0 - difficulty_gap(topic.mastery.recent_performance, &config.weakness));
    let importance = params.importance_of(&topic.topic_id);
    let gain = learning_gain(mastery, importance, retention, difficulty_match, params);
    let urgency = urgency(is_focus, mastery, retention);

    TaskRecommendation {
        task_id: format!("{user_id}_{}_task", topic.topic_id),
        topic_id: topic.topic_id.clone(),
        task_type,
        difficulty,
        priority: task_priority(gain, urgency, mastery, params),
        urgency,
        estimated_time_minutes: duration_of(task_type, params),
        expected_learning_gain: gain,
        rationale: rationale(&topic.topic_id, is_focus, mastery, task_type),
    }
}

/// Take tasks in order while they fit; a task that would overflow the
/// budget is skipped and later, shorter ones still get a chance.
pub fn fill_budget(ranked: Vec<TaskRecommendation>, budget_minutes: u32) -> (Vec<TaskRecommendation>, u32) {
    let mut used = 0;
    let mut selected = Vec::new();
    for task in ranked {
        if used + task.estimated_time_minutes <= budget_minutes {
            used += task.estimated_time_minutes;
            selected.push(task);
        }
    }
    (selected, used)
}

fn weekly_structure(daily_minutes: u32, focus_areas: &[String]) -> Vec<DayPlan> {
    WEEK_DAYS
        .iter()
        .map(|day| DayPlan {
            day: day.to_string(),
            focus_count: focus_areas.len().min(2),
            study_minutes: daily_minutes,
            recommended_mix: vec![TaskType::Practice, TaskType::Revision, TaskType::MockInterview],
        })
        .collect()
}

/// Build today's plan for a learner.
///
/// `focus_areas` normally comes from weakness analysis over the same topic
/// snapshot.
pub fn generate_plan(
    request: &PlanRequest,
    topics: &[TopicSnapshot],
    focus_areas: &[String],
    now: DateTime<Utc>,
    config: &ModelConfig,
) -> ValidationResult<AdaptivePlan> {
    request.validate()?;

    let mut ranked: Vec<TaskRecommendation> = topics
        .iter()
        .map(|t| candidate(&request.user_id, t, focus_areas, now, config))
        .collect();
    ranked.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    let candidates_considered = ranked.len();

    let (tasks_today, total_study_minutes) = fill_budget(ranked, request.daily_study_minutes);

    let mut constraints = vec![format!(
        "daily study time {} minutes",
        request.daily_study_minutes
    )];
    if let Some(days) = request.preparation_days {
        constraints.push(format!("preparation period {days} days"));
    }
    constraints.push(format!(
        "{} of {} candidate tasks scheduled today",
        tasks_today.len(),
        candidates_considered
    ));

    Ok(AdaptivePlan {
        user_id: request.user_id.clone(),
        plan_date: now.date_naive(),
        total_study_minutes,
        weekly_focus: focus_areas.to_vec(),
        weekly_structure: weekly_structure(request.daily_study_minutes, focus_areas),
        tasks_today,
        candidates_considered,
        explanation: Explanation {
            model: STRATEGY.to_string(),
            reason: "Expected learning gain under a daily time budget".to_string(),
            factors: constraints,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mastery::MasteryState;
    use chrono::TimeZone;

    const TOL: f64 = 1e-9;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 7, 30, 0).unwrap()
    }

    fn topic(id: &str, mastery: f64, recent: f64) -> TopicSnapshot {
        let mut state = MasteryState::initial(&ModelConfig::default(), now());
        state.mastery_probability = mastery;
        state.recent_performance = recent;
        TopicSnapshot::new(id, state, None)
    }

    fn request(minutes: u32) -> PlanRequest {
        PlanRequest {
            user_id: "u1".to_string(),
            daily_study_minutes: minutes,
            preparation_days: Some(30),
        }
    }

    fn task(id: &str, minutes: u32) -> TaskRecommendation {
        TaskRecommendation {
            task_id: id.to_string(),
            topic_id: id.to_string(),
            task_type: TaskType::Practice,
            difficulty: TaskDifficulty::Medium,
            priority: 0.5,
            urgency: 0.3,
            estimated_time_minutes: minutes,
            expected_learning_gain: 0.5,
            rationale: String::new(),
        }
    }

    #[test]
    fn test_learning_gain_multipliers() {
        let p = PlannerParams::default();
        assert!((learning_gain(0.5, 0.8, 0.4, 0.9, &p) - 0.6).abs() < TOL);
        assert!((learning_gain(0.5, 0.8, 0.9, 0.9, &p) - 0.48).abs() < TOL);
        assert!((learning_gain(0.5, 0.8, 0.9, 0.5, &p) - 0.4).abs() < TOL);
        assert_eq!(learning_gain(0.0, 0.95, 0.1, 1.0, &p), 1.0);
    }

    #[test]
    fn test_priority_low_mastery_boost() {
        let p = PlannerParams::default();
        assert!((task_priority(0.5, 0.5, 0.6, &p) - 0.5).abs() < TOL);
        assert!((task_priority(0.5, 0.5, 0.3, &p) - 0.65).abs() < TOL);
    }

    #[test]
    fn test_fill_budget_skips_overflowing_tasks() {
        let ranked = vec![task("a", 45), task("b", 120), task("c", 30), task("d", 20)];
        let (selected, used) = fill_budget(ranked, 100);
        let ids: Vec<_> = selected.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
        assert_eq!(used, 95);
    }

    #[test]
    fn test_task_shape_by_mastery_band() {
        assert_eq!(task_shape(0.2, 0.9), (TaskType::Study, TaskDifficulty::Easy));
        assert_eq!(task_shape(0.5, 0.9), (TaskType::Practice, TaskDifficulty::Medium));
        assert_eq!(task_shape(0.8, 0.5), (TaskType::Revision, TaskDifficulty::Hard));
        assert_eq!(task_shape(0.8, 0.9), (TaskType::MockInterview, TaskDifficulty::Hard));
    }

    #[test]
    fn test_plan_ranks_and_fits_budget() {
        let topics = vec![
            topic("networking", 0.65, 0.7),
            topic("algorithms", 0.2, 0.3),
            topic("databases", 0.5, 0.6),
        ];
        let focus = vec!["algorithms".to_string()];
        let plan = generate_plan(&request(60), &topics, &focus, now(), &ModelConfig::default()).unwrap();

        assert_eq!(plan.candidates_considered, 3);
        assert_eq!(plan.tasks_today[0].topic_id, "algorithms");
        assert_eq!(plan.tasks_today[0].task_type, TaskType::Study);
        assert_eq!(plan.tasks_today[0].task_id, "u1_algorithms_task");
        assert!(plan.tasks_today[0].rationale.starts_with("Priority weak area"));
        assert!(plan.total_study_minutes <= 60);
        assert_eq!(
            plan.total_study_minutes,
            plan.tasks_today.iter().map(|t| t.estimated_time_minutes).sum::<u32>()
        );
        assert_eq!(plan.weekly_structure.len(), 7);
        assert_eq!(plan.weekly_focus, focus);
        assert_eq!(plan.plan_date, now().date_naive());
    }

    #[test]
    fn test_plan_for_learner_without_topics() {
        let plan = generate_plan(&request(90), &[], &[], now(), &ModelConfig::default()).unwrap();
        assert!(plan.tasks_today.is_empty());
        assert_eq!(plan.total_study_minutes, 0);
    }

    #[test]
    fn test_invalid_budget_rejected() {
        let err = generate_plan(&request(0), &[], &[], now(), &ModelConfig::default()).unwrap_err();
        assert_eq!(err.field, "daily_study_minutes");
    }
}
