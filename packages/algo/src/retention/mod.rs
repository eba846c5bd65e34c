//! Retention Engine
//!
//! Ebbinghaus forgetting curve `R = exp(-t_days / S)` with revision-driven
//! stability updates, urgency classification and revision queue ordering.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RetentionParams;
use crate::error::{ValidationError, ValidationResult};
use crate::sanitize::{clamp_range, clamp_unit, mean};
use crate::types::{Explanation, UrgencyLevel, HOURS_PER_DAY};

const MODEL_NAME: &str = "Ebbinghaus Forgetting Curve";

/// Retention probability after `hours` without revision.
pub fn retention_probability(hours: f64, stability_days: f64) -> f64 {
    if stability_days <= 0.0 {
        return 0.0;
    }
    let days = hours.max(0.0) / HOURS_PER_DAY;
    clamp_unit((-days / stability_days).exp())
}

/// New stability after a revision observed at `retention_at_review`.
///
/// A successful revision grows stability more the less was forgotten; a
/// failed one halves it. Always clamped to the configured bounds.
pub fn update_stability(
    stability_days: f64,
    successful: bool,
    retention_at_review: f64,
    params: &RetentionParams,
) -> f64 {
    let next = if successful {
        stability_days * params.success_factor * (2.0 - (1.0 - retention_at_review))
    } else {
        stability_days * params.failure_factor
    };
    clamp_range(next, params.min_stability_days, params.max_stability_days)
}

pub fn classify_urgency(retention: f64, params: &RetentionParams) -> UrgencyLevel {
    if retention < params.critical_below {
        UrgencyLevel::Critical
    } else if retention < params.high_below {
        UrgencyLevel::High
    } else if retention < params.medium_below {
        UrgencyLevel::Medium
    } else {
        UrgencyLevel::Low
    }
}

fn days_to_duration(days: f64) -> Duration {
    Duration::milliseconds((days * 86_400_000.0).round() as i64)
}

/// Persisted per-(user, topic) revision schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionState {
    /// Retention observed at the last revision, before it was applied
    pub retention_probability: f64,
    pub stability_days: f64,
    pub last_revision_date: DateTime<Utc>,
    pub next_revision_date: DateTime<Utc>,
    pub urgency_level: UrgencyLevel,
    pub revision_count: u32,
    pub last_revision_successful: bool,
}

impl RetentionState {
    /// Live retention at `now`, from the last revision and current stability.
    pub fn retention_at(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = now.signed_duration_since(self.last_revision_date);
        let hours = elapsed.num_milliseconds() as f64 / 3_600_000.0;
        retention_probability(hours, self.stability_days)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_revision_date <= now
    }

    /// Fractional days until the next revision; negative once overdue.
    pub fn days_until_revision(&self, now: DateTime<Utc>) -> f64 {
        let remaining = self.next_revision_date.signed_duration_since(now);
        remaining.num_milliseconds() as f64 / 86_400_000.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionUpdate {
    pub state: RetentionState,
    pub days_until_revision: f64,
    pub explanation: Explanation,
}

/// Record a revision of a topic.
///
/// `prior` is `None` on the first revision, which starts from the initial
/// stability. `hours_since_last_revision` is the gap before this revision.
pub fn update_retention(
    prior: Option<&RetentionState>,
    is_successful: bool,
    hours_since_last_revision: f64,
    now: DateTime<Utc>,
    params: &RetentionParams,
) -> ValidationResult<RetentionUpdate> {
    if !hours_since_last_revision.is_finite() || hours_since_last_revision < 0.0 {
        return Err(ValidationError::new(
            "time_since_last_revision_hours",
            format!("must be a non-negative number, got {hours_since_last_revision}"),
        ));
    }

    let stability = prior
        .map(|p| p.stability_days)
        .unwrap_or(params.initial_stability_days);
    let retention_pre = retention_probability(hours_since_last_revision, stability);
    let new_stability = update_stability(stability, is_successful, retention_pre, params);
    let urgency = classify_urgency(retention_pre, params);

    let state = RetentionState {
        retention_probability: retention_pre,
        stability_days: new_stability,
        last_revision_date: now,
        next_revision_date: now + days_to_duration(new_stability),
        urgency_level: urgency,
        revision_count: prior.map(|p| p.revision_count).unwrap_or(0) + 1,
        last_revision_successful: is_successful,
    };

    let explanation = Explanation {
        model: MODEL_NAME.to_string(),
        reason: format!(
            "Based on {} revision",
            if is_successful { "successful" } else { "unsuccessful" }
        ),
        factors: vec![
            format!("retention before revision {:.1}%", retention_pre * 100.0),
            format!("memory stability {:.1} days", new_stability),
            format!("time since last review {:.1} hours", hours_since_last_revision),
            format!("next review in {:.1} days", new_stability),
            format!("urgency {}", urgency.as_str()),
        ],
    };

    Ok(RetentionUpdate {
        state,
        days_until_revision: new_stability,
        explanation,
    })
}

// ==================== Queue ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionQueueItem {
    pub topic_id: String,
    pub retention_probability: f64,
    pub stability_days: f64,
    pub urgency_level: UrgencyLevel,
    pub next_revision_date: DateTime<Utc>,
    pub days_until_revision: f64,
    pub is_due: bool,
    pub days_overdue: i64,
}

impl RevisionQueueItem {
    /// Queue row from a stored state, scored at `now`.
    pub fn from_state(
        topic_id: impl Into<String>,
        state: &RetentionState,
        now: DateTime<Utc>,
        params: &RetentionParams,
    ) -> Self {
        let retention = state.retention_at(now);
        let overdue = now.signed_duration_since(state.next_revision_date);
        Self {
            topic_id: topic_id.into(),
            retention_probability: retention,
            stability_days: state.stability_days,
            urgency_level: classify_urgency(retention, params),
            next_revision_date: state.next_revision_date,
            days_until_revision: state.days_until_revision(now),
            is_due: state.is_due(now),
            days_overdue: overdue.num_days().max(0),
        }
    }
}

/// Most urgent first, then soonest due. Ties keep input order.
pub fn order_revision_queue(mut items: Vec<RevisionQueueItem>, limit: usize) -> Vec<RevisionQueueItem> {
    items.sort_by(|a, b| {
        a.urgency_level
            .rank()
            .cmp(&b.urgency_level.rank())
            .then(a.days_until_revision.total_cmp(&b.days_until_revision))
    });
    items.truncate(limit);
    items
}

// ==================== Snapshot ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRetentionSummary {
    pub topic_id: String,
    pub retention_probability: f64,
    pub stability_days: f64,
    pub next_revision_date: DateTime<Utc>,
    pub urgency_level: UrgencyLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionSnapshot {
    pub average_retention: f64,
    pub topics_count: usize,
    pub overdue_revisions: usize,
    pub topics: Vec<TopicRetentionSummary>,
}

impl RetentionSnapshot {
    pub fn from_states(
        states: &[(String, RetentionState)],
        now: DateTime<Utc>,
        params: &RetentionParams,
    ) -> Self {
        let topics: Vec<TopicRetentionSummary> = states
            .iter()
            .map(|(id, s)| {
                let retention = s.retention_at(now);
                TopicRetentionSummary {
                    topic_id: id.clone(),
                    retention_probability: retention,
                    stability_days: s.stability_days,
                    next_revision_date: s.next_revision_date,
                    urgency_level: classify_urgency(retention, params),
                }
            })
            .collect();
        let retentions: Vec<f64> = topics.iter().map(|t| t.retention_probability).collect();

        Self {
            average_retention: mean(&retentions),
            topics_count: topics.len(),
            overdue_revisions: states.iter().filter(|(_, s)| s.is_due(now)).count(),
            topics,
        }
    }
}
