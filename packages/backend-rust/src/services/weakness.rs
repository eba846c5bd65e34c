use chrono::{DateTime, Utc};
use prepmate_algo::{analyze_weaknesses, AnalysisStatus, ModelConfig, WeaknessReport};

use crate::db::LearnerStore;
use crate::services::{require_id, ServiceError};

pub async fn analyze(
    store: &LearnerStore,
    model: &ModelConfig,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<WeaknessReport, ServiceError> {
    require_id("user_id", user_id)?;
    let topics = store.user_snapshot(user_id).await?;
    let report = analyze_weaknesses(&topics, now, model);

    if report.status == AnalysisStatus::InsufficientData {
        tracing::debug!(user_id, topics = topics.len(), "not enough attempts for weakness analysis");
    } else {
        tracing::info!(
            user_id,
            weak_topics = report.weak_topics.len(),
            intervention = report.intervention_priority_score,
            "weakness analysis complete"
        );
    }
    Ok(report)
}
