use chrono::{DateTime, Utc};
use prepmate_algo::{analyze_weaknesses, generate_plan, AdaptivePlan, ModelConfig, PlanRequest};

use crate::db::LearnerStore;
use crate::services::ServiceError;

/// Build today's plan from one snapshot of the learner, with the current
/// weakness focus areas boosted.
pub async fn plan(
    store: &LearnerStore,
    model: &ModelConfig,
    request: &PlanRequest,
    now: DateTime<Utc>,
) -> Result<AdaptivePlan, ServiceError> {
    request.validate()?;
    let topics = store.user_snapshot(&request.user_id).await?;
    let report = analyze_weaknesses(&topics, now, model);
    let plan = generate_plan(request, &topics, &report.focus_areas, now, model)?;

    tracing::info!(
        user_id = %request.user_id,
        tasks = plan.tasks_today.len(),
        minutes = plan.total_study_minutes,
        "plan generated"
    );
    Ok(plan)
}
