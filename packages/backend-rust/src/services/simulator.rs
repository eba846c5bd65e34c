use chrono::{DateTime, Utc};
use prepmate_algo::{run_simulation, SimulationResult, SimulationScenario};

use crate::db::LearnerStore;
use crate::services::{require_id, ServiceError};

pub async fn simulate(
    store: &LearnerStore,
    user_id: &str,
    scenario: &SimulationScenario,
    now: DateTime<Utc>,
) -> Result<SimulationResult, ServiceError> {
    require_id("user_id", user_id)?;
    scenario.validate()?;
    let topics = store.user_snapshot(user_id).await?;
    let result = run_simulation(scenario, &topics, now)?;

    tracing::debug!(
        user_id,
        days = scenario.timeline_days,
        reaches_target = result.completion_forecast_date.is_some(),
        "simulation finished"
    );
    Ok(result)
}
