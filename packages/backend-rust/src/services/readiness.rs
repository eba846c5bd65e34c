use chrono::{DateTime, Utc};
use prepmate_algo::{predict_readiness, ModelConfig, ReadinessPrediction, ReadinessRequest};

use crate::db::LearnerStore;
use crate::services::ServiceError;

pub async fn predict(
    store: &LearnerStore,
    model: &ModelConfig,
    request: &ReadinessRequest,
    now: DateTime<Utc>,
) -> Result<ReadinessPrediction, ServiceError> {
    request.validate()?;
    let topics = store.user_snapshot(&request.user_id).await?;
    let prediction = predict_readiness(request, &topics, now, model)?;

    tracing::info!(
        user_id = %request.user_id,
        readiness = prediction.readiness_score,
        days_to_ready = prediction.time_to_readiness_days,
        "readiness predicted"
    );
    Ok(prediction)
}
