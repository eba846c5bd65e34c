use chrono::{DateTime, Utc};
use prepmate_algo::{
    summarize_profile, update_mastery, AttemptRecord, MasteryProfile, MasteryUpdate, ModelConfig,
};

use crate::db::LearnerStore;
use crate::services::{require_id, retry_on_conflict, ServiceError};

/// Fold a batch of attempts into the stored mastery of one topic.
pub async fn record_attempts(
    store: &LearnerStore,
    model: &ModelConfig,
    user_id: &str,
    topic_id: &str,
    attempts: &[AttemptRecord],
    now: DateTime<Utc>,
) -> Result<MasteryUpdate, ServiceError> {
    require_id("user_id", user_id)?;
    require_id("topic_id", topic_id)?;

    let _guard = store.lock(user_id, topic_id).await;
    let update = retry_on_conflict("mastery.update", || async move {
        let prior = store.get_mastery(user_id, topic_id).await?;
        let update = update_mastery(prior.as_ref().map(|v| &v.value), attempts, now, model)?;
        store
            .put_mastery(user_id, topic_id, &update.state, prior.map(|v| v.version))
            .await?;
        Ok::<_, ServiceError>(update)
    })
    .await?;

    tracing::info!(
        user_id,
        topic_id,
        attempts = attempts.len(),
        mastery = update.state.mastery_probability,
        trend = update.state.improvement_trend.as_str(),
        "mastery updated"
    );
    Ok(update)
}

pub async fn profile(store: &LearnerStore, user_id: &str) -> Result<MasteryProfile, ServiceError> {
    require_id("user_id", user_id)?;
    let topics = store.list_mastery(user_id).await?;
    Ok(summarize_profile(&topics))
}
