use chrono::{DateTime, Utc};
use prepmate_algo::{
    order_revision_queue, update_retention, ModelConfig, RetentionSnapshot, RetentionState,
    RetentionUpdate, RevisionQueueItem,
};

use crate::db::LearnerStore;
use crate::services::{require_id, retry_on_conflict, ServiceError};

/// Record one revision outcome. Without an explicit gap the hours since
/// the stored last revision are used, or zero for a first revision.
pub async fn record_revision(
    store: &LearnerStore,
    model: &ModelConfig,
    user_id: &str,
    topic_id: &str,
    is_successful: bool,
    hours_since_last_revision: Option<f64>,
    now: DateTime<Utc>,
) -> Result<RetentionUpdate, ServiceError> {
    require_id("user_id", user_id)?;
    require_id("topic_id", topic_id)?;

    let _guard = store.lock(user_id, topic_id).await;
    let update = retry_on_conflict("retention.update", || async move {
        let prior = store.get_retention(user_id, topic_id).await?;
        let hours = hours_since_last_revision
            .unwrap_or_else(|| prior.as_ref().map_or(0.0, |p| elapsed_hours(&p.value, now)));
        let update = update_retention(
            prior.as_ref().map(|v| &v.value),
            is_successful,
            hours,
            now,
            &model.retention,
        )?;
        store
            .put_retention(user_id, topic_id, &update.state, prior.map(|v| v.version))
            .await?;
        Ok::<_, ServiceError>(update)
    })
    .await?;

    tracing::info!(
        user_id,
        topic_id,
        is_successful,
        stability_days = update.state.stability_days,
        urgency = update.state.urgency_level.as_str(),
        "revision recorded"
    );
    Ok(update)
}

/// Topics ordered for revision, capped at `limit` or the model's default.
pub async fn revision_queue(
    store: &LearnerStore,
    model: &ModelConfig,
    user_id: &str,
    limit: Option<usize>,
    now: DateTime<Utc>,
) -> Result<Vec<RevisionQueueItem>, ServiceError> {
    require_id("user_id", user_id)?;
    let limit = limit.unwrap_or(model.retention.default_queue_limit);
    let items = store
        .list_retention(user_id)
        .await?
        .into_iter()
        .map(|(topic_id, state)| RevisionQueueItem::from_state(topic_id, &state, now, &model.retention))
        .collect();
    Ok(order_revision_queue(items, limit))
}

pub async fn snapshot(
    store: &LearnerStore,
    model: &ModelConfig,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<RetentionSnapshot, ServiceError> {
    require_id("user_id", user_id)?;
    let states = store.list_retention(user_id).await?;
    Ok(RetentionSnapshot::from_states(&states, now, &model.retention))
}

fn elapsed_hours(state: &RetentionState, now: DateTime<Utc>) -> f64 {
    let elapsed = now.signed_duration_since(state.last_revision_date);
    (elapsed.num_milliseconds() as f64 / 3_600_000.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_gap_defaults_to_time_since_last_revision() {
        let store = LearnerStore::memory();
        let model = ModelConfig::default();
        let start = Utc::now();

        let first = record_revision(&store, &model, "u1", "dp", true, None, start)
            .await
            .unwrap();
        assert_eq!(first.state.retention_probability, 1.0);

        let later = start + Duration::hours(48);
        let second = record_revision(&store, &model, "u1", "dp", true, None, later)
            .await
            .unwrap();
        let expected = (-2.0 / first.state.stability_days).exp();
        assert!((second.state.retention_probability - expected).abs() < 1e-9);
        assert_eq!(second.state.revision_count, 2);
    }

    #[tokio::test]
    async fn test_negative_gap_rejected() {
        let store = LearnerStore::memory();
        let err = record_revision(&store, &ModelConfig::default(), "u1", "dp", true, Some(-1.0), Utc::now())
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation(e) => assert_eq!(e.field, "time_since_last_revision_hours"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_queue_respects_limit() {
        let store = LearnerStore::memory();
        let model = ModelConfig::default();
        let now = Utc::now();
        for topic in ["a", "b", "c"] {
            record_revision(&store, &model, "u1", topic, false, Some(0.0), now)
                .await
                .unwrap();
        }

        let queue = revision_queue(&store, &model, "u1", Some(2), now).await.unwrap();
        assert_eq!(queue.len(), 2);
        assert!(revision_queue(&store, &model, "nobody", Some(10), now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queue_without_limit_uses_model_default() {
        let store = LearnerStore::memory();
        let mut model = ModelConfig::default();
        model.retention.default_queue_limit = 2;
        let now = Utc::now();
        for topic in ["a", "b", "c", "d"] {
            record_revision(&store, &model, "u1", topic, false, Some(0.0), now)
                .await
                .unwrap();
        }

        let queue = revision_queue(&store, &model, "u1", None, now).await.unwrap();
        assert_eq!(queue.len(), 2);
        let queue = revision_queue(&store, &model, "u1", Some(3), now).await.unwrap();
        assert_eq!(queue.len(), 3);
    }
}
