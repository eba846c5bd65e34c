use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use prepmate_algo::{RetentionUpdate, ValidationError};
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::services;
use crate::state::AppState;

const MAX_QUEUE_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    topic_id: String,
    is_successful_revision: Option<bool>,
    time_since_last_revision_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct QueueQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct RetentionUpdateDto {
    user_id: String,
    topic_id: String,
    stability_score: f64,
    #[serde(flatten)]
    update: RetentionUpdate,
}

#[derive(Debug, Serialize)]
struct QueueDto<T> {
    user_id: String,
    count: usize,
    queue: Vec<T>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/update", post(update))
        .route("/queue/:user_id", get(queue))
        .route("/snapshot/:user_id", get(snapshot))
}

async fn update(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let is_successful = request
        .is_successful_revision
        .ok_or_else(|| ValidationError::missing("is_successful_revision"))?;

    let update = services::retention::record_revision(
        state.store(),
        state.model(),
        &request.user_id,
        &request.topic_id,
        is_successful,
        request.time_since_last_revision_hours,
        Utc::now(),
    )
    .await?;

    Ok(ok(RetentionUpdateDto {
        user_id: request.user_id,
        topic_id: request.topic_id,
        stability_score: update.state.stability_days,
        update,
    }))
}

async fn queue(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<QueueQuery>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(limit) = query.limit.filter(|l| *l == 0 || *l > MAX_QUEUE_LIMIT) {
        return Err(ValidationError::new(
            "limit",
            format!("must be between 1 and {MAX_QUEUE_LIMIT}, got {limit}"),
        )
        .into());
    }

    let queue =
        services::retention::revision_queue(state.store(), state.model(), &user_id, query.limit, Utc::now())
            .await?;
    Ok(ok(QueueDto {
        user_id,
        count: queue.len(),
        queue,
    }))
}

async fn snapshot(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = services::retention::snapshot(state.store(), state.model(), &user_id, Utc::now()).await?;
    Ok(ok(snapshot))
}
