use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use prepmate_algo::{parse_attempts, AttemptInput, MasteryUpdate};
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::services;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    topic_id: String,
    #[serde(default)]
    attempts: Vec<AttemptInput>,
}

#[derive(Debug, Serialize)]
struct MasteryUpdateDto {
    user_id: String,
    topic_id: String,
    #[serde(flatten)]
    update: MasteryUpdate,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/update", post(update))
        .route("/profile/:user_id", get(profile))
}

async fn update(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let attempts = parse_attempts(request.attempts)?;

    let update = services::mastery::record_attempts(
        state.store(),
        state.model(),
        &request.user_id,
        &request.topic_id,
        &attempts,
        Utc::now(),
    )
    .await?;

    Ok(ok(MasteryUpdateDto {
        user_id: request.user_id,
        topic_id: request.topic_id,
        update,
    }))
}

async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let profile = services::mastery::profile(state.store(), &user_id).await?;
    Ok(ok(profile))
}
