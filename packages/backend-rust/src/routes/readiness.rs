use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use prepmate_algo::ReadinessRequest;

use crate::response::{ok, AppError};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<ReadinessRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let prediction = services::readiness::predict(state.store(), state.model(), &request, Utc::now()).await?;
    Ok(ok(prediction))
}
