use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use prepmate_algo::WeaknessReport;
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::services;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    user_id: String,
}

#[derive(Debug, Serialize)]
struct WeaknessReportDto {
    user_id: String,
    #[serde(flatten)]
    report: WeaknessReport,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze))
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let report = services::weakness::analyze(state.store(), state.model(), &request.user_id, Utc::now()).await?;
    Ok(ok(WeaknessReportDto {
        user_id: request.user_id,
        report,
    }))
}
