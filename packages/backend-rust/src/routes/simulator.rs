use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use prepmate_algo::SimulationScenario;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::services;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct SimulationRequest {
    #[serde(default)]
    user_id: String,
    #[serde(flatten)]
    scenario: SimulationScenario,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run", post(run))
}

async fn run(
    State(state): State<AppState>,
    payload: Result<Json<SimulationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let result = services::simulator::simulate(state.store(), &request.user_id, &request.scenario, Utc::now()).await?;
    Ok(ok(result))
}
