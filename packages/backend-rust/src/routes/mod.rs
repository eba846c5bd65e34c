mod health;
mod mastery;
mod planner;
mod readiness;
mod retention;
mod simulator;
mod weakness;

use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/ml/mastery", mastery::router())
        .nest("/api/ml/retention", retention::router())
        .nest("/api/ml/weakness", weakness::router())
        .nest("/api/ml/planner", planner::router())
        .nest("/api/ml/readiness", readiness::router())
        .nest("/api/ml/simulator", simulator::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    AppError::not_found("route not found").into_response()
}
