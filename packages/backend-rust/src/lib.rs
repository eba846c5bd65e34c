pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use prepmate_algo::ModelConfig;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{LearnerStore, StoreError};
use crate::state::AppState;

/// Application wired from the environment.
pub async fn create_app() -> Result<axum::Router, StoreError> {
    let config = Config::from_env();
    let store = LearnerStore::connect(&config.database).await?;
    Ok(create_app_with_store(store, config.model))
}

pub fn create_app_with_store(store: LearnerStore, model: ModelConfig) -> axum::Router {
    let state = AppState::new(store, model);

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
