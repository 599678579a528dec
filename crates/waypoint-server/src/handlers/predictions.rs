//! Prediction and forecasting handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{AppError, AppState};
use waypoint_core::{MarketData, ModelSpec, PredictionResult, WhatIfScenario};

/// GET /api/goals/:id/prediction - Cached prediction, 404 when absent
pub async fn get_prediction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PredictionResult>, AppError> {
    state
        .service
        .forecaster()
        .prediction(&id)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("No prediction cached for goal: {}", id)))
}

/// POST /api/goals/:id/prediction - Force a regeneration
pub async fn generate_prediction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PredictionResult>, AppError> {
    let goal = state
        .service
        .tracker()
        .goal(&id)
        .ok_or_else(|| AppError::not_found(format!("Goal not found: {}", id)))?;
    let history = state.service.tracker().progress_history(&id);
    let prediction = state
        .service
        .forecaster()
        .generate_goal_prediction(&goal, &history);
    Ok(Json(prediction))
}

/// POST /api/goals/:id/what-if - Apply deltas to the cached base prediction
pub async fn what_if_prediction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(scenario): Json<WhatIfScenario>,
) -> Result<Json<PredictionResult>, AppError> {
    let adjusted = state.service.forecaster().what_if(&id, &scenario)?;
    Ok(Json(adjusted))
}

/// GET /api/market - Trailing market observations
pub async fn get_market_data(State(state): State<Arc<AppState>>) -> Json<Vec<MarketData>> {
    Json(state.service.forecaster().market_snapshot())
}

/// GET /api/models - Sub-model bookkeeping
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<Vec<ModelSpec>> {
    Json(state.service.forecaster().models())
}
