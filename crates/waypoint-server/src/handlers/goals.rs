//! Goal handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use waypoint_core::{Goal, GoalAnalytics, ProgressPoint, ProgressSource};

/// Request body for progress updates
#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    pub amount: f64,
    #[serde(default = "default_source")]
    pub source: ProgressSource,
    #[serde(default)]
    pub factors: Vec<String>,
}

fn default_source() -> ProgressSource {
    ProgressSource::Manual
}

/// GET /api/goals
pub async fn list_goals(State(state): State<Arc<AppState>>) -> Json<Vec<Goal>> {
    Json(state.service.tracker().goals())
}

/// POST /api/goals - Register (or replace) a goal
pub async fn create_goal(
    State(state): State<Arc<AppState>>,
    Json(goal): Json<Goal>,
) -> Result<Json<Goal>, AppError> {
    let id = goal.id.clone();
    state.service.tracker().create_goal(goal);
    let stored = state
        .service
        .tracker()
        .goal(&id)
        .ok_or_else(|| AppError::not_found(format!("Goal not found: {}", id)))?;
    Ok(Json(stored))
}

/// GET /api/goals/:id
pub async fn get_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Goal>, AppError> {
    state
        .service
        .tracker()
        .goal(&id)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Goal not found: {}", id)))
}

/// POST /api/goals/:id/progress - Record a new observed amount
pub async fn update_goal_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateProgressRequest>,
) -> Result<Json<Goal>, AppError> {
    let goal = state
        .service
        .tracker()
        .update_goal_progress(&id, request.amount, request.source, request.factors)
        .await?;
    Ok(Json(goal))
}

/// GET /api/goals/:id/analytics
pub async fn get_goal_analytics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GoalAnalytics>, AppError> {
    let analytics = state.service.tracker().calculate_goal_analytics(&id)?;
    Ok(Json(analytics))
}

/// GET /api/goals/:id/history - Bounded progress history, oldest first
pub async fn get_goal_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ProgressPoint>>, AppError> {
    if state.service.tracker().goal(&id).is_none() {
        return Err(AppError::not_found(format!("Goal not found: {}", id)));
    }
    Ok(Json(state.service.tracker().progress_history(&id)))
}
