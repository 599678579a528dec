//! System handlers: metrics, dashboard, status, manual sweep

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::AppState;
use waypoint_core::{AutomationMetrics, Dashboard, SweepSummary, SystemStatus};

/// GET /api/metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<AutomationMetrics> {
    Json(state.service.metrics())
}

/// GET /api/dashboard
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<Dashboard> {
    Json(state.service.dashboard())
}

/// GET /api/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    Json(state.service.system_status())
}

/// POST /api/sweep - Run the comprehensive sweep on demand
pub async fn run_sweep(State(state): State<Arc<AppState>>) -> Json<SweepSummary> {
    Json(state.service.run_comprehensive_sweep().await)
}
