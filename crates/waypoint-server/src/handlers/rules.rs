//! Rule handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, SuccessResponse};
use waypoint_core::{AutomationContext, AutomationRule, ExecutionResult, TriggerSource};

/// Request body for manual rule execution
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRuleRequest {
    /// Free-form fields the rule's conditions evaluate against
    #[serde(default)]
    pub data: serde_json::Value,
}

/// GET /api/rules - List all registered rules
pub async fn list_rules(State(state): State<Arc<AppState>>) -> Json<Vec<AutomationRule>> {
    Json(state.service.engine().rules())
}

/// POST /api/rules - Register (or replace) a rule
pub async fn register_rule(
    State(state): State<Arc<AppState>>,
    Json(rule): Json<AutomationRule>,
) -> Result<Json<AutomationRule>, AppError> {
    let id = rule.id.clone();
    state.service.engine().register_rule(rule);
    let stored = state
        .service
        .engine()
        .rule(&id)
        .ok_or_else(|| AppError::not_found(format!("Rule not found: {}", id)))?;
    Ok(Json(stored))
}

/// GET /api/rules/:id
pub async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AutomationRule>, AppError> {
    state
        .service
        .engine()
        .rule(&id)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Rule not found: {}", id)))
}

/// POST /api/rules/:id/enable
pub async fn enable_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.service.engine().enable_rule(&id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/rules/:id/disable
pub async fn disable_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.service.engine().disable_rule(&id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/rules/:id/execute - Run a rule now with a manual context
pub async fn execute_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<ExecuteRuleRequest>>,
) -> Result<Json<ExecutionResult>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let ctx = AutomationContext::new(TriggerSource::Manual).with_data(request.data);
    let result = state.service.engine().execute_rule(&id, &ctx).await?;
    Ok(Json(result))
}

/// GET /api/rules/:id/history - Recent execution results (bounded)
pub async fn get_rule_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ExecutionResult>>, AppError> {
    if state.service.engine().rule(&id).is_none() {
        return Err(AppError::not_found(format!("Rule not found: {}", id)));
    }
    Ok(Json(state.service.engine().execution_history(&id)))
}
