//! Waypoint Web Server
//!
//! Axum-based REST API over the automation service: rules, goals,
//! predictions, market data, and system surfaces. Background timers for the
//! rule-schedule tick, the hourly comprehensive sweep, metrics snapshots,
//! and daily forecast maintenance are started alongside the listener.
//!
//! Authentication is an upstream concern (reverse proxy or gateway); the
//! server itself ships a restrictive CORS policy and request tracing.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use waypoint_core::{bootstrap, AutomationService, IntegrationBus, NoopBus, WebhookBus};

mod handlers;
mod scheduler;

pub use scheduler::{start_automation_scheduler, AutomationScheduleConfig};

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Register the bootstrap goal/rule set on startup
    pub seed_defaults: bool,
}

/// Shared application state
pub struct AppState {
    pub service: AutomationService,
}

/// Success response for flag-toggle style endpoints
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(service: AutomationService, config: &ServerConfig) -> Router {
    let state = Arc::new(AppState { service });

    let api_routes = Router::new()
        // Rules
        .route(
            "/rules",
            get(handlers::list_rules).post(handlers::register_rule),
        )
        .route("/rules/:id", get(handlers::get_rule))
        .route("/rules/:id/enable", post(handlers::enable_rule))
        .route("/rules/:id/disable", post(handlers::disable_rule))
        .route("/rules/:id/execute", post(handlers::execute_rule))
        .route("/rules/:id/history", get(handlers::get_rule_history))
        // Goals
        .route(
            "/goals",
            get(handlers::list_goals).post(handlers::create_goal),
        )
        .route("/goals/:id", get(handlers::get_goal))
        .route("/goals/:id/progress", post(handlers::update_goal_progress))
        .route("/goals/:id/analytics", get(handlers::get_goal_analytics))
        .route("/goals/:id/history", get(handlers::get_goal_history))
        // Predictions
        .route(
            "/goals/:id/prediction",
            get(handlers::get_prediction).post(handlers::generate_prediction),
        )
        .route("/goals/:id/what-if", post(handlers::what_if_prediction))
        // Forecasting surfaces
        .route("/market", get(handlers::get_market_data))
        .route("/models", get(handlers::list_models))
        // System
        .route("/metrics", get(handlers::get_metrics))
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/status", get(handlers::get_status))
        .route("/sweep", post(handlers::run_sweep));

    // Restrictive CORS by default; explicit origins when configured
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server with background timers
pub async fn serve(host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    let bus: Arc<dyn IntegrationBus> = match WebhookBus::from_env() {
        Some(webhook) => {
            info!("Integration bus: webhook delivery enabled");
            Arc::new(webhook)
        }
        None => {
            info!("Integration bus: noop (set WAYPOINT_WEBHOOK_URL to deliver actions)");
            Arc::new(NoopBus)
        }
    };

    let service = AutomationService::new(bus);
    if config.seed_defaults {
        bootstrap::seed(&service);
        info!(
            rules = service.engine().rules().len(),
            goals = service.tracker().goals().len(),
            "Seeded default goals and rules"
        );
    }

    // The scheduler holds its own handle to the shared registries
    start_automation_scheduler(service.clone(), AutomationScheduleConfig::from_env());

    let app = create_router(service, &config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.message, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<waypoint_core::Error> for AppError {
    fn from(err: waypoint_core::Error) -> Self {
        use waypoint_core::Error;

        let status = match &err {
            Error::RuleNotFound(_) | Error::GoalNotFound(_) | Error::PredictionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Error::UnsupportedKind(_) | Error::InvalidSchedule(_) | Error::InvalidData(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self {
            status,
            message: err.to_string(),
        }
    }
}
