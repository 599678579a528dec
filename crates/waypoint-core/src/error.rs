//! Error types for Waypoint

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Goal not found: {0}")]
    GoalNotFound(String),

    #[error("No prediction cached for goal: {0}")]
    PredictionNotFound(String),

    #[error("Unsupported kind: {0}")]
    UnsupportedKind(String),

    #[error("Invalid schedule expression: {0}")]
    InvalidSchedule(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Upstream delivery failed: {0}")]
    Upstream(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
