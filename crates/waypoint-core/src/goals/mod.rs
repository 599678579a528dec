//! Goal and milestone tracking
//!
//! The tracker owns goal state and progress histories, detects milestone
//! crossings, and hands milestone/band triggers to the rule engine.

use serde::{Deserialize, Serialize};

use crate::models::Recommendation;

mod analytics;
mod tracker;

pub use analytics::compute_analytics;
pub use tracker::GoalTracker;

/// Trend classification for a goal's recent progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendClassification {
    Up,
    Down,
    Stable,
}

impl TrendClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
        }
    }
}

impl std::fmt::Display for TrendClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tunables for analytics; trend thresholds are in currency units per day
/// and should be scaled to the currency being tracked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Velocity above which the trend counts as up
    pub trend_up_threshold: f64,
    /// Velocity below which the trend counts as down
    pub trend_down_threshold: f64,
    /// How many recent points feed velocity and confidence
    pub window: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trend_up_threshold: 100.0,
            trend_down_threshold: -100.0,
            window: 30,
        }
    }
}

/// Derived analytics for one goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalAnalytics {
    /// Amount change per day over the recent window
    pub velocity_per_day: f64,
    /// Days until the target at current velocity; None when velocity is
    /// non-positive (the goal is never reached at this rate)
    pub time_to_completion_days: Option<f64>,
    pub trend: TrendClassification,
    /// 0-100, derived from per-step velocity variance
    pub confidence: f64,
    pub recommendations: Vec<Recommendation>,
}

impl GoalAnalytics {
    /// The well-defined result for goals with fewer than two observations
    pub fn degenerate() -> Self {
        Self {
            velocity_per_day: 0.0,
            time_to_completion_days: None,
            trend: TrendClassification::Stable,
            confidence: 0.0,
            recommendations: vec![],
        }
    }
}
