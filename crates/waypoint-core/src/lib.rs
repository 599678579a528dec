//! Waypoint Core Library
//!
//! Shared functionality for the Waypoint goal automation service:
//! - Automation rule engine (declarative conditions, prioritized actions)
//! - Goal and milestone tracker with bounded progress histories
//! - Ensemble forecaster (linear, exponential, heuristic sub-models)
//! - Integration bus boundary for outbound action delivery
//! - Interval schedule expressions for rule scheduling
//! - Bootstrap seed set of goals and rules

pub mod bootstrap;
pub mod bus;
pub mod error;
pub mod forecast;
pub mod goals;
pub mod models;
pub mod rules;
pub mod schedule;
pub mod service;

pub use bus::{BusRequest, IntegrationBus, NoopBus, WebhookBus};
pub use error::{Error, Result};
pub use forecast::{
    Forecaster, MarketData, ModelKind, ModelSpec, PredictionResult, Scenario, ScenarioSet,
    WhatIfScenario,
};
pub use goals::{AnalyticsConfig, GoalAnalytics, GoalTracker, TrendClassification};
pub use models::{
    ActionOutcome, AutomationContext, Effort, ExecutionResult, Goal, GoalCategory, GoalMetadata,
    GrowthStrategy, Milestone, Priority, ProgressPoint, ProgressSource, Recommendation,
    RecommendationImpact, RecommendationKind, TriggerSource,
};
pub use rules::{
    Action, ActionKind, Aggregate, AutomationRule, CompareOp, Condition, ConditionKind,
    EngineMetricsSnapshot, RuleCategory, RuleEngine, RuleMetadata, TrendDirection,
};
pub use schedule::Schedule;
pub use service::{
    AutomationMetrics, AutomationService, ComponentHealth, Dashboard, RiskLevel, SweepSummary,
    SystemStatus,
};

/// Recording mock bus for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub use bus::MockBus;
