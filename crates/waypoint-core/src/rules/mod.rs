//! Automation rules: declarative conditions plus prioritized actions
//!
//! A rule is a named set of conditions (all must hold) and actions (executed
//! in descending priority order). Rules run on an interval schedule, on
//! milestone achievements, or on demand; every trigger funnels into
//! `RuleEngine::execute_rule`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Priority;
use crate::schedule::Schedule;

mod actions;
mod conditions;
mod engine;

pub use actions::ActionExecutor;
pub use engine::{EngineMetricsSnapshot, RuleEngine};

/// A registered automation rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: RuleCategory,
    pub priority: Priority,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// When set, the per-minute sweep runs the rule whenever this is due
    #[serde(default)]
    pub schedule: Option<Schedule>,
    /// All conditions must hold (logical AND, short-circuit)
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Executed in descending priority order
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub metadata: RuleMetadata,
}

fn default_enabled() -> bool {
    true
}

/// Rule categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Financial,
    GoalTracking,
    RevenueTracking,
    ExpenseOptimization,
    Business,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Financial => "financial",
            Self::GoalTracking => "goal_tracking",
            Self::RevenueTracking => "revenue_tracking",
            Self::ExpenseOptimization => "expense_optimization",
            Self::Business => "business",
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution bookkeeping attached to a rule.
///
/// Counters only grow; `success_rate` is recomputed from the counts and
/// `average_execution_time_ms` is a running mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub created_at: DateTime<Utc>,
    pub last_executed: Option<DateTime<Utc>>,
    pub execution_count: u64,
    pub success_count: u64,
    /// 0-100, derived from success_count / execution_count
    pub success_rate: f64,
    pub average_execution_time_ms: f64,
}

impl RuleMetadata {
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            last_executed: None,
            execution_count: 0,
            success_count: 0,
            success_rate: 100.0,
            average_execution_time_ms: 0.0,
        }
    }

    /// Fold one execution into the counters
    pub(crate) fn record_execution(&mut self, success: bool, execution_time_ms: u64, at: DateTime<Utc>) {
        self.last_executed = Some(at);
        self.execution_count += 1;
        if success {
            self.success_count += 1;
        }
        self.success_rate = (self.success_count as f64 / self.execution_count as f64) * 100.0;
        self.average_execution_time_ms = (self.average_execution_time_ms
            * (self.execution_count - 1) as f64
            + execution_time_ms as f64)
            / self.execution_count as f64;
    }
}

impl Default for RuleMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// A single condition within a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub id: String,
    #[serde(flatten)]
    pub kind: ConditionKind,
}

/// Condition kinds, each with its own evaluator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionKind {
    /// Numeric field compared against a fixed value
    Threshold {
        field: String,
        op: CompareOp,
        value: f64,
    },
    /// String field matched against a regular expression
    Pattern { field: String, pattern: String },
    /// Relative change over a numeric series exceeds a minimum
    Trend {
        field: String,
        direction: TrendDirection,
        /// Minimum relative change, e.g. 0.05 for 5%
        min_change: f64,
    },
    /// Last point of a numeric series deviates from the series mean by more
    /// than `sigma` standard deviations
    Anomaly { field: String, sigma: f64 },
    /// Holds when the execution was schedule-triggered
    Schedule,
}

impl ConditionKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Threshold { .. } => "threshold",
            Self::Pattern { .. } => "pattern",
            Self::Trend { .. } => "trend",
            Self::Anomaly { .. } => "anomaly",
            Self::Schedule => "schedule",
        }
    }
}

/// Comparison operators for threshold conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn apply(&self, left: f64, right: f64) -> bool {
        match self {
            Self::Gt => left > right,
            Self::Gte => left >= right,
            Self::Lt => left < right,
            Self::Lte => left <= right,
            Self::Eq => (left - right).abs() < f64::EPSILON,
            Self::Ne => (left - right).abs() >= f64::EPSILON,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Eq => "eq",
            Self::Ne => "ne",
        }
    }
}

/// Direction for trend conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

/// A single action within a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    /// Target system name on the integration bus (or URL host label for
    /// external API calls)
    pub target: String,
    pub priority: Priority,
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// Action kinds, each dispatched to a distinct handler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Push a notification through the bus
    Notification {
        channels: Vec<String>,
        message: String,
    },
    /// Create a task in an external tracker
    TaskCreation {
        title: String,
        notes: Option<String>,
    },
    /// Update fields of an external document/page
    DocumentUpdate {
        document: String,
        fields: serde_json::Value,
    },
    /// Compute an aggregate over a numeric series in the context data
    Calculation { operation: Aggregate, field: String },
    /// POST a payload to an arbitrary HTTP endpoint
    ExternalApi {
        url: String,
        body: serde_json::Value,
    },
    /// Ask the bus to re-sync an integration
    IntegrationSync { integration_id: String },
}

impl ActionKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Notification { .. } => "notification",
            Self::TaskCreation { .. } => "task_creation",
            Self::DocumentUpdate { .. } => "document_update",
            Self::Calculation { .. } => "calculation",
            Self::ExternalApi { .. } => "external_api",
            Self::IntegrationSync { .. } => "integration_sync",
        }
    }
}

/// Aggregates available to calculation actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sum,
    Mean,
    Min,
    Max,
    Last,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_running_mean() {
        let mut meta = RuleMetadata::new();
        let now = Utc::now();
        meta.record_execution(true, 100, now);
        meta.record_execution(true, 300, now);
        assert_eq!(meta.execution_count, 2);
        assert!((meta.average_execution_time_ms - 200.0).abs() < f64::EPSILON);
        assert!((meta.success_rate - 100.0).abs() < f64::EPSILON);

        meta.record_execution(false, 200, now);
        assert_eq!(meta.execution_count, 3);
        assert!((meta.success_rate - (2.0 / 3.0 * 100.0)).abs() < 0.001);
    }

    #[test]
    fn test_condition_kind_tagged_serialization() {
        let condition = Condition {
            id: "c1".to_string(),
            kind: ConditionKind::Threshold {
                field: "net_worth".to_string(),
                op: CompareOp::Gt,
                value: 0.0,
            },
        };
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["kind"], "threshold");
        assert_eq!(json["field"], "net_worth");

        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind.kind_name(), "threshold");
    }

    #[test]
    fn test_unknown_kind_rejected_at_deserialization() {
        let json = serde_json::json!({
            "id": "c1",
            "kind": "telepathy",
            "field": "x"
        });
        assert!(serde_json::from_value::<Condition>(json).is_err());
    }

    #[test]
    fn test_compare_ops() {
        assert!(CompareOp::Gt.apply(2.0, 1.0));
        assert!(!CompareOp::Gt.apply(1.0, 1.0));
        assert!(CompareOp::Gte.apply(1.0, 1.0));
        assert!(CompareOp::Ne.apply(1.0, 2.0));
        assert!(CompareOp::Eq.apply(1.0, 1.0));
    }
}
