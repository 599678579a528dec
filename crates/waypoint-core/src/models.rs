//! Domain models for Waypoint

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A tracked financial goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub category: GoalCategory,
    pub target_amount: f64,
    /// Updated only through `GoalTracker::update_goal_progress`
    #[serde(default)]
    pub current_amount: f64,
    /// ISO 4217 currency code
    pub currency: String,
    pub target_date: NaiveDate,
    pub strategy: GrowthStrategy,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    /// Rule ids triggered on 25%-band crossings
    #[serde(default)]
    pub automation_rules: Vec<String>,
    #[serde(default)]
    pub metadata: GoalMetadata,
}

impl Goal {
    /// Progress toward the target as a percentage (uncapped)
    pub fn progress_percent(&self) -> f64 {
        if self.target_amount <= 0.0 {
            return 0.0;
        }
        (self.current_amount / self.target_amount) * 100.0
    }

    pub fn remaining_amount(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }
}

/// Bookkeeping attached to a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalMetadata {
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Rolling estimate of how accurate past predictions for this goal were
    pub prediction_accuracy: f64,
}

impl GoalMetadata {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_updated: now,
            prediction_accuracy: 85.0,
        }
    }
}

impl Default for GoalMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Goal categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    NetWorth,
    Revenue,
    RecurringRevenue,
    Savings,
    Investment,
    ExpenseReduction,
}

impl GoalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetWorth => "net_worth",
            Self::Revenue => "revenue",
            Self::RecurringRevenue => "recurring_revenue",
            Self::Savings => "savings",
            Self::Investment => "investment",
            Self::ExpenseReduction => "expense_reduction",
        }
    }
}

impl std::str::FromStr for GoalCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "net_worth" => Ok(Self::NetWorth),
            "revenue" => Ok(Self::Revenue),
            "recurring_revenue" | "mrr" => Ok(Self::RecurringRevenue),
            "savings" => Ok(Self::Savings),
            "investment" => Ok(Self::Investment),
            "expense_reduction" => Ok(Self::ExpenseReduction),
            _ => Err(format!("Unknown goal category: {}", s)),
        }
    }
}

impl std::fmt::Display for GoalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a goal is expected to grow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStrategy {
    Linear,
    Exponential,
    MilestoneBased,
    ModelOptimized,
}

impl GrowthStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
            Self::MilestoneBased => "milestone_based",
            Self::ModelOptimized => "model_optimized",
        }
    }
}

impl std::fmt::Display for GrowthStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A sub-target within a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub target_amount: f64,
    pub target_date: NaiveDate,
    /// Transitions false -> true exactly once
    #[serde(default)]
    pub achieved: bool,
    #[serde(default)]
    pub achieved_at: Option<DateTime<Utc>>,
    /// Rule ids triggered synchronously at the moment of achievement
    #[serde(default)]
    pub automation_triggers: Vec<String>,
}

impl Milestone {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        target_amount: f64,
        target_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            target_amount,
            target_date,
            achieved: false,
            achieved_at: None,
            automation_triggers: vec![],
        }
    }

    pub fn with_triggers(mut self, rule_ids: Vec<String>) -> Self {
        self.automation_triggers = rule_ids;
        self
    }
}

/// One timestamped observation of a goal's amount (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressPoint {
    pub at: DateTime<Utc>,
    pub amount: f64,
    pub source: ProgressSource,
    /// 0-100
    pub confidence: f64,
    /// Tags naming what contributed to this observation
    pub factors: Vec<String>,
}

/// Where a progress observation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressSource {
    Manual,
    Automated,
    Calculated,
}

impl ProgressSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automated => "automated",
            Self::Calculated => "calculated",
        }
    }

    /// Default confidence assigned to observations from this source
    pub fn default_confidence(&self) -> f64 {
        match self {
            Self::Manual => 100.0,
            Self::Automated => 95.0,
            Self::Calculated => 90.0,
        }
    }
}

impl std::str::FromStr for ProgressSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "automated" => Ok(Self::Automated),
            "calculated" => Ok(Self::Calculated),
            _ => Err(format!("Unknown progress source: {}", s)),
        }
    }
}

impl std::fmt::Display for ProgressSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priority of rules and actions, totally ordered for scheduling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Numeric rank for sorting (higher = more urgent)
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Urgent => 4,
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What caused a rule execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Schedule,
    Milestone,
    Condition,
    Manual,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Milestone => "milestone",
            Self::Condition => "condition",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Context handed to a rule execution: who triggered it and with what data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationContext {
    pub triggered_by: TriggerSource,
    pub rule_id: Option<String>,
    pub goal_id: Option<String>,
    pub at: DateTime<Utc>,
    /// Free-form fields condition evaluators read from
    pub data: serde_json::Value,
}

impl AutomationContext {
    pub fn new(triggered_by: TriggerSource) -> Self {
        Self {
            triggered_by,
            rule_id: None,
            goal_id: None,
            at: Utc::now(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_goal(mut self, goal_id: impl Into<String>) -> Self {
        self.goal_id = Some(goal_id.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Outcome of a single action within a rule execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action_id: String,
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

/// Result of one rule execution. Transient: callers decide whether to keep it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Logical AND of all action successes (true when no actions ran)
    pub success: bool,
    pub execution_time_ms: u64,
    /// Per-action outcomes in the order executed (descending priority)
    pub actions: Vec<ActionOutcome>,
    pub recommendations: Vec<Recommendation>,
    pub next_execution: Option<DateTime<Utc>>,
}

/// Recommendation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    IncreaseSavings,
    ReduceExpenses,
    OptimizeInvestments,
    RevenueBoost,
    RiskMitigation,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncreaseSavings => "increase_savings",
            Self::ReduceExpenses => "reduce_expenses",
            Self::OptimizeInvestments => "optimize_investments",
            Self::RevenueBoost => "revenue_boost",
            Self::RiskMitigation => "risk_mitigation",
        }
    }
}

impl std::fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Estimated impact of following a recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationImpact {
    pub time_reduction_days: i64,
    pub amount_increase: f64,
    /// 0.0-1.0
    pub risk_reduction: f64,
}

/// A deterministic, explainable suggestion attached to executions and predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    pub impact: RecommendationImpact,
    pub effort: Effort,
    /// 1-10, higher is more important
    pub priority: u8,
    pub automatable: bool,
    pub suggested_actions: Vec<String>,
}

impl Recommendation {
    pub fn new(
        kind: RecommendationKind,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            description: description.into(),
            impact: RecommendationImpact {
                time_reduction_days: 0,
                amount_increase: 0.0,
                risk_reduction: 0.0,
            },
            effort: Effort::Medium,
            priority: 5,
            automatable: false,
            suggested_actions: vec![],
        }
    }

    pub fn with_impact(mut self, impact: RecommendationImpact) -> Self {
        self.impact = impact;
        self
    }

    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.effort = effort;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn automatable(mut self) -> Self {
        self.automatable = true;
        self
    }

    pub fn with_suggested_actions(mut self, actions: Vec<String>) -> Self {
        self.suggested_actions = actions;
        self
    }
}

/// How much effort a recommendation takes to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl Effort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Urgent.rank() > Priority::High.rank());
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
    }

    #[test]
    fn test_goal_category_round_trip() {
        assert_eq!(
            GoalCategory::from_str("recurring_revenue").unwrap(),
            GoalCategory::RecurringRevenue
        );
        assert_eq!(GoalCategory::NetWorth.as_str(), "net_worth");
    }

    #[test]
    fn test_progress_percent() {
        let mut goal = sample_goal();
        goal.target_amount = 1000.0;
        goal.current_amount = 250.0;
        assert!((goal.progress_percent() - 25.0).abs() < f64::EPSILON);

        goal.target_amount = 0.0;
        assert_eq!(goal.progress_percent(), 0.0);
    }

    #[test]
    fn test_source_confidence_defaults() {
        assert_eq!(ProgressSource::Manual.default_confidence(), 100.0);
        assert_eq!(ProgressSource::Automated.default_confidence(), 95.0);
    }

    fn sample_goal() -> Goal {
        Goal {
            id: "g1".to_string(),
            name: "Test goal".to_string(),
            category: GoalCategory::Savings,
            target_amount: 1000.0,
            current_amount: 0.0,
            currency: "USD".to_string(),
            target_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            strategy: GrowthStrategy::Linear,
            milestones: vec![],
            automation_rules: vec![],
            metadata: GoalMetadata::new(),
        }
    }
}
