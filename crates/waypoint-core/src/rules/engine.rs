//! Rule engine: registry, evaluation, and prioritized execution

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bus::IntegrationBus;
use crate::error::{Error, Result};
use crate::models::{
    ActionOutcome, AutomationContext, Effort, ExecutionResult, Recommendation,
    RecommendationImpact, RecommendationKind,
};

use super::{actions::ActionExecutor, conditions, AutomationRule, RuleCategory};

/// Bounded per-rule execution history
const EXECUTION_HISTORY_CAP: usize = 100;

/// Aggregate engine counters, exposed for the metrics sweep
#[derive(Debug, Clone, Serialize)]
pub struct EngineMetricsSnapshot {
    pub rules_registered: usize,
    pub executions: u64,
    pub successes: u64,
    pub failures: u64,
    pub average_execution_time_ms: f64,
}

/// Owns rule definitions and executes them.
///
/// Scheduled ticks, milestone triggers, and manual requests all funnel into
/// [`RuleEngine::execute_rule`]; only the sweep consults the enabled flag,
/// so a disabled rule can still be run on demand.
pub struct RuleEngine {
    rules: DashMap<String, AutomationRule>,
    history: DashMap<String, Vec<ExecutionResult>>,
    /// When the sweep last dispatched each rule; schedules pace the sweep,
    /// not manual or milestone triggers
    last_scheduled: DashMap<String, chrono::DateTime<Utc>>,
    executor: ActionExecutor,
    executions: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    total_execution_time_ms: AtomicU64,
}

impl RuleEngine {
    pub fn new(bus: Arc<dyn IntegrationBus>) -> Self {
        Self {
            rules: DashMap::new(),
            history: DashMap::new(),
            last_scheduled: DashMap::new(),
            executor: ActionExecutor::new(bus),
            executions: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            total_execution_time_ms: AtomicU64::new(0),
        }
    }

    /// Add or replace a rule by id
    pub fn register_rule(&self, rule: AutomationRule) {
        info!(
            rule_id = %rule.id,
            name = %rule.name,
            priority = %rule.priority,
            operation = "rule_registration",
            "Rule registered"
        );
        self.rules.insert(rule.id.clone(), rule);
    }

    /// Execute a rule: evaluate conditions, run actions in priority order,
    /// record metadata and history
    pub async fn execute_rule(
        &self,
        rule_id: &str,
        ctx: &AutomationContext,
    ) -> Result<ExecutionResult> {
        let started = Instant::now();

        let rule = self
            .rules
            .get(rule_id)
            .map(|r| r.clone())
            .ok_or_else(|| Error::RuleNotFound(rule_id.to_string()))?;

        info!(
            rule_id = %rule_id,
            triggered_by = %ctx.triggered_by,
            operation = "rule_execution_start",
            "Executing rule"
        );

        // All conditions must hold; evaluation errors fail closed
        for condition in &rule.conditions {
            let met = match conditions::evaluate(condition, ctx) {
                Ok(met) => met,
                Err(e) => {
                    warn!(
                        rule_id = %rule_id,
                        condition_id = %condition.id,
                        error = %e,
                        "Condition evaluation failed, treating as not met"
                    );
                    false
                }
            };
            if !met {
                debug!(
                    rule_id = %rule_id,
                    condition_id = %condition.id,
                    "Conditions not met, skipping actions"
                );
                self.executions.fetch_add(1, Ordering::Relaxed);
                self.successes.fetch_add(1, Ordering::Relaxed);
                return Ok(ExecutionResult {
                    success: true,
                    execution_time_ms: started.elapsed().as_millis() as u64,
                    actions: vec![],
                    recommendations: vec![],
                    next_execution: None,
                });
            }
        }

        // Actions run in descending priority order; each failure is
        // contained to its own outcome
        let mut actions = rule.actions.clone();
        actions.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));

        let mut outcomes = Vec::with_capacity(actions.len());
        for action in &actions {
            let action_started = Instant::now();
            let outcome = match self.executor.execute(action, ctx).await {
                Ok(result) => ActionOutcome {
                    action_id: action.id.clone(),
                    success: true,
                    result: Some(result),
                    error: None,
                    execution_time_ms: action_started.elapsed().as_millis() as u64,
                },
                Err(e) => {
                    warn!(
                        rule_id = %rule_id,
                        action_id = %action.id,
                        error = %e,
                        "Action failed"
                    );
                    ActionOutcome {
                        action_id: action.id.clone(),
                        success: false,
                        result: None,
                        error: Some(e.to_string()),
                        execution_time_ms: action_started.elapsed().as_millis() as u64,
                    }
                }
            };
            outcomes.push(outcome);
        }

        let now = Utc::now();
        let result = ExecutionResult {
            success: outcomes.iter().all(|o| o.success),
            execution_time_ms: started.elapsed().as_millis() as u64,
            actions: outcomes,
            recommendations: generate_recommendations(&rule),
            next_execution: rule.schedule.map(|s| s.next_after(now)),
        };

        // Metadata and history updates happen under the entry guards so
        // concurrent executions of the same rule serialize
        if let Some(mut entry) = self.rules.get_mut(rule_id) {
            entry
                .metadata
                .record_execution(result.success, result.execution_time_ms, now);
        }
        {
            let mut history = self.history.entry(rule_id.to_string()).or_default();
            history.push(result.clone());
            if history.len() > EXECUTION_HISTORY_CAP {
                history.remove(0);
            }
        }

        self.executions.fetch_add(1, Ordering::Relaxed);
        if result.success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_execution_time_ms
            .fetch_add(result.execution_time_ms, Ordering::Relaxed);

        info!(
            rule_id = %rule_id,
            success = result.success,
            duration_ms = result.execution_time_ms,
            actions_executed = result.actions.len(),
            operation = "rule_execution_complete",
            "Rule execution complete"
        );

        Ok(result)
    }

    /// Run every enabled rule whose schedule is due.
    ///
    /// One rule's failure is logged and does not block the others.
    pub async fn execute_scheduled_rules(&self) {
        let now = Utc::now();
        let due: Vec<String> = self
            .rules
            .iter()
            .filter(|r| {
                r.enabled
                    && r.schedule
                        .map(|s| {
                            let last = self.last_scheduled.get(&r.id).map(|t| *t);
                            s.is_due(last, now)
                        })
                        .unwrap_or(false)
            })
            .map(|r| r.id.clone())
            .collect();

        for rule_id in due {
            self.last_scheduled.insert(rule_id.clone(), now);
            let ctx = AutomationContext::new(crate::models::TriggerSource::Schedule);
            if let Err(e) = self.execute_rule(&rule_id, &ctx).await {
                warn!(
                    rule_id = %rule_id,
                    error = %e,
                    operation = "rule_execution_error",
                    "Scheduled rule failed"
                );
            }
        }
    }

    pub fn enable_rule(&self, rule_id: &str) -> Result<()> {
        self.set_enabled(rule_id, true)
    }

    pub fn disable_rule(&self, rule_id: &str) -> Result<()> {
        self.set_enabled(rule_id, false)
    }

    fn set_enabled(&self, rule_id: &str, enabled: bool) -> Result<()> {
        let mut rule = self
            .rules
            .get_mut(rule_id)
            .ok_or_else(|| Error::RuleNotFound(rule_id.to_string()))?;
        rule.enabled = enabled;
        info!(
            rule_id = %rule_id,
            enabled,
            operation = if enabled { "rule_enable" } else { "rule_disable" },
            "Rule flag updated"
        );
        Ok(())
    }

    pub fn rules(&self) -> Vec<AutomationRule> {
        let mut rules: Vec<_> = self.rules.iter().map(|r| r.clone()).collect();
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        rules
    }

    pub fn rule(&self, rule_id: &str) -> Option<AutomationRule> {
        self.rules.get(rule_id).map(|r| r.clone())
    }

    pub fn execution_history(&self, rule_id: &str) -> Vec<ExecutionResult> {
        self.history
            .get(rule_id)
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    pub fn metrics(&self) -> EngineMetricsSnapshot {
        let executions = self.executions.load(Ordering::Relaxed);
        let total_ms = self.total_execution_time_ms.load(Ordering::Relaxed);
        EngineMetricsSnapshot {
            rules_registered: self.rules.len(),
            executions,
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            average_execution_time_ms: if executions > 0 {
                total_ms as f64 / executions as f64
            } else {
                0.0
            },
        }
    }
}

/// Deterministic recommendations attached to execution results
fn generate_recommendations(rule: &AutomationRule) -> Vec<Recommendation> {
    match rule.category {
        RuleCategory::GoalTracking => vec![Recommendation::new(
            RecommendationKind::IncreaseSavings,
            "Optimize savings rate",
            "Increase monthly savings by 15% to accelerate goal achievement",
        )
        .with_impact(RecommendationImpact {
            time_reduction_days: 30,
            amount_increase: 50_000.0,
            risk_reduction: 0.1,
        })
        .with_effort(Effort::Medium)
        .with_priority(8)
        .automatable()
        .with_suggested_actions(vec![
            "Set up automatic savings transfer".to_string(),
            "Review monthly budget allocation".to_string(),
            "Identify expense reduction opportunities".to_string(),
        ])],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockBus;
    use crate::models::{Priority, TriggerSource};
    use crate::rules::{
        Action, ActionKind, CompareOp, Condition, ConditionKind, RuleMetadata,
    };
    use crate::schedule::Schedule;
    use serde_json::json;

    fn engine_with_mock() -> (RuleEngine, Arc<MockBus>) {
        let bus = Arc::new(MockBus::new());
        (RuleEngine::new(bus.clone()), bus)
    }

    fn rule(id: &str, conditions: Vec<Condition>, actions: Vec<Action>) -> AutomationRule {
        AutomationRule {
            id: id.to_string(),
            name: format!("Rule {}", id),
            description: String::new(),
            category: RuleCategory::Financial,
            priority: Priority::High,
            enabled: true,
            schedule: None,
            conditions,
            actions,
            metadata: RuleMetadata::new(),
        }
    }

    fn notification(id: &str, priority: Priority) -> Action {
        Action {
            id: id.to_string(),
            target: "notifications".to_string(),
            priority,
            kind: ActionKind::Notification {
                channels: vec!["dashboard".to_string()],
                message: "test".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_unknown_rule_is_not_found() {
        let (engine, _) = engine_with_mock();
        let ctx = AutomationContext::new(TriggerSource::Manual);
        let err = engine.execute_rule("nope", &ctx).await.unwrap_err();
        assert!(matches!(err, Error::RuleNotFound(_)));
    }

    #[tokio::test]
    async fn test_register_is_idempotent_by_id() {
        let (engine, _) = engine_with_mock();
        engine.register_rule(rule("r1", vec![], vec![]));
        let mut replacement = rule("r1", vec![], vec![]);
        replacement.name = "Replaced".to_string();
        engine.register_rule(replacement);

        assert_eq!(engine.rules().len(), 1);
        assert_eq!(engine.rule("r1").unwrap().name, "Replaced");
    }

    #[tokio::test]
    async fn test_failing_condition_returns_empty_success() {
        let (engine, bus) = engine_with_mock();
        engine.register_rule(rule(
            "r1",
            vec![Condition {
                id: "c1".to_string(),
                kind: ConditionKind::Threshold {
                    field: "net_worth".to_string(),
                    op: CompareOp::Gt,
                    value: 1_000_000.0,
                },
            }],
            vec![notification("a1", Priority::High)],
        ));

        let ctx = AutomationContext::new(TriggerSource::Manual)
            .with_data(json!({ "net_worth": 5.0 }));
        let result = engine.execute_rule("r1", &ctx).await.unwrap();

        assert!(result.success);
        assert!(result.actions.is_empty());
        assert!(bus.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_condition_error_fails_closed() {
        let (engine, bus) = engine_with_mock();
        engine.register_rule(rule(
            "r1",
            vec![Condition {
                id: "c1".to_string(),
                kind: ConditionKind::Threshold {
                    field: "missing_field".to_string(),
                    op: CompareOp::Gt,
                    value: 0.0,
                },
            }],
            vec![notification("a1", Priority::High)],
        ));

        let ctx = AutomationContext::new(TriggerSource::Manual).with_data(json!({}));
        let result = engine.execute_rule("r1", &ctx).await.unwrap();
        assert!(result.success);
        assert!(result.actions.is_empty());
        assert!(bus.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_actions_run_in_priority_order_and_failures_are_isolated() {
        let (engine, _) = engine_with_mock();

        // Low-priority calculation over a missing field throws; the urgent
        // notification must still succeed and come first
        let failing_low = Action {
            id: "low".to_string(),
            target: "calc".to_string(),
            priority: Priority::Low,
            kind: ActionKind::Calculation {
                operation: crate::rules::Aggregate::Sum,
                field: "absent".to_string(),
            },
        };
        engine.register_rule(rule(
            "r1",
            vec![],
            vec![failing_low, notification("urgent", Priority::Urgent)],
        ));

        let ctx = AutomationContext::new(TriggerSource::Manual).with_data(json!({}));
        let result = engine.execute_rule("r1", &ctx).await.unwrap();

        assert_eq!(result.actions.len(), 2);
        assert_eq!(result.actions[0].action_id, "urgent");
        assert!(result.actions[0].success);
        assert_eq!(result.actions[1].action_id, "low");
        assert!(!result.actions[1].success);
        assert!(result.actions[1].error.is_some());
        // Overall success is the AND of action successes
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_metadata_and_history_update() {
        let (engine, _) = engine_with_mock();
        engine.register_rule(rule("r1", vec![], vec![notification("a1", Priority::High)]));

        let ctx = AutomationContext::new(TriggerSource::Manual);
        engine.execute_rule("r1", &ctx).await.unwrap();
        engine.execute_rule("r1", &ctx).await.unwrap();

        let meta = engine.rule("r1").unwrap().metadata;
        assert_eq!(meta.execution_count, 2);
        assert_eq!(meta.success_count, 2);
        assert!(meta.last_executed.is_some());

        assert_eq!(engine.execution_history("r1").len(), 2);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let (engine, _) = engine_with_mock();
        engine.register_rule(rule("r1", vec![], vec![]));

        let ctx = AutomationContext::new(TriggerSource::Manual);
        for _ in 0..(EXECUTION_HISTORY_CAP + 20) {
            engine.execute_rule("r1", &ctx).await.unwrap();
        }

        assert_eq!(engine.execution_history("r1").len(), EXECUTION_HISTORY_CAP);
    }

    #[tokio::test]
    async fn test_scheduled_sweep_skips_disabled_rules() {
        let (engine, bus) = engine_with_mock();

        let mut scheduled = rule("active", vec![], vec![notification("a1", Priority::High)]);
        scheduled.schedule = Some(Schedule::EveryMinutes(1));
        engine.register_rule(scheduled);

        let mut disabled = rule("disabled", vec![], vec![notification("a2", Priority::High)]);
        disabled.schedule = Some(Schedule::EveryMinutes(1));
        disabled.enabled = false;
        engine.register_rule(disabled);

        engine.execute_scheduled_rules().await;

        assert_eq!(bus.submissions().len(), 1);
        assert_eq!(engine.rule("active").unwrap().metadata.execution_count, 1);
        assert_eq!(engine.rule("disabled").unwrap().metadata.execution_count, 0);

        // A disabled rule still runs when requested manually
        let ctx = AutomationContext::new(TriggerSource::Manual);
        let result = engine.execute_rule("disabled", &ctx).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_enable_disable_toggle() {
        let (engine, _) = engine_with_mock();
        engine.register_rule(rule("r1", vec![], vec![]));

        engine.disable_rule("r1").unwrap();
        assert!(!engine.rule("r1").unwrap().enabled);
        engine.enable_rule("r1").unwrap();
        assert!(engine.rule("r1").unwrap().enabled);

        assert!(matches!(
            engine.enable_rule("ghost"),
            Err(Error::RuleNotFound(_))
        ));
    }
}
