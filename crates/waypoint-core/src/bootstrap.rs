//! Default goals and rules seeded at startup
//!
//! The `serve` and demo commands start from this set so the system does
//! something useful before any caller registers its own goals.

use chrono::{Duration, Utc};

use crate::models::{Goal, GoalCategory, GoalMetadata, GrowthStrategy, Milestone, Priority};
use crate::rules::{
    Action, ActionKind, Aggregate, AutomationRule, CompareOp, Condition, ConditionKind,
    RuleCategory, RuleMetadata, TrendDirection,
};
use crate::schedule::Schedule;
use crate::service::AutomationService;

/// Register the default goals and rules on a fresh service
pub fn seed(service: &AutomationService) {
    for rule in default_rules() {
        service.engine().register_rule(rule);
    }
    for goal in default_goals() {
        service.tracker().create_goal(goal);
    }
}

/// The three seed goals: a long-horizon net worth target with quartile
/// milestones, a daily revenue target, and a recurring-revenue target
pub fn default_goals() -> Vec<Goal> {
    let today = Utc::now().date_naive();
    let metadata = GoalMetadata::new;

    vec![
        Goal {
            id: "net_worth_primary".to_string(),
            name: "Primary net worth target".to_string(),
            category: GoalCategory::NetWorth,
            target_amount: 1_800_000.0,
            current_amount: 0.0,
            currency: "USD".to_string(),
            target_date: today + Duration::days(540),
            strategy: GrowthStrategy::ModelOptimized,
            milestones: vec![
                Milestone::new(
                    "net_worth_25",
                    "25% net worth milestone",
                    450_000.0,
                    today + Duration::days(180),
                )
                .with_triggers(vec![
                    "net_worth_tracking".to_string(),
                    "expense_optimization".to_string(),
                ]),
                Milestone::new(
                    "net_worth_50",
                    "50% net worth milestone",
                    900_000.0,
                    today + Duration::days(360),
                )
                .with_triggers(vec!["daily_revenue_tracking".to_string()]),
                Milestone::new(
                    "net_worth_75",
                    "75% net worth milestone",
                    1_350_000.0,
                    today + Duration::days(450),
                )
                .with_triggers(vec!["net_worth_tracking".to_string()]),
            ],
            automation_rules: vec![
                "net_worth_tracking".to_string(),
                "expense_optimization".to_string(),
            ],
            metadata: metadata(),
        },
        Goal {
            id: "daily_revenue".to_string(),
            name: "Daily revenue target".to_string(),
            category: GoalCategory::Revenue,
            target_amount: 4_881.0,
            current_amount: 0.0,
            currency: "USD".to_string(),
            target_date: today + Duration::days(540),
            strategy: GrowthStrategy::Exponential,
            milestones: vec![
                Milestone::new(
                    "revenue_1000",
                    "1,000 daily revenue",
                    1_000.0,
                    today + Duration::days(90),
                )
                .with_triggers(vec!["daily_revenue_tracking".to_string()]),
                Milestone::new(
                    "revenue_2500",
                    "2,500 daily revenue",
                    2_500.0,
                    today + Duration::days(270),
                )
                .with_triggers(vec!["daily_revenue_tracking".to_string()]),
            ],
            automation_rules: vec!["daily_revenue_tracking".to_string()],
            metadata: metadata(),
        },
        Goal {
            id: "recurring_revenue".to_string(),
            name: "Monthly recurring revenue target".to_string(),
            category: GoalCategory::RecurringRevenue,
            target_amount: 147_917.0,
            current_amount: 0.0,
            currency: "USD".to_string(),
            target_date: today + Duration::days(540),
            strategy: GrowthStrategy::MilestoneBased,
            milestones: vec![
                Milestone::new(
                    "mrr_50k",
                    "50,000 recurring revenue",
                    50_000.0,
                    today + Duration::days(180),
                )
                .with_triggers(vec!["daily_revenue_tracking".to_string()]),
                Milestone::new(
                    "mrr_100k",
                    "100,000 recurring revenue",
                    100_000.0,
                    today + Duration::days(360),
                )
                .with_triggers(vec!["daily_revenue_tracking".to_string()]),
            ],
            automation_rules: vec!["daily_revenue_tracking".to_string()],
            metadata: metadata(),
        },
    ]
}

/// The four seed rules: goal tracking, revenue tracking, expense
/// optimization, anomaly detection
pub fn default_rules() -> Vec<AutomationRule> {
    vec![
        AutomationRule {
            id: "net_worth_tracking".to_string(),
            name: "Net worth goal progress tracking".to_string(),
            description: "Monitor progress toward the net worth target".to_string(),
            category: RuleCategory::GoalTracking,
            priority: Priority::High,
            enabled: true,
            schedule: Some(Schedule::EveryHours(6)),
            conditions: vec![Condition {
                id: "net_worth_updated".to_string(),
                kind: ConditionKind::Threshold {
                    field: "net_worth".to_string(),
                    op: CompareOp::Gt,
                    value: 0.0,
                },
            }],
            actions: vec![
                Action {
                    id: "update_progress".to_string(),
                    target: "calculations".to_string(),
                    priority: Priority::High,
                    kind: ActionKind::Calculation {
                        operation: Aggregate::Last,
                        field: "net_worth_series".to_string(),
                    },
                },
                Action {
                    id: "notify_milestone".to_string(),
                    target: "notifications".to_string(),
                    priority: Priority::Medium,
                    kind: ActionKind::Notification {
                        channels: vec!["dashboard".to_string()],
                        message: "Net worth progress updated".to_string(),
                    },
                },
                Action {
                    id: "sync_documents".to_string(),
                    target: "documents".to_string(),
                    priority: Priority::Medium,
                    kind: ActionKind::IntegrationSync {
                        integration_id: "goal_tracking_pages".to_string(),
                    },
                },
            ],
            metadata: RuleMetadata::new(),
        },
        AutomationRule {
            id: "daily_revenue_tracking".to_string(),
            name: "Daily revenue tracking".to_string(),
            description: "Monitor daily revenue progress toward the target".to_string(),
            category: RuleCategory::RevenueTracking,
            priority: Priority::High,
            enabled: true,
            schedule: Some(Schedule::EveryHours(3)),
            conditions: vec![Condition {
                id: "revenue_updated".to_string(),
                kind: ConditionKind::Threshold {
                    field: "revenue".to_string(),
                    op: CompareOp::Gt,
                    value: 0.0,
                },
            }],
            actions: vec![
                Action {
                    id: "check_daily_target".to_string(),
                    target: "calculations".to_string(),
                    priority: Priority::High,
                    kind: ActionKind::Calculation {
                        operation: Aggregate::Mean,
                        field: "revenue_series".to_string(),
                    },
                },
                Action {
                    id: "create_action_task".to_string(),
                    target: "tasks".to_string(),
                    priority: Priority::Medium,
                    kind: ActionKind::TaskCreation {
                        title: "Review daily revenue performance".to_string(),
                        notes: Some("Created when revenue tracking fires".to_string()),
                    },
                },
            ],
            metadata: RuleMetadata::new(),
        },
        AutomationRule {
            id: "expense_optimization".to_string(),
            name: "Expense analysis and optimization".to_string(),
            description: "Analyze expense trends and surface reduction opportunities"
                .to_string(),
            category: RuleCategory::ExpenseOptimization,
            priority: Priority::Medium,
            enabled: true,
            schedule: Some(Schedule::EveryHours(48)),
            conditions: vec![Condition {
                id: "expense_pattern".to_string(),
                kind: ConditionKind::Trend {
                    field: "expenses".to_string(),
                    direction: TrendDirection::Up,
                    min_change: 0.05,
                },
            }],
            actions: vec![
                Action {
                    id: "analyze_expenses".to_string(),
                    target: "calculations".to_string(),
                    priority: Priority::Medium,
                    kind: ActionKind::Calculation {
                        operation: Aggregate::Sum,
                        field: "expenses".to_string(),
                    },
                },
                Action {
                    id: "optimization_task".to_string(),
                    target: "tasks".to_string(),
                    priority: Priority::Medium,
                    kind: ActionKind::TaskCreation {
                        title: "Review expense reduction opportunities".to_string(),
                        notes: Some("Expenses trending up more than 5%".to_string()),
                    },
                },
            ],
            metadata: RuleMetadata::new(),
        },
        AutomationRule {
            id: "anomaly_detection".to_string(),
            name: "Financial anomaly detection".to_string(),
            description: "Detect unusual financial patterns and alert".to_string(),
            category: RuleCategory::Financial,
            priority: Priority::Urgent,
            enabled: true,
            schedule: Some(Schedule::EveryHours(1)),
            conditions: vec![Condition {
                id: "financial_anomaly".to_string(),
                kind: ConditionKind::Anomaly {
                    field: "financial_metrics".to_string(),
                    sigma: 3.0,
                },
            }],
            actions: vec![
                Action {
                    id: "alert_anomaly".to_string(),
                    target: "notifications".to_string(),
                    priority: Priority::Urgent,
                    kind: ActionKind::Notification {
                        channels: vec!["chat".to_string(), "email".to_string()],
                        message: "Financial anomaly detected".to_string(),
                    },
                },
                Action {
                    id: "investigate_anomaly".to_string(),
                    target: "tasks".to_string(),
                    priority: Priority::High,
                    kind: ActionKind::TaskCreation {
                        title: "Investigate financial anomaly".to_string(),
                        notes: None,
                    },
                },
            ],
            metadata: RuleMetadata::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_set_is_consistent() {
        let rules = default_rules();
        let goals = default_goals();
        assert_eq!(rules.len(), 4);
        assert_eq!(goals.len(), 3);

        // Every rule id referenced by a goal or milestone exists
        let rule_ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
        for goal in &goals {
            for rule_id in &goal.automation_rules {
                assert!(rule_ids.contains(&rule_id.as_str()), "missing {}", rule_id);
            }
            for milestone in &goal.milestones {
                assert!(!milestone.achieved);
                for rule_id in &milestone.automation_triggers {
                    assert!(rule_ids.contains(&rule_id.as_str()), "missing {}", rule_id);
                }
            }
        }
    }

    #[test]
    fn test_milestones_are_ordered_below_target() {
        for goal in default_goals() {
            let mut last = 0.0;
            for milestone in &goal.milestones {
                assert!(milestone.target_amount > last);
                assert!(milestone.target_amount < goal.target_amount);
                last = milestone.target_amount;
            }
        }
    }
}
