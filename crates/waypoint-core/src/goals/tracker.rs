//! Goal tracker: progress updates, milestone detection, trigger dispatch

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use tracing::{info, warn};

use crate::bus::{BusRequest, IntegrationBus};
use crate::error::{Error, Result};
use crate::models::{
    AutomationContext, Goal, Milestone, ProgressPoint, ProgressSource, TriggerSource,
};
use crate::rules::RuleEngine;

use super::{compute_analytics, AnalyticsConfig, GoalAnalytics, TrendClassification};

/// Progress histories keep the most recent 1000 observations
const PROGRESS_HISTORY_CAP: usize = 1000;

/// Owns goal state and progress histories.
///
/// Milestone achievements and 25%-band crossings trigger automation rules
/// through the shared [`RuleEngine`]; check-and-set of the achieved flag
/// happens under the goal's registry entry so each milestone fires exactly
/// once even under concurrent updates.
pub struct GoalTracker {
    goals: DashMap<String, Goal>,
    histories: DashMap<String, Vec<ProgressPoint>>,
    engine: Arc<RuleEngine>,
    bus: Arc<dyn IntegrationBus>,
    analytics_config: AnalyticsConfig,
    milestones_achieved: AtomicU64,
}

impl GoalTracker {
    pub fn new(engine: Arc<RuleEngine>, bus: Arc<dyn IntegrationBus>) -> Self {
        Self::with_config(engine, bus, AnalyticsConfig::default())
    }

    pub fn with_config(
        engine: Arc<RuleEngine>,
        bus: Arc<dyn IntegrationBus>,
        analytics_config: AnalyticsConfig,
    ) -> Self {
        Self {
            goals: DashMap::new(),
            histories: DashMap::new(),
            engine,
            bus,
            analytics_config,
            milestones_achieved: AtomicU64::new(0),
        }
    }

    /// Register a goal with an empty progress history, replacing any
    /// existing goal with the same id
    pub fn create_goal(&self, goal: Goal) {
        info!(
            goal_id = %goal.id,
            name = %goal.name,
            category = %goal.category,
            target_amount = goal.target_amount,
            operation = "goal_creation",
            "Goal created"
        );
        self.histories.insert(goal.id.clone(), vec![]);
        self.goals.insert(goal.id.clone(), goal);
    }

    /// Overwrite the goal's current amount, append a progress observation,
    /// and fire milestone and band triggers.
    ///
    /// Returns a snapshot of the goal after the update.
    pub async fn update_goal_progress(
        &self,
        goal_id: &str,
        new_amount: f64,
        source: ProgressSource,
        factors: Vec<String>,
    ) -> Result<Goal> {
        let now = Utc::now();

        // State mutation and milestone check-and-set happen under the
        // entry guard; trigger dispatch happens after it is released
        let (snapshot, old_amount, achieved, old_band, new_band) = {
            let mut goal = self
                .goals
                .get_mut(goal_id)
                .ok_or_else(|| Error::GoalNotFound(goal_id.to_string()))?;

            let old_amount = goal.current_amount;
            goal.current_amount = new_amount;
            goal.metadata.last_updated = now;

            let achieved: Vec<Milestone> = goal
                .milestones
                .iter_mut()
                .filter(|m| !m.achieved && new_amount >= m.target_amount)
                .map(|m| {
                    m.achieved = true;
                    m.achieved_at = Some(now);
                    m.clone()
                })
                .collect();

            let old_band = progress_band(old_amount, goal.target_amount);
            let new_band = progress_band(new_amount, goal.target_amount);

            (goal.clone(), old_amount, achieved, old_band, new_band)
        };

        {
            let mut history = self.histories.entry(goal_id.to_string()).or_default();
            history.push(ProgressPoint {
                at: now,
                amount: new_amount,
                source,
                confidence: source.default_confidence(),
                factors,
            });
            if history.len() > PROGRESS_HISTORY_CAP {
                history.remove(0);
            }
        }

        info!(
            goal_id = %goal_id,
            amount = new_amount,
            previous = old_amount,
            progress_percent = snapshot.progress_percent(),
            source = %source,
            operation = "progress_update",
            "Goal progress updated"
        );

        // Trigger contexts carry the goal amounts under keys the seed
        // rules' conditions read (e.g. "net_worth", "net_worth_series")
        let trigger_data = self.trigger_payload(&snapshot);

        for milestone in &achieved {
            self.milestones_achieved.fetch_add(1, Ordering::Relaxed);
            info!(
                goal_id = %goal_id,
                milestone_id = %milestone.id,
                milestone_name = %milestone.name,
                amount = new_amount,
                operation = "milestone_achievement",
                "Milestone achieved"
            );

            let mut data = trigger_data.clone();
            data.insert("milestone".to_string(), json!(milestone));
            let ctx = AutomationContext::new(TriggerSource::Milestone)
                .with_goal(goal_id)
                .with_data(serde_json::Value::Object(data));
            for rule_id in &milestone.automation_triggers {
                if let Err(e) = self.engine.execute_rule(rule_id, &ctx).await {
                    warn!(
                        goal_id = %goal_id,
                        rule_id = %rule_id,
                        error = %e,
                        "Milestone-triggered rule failed"
                    );
                }
            }

            self.submit_milestone_task(&snapshot, milestone).await;
        }

        // One band trigger per update, however many bands the jump spans
        if new_band > old_band {
            let mut data = trigger_data.clone();
            data.insert("band".to_string(), json!(new_band * 25));
            let ctx = AutomationContext::new(TriggerSource::Condition)
                .with_goal(goal_id)
                .with_data(serde_json::Value::Object(data));
            for rule_id in &snapshot.automation_rules {
                if let Err(e) = self.engine.execute_rule(rule_id, &ctx).await {
                    warn!(
                        goal_id = %goal_id,
                        rule_id = %rule_id,
                        error = %e,
                        "Band-triggered rule failed"
                    );
                }
            }
        }

        Ok(snapshot)
    }

    /// Analytics over the goal's recent history
    pub fn calculate_goal_analytics(&self, goal_id: &str) -> Result<GoalAnalytics> {
        let goal = self
            .goals
            .get(goal_id)
            .map(|g| g.clone())
            .ok_or_else(|| Error::GoalNotFound(goal_id.to_string()))?;
        let history = self.progress_history(goal_id);
        Ok(compute_analytics(&goal, &history, &self.analytics_config))
    }

    /// Periodic sweep: log analytics per goal and raise an alert when a
    /// goal is confidently trending down
    pub async fn monitor_goals(&self) {
        for goal in self.goals() {
            let analytics = match self.calculate_goal_analytics(&goal.id) {
                Ok(a) => a,
                Err(e) => {
                    warn!(goal_id = %goal.id, error = %e, "Goal monitoring failed");
                    continue;
                }
            };

            info!(
                goal_id = %goal.id,
                progress_percent = goal.progress_percent(),
                velocity = analytics.velocity_per_day,
                trend = %analytics.trend,
                confidence = analytics.confidence,
                operation = "progress_monitoring",
                "Goal analytics"
            );

            if analytics.trend == TrendClassification::Down && analytics.confidence > 70.0 {
                let request = BusRequest::new(
                    "tasks",
                    "create_task",
                    json!({
                        "title": format!("Goal progress alert: {}", goal.name),
                        "notes": format!(
                            "Progress has slowed or reversed. Current velocity: {:.2} per day.",
                            analytics.velocity_per_day
                        ),
                        "priority": "high",
                        "goal_id": goal.id,
                    }),
                );
                if let Err(e) = self.bus.submit(request).await {
                    warn!(goal_id = %goal.id, error = %e, "Failed to submit progress alert");
                }
            }
        }
    }

    pub fn goals(&self) -> Vec<Goal> {
        let mut goals: Vec<_> = self.goals.iter().map(|g| g.clone()).collect();
        goals.sort_by(|a, b| a.id.cmp(&b.id));
        goals
    }

    pub fn goal(&self, goal_id: &str) -> Option<Goal> {
        self.goals.get(goal_id).map(|g| g.clone())
    }

    pub fn progress_history(&self, goal_id: &str) -> Vec<ProgressPoint> {
        self.histories
            .get(goal_id)
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Replace a goal's history wholesale (synthetic histories for what-if
    /// exploration and the CLI predict command)
    pub fn seed_history(&self, goal_id: &str, points: Vec<ProgressPoint>) -> Result<()> {
        if !self.goals.contains_key(goal_id) {
            return Err(Error::GoalNotFound(goal_id.to_string()));
        }
        let mut points = points;
        if points.len() > PROGRESS_HISTORY_CAP {
            points.drain(..points.len() - PROGRESS_HISTORY_CAP);
        }
        self.histories.insert(goal_id.to_string(), points);
        Ok(())
    }

    /// Total milestones achieved since startup
    pub fn milestones_achieved(&self) -> u64 {
        self.milestones_achieved.load(Ordering::Relaxed)
    }

    /// Context data for milestone and band triggers: the goal snapshot plus
    /// amounts keyed by the goal's category so threshold/trend/anomaly
    /// conditions have something to evaluate
    fn trigger_payload(&self, goal: &Goal) -> serde_json::Map<String, serde_json::Value> {
        let history = self.progress_history(&goal.id);
        let start = history.len().saturating_sub(30);
        let series: Vec<f64> = history[start..].iter().map(|p| p.amount).collect();

        let mut data = serde_json::Map::new();
        data.insert("current_amount".to_string(), json!(goal.current_amount));
        data.insert(
            "progress_percent".to_string(),
            json!(goal.progress_percent()),
        );
        data.insert("goal".to_string(), json!(goal));
        data.insert(goal.category.as_str().to_string(), json!(goal.current_amount));
        data.insert(format!("{}_series", goal.category.as_str()), json!(series));
        data
    }

    async fn submit_milestone_task(&self, goal: &Goal, milestone: &Milestone) {
        let request = BusRequest::new(
            "tasks",
            "create_task",
            json!({
                "title": format!("Milestone achieved: {}", milestone.name),
                "notes": format!(
                    "{} reached {} {:.2} toward {} {:.2}.",
                    goal.name, goal.currency, milestone.target_amount,
                    goal.currency, goal.target_amount
                ),
                "goal_id": goal.id,
                "milestone_id": milestone.id,
            }),
        );
        if let Err(e) = self.bus.submit(request).await {
            warn!(
                goal_id = %goal.id,
                milestone_id = %milestone.id,
                error = %e,
                "Failed to submit milestone task"
            );
        }
    }
}

/// Which 25% band an amount falls in (0..=4, saturating above the target)
fn progress_band(amount: f64, target: f64) -> u8 {
    if target <= 0.0 {
        return 0;
    }
    let percent = (amount / target) * 100.0;
    ((percent / 25.0).floor() as i64).clamp(0, 4) as u8
}
