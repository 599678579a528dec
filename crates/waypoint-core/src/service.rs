//! Umbrella automation service
//!
//! Wires the rule engine, goal tracker, and forecaster together and exposes
//! the aggregate surfaces: the hourly comprehensive sweep, combined
//! metrics, the dashboard summary, and component health.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::bus::IntegrationBus;
use crate::forecast::Forecaster;
use crate::goals::GoalTracker;
use crate::models::Recommendation;
use crate::rules::{EngineMetricsSnapshot, RuleEngine};

/// Owns the three core subsystems. Cloning is cheap and shares the
/// underlying registries, like cloning a pooled database handle.
#[derive(Clone)]
pub struct AutomationService {
    engine: Arc<RuleEngine>,
    tracker: Arc<GoalTracker>,
    forecaster: Arc<Forecaster>,
}

/// Combined counters across the subsystems
#[derive(Debug, Clone, Serialize)]
pub struct AutomationMetrics {
    pub rules: EngineMetricsSnapshot,
    pub goals_tracked: usize,
    pub milestones_achieved: u64,
    pub predictions_cached: usize,
}

/// What one comprehensive sweep did
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub goals_processed: usize,
    pub predictions_generated: usize,
    pub recommendations: Vec<Recommendation>,
}

/// Per-goal progress line for the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct GoalProgressSummary {
    pub goal_id: String,
    pub name: String,
    pub category: String,
    pub progress_percent: f64,
}

/// Overall risk classification for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Aggregated dashboard summary
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub active_rules: usize,
    pub executions: u64,
    pub success_rate: f64,
    pub goal_progress: Vec<GoalProgressSummary>,
    pub next_completion: Option<(String, chrono::NaiveDate)>,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<Recommendation>,
    pub alerts: Vec<String>,
}

/// Component health states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentHealth {
    Healthy,
    Warning,
    Error,
}

/// Liveness summary for the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub status: ComponentHealth,
    pub rules_engine: ComponentHealth,
    pub goal_tracker: ComponentHealth,
    pub forecaster: ComponentHealth,
    pub metrics: AutomationMetrics,
}

impl AutomationService {
    pub fn new(bus: Arc<dyn IntegrationBus>) -> Self {
        let engine = Arc::new(RuleEngine::new(bus.clone()));
        let tracker = Arc::new(GoalTracker::new(engine.clone(), bus));
        let forecaster = Arc::new(Forecaster::new());
        Self {
            engine,
            tracker,
            forecaster,
        }
    }

    pub fn engine(&self) -> &Arc<RuleEngine> {
        &self.engine
    }

    pub fn tracker(&self) -> &Arc<GoalTracker> {
        &self.tracker
    }

    pub fn forecaster(&self) -> &Arc<Forecaster> {
        &self.forecaster
    }

    /// The hourly sweep: monitor every goal, regenerate its prediction,
    /// and collect the recommendations that fell out
    pub async fn run_comprehensive_sweep(&self) -> SweepSummary {
        self.tracker.monitor_goals().await;

        let mut recommendations = vec![];
        let mut predictions_generated = 0;
        let goals = self.tracker.goals();
        let goals_processed = goals.len();

        for goal in goals {
            if let Ok(analytics) = self.tracker.calculate_goal_analytics(&goal.id) {
                recommendations.extend(analytics.recommendations);
            }
            let history = self.tracker.progress_history(&goal.id);
            let prediction = self.forecaster.generate_goal_prediction(&goal, &history);
            recommendations.extend(prediction.recommendations);
            predictions_generated += 1;
        }

        info!(
            goals_processed,
            predictions_generated,
            operation = "comprehensive_sweep",
            "Comprehensive automation sweep complete"
        );

        SweepSummary {
            goals_processed,
            predictions_generated,
            recommendations,
        }
    }

    pub fn metrics(&self) -> AutomationMetrics {
        AutomationMetrics {
            rules: self.engine.metrics(),
            goals_tracked: self.tracker.goals().len(),
            milestones_achieved: self.tracker.milestones_achieved(),
            predictions_cached: self
                .tracker
                .goals()
                .iter()
                .filter(|g| self.forecaster.prediction(&g.id).is_some())
                .count(),
        }
    }

    /// Summary for dashboards: progress, the nearest predicted completion,
    /// risk classification, top recommendations, and alert strings
    pub fn dashboard(&self) -> Dashboard {
        let rules = self.engine.rules();
        let metrics = self.engine.metrics();
        let goals = self.tracker.goals();

        let goal_progress: Vec<GoalProgressSummary> = goals
            .iter()
            .map(|g| GoalProgressSummary {
                goal_id: g.id.clone(),
                name: g.name.clone(),
                category: g.category.to_string(),
                progress_percent: g.progress_percent(),
            })
            .collect();

        let next_completion = goals
            .iter()
            .filter_map(|g| {
                self.forecaster
                    .prediction(&g.id)
                    .map(|p| (g.id.clone(), p.predicted_date))
            })
            .min_by_key(|(_, date)| *date);

        let avg_progress = if goal_progress.is_empty() {
            0.0
        } else {
            goal_progress
                .iter()
                .map(|g| g.progress_percent.min(100.0))
                .sum::<f64>()
                / goal_progress.len() as f64
        };
        let risk_level = if avg_progress > 75.0 {
            RiskLevel::Low
        } else if avg_progress > 50.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        };

        let mut recommendations = vec![];
        for goal in &goals {
            if let Ok(analytics) = self.tracker.calculate_goal_analytics(&goal.id) {
                recommendations.extend(analytics.recommendations);
            }
        }
        recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
        recommendations.truncate(5);

        let success_rate = if metrics.executions > 0 {
            metrics.successes as f64 / metrics.executions as f64 * 100.0
        } else {
            100.0
        };

        let mut alerts = vec![];
        for summary in &goal_progress {
            if summary.progress_percent < 25.0 {
                alerts.push(format!(
                    "{} progress below 25% - consider acceleration strategies",
                    summary.name
                ));
            }
        }
        if risk_level == RiskLevel::High {
            alerts.push(
                "High risk detected - review financial strategy and automation rules".to_string(),
            );
        }
        if success_rate < 85.0 {
            alerts.push(
                "Automation success rate below optimal - review rule configurations".to_string(),
            );
        }

        Dashboard {
            active_rules: rules.iter().filter(|r| r.enabled).count(),
            executions: metrics.executions,
            success_rate,
            goal_progress,
            next_completion,
            risk_level,
            recommendations,
            alerts,
        }
    }

    /// Probe each component; in-memory components only degrade if a probe
    /// itself misbehaves, but callers get a stable shape to monitor
    pub fn system_status(&self) -> SystemStatus {
        let rules_engine = ComponentHealth::Healthy;
        let goal_tracker = ComponentHealth::Healthy;
        let forecaster = ComponentHealth::Healthy;

        SystemStatus {
            status: ComponentHealth::Healthy,
            rules_engine,
            goal_tracker,
            forecaster,
            metrics: self.metrics(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap;
    use crate::bus::MockBus;
    use crate::models::ProgressSource;

    #[tokio::test]
    async fn test_sweep_generates_predictions_for_all_goals() {
        let service = AutomationService::new(Arc::new(MockBus::new()));
        bootstrap::seed(&service);

        let summary = service.run_comprehensive_sweep().await;
        assert_eq!(summary.goals_processed, 3);
        assert_eq!(summary.predictions_generated, 3);

        for goal in service.tracker().goals() {
            assert!(service.forecaster().prediction(&goal.id).is_some());
        }
    }

    #[tokio::test]
    async fn test_dashboard_reflects_progress() {
        let service = AutomationService::new(Arc::new(MockBus::new()));
        bootstrap::seed(&service);

        let dashboard = service.dashboard();
        assert!(dashboard.active_rules >= 4);
        // Everything at zero progress: high risk, low-progress alerts
        assert_eq!(dashboard.risk_level, RiskLevel::High);
        assert!(!dashboard.alerts.is_empty());

        // Push one goal forward and update again
        let goal_id = service.tracker().goals()[0].id.clone();
        let target = service.tracker().goal(&goal_id).unwrap().target_amount;
        service
            .tracker()
            .update_goal_progress(&goal_id, target * 0.9, ProgressSource::Manual, vec![])
            .await
            .unwrap();

        let dashboard = service.dashboard();
        let summary = dashboard
            .goal_progress
            .iter()
            .find(|g| g.goal_id == goal_id)
            .unwrap();
        assert!(summary.progress_percent > 80.0);
    }

    #[test]
    fn test_metrics_shape() {
        let service = AutomationService::new(Arc::new(MockBus::new()));
        bootstrap::seed(&service);

        let metrics = service.metrics();
        assert_eq!(metrics.goals_tracked, 3);
        assert_eq!(metrics.predictions_cached, 0);
        assert_eq!(metrics.milestones_achieved, 0);

        let status = service.system_status();
        assert_eq!(status.status, ComponentHealth::Healthy);
    }
}
