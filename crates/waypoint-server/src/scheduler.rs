//! Background timers for the automation service
//!
//! Four cooperative tokio tasks drive the system:
//!
//! - a per-minute tick that runs due scheduled rules
//! - an hourly comprehensive sweep (monitoring + forecast refresh)
//! - a periodic metrics snapshot log
//! - a daily forecast/model maintenance pass
//!
//! Cadences can be tuned via environment variables:
//!
//! - `WAYPOINT_SWEEP_SCHEDULE`: hours between comprehensive sweeps (default 1)
//! - `WAYPOINT_FORECAST_SCHEDULE`: hours between maintenance passes (default 24)
//! - `WAYPOINT_METRICS_SCHEDULE`: minutes between metrics snapshots (default 15)
//!
//! Every tick logs and continues on failure; one bad rule or goal never
//! blocks the rest of a tick.

use std::time::Duration;

use tokio::time::interval;
use tracing::info;

use waypoint_core::AutomationService;

/// Rule schedules are checked once a minute
const RULE_TICK_SECONDS: u64 = 60;

/// Configuration for the background timers
#[derive(Debug, Clone)]
pub struct AutomationScheduleConfig {
    /// Hours between comprehensive sweeps
    pub sweep_interval_hours: u64,
    /// Hours between forecast maintenance passes
    pub forecast_interval_hours: u64,
    /// Minutes between metrics snapshot logs
    pub metrics_interval_minutes: u64,
}

impl Default for AutomationScheduleConfig {
    fn default() -> Self {
        Self {
            sweep_interval_hours: 1,
            forecast_interval_hours: 24,
            metrics_interval_minutes: 15,
        }
    }
}

impl AutomationScheduleConfig {
    /// Parse configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let parse = |name: &str, fallback: u64| -> u64 {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(fallback)
        };

        Self {
            sweep_interval_hours: parse("WAYPOINT_SWEEP_SCHEDULE", defaults.sweep_interval_hours),
            forecast_interval_hours: parse(
                "WAYPOINT_FORECAST_SCHEDULE",
                defaults.forecast_interval_hours,
            ),
            metrics_interval_minutes: parse(
                "WAYPOINT_METRICS_SCHEDULE",
                defaults.metrics_interval_minutes,
            ),
        }
    }
}

/// Start the four background timers.
///
/// Each runs in its own task so a slow sweep never delays the per-minute
/// rule tick.
pub fn start_automation_scheduler(service: AutomationService, config: AutomationScheduleConfig) {
    info!(
        sweep_hours = config.sweep_interval_hours,
        forecast_hours = config.forecast_interval_hours,
        metrics_minutes = config.metrics_interval_minutes,
        "Starting automation scheduler"
    );

    {
        let service = service.clone();
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(RULE_TICK_SECONDS));
            // Skip the immediate first tick; nothing is due at startup
            ticker.tick().await;
            loop {
                ticker.tick().await;
                service.engine().execute_scheduled_rules().await;
            }
        });
    }

    {
        let service = service.clone();
        let hours = config.sweep_interval_hours;
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(hours * 3600));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                info!("Running comprehensive automation sweep...");
                let summary = service.run_comprehensive_sweep().await;
                info!(
                    goals = summary.goals_processed,
                    predictions = summary.predictions_generated,
                    "Comprehensive sweep completed"
                );
            }
        });
    }

    {
        let service = service.clone();
        let minutes = config.metrics_interval_minutes;
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(minutes * 60));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let metrics = service.metrics();
                info!(
                    executions = metrics.rules.executions,
                    successes = metrics.rules.successes,
                    failures = metrics.rules.failures,
                    goals = metrics.goals_tracked,
                    milestones = metrics.milestones_achieved,
                    operation = "metrics_snapshot",
                    "Automation metrics"
                );
            }
        });
    }

    {
        let hours = config.forecast_interval_hours;
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(hours * 3600));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                info!("Running forecast maintenance...");
                service.forecaster().run_maintenance();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AutomationScheduleConfig::default();
        assert_eq!(config.sweep_interval_hours, 1);
        assert_eq!(config.forecast_interval_hours, 24);
        assert_eq!(config.metrics_interval_minutes, 15);
    }

    #[test]
    fn test_config_from_env_overrides() {
        std::env::set_var("WAYPOINT_SWEEP_SCHEDULE", "6");
        std::env::set_var("WAYPOINT_METRICS_SCHEDULE", "not-a-number");
        let config = AutomationScheduleConfig::from_env();
        assert_eq!(config.sweep_interval_hours, 6);
        // Unparsable values fall back to the default
        assert_eq!(config.metrics_interval_minutes, 15);
        std::env::remove_var("WAYPOINT_SWEEP_SCHEDULE");
        std::env::remove_var("WAYPOINT_METRICS_SCHEDULE");
    }

    #[test]
    fn test_config_rejects_zero() {
        std::env::set_var("WAYPOINT_FORECAST_SCHEDULE", "0");
        let config = AutomationScheduleConfig::from_env();
        assert_eq!(config.forecast_interval_hours, 24);
        std::env::remove_var("WAYPOINT_FORECAST_SCHEDULE");
    }
}
