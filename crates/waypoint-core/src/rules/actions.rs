//! Action handlers
//!
//! Each action kind dispatches to its own handler. Handlers that leave the
//! process (bus submissions, HTTP calls) are bounded by a timeout so a slow
//! external system cannot stall the scheduler tick; the caller catches
//! failures per action.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::bus::{BusRequest, IntegrationBus};
use crate::error::{Error, Result};
use crate::models::AutomationContext;

use super::conditions::series_field;
use super::{Action, ActionKind, Aggregate};

/// Default upper bound for a single action execution
const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes individual actions against the integration bus and HTTP
pub struct ActionExecutor {
    bus: Arc<dyn IntegrationBus>,
    http: reqwest::Client,
    timeout: Duration,
}

impl ActionExecutor {
    pub fn new(bus: Arc<dyn IntegrationBus>) -> Self {
        Self {
            bus,
            http: reqwest::Client::new(),
            timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn bus(&self) -> &Arc<dyn IntegrationBus> {
        &self.bus
    }

    /// Run one action to completion or timeout
    pub async fn execute(
        &self,
        action: &Action,
        ctx: &AutomationContext,
    ) -> Result<serde_json::Value> {
        let work = self.dispatch(action, ctx);
        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(Error::Upstream(format!(
                "action '{}' timed out after {:?}",
                action.id, self.timeout
            ))),
        }
    }

    async fn dispatch(
        &self,
        action: &Action,
        ctx: &AutomationContext,
    ) -> Result<serde_json::Value> {
        debug!(
            action_id = %action.id,
            kind = action.kind.kind_name(),
            target = %action.target,
            "Executing action"
        );

        match &action.kind {
            ActionKind::Notification { channels, message } => {
                self.bus
                    .submit(BusRequest::new(
                        &action.target,
                        "notify",
                        json!({
                            "channels": channels,
                            "message": message,
                            "goal_id": ctx.goal_id,
                            "triggered_by": ctx.triggered_by,
                        }),
                    ))
                    .await
            }
            ActionKind::TaskCreation { title, notes } => {
                self.bus
                    .submit(BusRequest::new(
                        &action.target,
                        "create_task",
                        json!({
                            "title": title,
                            "notes": notes,
                            "goal_id": ctx.goal_id,
                            "rule_id": ctx.rule_id,
                        }),
                    ))
                    .await
            }
            ActionKind::DocumentUpdate { document, fields } => {
                self.bus
                    .submit(BusRequest::new(
                        &action.target,
                        "update_document",
                        json!({
                            "document": document,
                            "fields": fields,
                        }),
                    ))
                    .await
            }
            ActionKind::Calculation { operation, field } => {
                let value = calculate(*operation, field, ctx)?;
                Ok(json!({ "operation": operation, "field": field, "value": value }))
            }
            ActionKind::ExternalApi { url, body } => {
                let response = self.http.post(url).json(body).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(Error::Upstream(format!(
                        "external API {} returned {}",
                        url, status
                    )));
                }
                Ok(json!({ "status": status.as_u16() }))
            }
            ActionKind::IntegrationSync { integration_id } => {
                self.bus
                    .submit(BusRequest::new(
                        &action.target,
                        "sync",
                        json!({ "integration_id": integration_id }),
                    ))
                    .await
            }
        }
    }
}

/// Compute an aggregate over a numeric series in the context data
fn calculate(operation: Aggregate, field: &str, ctx: &AutomationContext) -> Result<f64> {
    let series = series_field(ctx, field)?;
    if series.is_empty() {
        return Err(Error::InvalidData(format!(
            "calculation over empty series '{}'",
            field
        )));
    }

    Ok(match operation {
        Aggregate::Sum => series.iter().sum(),
        Aggregate::Mean => series.iter().sum::<f64>() / series.len() as f64,
        Aggregate::Min => series.iter().cloned().fold(f64::INFINITY, f64::min),
        Aggregate::Max => series.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        Aggregate::Last => series[series.len() - 1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockBus;
    use crate::models::{Priority, TriggerSource};
    use serde_json::json;

    fn action(kind: ActionKind) -> Action {
        Action {
            id: "a1".to_string(),
            target: "tasks".to_string(),
            priority: Priority::Medium,
            kind,
        }
    }

    #[tokio::test]
    async fn test_task_creation_goes_through_bus() {
        let bus = Arc::new(MockBus::new());
        let executor = ActionExecutor::new(bus.clone());
        let ctx = AutomationContext::new(TriggerSource::Manual).with_goal("g1");

        executor
            .execute(
                &action(ActionKind::TaskCreation {
                    title: "Review allocation".to_string(),
                    notes: None,
                }),
                &ctx,
            )
            .await
            .unwrap();

        let submissions = bus.submissions_for("tasks");
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].operation, "create_task");
        assert_eq!(submissions[0].payload["goal_id"], "g1");
    }

    #[tokio::test]
    async fn test_calculation_aggregates() {
        let bus = Arc::new(MockBus::new());
        let executor = ActionExecutor::new(bus);
        let ctx = AutomationContext::new(TriggerSource::Manual)
            .with_data(json!({ "amounts": [1.0, 2.0, 3.0, 4.0] }));

        let result = executor
            .execute(
                &action(ActionKind::Calculation {
                    operation: Aggregate::Mean,
                    field: "amounts".to_string(),
                }),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(result["value"], 2.5);

        let result = executor
            .execute(
                &action(ActionKind::Calculation {
                    operation: Aggregate::Max,
                    field: "amounts".to_string(),
                }),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(result["value"], 4.0);
    }

    #[tokio::test]
    async fn test_bus_failure_propagates() {
        let bus = Arc::new(MockBus::new());
        bus.fail_all();
        let executor = ActionExecutor::new(bus);
        let ctx = AutomationContext::new(TriggerSource::Manual);

        let result = executor
            .execute(
                &action(ActionKind::IntegrationSync {
                    integration_id: "documents".to_string(),
                }),
                &ctx,
            )
            .await;
        assert!(matches!(result, Err(Error::Upstream(_))));
    }
}
