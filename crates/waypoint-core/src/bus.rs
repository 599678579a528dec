//! Integration bus boundary
//!
//! The rule engine and goal tracker submit fire-and-forget action requests
//! (task creation, document updates, notifications, syncs) to external
//! systems through this trait. Delivery is opaque to the core; only
//! success/failure comes back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// A structured request addressed to an external system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusRequest {
    /// Target system name (e.g. "tasks", "documents", "notifications")
    pub target: String,
    /// Operation the target should perform (e.g. "create_task")
    pub operation: String,
    pub payload: serde_json::Value,
}

impl BusRequest {
    pub fn new(
        target: impl Into<String>,
        operation: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            target: target.into(),
            operation: operation.into(),
            payload,
        }
    }
}

/// Outbound delivery boundary for automation actions
#[async_trait]
pub trait IntegrationBus: Send + Sync {
    /// Submit a request; the returned value is whatever acknowledgement the
    /// delivery mechanism produced
    async fn submit(&self, request: BusRequest) -> Result<serde_json::Value>;
}

/// Bus that logs submissions and reports success without delivering anywhere.
/// The default when no webhook endpoint is configured.
#[derive(Debug, Default)]
pub struct NoopBus;

#[async_trait]
impl IntegrationBus for NoopBus {
    async fn submit(&self, request: BusRequest) -> Result<serde_json::Value> {
        debug!(
            target_system = %request.target,
            operation = %request.operation,
            "Integration request (noop bus)"
        );
        Ok(serde_json::json!({ "delivered": false, "target": request.target }))
    }
}

/// Bus that POSTs each request as JSON to a single webhook endpoint
pub struct WebhookBus {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookBus {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Build from `WAYPOINT_WEBHOOK_URL`, if set
    pub fn from_env() -> Option<Self> {
        std::env::var("WAYPOINT_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .map(Self::new)
    }
}

#[async_trait]
impl IntegrationBus for WebhookBus {
    async fn submit(&self, request: BusRequest) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "webhook returned {} for {}/{}",
                status, request.target, request.operation
            )));
        }

        // Some webhook receivers reply with an empty body; treat that as ack
        Ok(response
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::Value::Null))
    }
}

/// Recording bus for tests: remembers every submission and can be told to fail
#[cfg(any(test, feature = "test-utils"))]
pub struct MockBus {
    submissions: std::sync::Mutex<Vec<BusRequest>>,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockBus {
    pub fn new() -> Self {
        Self {
            submissions: std::sync::Mutex::new(vec![]),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Make every subsequent submission fail with an upstream error
    pub fn fail_all(&self) {
        self.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<BusRequest> {
        self.submissions.lock().unwrap().clone()
    }

    /// Submissions addressed to a given target system
    pub fn submissions_for(&self, target: &str) -> Vec<BusRequest> {
        self.submissions()
            .into_iter()
            .filter(|r| r.target == target)
            .collect()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl IntegrationBus for MockBus {
    async fn submit(&self, request: BusRequest) -> Result<serde_json::Value> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::Upstream(format!(
                "mock bus configured to fail: {}/{}",
                request.target, request.operation
            )));
        }
        self.submissions.lock().unwrap().push(request);
        Ok(serde_json::json!({ "delivered": true }))
    }
}
