//! Command implementations
//!
//! Inspection commands run against a freshly bootstrapped in-memory
//! service: useful for exploring the seed set and forecasting behavior
//! without a running server.

mod core;
mod goals;
mod predict;
mod rules;

pub use core::{cmd_serve, cmd_status};
pub use goals::{cmd_goals_list, cmd_goals_show, cmd_goals_update};
pub use predict::cmd_predict;
pub use rules::{cmd_rules_list, cmd_rules_show};

use std::sync::Arc;

use waypoint_core::{bootstrap, AutomationService, NoopBus};

/// A bootstrapped in-memory service for inspection commands
pub(crate) fn demo_service() -> AutomationService {
    let service = AutomationService::new(Arc::new(NoopBus));
    bootstrap::seed(&service);
    service
}
