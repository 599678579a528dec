//! API route handlers, organized by domain

mod goals;
mod predictions;
mod rules;
mod system;

pub use goals::{
    create_goal, get_goal, get_goal_analytics, get_goal_history, list_goals, update_goal_progress,
};
pub use predictions::{
    generate_prediction, get_market_data, get_prediction, list_models, what_if_prediction,
};
pub use rules::{
    disable_rule, enable_rule, execute_rule, get_rule, get_rule_history, list_rules, register_rule,
};
pub use system::{get_dashboard, get_metrics, get_status, run_sweep};
