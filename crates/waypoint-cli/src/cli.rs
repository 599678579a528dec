//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use clap::{Parser, Subcommand};

/// Waypoint - Track financial goals and automate reactions to progress
#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Goal automation and forecasting service", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server and background schedulers
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Allowed CORS origin (repeatable)
        #[arg(long)]
        cors_origin: Vec<String>,

        /// Start with empty registries instead of the default goal/rule set
        #[arg(long)]
        no_seed: bool,
    },

    /// Inspect and update goals
    Goals {
        #[command(subcommand)]
        action: GoalsAction,
    },

    /// Inspect automation rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Generate an ensemble prediction over a synthetic progress history
    Predict {
        /// Goal id (from the seed set, e.g. net_worth_primary)
        goal_id: String,

        /// Number of history points to synthesize
        #[arg(long, default_value = "30")]
        points: usize,

        /// Amount gained per day in the synthetic history
        #[arg(long, default_value = "500.0")]
        daily_gain: f64,
    },

    /// Show the dashboard summary
    Status,
}

#[derive(Subcommand)]
pub enum GoalsAction {
    /// List all goals
    List,

    /// Show one goal with its milestones
    Show { id: String },

    /// Record a progress update and show the resulting analytics
    Update { id: String, amount: f64 },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List all rules
    List,

    /// Show one rule with its conditions and actions
    Show { id: String },
}
