//! Waypoint CLI - Goal automation and forecasting service
//!
//! Usage:
//!   waypoint serve --port 3000     Start the API server and schedulers
//!   waypoint goals list            Show the seeded goals
//!   waypoint rules list            Show the seeded automation rules
//!   waypoint predict <goal-id>     Forecast a goal over a synthetic history
//!   waypoint status                Dashboard summary

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Serve {
            host,
            port,
            cors_origin,
            no_seed,
        } => commands::cmd_serve(&host, port, cors_origin, no_seed).await,
        Commands::Goals { action } => match action {
            GoalsAction::List => commands::cmd_goals_list(),
            GoalsAction::Show { id } => commands::cmd_goals_show(&id),
            GoalsAction::Update { id, amount } => commands::cmd_goals_update(&id, amount).await,
        },
        Commands::Rules { action } => match action {
            RulesAction::List => commands::cmd_rules_list(),
            RulesAction::Show { id } => commands::cmd_rules_show(&id),
        },
        Commands::Predict {
            goal_id,
            points,
            daily_gain,
        } => commands::cmd_predict(&goal_id, points, daily_gain),
        Commands::Status => commands::cmd_status().await,
    }
}
