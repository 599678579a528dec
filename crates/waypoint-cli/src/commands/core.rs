//! Serve and status command implementations

use anyhow::Result;

use waypoint_server::ServerConfig;

use super::demo_service;

pub async fn cmd_serve(
    host: &str,
    port: u16,
    cors_origins: Vec<String>,
    no_seed: bool,
) -> Result<()> {
    let config = ServerConfig {
        allowed_origins: cors_origins,
        seed_defaults: !no_seed,
    };
    waypoint_server::serve(host, port, config).await
}

pub async fn cmd_status() -> Result<()> {
    let service = demo_service();
    service.run_comprehensive_sweep().await;
    let dashboard = service.dashboard();

    println!();
    println!("📊 Waypoint Status");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Active rules: {}", dashboard.active_rules);
    println!("   Executions:   {}", dashboard.executions);
    println!("   Success rate: {:.1}%", dashboard.success_rate);
    println!("   Risk level:   {:?}", dashboard.risk_level);
    println!();

    println!("   Goals:");
    for goal in &dashboard.goal_progress {
        println!(
            "   - {:<40} {:>6.1}%  [{}]",
            goal.name, goal.progress_percent, goal.category
        );
    }

    if let Some((goal_id, date)) = &dashboard.next_completion {
        println!();
        println!("   Next predicted completion: {} on {}", goal_id, date);
    }

    if !dashboard.alerts.is_empty() {
        println!();
        println!("   Alerts:");
        for alert in &dashboard.alerts {
            println!("   ⚠️  {}", alert);
        }
    }

    println!();
    Ok(())
}
