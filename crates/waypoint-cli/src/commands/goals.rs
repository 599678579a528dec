//! Goal inspection command implementations

use anyhow::{bail, Result};

use waypoint_core::ProgressSource;

use super::demo_service;

pub fn cmd_goals_list() -> Result<()> {
    let service = demo_service();

    println!();
    println!("🎯 Goals");
    println!("   ─────────────────────────────────────────────────────────────");
    for goal in service.tracker().goals() {
        println!(
            "   {:<22} {:<38} {} {:>12.0}  ({} milestones)",
            goal.id,
            goal.name,
            goal.currency,
            goal.target_amount,
            goal.milestones.len()
        );
    }
    println!();
    Ok(())
}

pub fn cmd_goals_show(id: &str) -> Result<()> {
    let service = demo_service();
    let Some(goal) = service.tracker().goal(id) else {
        bail!("Goal not found: {}", id);
    };

    println!();
    println!("🎯 {}", goal.name);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Category:  {}", goal.category);
    println!("   Strategy:  {}", goal.strategy);
    println!(
        "   Target:    {} {:.0} by {}",
        goal.currency, goal.target_amount, goal.target_date
    );
    println!(
        "   Current:   {} {:.0} ({:.1}%)",
        goal.currency,
        goal.current_amount,
        goal.progress_percent()
    );

    if !goal.milestones.is_empty() {
        println!();
        println!("   Milestones:");
        for milestone in &goal.milestones {
            let mark = if milestone.achieved { "✅" } else { "▫️" };
            println!(
                "   {} {:<32} {} {:>12.0} by {}",
                mark, milestone.name, goal.currency, milestone.target_amount, milestone.target_date
            );
        }
    }

    if !goal.automation_rules.is_empty() {
        println!();
        println!("   Band-crossing rules: {}", goal.automation_rules.join(", "));
    }

    println!();
    Ok(())
}

pub async fn cmd_goals_update(id: &str, amount: f64) -> Result<()> {
    let service = demo_service();
    let goal = service
        .tracker()
        .update_goal_progress(id, amount, ProgressSource::Manual, vec!["cli".to_string()])
        .await?;

    println!();
    println!(
        "Updated {} to {} {:.0} ({:.1}%)",
        goal.id,
        goal.currency,
        goal.current_amount,
        goal.progress_percent()
    );

    for milestone in goal.milestones.iter().filter(|m| m.achieved) {
        println!("🎉 Milestone achieved: {}", milestone.name);
    }

    let analytics = service.tracker().calculate_goal_analytics(id)?;
    println!();
    println!("   Velocity:   {:.2}/day", analytics.velocity_per_day);
    println!("   Trend:      {}", analytics.trend);
    println!("   Confidence: {:.0}%", analytics.confidence);
    match analytics.time_to_completion_days {
        Some(days) => println!("   Completion: ~{:.0} days at current velocity", days),
        None => println!("   Completion: not reachable at current velocity"),
    }
    println!();
    Ok(())
}
