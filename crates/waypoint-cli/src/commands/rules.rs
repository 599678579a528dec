//! Rule inspection command implementations

use anyhow::{bail, Result};

use super::demo_service;

pub fn cmd_rules_list() -> Result<()> {
    let service = demo_service();

    println!();
    println!("⚙️  Automation rules");
    println!("   ─────────────────────────────────────────────────────────────");
    for rule in service.engine().rules() {
        let schedule = rule
            .schedule
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unscheduled".to_string());
        let state = if rule.enabled { "enabled" } else { "disabled" };
        println!(
            "   {:<24} {:<38} {:<10} [{}] {}",
            rule.id, rule.name, schedule, rule.priority, state
        );
    }
    println!();
    Ok(())
}

pub fn cmd_rules_show(id: &str) -> Result<()> {
    let service = demo_service();
    let Some(rule) = service.engine().rule(id) else {
        bail!("Rule not found: {}", id);
    };

    println!();
    println!("⚙️  {}", rule.name);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {}", rule.description);
    println!("   Category: {}", rule.category);
    println!("   Priority: {}", rule.priority);
    if let Some(schedule) = rule.schedule {
        println!("   Schedule: {}", schedule);
    }

    println!();
    println!("   Conditions:");
    for condition in &rule.conditions {
        println!("   - {} ({})", condition.id, condition.kind.kind_name());
    }

    println!();
    println!("   Actions (by priority):");
    let mut actions = rule.actions.clone();
    actions.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));
    for action in &actions {
        println!(
            "   - [{}] {} -> {} ({})",
            action.priority,
            action.id,
            action.target,
            action.kind.kind_name()
        );
    }

    println!();
    Ok(())
}
