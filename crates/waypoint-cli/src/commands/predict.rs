//! Prediction command implementation

use anyhow::{bail, Result};
use chrono::{Duration, Utc};

use waypoint_core::{ProgressPoint, ProgressSource};

use super::demo_service;

/// Seed a synthetic steady-gain history and run the ensemble over it
pub fn cmd_predict(goal_id: &str, points: usize, daily_gain: f64) -> Result<()> {
    let service = demo_service();
    let Some(goal) = service.tracker().goal(goal_id) else {
        bail!("Goal not found: {}", goal_id);
    };

    let begin = Utc::now() - Duration::days(points as i64);
    let history: Vec<ProgressPoint> = (0..=points)
        .map(|i| ProgressPoint {
            at: begin + Duration::days(i as i64),
            amount: goal.current_amount + daily_gain * i as f64,
            source: ProgressSource::Calculated,
            confidence: ProgressSource::Calculated.default_confidence(),
            factors: vec!["synthetic".to_string()],
        })
        .collect();
    service.tracker().seed_history(goal_id, history)?;

    let history = service.tracker().progress_history(goal_id);
    let prediction = service.forecaster().generate_goal_prediction(&goal, &history);

    println!();
    println!("🔮 Prediction for {}", goal.name);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Synthetic history: {} points gaining {:.0}/day",
        points + 1,
        daily_gain
    );
    println!(
        "   Predicted amount:  {} {:.0}",
        goal.currency, prediction.predicted_amount
    );
    println!("   Predicted date:    {}", prediction.predicted_date);
    println!("   Confidence:        {:.0}%", prediction.confidence);

    println!();
    println!("   Scenarios:");
    for (name, scenario) in [
        ("optimistic", &prediction.scenarios.optimistic),
        ("realistic", &prediction.scenarios.realistic),
        ("pessimistic", &prediction.scenarios.pessimistic),
    ] {
        println!(
            "   - {:<12} {} {:>12.0} on {} ({}%)",
            name, goal.currency, scenario.amount, scenario.date, scenario.probability
        );
    }

    if !prediction.risk_factors.is_empty() {
        println!();
        println!("   Risk factors:");
        for risk in &prediction.risk_factors {
            println!("   ⚠️  {}", risk);
        }
    }

    if !prediction.recommendations.is_empty() {
        println!();
        println!("   Recommendations:");
        for recommendation in &prediction.recommendations {
            println!(
                "   - [{}] {}: {}",
                recommendation.priority, recommendation.title, recommendation.description
            );
        }
    }

    println!();
    Ok(())
}
