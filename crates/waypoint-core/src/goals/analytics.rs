//! Goal analytics: velocity, time-to-completion, trend, confidence

use crate::models::{
    Effort, Goal, GoalCategory, ProgressPoint, Recommendation, RecommendationImpact,
    RecommendationKind,
};

use super::{AnalyticsConfig, GoalAnalytics, TrendClassification};

const DAY_SECONDS: f64 = 86_400.0;

/// Compute analytics over a goal's progress history.
///
/// Pure over its inputs; fewer than two points yields the degenerate
/// result rather than an error.
pub fn compute_analytics(
    goal: &Goal,
    history: &[ProgressPoint],
    config: &AnalyticsConfig,
) -> GoalAnalytics {
    if history.len() < 2 {
        return GoalAnalytics::degenerate();
    }

    let window_start = history.len().saturating_sub(config.window);
    let recent = &history[window_start..];

    let first = &recent[0];
    let last = &recent[recent.len() - 1];
    let span_days = (last.at - first.at).num_seconds() as f64 / DAY_SECONDS;
    if span_days <= 0.0 {
        // Observations with no elapsed time between them carry no rate signal
        return GoalAnalytics::degenerate();
    }

    let velocity = (last.amount - first.amount) / span_days;

    let time_to_completion_days = if velocity > 0.0 {
        Some(goal.remaining_amount() / velocity)
    } else {
        None
    };

    let trend = if velocity > config.trend_up_threshold {
        TrendClassification::Up
    } else if velocity < config.trend_down_threshold {
        TrendClassification::Down
    } else {
        TrendClassification::Stable
    };

    let confidence = velocity_confidence(recent);
    let recommendations = progress_recommendations(goal, velocity, trend, config);

    GoalAnalytics {
        velocity_per_day: velocity,
        time_to_completion_days,
        trend,
        confidence,
        recommendations,
    }
}

/// Confidence from the variance of per-step velocities relative to their
/// mean: steadier progress scores higher. Clamped to [0, 100].
fn velocity_confidence(recent: &[ProgressPoint]) -> f64 {
    let mut step_velocities = Vec::with_capacity(recent.len() - 1);
    for pair in recent.windows(2) {
        let dt_days = (pair[1].at - pair[0].at).num_seconds() as f64 / DAY_SECONDS;
        if dt_days > 0.0 {
            step_velocities.push((pair[1].amount - pair[0].amount) / dt_days);
        }
    }
    if step_velocities.is_empty() {
        return 0.0;
    }

    let mean = step_velocities.iter().sum::<f64>() / step_velocities.len() as f64;
    if mean.abs() < f64::EPSILON {
        return 0.0;
    }
    let variance = step_velocities
        .iter()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / step_velocities.len() as f64;

    (100.0 - (variance / mean) * 10.0).clamp(0.0, 100.0)
}

fn progress_recommendations(
    goal: &Goal,
    velocity: f64,
    trend: TrendClassification,
    config: &AnalyticsConfig,
) -> Vec<Recommendation> {
    let mut recommendations = vec![];

    if trend == TrendClassification::Down || velocity < config.trend_up_threshold {
        recommendations.push(
            Recommendation::new(
                RecommendationKind::RevenueBoost,
                "Accelerate goal progress",
                "Current velocity is below target. Consider implementing these strategies.",
            )
            .with_impact(RecommendationImpact {
                time_reduction_days: 60,
                amount_increase: velocity * 30.0,
                risk_reduction: 0.2,
            })
            .with_effort(Effort::Medium)
            .with_priority(8)
            .automatable()
            .with_suggested_actions(vec![
                "Increase income streams".to_string(),
                "Optimize expense categories".to_string(),
                "Review investment allocation".to_string(),
                "Implement automatic savings increases".to_string(),
            ]),
        );
    }

    if goal.category == GoalCategory::NetWorth && goal.current_amount < goal.target_amount * 0.5 {
        recommendations.push(
            Recommendation::new(
                RecommendationKind::OptimizeInvestments,
                "Optimize net worth growth strategy",
                "Focus on high-impact wealth building activities.",
            )
            .with_impact(RecommendationImpact {
                time_reduction_days: 90,
                amount_increase: goal.target_amount * 0.15,
                risk_reduction: 0.1,
            })
            .with_effort(Effort::High)
            .with_priority(9)
            .with_suggested_actions(vec![
                "Diversify investment portfolio".to_string(),
                "Increase high-yield savings rate".to_string(),
                "Explore additional revenue streams".to_string(),
                "Optimize tax strategies".to_string(),
            ]),
        );
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GoalMetadata, GrowthStrategy, ProgressSource};
    use chrono::{Duration, NaiveDate, Utc};

    fn goal(target: f64, current: f64) -> Goal {
        Goal {
            id: "g1".to_string(),
            name: "Test".to_string(),
            category: GoalCategory::Savings,
            target_amount: target,
            current_amount: current,
            currency: "USD".to_string(),
            target_date: NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
            strategy: GrowthStrategy::Linear,
            milestones: vec![],
            automation_rules: vec![],
            metadata: GoalMetadata::new(),
        }
    }

    fn steady_history(start: f64, per_day: f64, days: usize) -> Vec<ProgressPoint> {
        let begin = Utc::now() - Duration::days(days as i64);
        (0..=days)
            .map(|i| ProgressPoint {
                at: begin + Duration::days(i as i64),
                amount: start + per_day * i as f64,
                source: ProgressSource::Automated,
                confidence: 95.0,
                factors: vec![],
            })
            .collect()
    }

    #[test]
    fn test_degenerate_with_few_points() {
        let g = goal(1000.0, 0.0);
        let config = AnalyticsConfig::default();

        for history in [vec![], steady_history(0.0, 10.0, 0)] {
            let analytics = compute_analytics(&g, &history, &config);
            assert_eq!(analytics.velocity_per_day, 0.0);
            assert_eq!(analytics.trend, TrendClassification::Stable);
            assert_eq!(analytics.confidence, 0.0);
            assert!(analytics.time_to_completion_days.is_none());
        }
    }

    #[test]
    fn test_velocity_and_completion_estimate() {
        // Target 1,800,000 at 239,625 gaining 500/day: completion in
        // roughly (1,800,000 - 239,625) / 500 ≈ 3121 days
        let g = goal(1_800_000.0, 239_625.0);
        let history = steady_history(239_625.0 - 500.0 * 30.0, 500.0, 30);
        let analytics = compute_analytics(&g, &history, &AnalyticsConfig::default());

        assert!((analytics.velocity_per_day - 500.0).abs() < 1.0);
        let ttc = analytics.time_to_completion_days.unwrap();
        assert!((ttc - 3120.75).abs() < 5.0);
        assert_eq!(analytics.trend, TrendClassification::Up);
        // Perfectly steady progress: full confidence
        assert!(analytics.confidence > 95.0);
    }

    #[test]
    fn test_negative_velocity_never_completes() {
        let g = goal(1000.0, 500.0);
        let history = steady_history(800.0, -150.0, 10);
        let analytics = compute_analytics(&g, &history, &AnalyticsConfig::default());

        assert!(analytics.velocity_per_day < 0.0);
        assert!(analytics.time_to_completion_days.is_none());
        assert_eq!(analytics.trend, TrendClassification::Down);
    }

    #[test]
    fn test_trend_thresholds_are_configurable() {
        let g = goal(10_000.0, 100.0);
        let history = steady_history(0.0, 50.0, 10);

        let default_config = AnalyticsConfig::default();
        let analytics = compute_analytics(&g, &history, &default_config);
        assert_eq!(analytics.trend, TrendClassification::Stable);

        let sensitive = AnalyticsConfig {
            trend_up_threshold: 10.0,
            trend_down_threshold: -10.0,
            window: 30,
        };
        let analytics = compute_analytics(&g, &history, &sensitive);
        assert_eq!(analytics.trend, TrendClassification::Up);
    }

    #[test]
    fn test_confidence_within_bounds() {
        let g = goal(10_000.0, 100.0);
        // Erratic progress: wildly varying step velocities
        let begin = Utc::now() - Duration::days(10);
        let amounts = [0.0, 900.0, 910.0, 1800.0, 1810.0, 2900.0];
        let history: Vec<ProgressPoint> = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| ProgressPoint {
                at: begin + Duration::days(i as i64),
                amount: *amount,
                source: ProgressSource::Manual,
                confidence: 100.0,
                factors: vec![],
            })
            .collect();

        let analytics = compute_analytics(&g, &history, &AnalyticsConfig::default());
        assert!(analytics.confidence >= 0.0);
        assert!(analytics.confidence <= 100.0);
    }
}
