//! Forecasting sub-models and preprocessing
//!
//! Every function here is pure over its inputs. Completion dates further
//! than ten years out are capped at the goal's own target date; forecasts
//! that far ahead carry no signal.

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{Goal, ProgressPoint};

use super::{MarketData, SubPrediction};

const DAY_SECONDS: f64 = 86_400.0;

/// Horizon beyond which a projected completion date is meaningless
const MAX_HORIZON_DAYS: f64 = 3650.0;

/// Clean a history for prediction: drop amount outliers by the IQR rule,
/// then smooth with a trailing 3-point moving average
pub fn preprocess(history: &[ProgressPoint]) -> Vec<ProgressPoint> {
    if history.is_empty() {
        return vec![];
    }

    let mut amounts: Vec<f64> = history.iter().map(|p| p.amount).collect();
    amounts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let q1 = amounts[(amounts.len() as f64 * 0.25).floor() as usize];
    let q3 = amounts[(amounts.len() as f64 * 0.75).floor() as usize];
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    let cleaned: Vec<&ProgressPoint> = history
        .iter()
        .filter(|p| p.amount >= lower && p.amount <= upper)
        .collect();

    cleaned
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let mut smoothed = (*point).clone();
            if i >= 2 {
                let window = &cleaned[i - 2..=i];
                smoothed.amount =
                    window.iter().map(|p| p.amount).sum::<f64>() / window.len() as f64;
            }
            smoothed
        })
        .collect()
}

/// Ordinary least squares on index-vs-amount; confidence from R²
pub(crate) fn linear_prediction(
    goal: &Goal,
    data: &[ProgressPoint],
    today: NaiveDate,
) -> SubPrediction {
    if data.len() < 2 {
        return SubPrediction {
            amount: goal.current_amount,
            date: goal.target_date,
            confidence: 20.0,
        };
    }

    let n = data.len() as f64;
    let xs: Vec<f64> = (0..data.len()).map(|i| i as f64).collect();
    let ys: Vec<f64> = data.iter().map(|p| p.amount).collect();

    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(&ys).map(|(x, y)| x * y).sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return SubPrediction {
            amount: goal.current_amount,
            date: goal.target_date,
            confidence: 20.0,
        };
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;

    let y_mean = sum_y / n;
    let ss_total: f64 = ys.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_residual: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    let r_squared = if ss_total > f64::EPSILON {
        1.0 - ss_residual / ss_total
    } else {
        0.0
    };

    let days_to_target = (goal.target_date - today).num_days().max(0) as f64;
    let predicted_amount = (slope * (n + days_to_target) + intercept).max(0.0);

    let date = if slope > 0.0 {
        let days_to_completion = ((goal.target_amount - goal.current_amount) / slope).ceil();
        completion_date(goal, today, days_to_completion)
    } else {
        goal.target_date
    };

    SubPrediction {
        amount: predicted_amount,
        date,
        confidence: (r_squared * 100.0).clamp(30.0, 95.0),
    }
}

/// Mean day-over-day growth rate over the trailing window; confidence
/// inversely related to growth-rate variance
pub(crate) fn exponential_prediction(
    goal: &Goal,
    data: &[ProgressPoint],
    today: NaiveDate,
) -> SubPrediction {
    if data.len() < 3 {
        return linear_prediction(goal, data, today);
    }

    let window_start = data.len().saturating_sub(30);
    let recent = &data[window_start..];

    let mut growth_rates = vec![];
    for pair in recent.windows(2) {
        if pair[0].amount > 0.0 {
            growth_rates.push((pair[1].amount - pair[0].amount) / pair[0].amount);
        }
    }
    if growth_rates.is_empty() {
        return linear_prediction(goal, data, today);
    }

    let avg_rate = growth_rates.iter().sum::<f64>() / growth_rates.len() as f64;
    let rate_variance = growth_rates
        .iter()
        .map(|r| (r - avg_rate).powi(2))
        .sum::<f64>()
        / growth_rates.len() as f64;

    let days_to_target = (goal.target_date - today).num_days().max(0) as f64;
    let predicted_amount = (goal.current_amount * (1.0 + avg_rate).powf(days_to_target)).max(0.0);

    let date = if avg_rate > 0.0 && goal.current_amount > 0.0 && goal.target_amount > 0.0 {
        let days_to_completion =
            (goal.target_amount / goal.current_amount).ln() / (1.0 + avg_rate).ln();
        completion_date(goal, today, days_to_completion)
    } else {
        goal.target_date
    };

    SubPrediction {
        amount: predicted_amount,
        date,
        confidence: (100.0 - rate_variance * 1000.0).clamp(40.0, 90.0),
    }
}

/// Blend of the two base models, adjusted by market and seasonal factors
pub(crate) fn heuristic_prediction(
    goal: &Goal,
    data: &[ProgressPoint],
    market: &MarketData,
    today: NaiveDate,
) -> SubPrediction {
    let linear = linear_prediction(goal, data, today);
    let exponential = exponential_prediction(goal, data, today);

    let market_factor = market_adjustment(market);
    let seasonal_factor = seasonal_adjustment(today.month());

    let amount =
        (linear.amount * 0.4 + exponential.amount * 0.6) * market_factor * seasonal_factor;

    let base_confidence = (linear.confidence + exponential.confidence) / 2.0;
    let market_confidence = if market.market_volatility < 0.2 { 1.1 } else { 0.9 };
    let data_confidence = if data.len() > 50 {
        1.15
    } else {
        data.len() as f64 / 50.0
    };
    let confidence =
        (base_confidence * market_confidence * data_confidence).clamp(50.0, 95.0);

    let v = velocity(data);
    let date = if v > 0.0 {
        completion_date(goal, today, goal.remaining_amount() / v)
    } else {
        goal.target_date
    };

    SubPrediction {
        amount: amount.max(0.0),
        date,
        confidence,
    }
}

/// Market factor from inflation, interest, and volatility bands,
/// clamped to [0.8, 1.2]
pub fn market_adjustment(market: &MarketData) -> f64 {
    let mut adjustment: f64 = 1.0;

    // High inflation erodes savings goals, low inflation helps
    if market.inflation_rate > 0.06 {
        adjustment *= 0.95;
    } else if market.inflation_rate < 0.03 {
        adjustment *= 1.05;
    }

    // High rates reward savers
    if market.interest_rate > 0.08 {
        adjustment *= 1.1;
    } else if market.interest_rate < 0.04 {
        adjustment *= 0.95;
    }

    // Volatility widens the error bars either way
    if market.market_volatility > 0.25 {
        adjustment *= 0.9;
    } else if market.market_volatility < 0.1 {
        adjustment *= 1.05;
    }

    adjustment.clamp(0.8, 1.2)
}

/// Fixed quarterly multiplier: holiday-quarter spending drag, recovery
/// bumps through the rest of the year
pub fn seasonal_adjustment(month: u32) -> f64 {
    match month {
        12 | 1 | 2 => 0.95,
        3..=5 => 1.05,
        6..=8 => 1.02,
        _ => 1.03,
    }
}

/// Trailing velocity (amount per day) over the most recent ≤30 points
pub(crate) fn velocity(data: &[ProgressPoint]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let window_start = data.len().saturating_sub(30);
    let recent = &data[window_start..];
    let span_days =
        (recent[recent.len() - 1].at - recent[0].at).num_seconds() as f64 / DAY_SECONDS;
    if span_days <= 0.0 {
        return 0.0;
    }
    (recent[recent.len() - 1].amount - recent[0].amount) / span_days
}

fn completion_date(goal: &Goal, today: NaiveDate, days_to_completion: f64) -> NaiveDate {
    if days_to_completion.is_finite() && days_to_completion < MAX_HORIZON_DAYS {
        today + Duration::days(days_to_completion.ceil() as i64)
    } else {
        goal.target_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        GoalCategory, GoalMetadata, GrowthStrategy, ProgressSource,
    };
    use chrono::{Duration, Utc};

    fn goal(target: f64, current: f64) -> Goal {
        Goal {
            id: "g1".to_string(),
            name: "Test".to_string(),
            category: GoalCategory::NetWorth,
            target_amount: target,
            current_amount: current,
            currency: "USD".to_string(),
            target_date: Utc::now().date_naive() + Duration::days(365),
            strategy: GrowthStrategy::Linear,
            milestones: vec![],
            automation_rules: vec![],
            metadata: GoalMetadata::new(),
        }
    }

    fn history(amounts: &[f64]) -> Vec<ProgressPoint> {
        let begin = Utc::now() - Duration::days(amounts.len() as i64);
        amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| ProgressPoint {
                at: begin + Duration::days(i as i64),
                amount: *amount,
                source: ProgressSource::Automated,
                confidence: 95.0,
                factors: vec![],
            })
            .collect()
    }

    #[test]
    fn test_preprocess_drops_iqr_outliers() {
        // One wild spike in an otherwise tight series
        let points = history(&[100.0, 102.0, 101.0, 103.0, 10_000.0, 104.0, 105.0, 103.0]);
        let cleaned = preprocess(&points);
        assert_eq!(cleaned.len(), points.len() - 1);
        assert!(cleaned.iter().all(|p| p.amount < 1000.0));
    }

    #[test]
    fn test_preprocess_smooths_with_trailing_window() {
        let points = history(&[10.0, 20.0, 30.0, 40.0]);
        let cleaned = preprocess(&points);
        // First two points pass through, later ones are 3-point averages
        assert_eq!(cleaned[0].amount, 10.0);
        assert_eq!(cleaned[1].amount, 20.0);
        assert!((cleaned[2].amount - 20.0).abs() < f64::EPSILON);
        assert!((cleaned[3].amount - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_preprocess_empty() {
        assert!(preprocess(&[]).is_empty());
    }

    #[test]
    fn test_linear_degenerate_below_two_points() {
        let g = goal(1000.0, 100.0);
        let prediction = linear_prediction(&g, &history(&[100.0]), Utc::now().date_naive());
        assert_eq!(prediction.amount, 100.0);
        assert_eq!(prediction.date, g.target_date);
        assert_eq!(prediction.confidence, 20.0);
    }

    #[test]
    fn test_linear_on_clean_series() {
        // 100/day toward 10,000 from 3,000: completion in ~70 days
        let g = goal(10_000.0, 3_000.0);
        let points = history(&[
            0.0, 100.0, 200.0, 300.0, 400.0, 500.0, 600.0, 700.0, 800.0, 900.0,
        ]);
        let today = Utc::now().date_naive();
        let prediction = linear_prediction(&g, &points, today);

        // Perfect fit: confidence hits the upper clamp
        assert!((prediction.confidence - 95.0).abs() < f64::EPSILON);
        let days = (prediction.date - today).num_days();
        assert_eq!(days, 70);
    }

    #[test]
    fn test_exponential_steady_growth() {
        // 1% a day from 1000 toward 2000: ln(2)/ln(1.01) ≈ 70 days
        let g = goal(2000.0, 1000.0);
        let amounts: Vec<f64> = (0..20).map(|i| 1000.0 * 1.01f64.powi(i - 19)).collect();
        let today = Utc::now().date_naive();
        let prediction = exponential_prediction(&g, &history(&amounts), today);

        let days = (prediction.date - today).num_days();
        assert!((days - 70).abs() <= 2, "got {} days", days);
        // Constant growth rate: variance 0, confidence at the upper clamp
        assert!((prediction.confidence - 90.0).abs() < 1.0);
    }

    #[test]
    fn test_market_adjustment_bounds() {
        let now = Utc::now();
        let calm = MarketData {
            at: now,
            inflation_rate: 0.02,
            interest_rate: 0.09,
            market_volatility: 0.05,
        };
        assert!((market_adjustment(&calm) - 1.2).abs() < 0.01);

        let stormy = MarketData {
            at: now,
            inflation_rate: 0.10,
            interest_rate: 0.02,
            market_volatility: 0.40,
        };
        let factor = market_adjustment(&stormy);
        assert!((0.8..=1.2).contains(&factor));
        assert!(factor < 1.0);
    }

    #[test]
    fn test_seasonal_covers_all_months() {
        for month in 1..=12 {
            let factor = seasonal_adjustment(month);
            assert!((0.9..=1.1).contains(&factor));
        }
        assert_eq!(seasonal_adjustment(12), 0.95);
        assert_eq!(seasonal_adjustment(4), 1.05);
    }

    #[test]
    fn test_velocity() {
        let points = history(&[0.0, 500.0, 1000.0, 1500.0]);
        assert!((velocity(&points) - 500.0).abs() < 1.0);
        assert_eq!(velocity(&points[..1]), 0.0);
    }
}
