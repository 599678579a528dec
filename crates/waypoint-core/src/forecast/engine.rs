//! The ensemble forecaster: model combination, scenarios, risk, cache

use std::sync::RwLock;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{
    Effort, Goal, ProgressPoint, Recommendation, RecommendationImpact, RecommendationKind,
};

use super::models::{
    exponential_prediction, heuristic_prediction, linear_prediction, preprocess, velocity,
};
use super::{
    MarketData, ModelKind, ModelSpec, PredictionResult, Scenario, ScenarioSet, SubPrediction,
    WhatIfScenario,
};

/// Ensemble weights: linear / exponential / heuristic
const ENSEMBLE_WEIGHTS: [f64; 3] = [0.30, 0.35, 0.35];

/// Market history kept for the snapshot API
const MARKET_HISTORY_CAP: usize = 365;

/// Velocity below which a goal is flagged as at risk (currency units/day)
const LOW_VELOCITY_THRESHOLD: f64 = 100.0;

/// Generates and caches per-goal ensemble predictions.
///
/// Prediction generation never mutates the goal; the only writes are the
/// forecaster's own cache entry, so goals can be forecast fully in parallel.
pub struct Forecaster {
    predictions: DashMap<String, PredictionResult>,
    models: DashMap<String, ModelSpec>,
    market_history: RwLock<Vec<MarketData>>,
}

impl Forecaster {
    pub fn new() -> Self {
        let forecaster = Self {
            predictions: DashMap::new(),
            models: DashMap::new(),
            market_history: RwLock::new(vec![MarketData::baseline(Utc::now())]),
        };

        let now = Utc::now();
        for (id, name, kind, accuracy, samples) in [
            (
                "linear_predictor",
                "Linear regression predictor",
                ModelKind::Linear,
                87.0,
                1000,
            ),
            (
                "exponential_predictor",
                "Exponential growth predictor",
                ModelKind::Exponential,
                92.0,
                2000,
            ),
            (
                "heuristic_predictor",
                "Market-adjusted blend predictor",
                ModelKind::Heuristic,
                85.0,
                1500,
            ),
        ] {
            forecaster.models.insert(
                id.to_string(),
                ModelSpec {
                    id: id.to_string(),
                    name: name.to_string(),
                    kind,
                    accuracy,
                    training_samples: samples,
                    last_trained: now,
                },
            );
        }

        forecaster
    }

    /// Run the full pipeline over a goal and its history, cache and return
    /// the result
    pub fn generate_goal_prediction(
        &self,
        goal: &Goal,
        history: &[ProgressPoint],
    ) -> PredictionResult {
        let started = std::time::Instant::now();
        let today = Utc::now().date_naive();
        let market = self.current_market();

        let cleaned = preprocess(history);

        let linear = linear_prediction(goal, &cleaned, today);
        let exponential = exponential_prediction(goal, &cleaned, today);
        let heuristic = heuristic_prediction(goal, &cleaned, &market, today);

        let ensemble = combine([linear, exponential, heuristic]);
        let scenarios = build_scenarios(&ensemble);
        let risk_factors = assess_risk_factors(goal, &cleaned, &market, today);
        let recommendations = prediction_recommendations(goal, &ensemble, &scenarios);

        let result = PredictionResult {
            goal_id: goal.id.clone(),
            predicted_amount: ensemble.amount,
            predicted_date: ensemble.date,
            confidence: ensemble.confidence,
            scenarios,
            recommendations,
            risk_factors,
            generated_at: Utc::now(),
        };

        self.predictions.insert(goal.id.clone(), result.clone());

        info!(
            goal_id = %goal.id,
            confidence = result.confidence,
            predicted_date = %result.predicted_date,
            duration_ms = started.elapsed().as_millis() as u64,
            operation = "prediction_generation",
            "Generated goal prediction"
        );

        result
    }

    /// Cached prediction for a goal, if one has been generated
    pub fn prediction(&self, goal_id: &str) -> Option<PredictionResult> {
        self.predictions.get(goal_id).map(|p| p.clone())
    }

    /// Apply what-if deltas to the cached base prediction.
    ///
    /// Fails with `PredictionNotFound` when no base exists; callers that
    /// want one can force a generation first.
    pub fn what_if(&self, goal_id: &str, scenario: &WhatIfScenario) -> Result<PredictionResult> {
        let mut adjusted = self
            .prediction(goal_id)
            .ok_or_else(|| Error::PredictionNotFound(goal_id.to_string()))?;

        if let Some(increase) = scenario.savings_increase {
            adjusted.predicted_amount *= 1.0 + increase;
        }
        if let Some(extension) = scenario.time_extension_days {
            adjusted.predicted_date = adjusted.predicted_date + Duration::days(extension);
        }

        Ok(adjusted)
    }

    /// Most recent market observation
    pub fn current_market(&self) -> MarketData {
        let history = self.market_history.read().unwrap();
        history
            .last()
            .copied()
            .unwrap_or_else(|| MarketData::baseline(Utc::now()))
    }

    /// Trailing ≤30 market observations, oldest first
    pub fn market_snapshot(&self) -> Vec<MarketData> {
        let history = self.market_history.read().unwrap();
        let start = history.len().saturating_sub(30);
        history[start..].to_vec()
    }

    /// Registered sub-model bookkeeping
    pub fn models(&self) -> Vec<ModelSpec> {
        let mut models: Vec<_> = self.models.iter().map(|m| m.clone()).collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        models
    }

    /// Daily maintenance: refresh the market cache and, at most once per
    /// calendar week, bump each model's bookkeeping. Not real training.
    pub fn run_maintenance(&self) {
        let now = Utc::now();

        {
            let mut history = self.market_history.write().unwrap();
            // A fresh fetch would land here; without a feed we re-observe
            // the latest values at a new timestamp
            let mut latest = history
                .last()
                .copied()
                .unwrap_or_else(|| MarketData::baseline(now));
            latest.at = now;
            history.push(latest);
            if history.len() > MARKET_HISTORY_CAP {
                history.remove(0);
            }
        }

        let mut retrained = 0;
        for mut model in self.models.iter_mut() {
            if (now - model.last_trained) >= Duration::days(7) {
                model.last_trained = now;
                model.training_samples += 100;
                model.accuracy = (model.accuracy + 0.5).min(95.0);
                retrained += 1;
            }
        }

        info!(
            retrained,
            predictions_cached = self.predictions.len(),
            operation = "forecast_maintenance",
            "Forecast maintenance complete"
        );
    }

    #[cfg(test)]
    fn backdate_model_training(&self, days: i64) {
        for mut model in self.models.iter_mut() {
            model.last_trained = Utc::now() - Duration::days(days);
        }
    }
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Weighted mean of amounts and confidences; the completion date comes from
/// the most confident sub-model
fn combine(predictions: [SubPrediction; 3]) -> SubPrediction {
    let total_weight: f64 = ENSEMBLE_WEIGHTS.iter().sum();
    let amount = predictions
        .iter()
        .zip(ENSEMBLE_WEIGHTS)
        .map(|(p, w)| p.amount * w)
        .sum::<f64>()
        / total_weight;
    let confidence = predictions
        .iter()
        .zip(ENSEMBLE_WEIGHTS)
        .map(|(p, w)| p.confidence * w)
        .sum::<f64>()
        / total_weight;

    let best = predictions
        .iter()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .expect("three predictions");

    SubPrediction {
        amount,
        date: best.date,
        confidence: confidence.clamp(0.0, 100.0),
    }
}

fn build_scenarios(ensemble: &SubPrediction) -> ScenarioSet {
    ScenarioSet {
        optimistic: Scenario {
            amount: ensemble.amount * 1.3,
            date: ensemble.date - Duration::days(30),
            probability: 25,
        },
        realistic: Scenario {
            amount: ensemble.amount,
            date: ensemble.date,
            probability: 50,
        },
        pessimistic: Scenario {
            amount: ensemble.amount * 0.7,
            date: ensemble.date + Duration::days(60),
            probability: 25,
        },
    }
}

fn assess_risk_factors(
    goal: &Goal,
    data: &[ProgressPoint],
    market: &MarketData,
    today: chrono::NaiveDate,
) -> Vec<String> {
    let mut risks = vec![];

    let v = velocity(data);
    if v < LOW_VELOCITY_THRESHOLD {
        risks.push("Low progress velocity - goal achievement at risk".to_string());
    }

    // Spread of the last handful of observations against the target scale
    let tail_start = data.len().saturating_sub(10);
    let tail = &data[tail_start..];
    if !tail.is_empty() {
        let mean = tail.iter().map(|p| p.amount).sum::<f64>() / tail.len() as f64;
        let variance = tail
            .iter()
            .map(|p| (p.amount - mean).powi(2))
            .sum::<f64>()
            / tail.len() as f64;
        if variance > goal.target_amount * 0.1 {
            risks.push("High variance in progress - inconsistent savings pattern".to_string());
        }
    }

    if market.market_volatility > 0.2 {
        risks.push("High market volatility affecting investment returns".to_string());
    }
    if market.inflation_rate > 0.06 {
        risks.push("High inflation rate eroding purchasing power".to_string());
    }

    let days_remaining = (goal.target_date - today).num_days();
    if days_remaining > 0 {
        let required_velocity = goal.remaining_amount() / days_remaining as f64;
        if required_velocity > v * 1.5 {
            risks.push(
                "Required savings rate significantly higher than current velocity".to_string(),
            );
        }
    }

    risks
}

fn prediction_recommendations(
    goal: &Goal,
    ensemble: &SubPrediction,
    scenarios: &ScenarioSet,
) -> Vec<Recommendation> {
    let mut recommendations = vec![];

    if ensemble.date > goal.target_date {
        let overshoot_days = (ensemble.date - goal.target_date).num_days();
        recommendations.push(
            Recommendation::new(
                RecommendationKind::IncreaseSavings,
                "Accelerate goal achievement",
                "Current trajectory suggests the target date may be missed. \
                 Consider these acceleration strategies.",
            )
            .with_impact(RecommendationImpact {
                time_reduction_days: overshoot_days,
                amount_increase: (goal.target_amount - ensemble.amount).max(0.0),
                risk_reduction: 0.15,
            })
            .with_effort(Effort::Medium)
            .with_priority(9)
            .automatable()
            .with_suggested_actions(vec![
                "Increase monthly savings rate by 25%".to_string(),
                "Identify additional income sources".to_string(),
                "Optimize high-yield investment allocation".to_string(),
                "Reduce discretionary spending by 15%".to_string(),
            ]),
        );
    }

    if ensemble.confidence < 70.0 {
        recommendations.push(
            Recommendation::new(
                RecommendationKind::RiskMitigation,
                "Improve prediction accuracy",
                "Establish more consistent financial patterns to improve \
                 prediction reliability.",
            )
            .with_impact(RecommendationImpact {
                time_reduction_days: 0,
                amount_increase: 0.0,
                risk_reduction: 0.3,
            })
            .with_effort(Effort::Low)
            .with_priority(6)
            .automatable()
            .with_suggested_actions(vec![
                "Set up automatic monthly transfers".to_string(),
                "Create consistent income streams".to_string(),
                "Establish a regular investment schedule".to_string(),
                "Track expenses more accurately".to_string(),
            ]),
        );
    }

    if scenarios.optimistic.date < goal.target_date {
        let headroom_days = (goal.target_date - scenarios.optimistic.date).num_days();
        recommendations.push(
            Recommendation::new(
                RecommendationKind::OptimizeInvestments,
                "Optimize for early achievement",
                "On track to achieve the goal early. Consider optimization strategies.",
            )
            .with_impact(RecommendationImpact {
                time_reduction_days: headroom_days,
                amount_increase: (scenarios.optimistic.amount - goal.target_amount).max(0.0),
                risk_reduction: 0.1,
            })
            .with_effort(Effort::Low)
            .with_priority(7)
            .with_suggested_actions(vec![
                "Consider increasing the target amount".to_string(),
                "Diversify into higher-yield investments".to_string(),
                "Set new stretch goals".to_string(),
                "Plan for tax optimization".to_string(),
            ]),
        );
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        GoalCategory, GoalMetadata, GrowthStrategy, ProgressSource,
    };
    use chrono::{Duration, NaiveDate, Utc};

    fn goal(target: f64, current: f64, days_out: i64) -> Goal {
        Goal {
            id: "g1".to_string(),
            name: "Net worth target".to_string(),
            category: GoalCategory::NetWorth,
            target_amount: target,
            current_amount: current,
            currency: "USD".to_string(),
            target_date: Utc::now().date_naive() + Duration::days(days_out),
            strategy: GrowthStrategy::ModelOptimized,
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
    fn test_prediction_bounds_and_probabilities() {
        let forecaster = Forecaster::new();
        let g = goal(1_800_000.0, 239_625.0, 365);
        let history = steady_history(224_625.0, 500.0, 30);

        let prediction = forecaster.generate_goal_prediction(&g, &history);

        assert!(prediction.confidence >= 0.0 && prediction.confidence <= 100.0);
        assert_eq!(prediction.scenarios.probability_sum(), 100);
        assert!(prediction.predicted_amount >= 0.0);
    }

    #[test]
    fn test_prediction_is_cached_and_overwritten() {
        let forecaster = Forecaster::new();
        let g = goal(10_000.0, 1_000.0, 365);

        assert!(forecaster.prediction("g1").is_none());

        forecaster.generate_goal_prediction(&g, &steady_history(0.0, 50.0, 20));
        let first = forecaster.prediction("g1").unwrap();

        forecaster.generate_goal_prediction(&g, &steady_history(0.0, 200.0, 20));
        let second = forecaster.prediction("g1").unwrap();

        // Regeneration replaces, never merges
        assert!(second.generated_at >= first.generated_at);
        assert_ne!(first.predicted_date, second.predicted_date);
    }

    #[test]
    fn test_empty_history_still_produces_valid_prediction() {
        let forecaster = Forecaster::new();
        let g = goal(10_000.0, 0.0, 365);
        let prediction = forecaster.generate_goal_prediction(&g, &[]);

        assert!(prediction.confidence >= 0.0 && prediction.confidence <= 100.0);
        assert_eq!(prediction.scenarios.probability_sum(), 100);
        // Nothing to extrapolate from: the date falls back to the target
        assert_eq!(prediction.predicted_date, g.target_date);
    }

    #[test]
    fn test_risk_factors_for_slow_inconsistent_goal() {
        let forecaster = Forecaster::new();
        // Short deadline, almost no progress, tiny velocity
        let g = goal(1_000_000.0, 5_000.0, 90);
        let history = steady_history(4_700.0, 10.0, 30);

        let prediction = forecaster.generate_goal_prediction(&g, &history);
        assert!(prediction
            .risk_factors
            .iter()
            .any(|r| r.contains("Low progress velocity")));
        assert!(prediction
            .risk_factors
            .iter()
            .any(|r| r.contains("Required savings rate")));
    }

    #[test]
    fn test_missed_target_date_recommends_acceleration() {
        let forecaster = Forecaster::new();
        // 100/day with 190,000 remaining: ~1900 days, but the target is in
        // 6 months
        let g = goal(200_000.0, 10_000.0, 180);
        let history = steady_history(7_000.0, 100.0, 30);

        let prediction = forecaster.generate_goal_prediction(&g, &history);
        assert!(prediction
            .recommendations
            .iter()
            .any(|r| r.kind == RecommendationKind::IncreaseSavings));
    }

    #[test]
    fn test_what_if_requires_cached_base() {
        let forecaster = Forecaster::new();
        let err = forecaster
            .what_if("ghost", &WhatIfScenario::default())
            .unwrap_err();
        assert!(matches!(err, Error::PredictionNotFound(_)));
    }

    #[test]
    fn test_what_if_applies_deltas() {
        let forecaster = Forecaster::new();
        let g = goal(10_000.0, 1_000.0, 365);
        let base = forecaster.generate_goal_prediction(&g, &steady_history(0.0, 50.0, 20));

        let scenario = WhatIfScenario {
            savings_increase: Some(0.2),
            time_extension_days: Some(30),
        };
        let adjusted = forecaster.what_if("g1", &scenario).unwrap();

        assert!((adjusted.predicted_amount - base.predicted_amount * 1.2).abs() < 0.01);
        assert_eq!(adjusted.predicted_date, base.predicted_date + Duration::days(30));

        // The cache keeps the unadjusted base
        let cached = forecaster.prediction("g1").unwrap();
        assert!((cached.predicted_amount - base.predicted_amount).abs() < f64::EPSILON);
    }

    #[test]
    fn test_maintenance_retrains_weekly_only() {
        let forecaster = Forecaster::new();

        // Freshly initialized models: within the week, no bump
        let samples_at_start: u64 = forecaster.models().iter().map(|m| m.training_samples).sum();
        forecaster.run_maintenance();
        let models = forecaster.models();
        let samples_before: u64 = models.iter().map(|m| m.training_samples).sum();
        assert_eq!(samples_before, samples_at_start);

        forecaster.backdate_model_training(8);
        forecaster.run_maintenance();
        let models = forecaster.models();
        let samples_after: u64 = models.iter().map(|m| m.training_samples).sum();
        assert_eq!(samples_after, samples_before + 300);

        // Accuracy caps at 95
        for _ in 0..30 {
            forecaster.backdate_model_training(8);
            forecaster.run_maintenance();
        }
        assert!(forecaster.models().iter().all(|m| m.accuracy <= 95.0));
    }

    #[test]
    fn test_market_snapshot_is_bounded() {
        let forecaster = Forecaster::new();
        for _ in 0..50 {
            forecaster.run_maintenance();
        }
        let snapshot = forecaster.market_snapshot();
        assert!(snapshot.len() <= 30);
        assert!(snapshot.windows(2).all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn test_combine_uses_best_model_date() {
        let d1 = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2027, 6, 1).unwrap();
        let combined = combine([
            SubPrediction {
                amount: 100.0,
                date: d1,
                confidence: 50.0,
            },
            SubPrediction {
                amount: 200.0,
                date: d2,
                confidence: 90.0,
            },
            SubPrediction {
                amount: 300.0,
                date: d1,
                confidence: 70.0,
            },
        ]);

        // Weighted mean: 100*.3 + 200*.35 + 300*.35 = 205
        assert!((combined.amount - 205.0).abs() < 0.01);
        assert_eq!(combined.date, d2);
        assert!(combined.confidence > 0.0 && combined.confidence <= 100.0);
    }
}
