//! Ensemble forecasting
//!
//! Three explainable statistical sub-models (linear regression, exponential
//! growth, heuristic blend) run over a goal's cleaned progress history and
//! are combined into a weighted prediction with scenario bands and risk
//! factors. No trained models anywhere; the weekly "retraining" is
//! bookkeeping on the sub-model specs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Recommendation;

mod engine;
mod models;

pub use engine::Forecaster;
pub use models::{market_adjustment, preprocess, seasonal_adjustment};

/// A single sub-model's output: where the goal lands and when
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubPrediction {
    pub amount: f64,
    pub date: NaiveDate,
    /// 0-100
    pub confidence: f64,
}

/// One probability-weighted outcome band
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub amount: f64,
    pub date: NaiveDate,
    /// Percentage, 0-100
    pub probability: u8,
}

/// The three-way scenario set around a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub optimistic: Scenario,
    pub realistic: Scenario,
    pub pessimistic: Scenario,
}

impl ScenarioSet {
    /// Probabilities always sum to 100
    pub fn probability_sum(&self) -> u16 {
        self.optimistic.probability as u16
            + self.realistic.probability as u16
            + self.pessimistic.probability as u16
    }
}

/// A cached ensemble prediction for one goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub goal_id: String,
    pub predicted_amount: f64,
    pub predicted_date: NaiveDate,
    /// 0-100
    pub confidence: f64,
    pub scenarios: ScenarioSet,
    pub recommendations: Vec<Recommendation>,
    pub risk_factors: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// External market factors feeding the heuristic model and risk assessment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketData {
    pub at: DateTime<Utc>,
    /// Annualized, e.g. 0.045 for 4.5%
    pub inflation_rate: f64,
    pub interest_rate: f64,
    /// 0-1 volatility index
    pub market_volatility: f64,
}

impl MarketData {
    /// Baseline snapshot used until a refresh lands
    pub fn baseline(at: DateTime<Utc>) -> Self {
        Self {
            at,
            inflation_rate: 0.045,
            interest_rate: 0.075,
            market_volatility: 0.15,
        }
    }
}

/// Sub-model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Linear,
    Exponential,
    Heuristic,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
            Self::Heuristic => "heuristic",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bookkeeping for one named sub-model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    pub name: String,
    pub kind: ModelKind,
    /// 0-100, nudged upward by the weekly maintenance pass
    pub accuracy: f64,
    pub training_samples: u64,
    pub last_trained: DateTime<Utc>,
}

/// Deltas for a custom "what-if" prediction over a cached base
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatIfScenario {
    /// Relative savings increase, e.g. 0.15 for +15%
    pub savings_increase: Option<f64>,
    /// Extra days granted to the completion date
    pub time_extension_days: Option<i64>,
}
