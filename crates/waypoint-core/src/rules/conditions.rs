//! Condition evaluators
//!
//! One evaluator per condition kind, all reading from the execution
//! context's `data` object. Evaluation errors (missing fields, bad regexes)
//! are surfaced as `Err` so the engine can treat them as "not met" —
//! no action runs without an explicitly satisfied rule.

use regex::Regex;

use crate::error::{Error, Result};
use crate::models::{AutomationContext, TriggerSource};

use super::{CompareOp, Condition, ConditionKind, TrendDirection};

/// Evaluate a single condition against the context
pub(crate) fn evaluate(condition: &Condition, ctx: &AutomationContext) -> Result<bool> {
    match &condition.kind {
        ConditionKind::Threshold { field, op, value } => {
            evaluate_threshold(ctx, field, *op, *value)
        }
        ConditionKind::Pattern { field, pattern } => evaluate_pattern(ctx, field, pattern),
        ConditionKind::Trend {
            field,
            direction,
            min_change,
        } => evaluate_trend(ctx, field, *direction, *min_change),
        ConditionKind::Anomaly { field, sigma } => evaluate_anomaly(ctx, field, *sigma),
        ConditionKind::Schedule => Ok(ctx.triggered_by == TriggerSource::Schedule),
    }
}

fn evaluate_threshold(
    ctx: &AutomationContext,
    field: &str,
    op: CompareOp,
    value: f64,
) -> Result<bool> {
    let observed = numeric_field(ctx, field)?;
    Ok(op.apply(observed, value))
}

fn evaluate_pattern(ctx: &AutomationContext, field: &str, pattern: &str) -> Result<bool> {
    let text = string_field(ctx, field)?;
    let re = Regex::new(pattern)?;
    Ok(re.is_match(&text))
}

fn evaluate_trend(
    ctx: &AutomationContext,
    field: &str,
    direction: TrendDirection,
    min_change: f64,
) -> Result<bool> {
    let series = series_field(ctx, field)?;
    if series.len() < 2 {
        return Ok(false);
    }

    let first = series[0];
    let last = series[series.len() - 1];
    if first.abs() < f64::EPSILON {
        return Err(Error::InvalidData(format!(
            "trend condition on '{}': series starts at zero",
            field
        )));
    }

    let change = (last - first) / first.abs();
    Ok(match direction {
        TrendDirection::Up => change >= min_change,
        TrendDirection::Down => change <= -min_change,
    })
}

fn evaluate_anomaly(ctx: &AutomationContext, field: &str, sigma: f64) -> Result<bool> {
    let series = series_field(ctx, field)?;
    // Too little history to call anything anomalous
    if series.len() < 4 {
        return Ok(false);
    }

    let (baseline, last) = series.split_at(series.len() - 1);
    let mean = baseline.iter().sum::<f64>() / baseline.len() as f64;
    let variance = baseline
        .iter()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / baseline.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev < f64::EPSILON {
        // Perfectly flat baseline: any movement at all is anomalous
        return Ok((last[0] - mean).abs() > f64::EPSILON);
    }

    Ok((last[0] - mean).abs() > sigma * std_dev)
}

fn numeric_field(ctx: &AutomationContext, field: &str) -> Result<f64> {
    ctx.data
        .get(field)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| Error::InvalidData(format!("missing numeric field '{}'", field)))
}

fn string_field(ctx: &AutomationContext, field: &str) -> Result<String> {
    ctx.data
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::InvalidData(format!("missing string field '{}'", field)))
}

pub(crate) fn series_field(ctx: &AutomationContext, field: &str) -> Result<Vec<f64>> {
    let values = ctx
        .data
        .get(field)
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::InvalidData(format!("missing series field '{}'", field)))?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| Error::InvalidData(format!("non-numeric entry in '{}'", field)))
        })
        .collect()
}
