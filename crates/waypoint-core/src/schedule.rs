//! Interval schedule expressions for automation rules
//!
//! Rules carry simple interval expressions rather than cron strings:
//!
//! - `"every 5m"` / `"every 6h"` — fixed minute/hour intervals
//! - `"hourly"`, `"daily"`, `"weekly"` — named shorthands
//!
//! The per-minute sweep asks each enabled rule's schedule whether it is due
//! given the rule's last execution time. A rule that has never executed is
//! due immediately.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// When a rule should run, relative to its last execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Schedule {
    EveryMinutes(u32),
    EveryHours(u32),
    Daily,
    Weekly,
}

impl Schedule {
    /// Parse an interval expression
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "hourly" => return Ok(Self::EveryHours(1)),
            "daily" => return Ok(Self::Daily),
            "weekly" => return Ok(Self::Weekly),
            _ => {}
        }

        let rest = s
            .strip_prefix("every ")
            .or_else(|| s.strip_prefix("every"))
            .ok_or_else(|| Error::InvalidSchedule(s.clone()))?
            .trim();
        if rest.is_empty() || !rest.is_ascii() {
            return Err(Error::InvalidSchedule(s.clone()));
        }

        let (digits, unit) = rest.split_at(rest.len() - 1);
        let n: u32 = digits
            .trim()
            .parse()
            .map_err(|_| Error::InvalidSchedule(s.clone()))?;
        if n == 0 {
            return Err(Error::InvalidSchedule(s.clone()));
        }

        match unit {
            "m" => Ok(Self::EveryMinutes(n)),
            "h" => Ok(Self::EveryHours(n)),
            "d" if n == 1 => Ok(Self::Daily),
            _ => Err(Error::InvalidSchedule(s)),
        }
    }

    /// The interval this schedule repeats at
    pub fn interval(&self) -> Duration {
        match self {
            Self::EveryMinutes(n) => Duration::minutes(*n as i64),
            Self::EveryHours(n) => Duration::hours(*n as i64),
            Self::Daily => Duration::days(1),
            Self::Weekly => Duration::weeks(1),
        }
    }

    /// Whether a rule last executed at `last` is due at `now`
    pub fn is_due(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last {
            None => true,
            Some(last) => now - last >= self.interval(),
        }
    }

    /// The next execution time after `from`
    pub fn next_after(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + self.interval()
    }

    pub fn as_expression(&self) -> String {
        match self {
            Self::EveryMinutes(n) => format!("every {}m", n),
            Self::EveryHours(1) => "hourly".to_string(),
            Self::EveryHours(n) => format!("every {}h", n),
            Self::Daily => "daily".to_string(),
            Self::Weekly => "weekly".to_string(),
        }
    }
}

impl TryFrom<String> for Schedule {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Schedule> for String {
    fn from(s: Schedule) -> Self {
        s.as_expression()
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_expression())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_forms() {
        assert_eq!(Schedule::parse("hourly").unwrap(), Schedule::EveryHours(1));
        assert_eq!(Schedule::parse("daily").unwrap(), Schedule::Daily);
        assert_eq!(Schedule::parse("weekly").unwrap(), Schedule::Weekly);
    }

    #[test]
    fn test_parse_intervals() {
        assert_eq!(
            Schedule::parse("every 5m").unwrap(),
            Schedule::EveryMinutes(5)
        );
        assert_eq!(
            Schedule::parse("every 6h").unwrap(),
            Schedule::EveryHours(6)
        );
        assert_eq!(Schedule::parse("EVERY 1d").unwrap(), Schedule::Daily);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Schedule::parse("0 */6 * * *").is_err());
        assert!(Schedule::parse("every 0m").is_err());
        assert!(Schedule::parse("every fortnight").is_err());
        assert!(Schedule::parse("").is_err());
    }

    #[test]
    fn test_is_due() {
        let schedule = Schedule::EveryHours(6);
        let now = Utc::now();

        // Never executed: due immediately
        assert!(schedule.is_due(None, now));

        // Executed 5 hours ago: not yet
        assert!(!schedule.is_due(Some(now - Duration::hours(5)), now));

        // Executed 6 hours ago: due
        assert!(schedule.is_due(Some(now - Duration::hours(6)), now));
    }

    #[test]
    fn test_expression_round_trip() {
        for expr in ["every 5m", "hourly", "every 6h", "daily", "weekly"] {
            let schedule = Schedule::parse(expr).unwrap();
            assert_eq!(
                Schedule::parse(&schedule.as_expression()).unwrap(),
                schedule
            );
        }
    }
}
