//! Time utilities for resolving dashboard start/end expressions.

use crate::error::{Result, ServiceError};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeExpr {
    Now,
    NowMinus(Duration),
    EpochMillis(i64),
}

impl TimeExpr {
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match self {
            TimeExpr::Now => Ok(now),
            TimeExpr::NowMinus(offset) => now.checked_sub_signed(*offset).ok_or_else(|| {
                ServiceError::InvalidTime("relative offset is out of range".into())
            }),
            TimeExpr::EpochMillis(millis) => {
                DateTime::from_timestamp_millis(*millis).ok_or_else(|| {
                    ServiceError::InvalidTime(format!("timestamp {millis} is out of range"))
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Resolves both bounds against a single `now`. An empty end means "now".
    pub fn resolve(start: &str, end: &str, now: DateTime<Utc>) -> Result<Self> {
        let start = parse_time_expr(start)?.resolve(now)?;
        let end = if end.trim().is_empty() {
            now
        } else {
            parse_time_expr(end)?.resolve(now)?
        };

        Ok(Self { start, end })
    }

    pub fn seconds(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_seconds()
    }

    /// Window literal covering the whole range, e.g. `3600s`.
    pub fn window(&self) -> String {
        format!("{}s", self.seconds())
    }
}

pub fn parse_time_expr(raw: &str) -> Result<TimeExpr> {
    let value = raw.trim();

    if value == "now" {
        return Ok(TimeExpr::Now);
    }

    if let Some(offset) = value.strip_prefix("now-") {
        return parse_duration(offset)
            .map(TimeExpr::NowMinus)
            .ok_or_else(|| ServiceError::InvalidTime(format!("unsupported time token '{raw}'")));
    }

    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        let millis = value
            .parse::<i64>()
            .map_err(|_| ServiceError::InvalidTime(format!("timestamp '{raw}' is out of range")))?;
        return Ok(TimeExpr::EpochMillis(millis));
    }

    Err(ServiceError::InvalidTime(format!(
        "unsupported time token '{raw}'"
    )))
}

/// Parses durations such as `10m`, `1.5h` or `1h30m`. Units: s, m, h, d, w.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let mut total_millis = 0f64;
    let mut number = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            number.push(ch);
            continue;
        }

        let amount: f64 = number.parse().ok()?;
        number.clear();
        let unit_secs = match ch {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            'w' => 7 * 24 * 60 * 60,
            _ => return None,
        };
        total_millis += amount * f64::from(unit_secs) * 1000.0;
    }

    // trailing number without a unit
    if !number.is_empty() || !total_millis.is_finite() || total_millis < 1.0 {
        return None;
    }
    Duration::try_milliseconds(total_millis.round() as i64)
}
