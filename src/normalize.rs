// src/normalize.rs
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;

use crate::types::{Sample, Series, SeriesId, Timestamp};

/// Hourly funding (Hyperliquid).
pub const HOURLY_PERIODS_PER_YEAR: f64 = 24.0 * 365.0;
/// 8-hourly funding (Bitfinex).
pub const EIGHT_HOURLY_PERIODS_PER_YEAR: f64 = 3.0 * 365.0;

/// Per-source compounding convention: `rate * periods_per_year * 100`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annualizer {
    pub periods_per_year: f64,
}

impl Annualizer {
    pub fn new(periods_per_year: f64) -> Self { Self { periods_per_year } }
    pub fn hourly() -> Self { Self::new(HOURLY_PERIODS_PER_YEAR) }
    pub fn eight_hourly() -> Self { Self::new(EIGHT_HOURLY_PERIODS_PER_YEAR) }

    #[inline]
    pub fn annualize(&self, periodic_rate: f64) -> f64 {
        periodic_rate * self.periods_per_year * 100.0
    }
}

/// Lenient numeric read: JSON numbers and numeric strings pass, anything else
/// (null, garbage text, NaN, inf) becomes missing.
pub fn coerce_rate(raw: &Value) -> Option<f64> {
    let v = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(v)
}

/// How a source reports time.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTime {
    /// Unix epoch milliseconds, UTC.
    Millis(i64),
    /// RFC 3339 or naive ISO-8601 text; naive text is read as UTC.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub time: RawTime,
    pub rate: Value,
}

impl RawSample {
    pub fn millis(ms: i64, rate: Value) -> Self {
        Self { time: RawTime::Millis(ms), rate }
    }
    pub fn text(ts: impl Into<String>, rate: Value) -> Self {
        Self { time: RawTime::Text(ts.into()), rate }
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Turns raw records into typed samples in one display timezone.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    tz: Tz,
}

impl Normalizer {
    pub fn new(tz: Tz) -> Self { Self { tz } }

    pub fn tz(&self) -> Tz { self.tz }

    pub fn from_millis(&self, ms: i64) -> Option<Timestamp> {
        DateTime::<Utc>::from_timestamp_millis(ms).map(|t| t.with_timezone(&self.tz))
    }

    pub fn from_utc(&self, t: DateTime<Utc>) -> Timestamp {
        t.with_timezone(&self.tz)
    }

    pub fn from_text(&self, s: &str) -> Option<Timestamp> {
        let s = s.trim();
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Some(t.with_timezone(&self.tz));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
            .map(|n| n.and_utc().with_timezone(&self.tz))
    }

    pub fn time(&self, raw: &RawTime) -> Option<Timestamp> {
        match raw {
            RawTime::Millis(ms) => self.from_millis(*ms),
            RawTime::Text(s) => self.from_text(s),
        }
    }

    /// Records with an unreadable time are dropped; an unreadable rate keeps
    /// the row with a missing value. Rates pass through `annualizer` when set.
    pub fn series<I>(&self, id: SeriesId, raw: I, annualizer: Option<Annualizer>) -> Series
    where
        I: IntoIterator<Item = RawSample>,
    {
        let mut dropped = 0usize;
        let mut samples: Vec<Sample> = raw
            .into_iter()
            .filter_map(|r| {
                let Some(ts) = self.time(&r.time) else {
                    dropped += 1;
                    return None;
                };
                let value = coerce_rate(&r.rate).map(|v| match annualizer {
                    Some(a) => a.annualize(v),
                    None => v,
                });
                Some(Sample::new(ts, value))
            })
            .collect();
        if dropped > 0 {
            tracing::debug!(series = %id, dropped, "records with unreadable timestamps dropped");
        }
        samples.sort_by_key(|s| s.ts);
        Series::new(id, samples)
    }
}
