// src/types.rs
use chrono::DateTime;
use chrono_tz::Tz;
use std::fmt;

/// Every sample is expressed in the configured display timezone before it is
/// joined or charted.
pub type Timestamp = DateTime<Tz>;

pub const HOUR_MS: i64 = 3_600_000;

/// Source tag of a series, e.g. `funding:ETH`, `lend:weth-v3`, `borrow:usdc-v3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesId(String);

impl SeriesId {
    pub fn new(kind: &str, key: &str) -> Self {
        Self(format!("{kind}:{key}"))
    }

    pub fn funding(coin: &str) -> Self { Self::new("funding", coin) }
    pub fn lend(pool: &str) -> Self { Self::new("lend", pool) }
    pub fn borrow(pool: &str) -> Self { Self::new("borrow", pool) }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One funding-rate or yield observation. `value` is `None` when the source
/// field could not be read as a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub ts: Timestamp,
    pub value: Option<f64>,
}

impl Sample {
    pub fn new(ts: Timestamp, value: Option<f64>) -> Self {
        Self { ts, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub id: SeriesId,
    pub samples: Vec<Sample>,
}

impl Series {
    pub fn new(id: SeriesId, samples: Vec<Sample>) -> Self {
        Self { id, samples }
    }

    pub fn empty(id: SeriesId) -> Self {
        Self { id, samples: Vec::new() }
    }

    pub fn len(&self) -> usize { self.samples.len() }
    pub fn is_empty(&self) -> bool { self.samples.is_empty() }

    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    pub fn first_ts(&self) -> Option<Timestamp> { self.samples.first().map(|s| s.ts) }
    pub fn last_ts(&self) -> Option<Timestamp> { self.samples.last().map(|s| s.ts) }
}

/// One hour of sub-hourly samples.
/// `hour_start <= first_time <= last_time < hour_start + 1h`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourBucket {
    pub hour_start: Timestamp,
    pub first_value: Option<f64>,
    pub first_time: Timestamp,
    pub last_value: Option<f64>,
    pub last_time: Timestamp,
    pub count: usize,
}

/// Companion sample picked by the as-of join, with its own source time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matched {
    pub time: Timestamp,
    pub value: Option<f64>,
}

impl Matched {
    pub fn from_sample(s: &Sample) -> Self {
        Self { time: s.ts, value: s.value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedRow {
    pub reference_time: Timestamp,
    pub funding_rate: Option<f64>,
    pub borrow: Option<Matched>,
    pub lend: Option<Matched>,
}

impl AlignedRow {
    pub fn borrow_rate(&self) -> Option<f64> { self.borrow.and_then(|m| m.value) }
    pub fn lend_rate(&self) -> Option<f64> { self.lend.and_then(|m| m.value) }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRow {
    pub aligned: AlignedRow,
    pub annualized_funding: Option<f64>,
    pub adjusted_funding: Option<f64>,
    pub adjusted_borrow: Option<f64>,
    pub adjusted_lend: Option<f64>,
    pub arb_return: Option<f64>,
}

impl MetricRow {
    pub fn time(&self) -> Timestamp { self.aligned.reference_time }
}

/// Two-exchange comparison row; no leverage applies here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffRow {
    pub time: Timestamp,
    pub funding_a: Option<f64>,
    pub funding_b: Option<Matched>,
    pub differential: Option<f64>,
}
