// src/summary.rs
use serde::Serialize;

use crate::types::{DiffRow, MetricRow, Series};

/// Mean over present values only; `None` when nothing is present.
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, n) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArbSummary {
    pub avg_arb_return: Option<f64>,
    pub avg_funding: Option<f64>,
    pub avg_borrow: Option<f64>,
    pub avg_lend: Option<f64>,
    pub rows: usize,
}

impl ArbSummary {
    /// Averages of the leverage-adjusted legs.
    pub fn from_rows(rows: &[MetricRow]) -> Self {
        Self {
            avg_arb_return: mean_present(rows.iter().map(|r| r.arb_return)),
            avg_funding: mean_present(rows.iter().map(|r| r.adjusted_funding)),
            avg_borrow: mean_present(rows.iter().map(|r| r.adjusted_borrow)),
            avg_lend: mean_present(rows.iter().map(|r| r.adjusted_lend)),
            rows: rows.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompareSummary {
    pub avg_a: Option<f64>,
    pub avg_b: Option<f64>,
    /// `avg_a - avg_b`, each averaged over its own full series.
    pub difference: Option<f64>,
    /// Mean of the row-wise differential after alignment.
    pub avg_differential: Option<f64>,
}

impl CompareSummary {
    pub fn new(a: &Series, b: &Series, rows: &[DiffRow]) -> Self {
        let avg_a = mean_present(a.values());
        let avg_b = mean_present(b.values());
        Self {
            avg_a,
            avg_b,
            difference: crate::derive::funding_differential(avg_a, avg_b),
            avg_differential: mean_present(rows.iter().map(|r| r.differential)),
        }
    }
}
