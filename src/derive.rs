// src/derive.rs
use crate::types::{AlignedRow, DiffRow, MetricRow};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DeriveError {
    #[error("leverage must be a finite number > 0, got {0}")]
    InvalidLeverage(f64),
    #[error("loan-to-value must be within 0..=1, got {0}")]
    InvalidLtv(f64),
}

/// Row-wise carry arithmetic. A missing input leaves every output that
/// depends on it missing; nothing is ever read as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deriver {
    leverage: f64,
    loan_to_value: f64,
}

impl Deriver {
    pub fn new(leverage: f64, loan_to_value: f64) -> Result<Self, DeriveError> {
        if !leverage.is_finite() || leverage <= 0.0 {
            return Err(DeriveError::InvalidLeverage(leverage));
        }
        if !loan_to_value.is_finite() || !(0.0..=1.0).contains(&loan_to_value) {
            return Err(DeriveError::InvalidLtv(loan_to_value));
        }
        Ok(Self { leverage, loan_to_value })
    }

    /// Leverage 1, LTV 1: plain `funding + lend - borrow`.
    pub fn unlevered() -> Self {
        Self { leverage: 1.0, loan_to_value: 1.0 }
    }

    pub fn leverage(&self) -> f64 { self.leverage }
    pub fn loan_to_value(&self) -> f64 { self.loan_to_value }

    pub fn derive(&self, row: &AlignedRow) -> MetricRow {
        let adjusted_funding = row.funding_rate.map(|f| f * self.leverage);
        let adjusted_lend = row.lend_rate().map(|l| l * self.leverage);
        let adjusted_borrow = row.borrow_rate().map(|b| b * self.leverage * self.loan_to_value);
        MetricRow {
            aligned: *row,
            annualized_funding: row.funding_rate,
            adjusted_funding,
            adjusted_borrow,
            adjusted_lend,
            arb_return: arb_return(adjusted_funding, adjusted_lend, adjusted_borrow),
        }
    }

    pub fn derive_all(&self, rows: &[AlignedRow]) -> Vec<MetricRow> {
        rows.iter().map(|r| self.derive(r)).collect()
    }
}

/// `funding + lend - borrow`, present only when all three are.
pub fn arb_return(funding: Option<f64>, lend: Option<f64>, borrow: Option<f64>) -> Option<f64> {
    Some(funding? + lend? - borrow?)
}

pub fn funding_differential(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

/// Fills `differential` on every row.
pub fn differentials(rows: &[DiffRow]) -> Vec<DiffRow> {
    rows.iter()
        .map(|r| DiffRow {
            differential: funding_differential(r.funding_a, r.funding_b.and_then(|m| m.value)),
            ..*r
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use crate::types::{Matched, Timestamp};

    fn t0() -> Timestamp {
        Normalizer::new(chrono_tz::Asia::Singapore).from_millis(0).unwrap()
    }

    fn row(funding: Option<f64>, lend: Option<f64>, borrow: Option<f64>) -> AlignedRow {
        let m = |v: Option<f64>| v.map(|v| Matched { time: t0(), value: Some(v) });
        AlignedRow { reference_time: t0(), funding_rate: funding, borrow: m(borrow), lend: m(lend) }
    }

    #[test]
    fn leveraged_carry_example() {
        let d = Deriver::new(2.0, 0.5).unwrap();
        let m = d.derive(&row(Some(10.0), Some(4.0), Some(6.0)));
        assert_eq!(m.adjusted_funding, Some(20.0));
        assert_eq!(m.adjusted_lend, Some(8.0));
        assert_eq!(m.adjusted_borrow, Some(6.0));
        assert_eq!(m.arb_return, Some(22.0));
        assert_eq!(m.annualized_funding, Some(10.0));
    }

    #[test]
    fn arb_return_reproduces_from_components() {
        let d = Deriver::new(3.3, 0.77).unwrap();
        for (f, l, b) in [(12.5, 2.25, 5.75), (-4.0, 0.1, 9.9), (0.0, 0.0, 0.0)] {
            let m = d.derive(&row(Some(f), Some(l), Some(b)));
            let again = m.adjusted_funding.unwrap() + m.adjusted_lend.unwrap() - m.adjusted_borrow.unwrap();
            assert_eq!(m.arb_return, Some(again));
        }
    }

    #[test]
    fn unlevered_is_plain_sum() {
        let m = Deriver::unlevered().derive(&row(Some(10.0), Some(2.0), Some(5.0)));
        assert_eq!(m.arb_return, Some(7.0));
        assert_eq!(m.adjusted_borrow, Some(5.0));
    }

    #[test]
    fn absence_propagates_to_dependents_only() {
        let d = Deriver::new(2.0, 0.5).unwrap();
        let m = d.derive(&row(Some(10.0), None, Some(6.0)));
        assert_eq!(m.adjusted_funding, Some(20.0));
        assert_eq!(m.adjusted_borrow, Some(6.0));
        assert_eq!(m.adjusted_lend, None);
        assert_eq!(m.arb_return, None);

        let m = d.derive(&row(None, None, None));
        assert_eq!((m.adjusted_funding, m.adjusted_lend, m.adjusted_borrow, m.arb_return), (None, None, None, None));
    }

    #[test]
    fn rejects_bad_parameters() {
        assert_eq!(Deriver::new(0.0, 0.5), Err(DeriveError::InvalidLeverage(0.0)));
        assert_eq!(Deriver::new(-1.0, 0.5), Err(DeriveError::InvalidLeverage(-1.0)));
        assert!(matches!(Deriver::new(f64::NAN, 0.5), Err(DeriveError::InvalidLeverage(_))));
        assert_eq!(Deriver::new(1.0, 1.5), Err(DeriveError::InvalidLtv(1.5)));
        assert_eq!(Deriver::new(1.0, -0.1), Err(DeriveError::InvalidLtv(-0.1)));
        assert!(Deriver::new(1.0, 0.0).is_ok());
        assert!(Deriver::new(1.0, 1.0).is_ok());
    }

    #[test]
    fn differential_needs_both_sides() {
        let rows = vec![
            DiffRow { time: t0(), funding_a: Some(11.0), funding_b: Some(Matched { time: t0(), value: Some(4.0) }), differential: None },
            DiffRow { time: t0(), funding_a: Some(11.0), funding_b: None, differential: None },
            DiffRow { time: t0(), funding_a: None, funding_b: Some(Matched { time: t0(), value: Some(4.0) }), differential: None },
        ];
        let out = differentials(&rows);
        assert_eq!(out[0].differential, Some(7.0));
        assert_eq!(out[1].differential, None);
        assert_eq!(out[2].differential, None);
    }
}
