// src/providers/bitfinex.rs
use async_trait::async_trait;
use serde_json::Value;

use super::{read_json, PageSource, ProviderError};
use crate::normalize::{coerce_rate, RawSample};

// Field positions of a `status/deriv/{symbol}/hist` row.
const MTS: usize = 0;
const DERIV_PRICE: usize = 2;
const SPOT_PRICE: usize = 3;
const INSURANCE_FUND_BALANCE: usize = 5;
const NEXT_FUNDING_EVT_MTS: usize = 7;
const NEXT_FUNDING_ACCRUED: usize = 8;
const CURRENT_FUNDING: usize = 11;
const MARK_PRICE: usize = 14;
const OPEN_INTEREST: usize = 17;

/// Named view over one derivatives status row. Built once here; the rest of
/// the crate never sees the positional array.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivStatus {
    pub mts: i64,
    pub deriv_price: Option<f64>,
    pub spot_price: Option<f64>,
    pub insurance_fund_balance: Option<f64>,
    pub next_funding_evt_mts: Option<i64>,
    pub next_funding_accrued: Option<f64>,
    pub current_funding: Value,
    pub mark_price: Option<f64>,
    pub open_interest: Option<f64>,
}

impl DerivStatus {
    /// `None` when the row has no usable timestamp.
    pub fn from_row(row: &[Value]) -> Option<Self> {
        let num = |i: usize| row.get(i).and_then(coerce_rate);
        Some(Self {
            mts: row.get(MTS)?.as_i64()?,
            deriv_price: num(DERIV_PRICE),
            spot_price: num(SPOT_PRICE),
            insurance_fund_balance: num(INSURANCE_FUND_BALANCE),
            next_funding_evt_mts: row.get(NEXT_FUNDING_EVT_MTS).and_then(Value::as_i64),
            next_funding_accrued: num(NEXT_FUNDING_ACCRUED),
            current_funding: row.get(CURRENT_FUNDING).cloned().unwrap_or(Value::Null),
            mark_price: num(MARK_PRICE),
            open_interest: num(OPEN_INTEREST),
        })
    }
}

impl From<DerivStatus> for RawSample {
    fn from(s: DerivStatus) -> Self {
        RawSample::millis(s.mts, s.current_funding)
    }
}

pub struct BitfinexDerivStatus {
    pub http: reqwest::Client,
    pub base_url: String,
    pub symbol: String,
    pub limit: u32,
}

impl BitfinexDerivStatus {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, symbol: impl Into<String>, limit: u32) -> Self {
        Self { http, base_url: base_url.into(), symbol: symbol.into(), limit }
    }

    fn hist_url(&self) -> String {
        format!("{}/v2/status/deriv/{}/hist", self.base_url.trim_end_matches('/'), self.symbol)
    }
}

#[async_trait]
impl PageSource for BitfinexDerivStatus {
    type Record = DerivStatus;

    fn label(&self) -> String {
        format!("bitfinex:{}", self.symbol)
    }

    async fn fetch_page(&self, start_ms: i64, end_ms: i64) -> Result<Vec<DerivStatus>, ProviderError> {
        let resp = self
            .http
            .get(self.hist_url())
            .header("accept", "application/json")
            .query(&[
                ("start", start_ms),
                ("end", end_ms - 1),
                ("sort", 1),
                ("limit", i64::from(self.limit)),
            ])
            .send()
            .await?;
        let rows: Vec<Vec<Value>> = read_json(resp).await?;
        let total = rows.len();
        let out: Vec<DerivStatus> = rows.iter().filter_map(|r| DerivStatus::from_row(r)).collect();
        if out.len() < total {
            tracing::debug!(symbol = %self.symbol, skipped = total - out.len(), "rows without timestamp");
        }
        Ok(out)
    }

    fn record_time_ms(record: &DerivStatus) -> i64 {
        record.mts
    }
}
