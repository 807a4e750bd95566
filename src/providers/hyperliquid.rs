// src/providers/hyperliquid.rs
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{read_json, PageSource, ProviderError};
use crate::normalize::RawSample;

/// One entry of the `fundingHistory` info query. Rates arrive as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingEntry {
    pub coin: String,
    pub funding_rate: Value,
    #[serde(default)]
    pub premium: Value,
    pub time: i64,
}

impl From<FundingEntry> for RawSample {
    fn from(e: FundingEntry) -> Self {
        RawSample::millis(e.time, e.funding_rate)
    }
}

pub struct HyperliquidFunding {
    pub http: reqwest::Client,
    pub base_url: String,
    pub coin: String,
}

impl HyperliquidFunding {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, coin: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into(), coin: coin.into() }
    }

    fn info_url(&self) -> String {
        format!("{}/info", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl PageSource for HyperliquidFunding {
    type Record = FundingEntry;

    fn label(&self) -> String {
        format!("hyperliquid:{}", self.coin)
    }

    async fn fetch_page(&self, start_ms: i64, end_ms: i64) -> Result<Vec<FundingEntry>, ProviderError> {
        // endTime is inclusive on the exchange side
        let payload = json!({
            "type": "fundingHistory",
            "coin": self.coin,
            "startTime": start_ms,
            "endTime": end_ms - 1,
        });
        let resp = self.http.post(self.info_url()).json(&payload).send().await?;
        read_json(resp).await
    }

    fn record_time_ms(record: &FundingEntry) -> i64 {
        record.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn posts_funding_history_query() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/info")
                    .json_body(json!({
                        "type": "fundingHistory",
                        "coin": "ETH",
                        "startTime": 0,
                        "endTime": 3_599_999,
                    }));
                then.status(200).json_body(json!([
                    {"coin": "ETH", "fundingRate": "0.0000125", "premium": "-0.0001", "time": 0},
                ]));
            })
            .await;

        let src = HyperliquidFunding::new(reqwest::Client::new(), server.base_url(), "ETH");
        let page = src.fetch_page(0, 3_600_000).await.unwrap();
        m.assert_async().await;
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].coin, "ETH");
        assert_eq!(page[0].funding_rate, json!("0.0000125"));
        assert_eq!(HyperliquidFunding::record_time_ms(&page[0]), 0);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/info");
                then.status(429).body("rate limited");
            })
            .await;

        let src = HyperliquidFunding::new(reqwest::Client::new(), server.base_url(), "BTC");
        match src.fetch_page(0, 1).await {
            Err(ProviderError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
