// src/providers/defillama.rs
use serde::Deserialize;
use serde_json::Value;

use super::{read_json, ProviderError};
use crate::normalize::RawSample;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendBorrowPoint {
    pub timestamp: String,
    /// Supply APY in percent.
    #[serde(default)]
    pub apy_base: Value,
    /// Borrow APY in percent.
    #[serde(default)]
    pub apy_base_borrow: Value,
}

impl LendBorrowPoint {
    pub fn lend_sample(&self) -> RawSample {
        RawSample::text(self.timestamp.clone(), self.apy_base.clone())
    }

    pub fn borrow_sample(&self) -> RawSample {
        RawSample::text(self.timestamp.clone(), self.apy_base_borrow.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    #[serde(default)]
    data: Vec<LendBorrowPoint>,
}

/// `chartLendBorrow` is a single un-paginated call per pool.
#[derive(Clone)]
pub struct DefiLlamaLendBorrow {
    pub http: reqwest::Client,
    pub base_url: String,
}

impl DefiLlamaLendBorrow {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    pub async fn chart(&self, pool_id: &str) -> Result<Vec<LendBorrowPoint>, ProviderError> {
        let url = format!("{}/chartLendBorrow/{}", self.base_url.trim_end_matches('/'), pool_id);
        let resp = self.http.get(url).send().await?;
        let body: ChartResponse = read_json(resp).await?;
        Ok(body.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn reads_lend_and_borrow_columns() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/chartLendBorrow/pool-1");
                then.status(200).json_body(json!({
                    "status": "success",
                    "data": [
                        {"timestamp": "2024-05-01T23:01:14.000Z", "apyBase": 2.1, "apyBaseBorrow": 5.5, "totalSupplyUsd": 1},
                        {"timestamp": "2024-05-02T23:01:14.000Z", "apyBase": null, "apyBaseBorrow": 5.7}
                    ]
                }));
            })
            .await;

        let src = DefiLlamaLendBorrow::new(reqwest::Client::new(), server.base_url());
        let points = src.chart("pool-1").await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].lend_sample().rate, json!(2.1));
        assert_eq!(points[0].borrow_sample().rate, json!(5.5));
        assert_eq!(points[1].apy_base, Value::Null);
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/chartLendBorrow/pool-2");
                then.status(200).body("<html>oops</html>");
            })
            .await;

        let src = DefiLlamaLendBorrow::new(reqwest::Client::new(), server.base_url());
        assert!(matches!(src.chart("pool-2").await, Err(ProviderError::Decode(_))));
    }
}
