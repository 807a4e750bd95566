// src/providers/mod.rs
use async_trait::async_trait;
use serde::de::DeserializeOwned;

pub mod bitfinex;
pub mod defillama;
pub mod hyperliquid;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("transport: {0}")]
    Http(#[from] reqwest::Error),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A remote history endpoint that answers one time window per call.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Record: Send;

    /// Short tag for logs, e.g. `hyperliquid:ETH`.
    fn label(&self) -> String;

    /// Records with time in `[start_ms, end_ms)`.
    async fn fetch_page(&self, start_ms: i64, end_ms: i64) -> Result<Vec<Self::Record>, ProviderError>;

    fn record_time_ms(record: &Self::Record) -> i64;
}

/// Non-success status becomes `ProviderError::Status` carrying the head of the body.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ProviderError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        let body: String = text.chars().take(256).collect();
        return Err(ProviderError::Status { status: status.as_u16(), body });
    }
    Ok(serde_json::from_str(&text)?)
}
