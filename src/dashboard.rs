// src/dashboard.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};

use crate::align::Aligner;
use crate::bucket::{bucketize, hourly_series};
use crate::cache::{Clock, TtlCache};
use crate::config::{ConfigError, DashboardConfig};
use crate::derive::{differentials, Deriver};
use crate::fetch::PaginatedFetcher;
use crate::normalize::{Annualizer, Normalizer, RawSample};
use crate::providers::bitfinex::BitfinexDerivStatus;
use crate::providers::defillama::{DefiLlamaLendBorrow, LendBorrowPoint};
use crate::providers::hyperliquid::HyperliquidFunding;
use crate::summary::{ArbSummary, CompareSummary};
use crate::types::{DiffRow, HourBucket, MetricRow, Series, SeriesId};

#[derive(thiserror::Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("building http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Funding + Aave carry view.
#[derive(Debug, Clone)]
pub struct ArbView {
    pub coin: String,
    pub deriver: Deriver,
    pub rows: Vec<MetricRow>,
    pub summary: ArbSummary,
}

impl ArbView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Hyperliquid vs Bitfinex funding view.
#[derive(Debug, Clone)]
pub struct CompareView {
    pub coin: String,
    pub hyperliquid: Series,
    pub bitfinex: Series,
    pub buckets: Vec<HourBucket>,
    pub rows: Vec<DiffRow>,
    pub summary: CompareSummary,
}

impl CompareView {
    /// Both legs are needed for a comparison.
    pub fn is_empty(&self) -> bool {
        self.hyperliquid.is_empty() || self.bitfinex.is_empty()
    }
}

/// Runs fetch → normalize → bucket → align → derive for one render.
/// Every call fetches afresh except the lending charts, which are memoized
/// per pool for the configured TTL.
pub struct Dashboard {
    cfg: DashboardConfig,
    normalizer: Normalizer,
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
    lending: DefiLlamaLendBorrow,
    lending_cache: TtlCache<String, Arc<Vec<LendBorrowPoint>>>,
}

impl Dashboard {
    pub fn new(cfg: DashboardConfig, clock: Arc<dyn Clock>) -> Result<Self, DashboardError> {
        cfg.validate()?;
        let http = reqwest::Client::builder().timeout(cfg.request_timeout()).build()?;
        Ok(Self {
            normalizer: Normalizer::new(cfg.tz()?),
            lending: DefiLlamaLendBorrow::new(http.clone(), cfg.defillama_url.clone()),
            lending_cache: TtlCache::new(cfg.lending_cache_ttl(), clock.clone()),
            http,
            clock,
            cfg,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.cfg
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Annualized Hyperliquid funding over `[start, end)`.
    pub async fn hyperliquid_funding(&self, coin: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Series {
        let src = HyperliquidFunding::new(self.http.clone(), self.cfg.hyperliquid_url.clone(), coin);
        let fetcher = PaginatedFetcher::windowed(Duration::hours(self.cfg.hyperliquid_window_hours));
        let raw = fetcher.fetch(&src, start.timestamp_millis(), end.timestamp_millis()).await;
        self.normalizer.series(
            SeriesId::funding(coin),
            raw.into_iter().map(RawSample::from),
            Some(Annualizer::new(self.cfg.hyperliquid_periods_per_year)),
        )
    }

    /// Bitfinex status rows bucketed per hour, plus the annualized hourly series.
    pub async fn bitfinex_hourly(&self, coin: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> (Vec<HourBucket>, Series) {
        let symbol = self.cfg.bitfinex_symbol(coin);
        let src = BitfinexDerivStatus::new(
            self.http.clone(),
            self.cfg.bitfinex_url.clone(),
            symbol.clone(),
            self.cfg.bitfinex_page_limit,
        );
        let raw = PaginatedFetcher::cursor(None)
            .fetch(&src, start.timestamp_millis(), end.timestamp_millis())
            .await;
        let id = SeriesId::new("funding-bfx", &symbol);
        let periodic = self.normalizer.series(id.clone(), raw.into_iter().map(RawSample::from), None);
        let buckets = bucketize(&periodic);
        let hourly = hourly_series(id, &buckets, Annualizer::new(self.cfg.bitfinex_periods_per_year));
        (buckets, hourly)
    }

    /// Lend/borrow chart for a configured pool key. A failed call is logged
    /// and reads as an empty chart; only successes are cached.
    pub async fn lending_chart(&self, pool_key: &str) -> Arc<Vec<LendBorrowPoint>> {
        let Some(pool_id) = self.cfg.pool_id(pool_key) else {
            tracing::warn!(pool_key, "no pool id configured");
            return Arc::new(Vec::new());
        };
        if let Some(hit) = self.lending_cache.get(&pool_id.to_string()) {
            return hit;
        }
        match self.lending.chart(pool_id).await {
            Ok(points) => {
                let points = Arc::new(points);
                self.lending_cache.insert(pool_id.to_string(), points.clone());
                points
            }
            Err(err) => {
                tracing::warn!(pool_key, %err, "lending chart fetch failed");
                Arc::new(Vec::new())
            }
        }
    }

    pub async fn borrow_series(&self, pool_key: &str) -> Series {
        let chart = self.lending_chart(pool_key).await;
        self.normalizer.series(SeriesId::borrow(pool_key), chart.iter().map(LendBorrowPoint::borrow_sample), None)
    }

    pub async fn lend_series(&self, pool_key: &str) -> Series {
        let chart = self.lending_chart(pool_key).await;
        self.normalizer.series(SeriesId::lend(pool_key), chart.iter().map(LendBorrowPoint::lend_sample), None)
    }

    /// With daily sampling on, the window closes at today's sample hour in
    /// display time so each day contributes exactly one funding row.
    fn arb_window(&self, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = self.now();
        let end = if self.cfg.arb_daily_sampling {
            let tz = self.normalizer.tz();
            now.with_timezone(&tz)
                .date_naive()
                .and_hms_opt(self.cfg.arb_sample_hour, 0, 0)
                .and_then(|local| tz.from_local_datetime(&local).earliest())
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or(now)
        } else {
            now
        };
        (end - Duration::days(days as i64), end)
    }

    pub async fn arb_view(&self, coin: &str, days: u32, deriver: Deriver) -> ArbView {
        #[cfg(feature = "metrics")]
        let _timer = crate::metrics::PIPELINE_LATENCY.with_label_values(&["arb"]).start_timer();

        let (start, end) = self.arb_window(days);
        let mut funding = self.hyperliquid_funding(coin, start, end).await;
        if self.cfg.arb_daily_sampling {
            let hour = self.cfg.arb_sample_hour;
            funding.samples.retain(|s| s.ts.hour() == hour);
        }
        let borrow = self.borrow_series(&self.cfg.borrow_pool).await;
        let lend = self.lend_series(&self.cfg.lend_pool).await;

        let aligned = Aligner::backward().align(&funding, &borrow, &lend);
        let rows = deriver.derive_all(&aligned);
        tracing::debug!(coin, days, funding = funding.len(), borrow = borrow.len(), lend = lend.len(), rows = rows.len(), "arb view");
        ArbView { coin: coin.to_string(), summary: ArbSummary::from_rows(&rows), deriver, rows }
    }

    pub async fn compare_view(&self, coin: &str, days: u32) -> CompareView {
        #[cfg(feature = "metrics")]
        let _timer = crate::metrics::PIPELINE_LATENCY.with_label_values(&["compare"]).start_timer();

        let end = self.now();
        let start = end - Duration::days(days as i64);
        let hyperliquid = self.hyperliquid_funding(coin, start, end).await;
        let (buckets, bitfinex) = self.bitfinex_hourly(coin, start, end).await;

        let rows = differentials(&Aligner::new(self.cfg.compare_direction).align_pair(&hyperliquid, &bitfinex));
        let summary = CompareSummary::new(&hyperliquid, &bitfinex, &rows);
        tracing::debug!(coin, days, hl = hyperliquid.len(), bfx = bitfinex.len(), rows = rows.len(), "compare view");
        CompareView { coin: coin.to_string(), hyperliquid, bitfinex, buckets, rows, summary }
    }
}
