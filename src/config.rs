// src/config.rs
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;

use crate::align::Direction;
use crate::normalize::{EIGHT_HOURLY_PERIODS_PER_YEAR, HOURLY_PERIODS_PER_YEAR};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Upper bounds keep every derived `chrono::Duration` and page-reload delay
/// far from overflow.
pub const MAX_WINDOW_HOURS: i64 = 24 * 3650;
pub const MAX_DAYS: u32 = 3650;
pub const MAX_CACHE_TTL_SEC: u64 = 7 * 86_400;
pub const MAX_REFRESH_SEC: u64 = 7 * 86_400;
pub const MAX_TIMEOUT_MS: u64 = 10 * 60 * 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "d_bind")]                 pub bind: String,
    #[serde(default = "d_hyperliquid_url")]      pub hyperliquid_url: String,
    #[serde(default = "d_defillama_url")]        pub defillama_url: String,
    #[serde(default = "d_bitfinex_url")]         pub bitfinex_url: String,
    #[serde(default = "d_timeout_ms")]           pub request_timeout_ms: u64,
    #[serde(default = "d_hl_window_hours")]      pub hyperliquid_window_hours: i64,
    #[serde(default = "d_bfx_limit")]            pub bitfinex_page_limit: u32,
    #[serde(default = "d_hl_ppy")]               pub hyperliquid_periods_per_year: f64,
    #[serde(default = "d_bfx_ppy")]              pub bitfinex_periods_per_year: f64,
    #[serde(default = "d_bfx_symbol")]           pub bitfinex_symbol_template: String,
    #[serde(default = "d_display_tz")]           pub display_tz: String,
    #[serde(default = "d_cache_ttl_sec")]        pub lending_cache_ttl_sec: u64,
    #[serde(default = "d_pools")]                pub pools: BTreeMap<String, String>,
    #[serde(default = "d_borrow_pool")]          pub borrow_pool: String,
    #[serde(default = "d_lend_pool")]            pub lend_pool: String,
    #[serde(default = "d_arb_coins")]            pub arb_coins: Vec<String>,
    #[serde(default = "d_compare_coins")]        pub compare_coins: Vec<String>,
    #[serde(default = "d_default_days")]         pub default_days: u32,
    #[serde(default = "d_arb_max_days")]         pub arb_max_days: u32,
    #[serde(default = "d_compare_max_days")]     pub compare_max_days: u32,
    #[serde(default = "d_true")]                 pub arb_daily_sampling: bool,
    #[serde(default = "d_sample_hour")]          pub arb_sample_hour: u32,
    #[serde(default)]                            pub compare_direction: Direction,
    #[serde(default = "d_leverage")]             pub default_leverage: f64,
    #[serde(default = "d_ltv")]                  pub default_ltv: f64,
    #[serde(default = "d_refresh_sec")]          pub refresh_interval_sec: u64,
}
fn d_bind() -> String { "127.0.0.1:8501".into() }
fn d_hyperliquid_url() -> String { "https://api.hyperliquid.xyz".into() }
fn d_defillama_url() -> String { "https://yields.llama.fi".into() }
fn d_bitfinex_url() -> String { "https://api-pub.bitfinex.com".into() }
fn d_timeout_ms() -> u64 { 30_000 }
fn d_hl_window_hours() -> i64 { 500 }
fn d_bfx_limit() -> u32 { 5000 }
fn d_hl_ppy() -> f64 { HOURLY_PERIODS_PER_YEAR }
fn d_bfx_ppy() -> f64 { EIGHT_HOURLY_PERIODS_PER_YEAR }
fn d_bfx_symbol() -> String { "t{coin}F0:USTF0".into() }
fn d_display_tz() -> String { "Asia/Singapore".into() }
fn d_cache_ttl_sec() -> u64 { 600 }
fn d_pools() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("usdc-v3".to_string(), "d9fa8e14-0447-4207-9ae8-7810199dfa1f".to_string()),
        ("weth-v3".to_string(), "e302de4d-952e-4e18-9749-0a9dc86e98bc".to_string()),
    ])
}
fn d_borrow_pool() -> String { "usdc-v3".into() }
fn d_lend_pool() -> String { "weth-v3".into() }
fn d_arb_coins() -> Vec<String> { vec!["ETH".into()] }
fn d_compare_coins() -> Vec<String> { vec!["BTC".into(), "ETH".into(), "SOL".into()] }
fn d_default_days() -> u32 { 7 }
fn d_arb_max_days() -> u32 { 365 }
fn d_compare_max_days() -> u32 { 90 }
fn d_true() -> bool { true }
fn d_sample_hour() -> u32 { 7 }
fn d_leverage() -> f64 { 1.0 }
fn d_ltv() -> f64 { 1.0 }
fn d_refresh_sec() -> u64 { 3600 }

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: d_bind(),
            hyperliquid_url: d_hyperliquid_url(),
            defillama_url: d_defillama_url(),
            bitfinex_url: d_bitfinex_url(),
            request_timeout_ms: d_timeout_ms(),
            hyperliquid_window_hours: d_hl_window_hours(),
            bitfinex_page_limit: d_bfx_limit(),
            hyperliquid_periods_per_year: d_hl_ppy(),
            bitfinex_periods_per_year: d_bfx_ppy(),
            bitfinex_symbol_template: d_bfx_symbol(),
            display_tz: d_display_tz(),
            lending_cache_ttl_sec: d_cache_ttl_sec(),
            pools: d_pools(),
            borrow_pool: d_borrow_pool(),
            lend_pool: d_lend_pool(),
            arb_coins: d_arb_coins(),
            compare_coins: d_compare_coins(),
            default_days: d_default_days(),
            arb_max_days: d_arb_max_days(),
            compare_max_days: d_compare_max_days(),
            arb_daily_sampling: true,
            arb_sample_hour: d_sample_hour(),
            compare_direction: Direction::Backward,
            default_leverage: d_leverage(),
            default_ltv: d_ltv(),
            refresh_interval_sec: d_refresh_sec(),
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;
        let invalid = |m: &str| Err(ConfigError::Invalid(m.to_string()));
        if !(1..=MAX_WINDOW_HOURS).contains(&self.hyperliquid_window_hours) {
            return Err(ConfigError::Invalid(format!("hyperliquid_window_hours must be within 1..={MAX_WINDOW_HOURS}")));
        }
        if !(1..=MAX_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!("request_timeout_ms must be within 1..={MAX_TIMEOUT_MS}")));
        }
        if self.lending_cache_ttl_sec > MAX_CACHE_TTL_SEC {
            return Err(ConfigError::Invalid(format!("lending_cache_ttl_sec must be <= {MAX_CACHE_TTL_SEC}")));
        }
        if !(1..=MAX_REFRESH_SEC).contains(&self.refresh_interval_sec) {
            return Err(ConfigError::Invalid(format!("refresh_interval_sec must be within 1..={MAX_REFRESH_SEC}")));
        }
        if self.bitfinex_page_limit == 0 {
            return invalid("bitfinex_page_limit must be > 0");
        }
        if !(self.hyperliquid_periods_per_year > 0.0 && self.bitfinex_periods_per_year > 0.0) {
            return invalid("periods_per_year must be > 0");
        }
        if self.arb_coins.is_empty() || self.compare_coins.is_empty() {
            return invalid("coin lists must not be empty");
        }
        if self.arb_sample_hour > 23 {
            return invalid("arb_sample_hour must be within 0..=23");
        }
        for days in [self.arb_max_days, self.compare_max_days] {
            if !(1..=MAX_DAYS).contains(&days) {
                return Err(ConfigError::Invalid(format!("max days must be within 1..={MAX_DAYS}")));
            }
        }
        for key in [&self.borrow_pool, &self.lend_pool] {
            if !self.pools.contains_key(key) {
                return Err(ConfigError::Invalid(format!("pool `{key}` has no id in [pools]")));
            }
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.display_tz
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid(format!("unknown timezone `{}`", self.display_tz)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn lending_cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lending_cache_ttl_sec as i64)
    }

    pub fn bitfinex_symbol(&self, coin: &str) -> String {
        self.bitfinex_symbol_template.replace("{coin}", coin)
    }

    pub fn pool_id(&self, key: &str) -> Option<&str> {
        self.pools.get(key).map(String::as_str)
    }
}
