// src/bin/funding_probe.rs
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use funding_dash::cache::SystemClock;
use funding_dash::config::DashboardConfig;
use funding_dash::dashboard::Dashboard;
use funding_dash::types::Series;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Source {
    Hyperliquid,
    Bitfinex,
    Borrow,
    Lend,
}

/// Fetch one normalized series and print it.
#[derive(Parser, Debug)]
struct Args {
    #[arg(value_enum)]
    source: Source,
    /// Coin for funding sources, pool key for lending sources.
    #[arg(default_value = "ETH")]
    key: String,
    #[arg(long, default_value_t = 1)]
    days: i64,
    #[arg(long, env = "FUNDING_DASH_CONFIG")]
    config: Option<PathBuf>,
}

fn print(series: &Series) {
    println!("{} ({} samples)", series.id, series.len());
    for s in &series.samples {
        match s.value {
            Some(v) => println!("{}  {:>10.4}", s.ts.format("%Y-%m-%d %H:%M:%S %Z"), v),
            None => println!("{}  {:>10}", s.ts.format("%Y-%m-%d %H:%M:%S %Z"), "missing"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    let dash = Dashboard::new(cfg, Arc::new(SystemClock))?;
    let end = dash.now();
    let start = end - Duration::days(args.days);

    let series = match args.source {
        Source::Hyperliquid => dash.hyperliquid_funding(&args.key, start, end).await,
        Source::Bitfinex => dash.bitfinex_hourly(&args.key, start, end).await.1,
        Source::Borrow => dash.borrow_series(&args.key).await,
        Source::Lend => dash.lend_series(&args.key).await,
    };
    print(&series);
    Ok(())
}
