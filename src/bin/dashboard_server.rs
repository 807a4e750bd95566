// src/bin/dashboard_server.rs
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use funding_dash::cache::SystemClock;
use funding_dash::config::DashboardConfig;
use funding_dash::dashboard::Dashboard;
use funding_dash::web;

#[derive(Parser, Debug)]
#[command(about = "Serve the funding-rate dashboard")]
struct Args {
    /// TOML config; built-in defaults when omitted.
    #[arg(long, env = "FUNDING_DASH_CONFIG")]
    config: Option<PathBuf>,
    /// Overrides `bind` from the config.
    #[arg(long, env = "FUNDING_DASH_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(bind) = args.bind {
        cfg.bind = bind;
    }

    let bind = cfg.bind.clone();
    let dash = Arc::new(Dashboard::new(cfg, Arc::new(SystemClock))?);
    let app = web::router(dash);

    let listener = tokio::net::TcpListener::bind(bind.as_str()).await?;
    tracing::info!("funding dashboard listening on http://{bind}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}
