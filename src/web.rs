// src/web.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::dashboard::{ArbView, CompareView, Dashboard};
use crate::derive::{DeriveError, Deriver};
use crate::summary::{ArbSummary, CompareSummary};
use crate::types::Timestamp;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<DeriveError> for ApiError {
    fn from(e: DeriveError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ArbQuery {
    pub coin: Option<String>,
    pub days: Option<u32>,
    pub leverage: Option<f64>,
    pub ltv: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub coin: Option<String>,
    pub days: Option<u32>,
}

/// Chart time: display wall-clock seconds, so the browser shows display-zone
/// times whatever its own locale is.
fn chart_time(t: &Timestamp) -> i64 {
    t.naive_local().and_utc().timestamp()
}

#[derive(Debug, Serialize)]
pub struct ArbPoint {
    pub time: i64,
    pub iso: String,
    pub annualized_funding: Option<f64>,
    pub borrow_rate: Option<f64>,
    pub lend_rate: Option<f64>,
    pub adjusted_funding: Option<f64>,
    pub adjusted_borrow: Option<f64>,
    pub adjusted_lend: Option<f64>,
    pub arb_return: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ComparePoint {
    pub time: i64,
    pub iso: String,
    pub funding_a: Option<f64>,
    pub funding_b: Option<f64>,
    pub differential: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SeriesPoint {
    pub time: i64,
    pub value: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArbResponse {
    Ok {
        coin: String,
        leverage: f64,
        ltv: f64,
        summary: ArbSummary,
        rows: Vec<ArbPoint>,
    },
    NoData,
}

impl From<ArbView> for ArbResponse {
    fn from(v: ArbView) -> Self {
        if v.is_empty() {
            return Self::NoData;
        }
        let rows = v
            .rows
            .iter()
            .map(|r| ArbPoint {
                time: chart_time(&r.time()),
                iso: r.time().to_rfc3339(),
                annualized_funding: r.annualized_funding,
                borrow_rate: r.aligned.borrow_rate(),
                lend_rate: r.aligned.lend_rate(),
                adjusted_funding: r.adjusted_funding,
                adjusted_borrow: r.adjusted_borrow,
                adjusted_lend: r.adjusted_lend,
                arb_return: r.arb_return,
            })
            .collect();
        Self::Ok {
            coin: v.coin,
            leverage: v.deriver.leverage(),
            ltv: v.deriver.loan_to_value(),
            summary: v.summary,
            rows,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompareResponse {
    Ok {
        coin: String,
        summary: CompareSummary,
        rows: Vec<ComparePoint>,
        hyperliquid: Vec<SeriesPoint>,
        bitfinex: Vec<SeriesPoint>,
    },
    NoData,
}

impl From<CompareView> for CompareResponse {
    fn from(v: CompareView) -> Self {
        if v.is_empty() {
            return Self::NoData;
        }
        let points = |s: &crate::types::Series| -> Vec<SeriesPoint> {
            s.samples.iter().map(|x| SeriesPoint { time: chart_time(&x.ts), value: x.value }).collect()
        };
        Self::Ok {
            rows: v
                .rows
                .iter()
                .map(|r| ComparePoint {
                    time: chart_time(&r.time),
                    iso: r.time.to_rfc3339(),
                    funding_a: r.funding_a,
                    funding_b: r.funding_b.and_then(|m| m.value),
                    differential: r.differential,
                })
                .collect(),
            hyperliquid: points(&v.hyperliquid),
            bitfinex: points(&v.bitfinex),
            summary: v.summary,
            coin: v.coin,
        }
    }
}

fn pick_coin(requested: Option<String>, allowed: &[String]) -> Result<String, ApiError> {
    let coin = match requested {
        Some(c) => c.trim().to_uppercase(),
        None => allowed.first().cloned().unwrap_or_default(),
    };
    if allowed.iter().any(|a| *a == coin) {
        Ok(coin)
    } else {
        Err(ApiError::BadRequest(format!("coin must be one of {}", allowed.join(", "))))
    }
}

fn pick_days(requested: Option<u32>, default: u32, max: u32) -> Result<u32, ApiError> {
    let days = requested.unwrap_or(default.min(max));
    if (1..=max).contains(&days) {
        Ok(days)
    } else {
        Err(ApiError::BadRequest(format!("days must be within 1..={max}")))
    }
}

async fn api_arb(
    State(dash): State<Arc<Dashboard>>,
    query: Result<Query<ArbQuery>, QueryRejection>,
) -> Result<Json<ArbResponse>, ApiError> {
    let Query(q) = query?;
    let cfg = dash.config();
    let coin = pick_coin(q.coin, &cfg.arb_coins)?;
    let days = pick_days(q.days, cfg.default_days, cfg.arb_max_days)?;
    let deriver = Deriver::new(
        q.leverage.unwrap_or(cfg.default_leverage),
        q.ltv.unwrap_or(cfg.default_ltv),
    )?;
    let view = dash.arb_view(&coin, days, deriver).await;
    if view.is_empty() {
        tracing::info!(%coin, days, "arb view has no data");
    }
    Ok(Json(view.into()))
}

async fn api_compare(
    State(dash): State<Arc<Dashboard>>,
    query: Result<Query<CompareQuery>, QueryRejection>,
) -> Result<Json<CompareResponse>, ApiError> {
    let Query(q) = query?;
    let cfg = dash.config();
    let coin = pick_coin(q.coin, &cfg.compare_coins)?;
    let days = pick_days(q.days, cfg.default_days, cfg.compare_max_days)?;
    let view = dash.compare_view(&coin, days).await;
    if view.is_empty() {
        tracing::info!(%coin, days, "compare view has no data");
    }
    Ok(Json(view.into()))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(feature = "metrics")]
async fn metrics() -> Result<String, ApiError> {
    crate::metrics::render().map_err(|e| ApiError::Internal(e.to_string()))
}

async fn index_page(State(dash): State<Arc<Dashboard>>) -> Html<String> {
    let cfg = dash.config();
    let options = |coins: &[String]| -> String {
        coins.iter().map(|c| format!(r#"<option value="{c}">{c}</option>"#)).collect()
    };
    Html(
        INDEX_HTML
            .replace("{{ARB_COINS}}", &options(&cfg.arb_coins))
            .replace("{{COMPARE_COINS}}", &options(&cfg.compare_coins))
            .replace("{{DEFAULT_DAYS}}", &cfg.default_days.to_string())
            .replace("{{ARB_MAX_DAYS}}", &cfg.arb_max_days.to_string())
            .replace("{{COMPARE_MAX_DAYS}}", &cfg.compare_max_days.to_string())
            .replace("{{LEVERAGE}}", &cfg.default_leverage.to_string())
            .replace("{{LTV}}", &cfg.default_ltv.to_string())
            .replace("{{REFRESH_MS}}", &(cfg.refresh_interval_sec * 1000).to_string())
            .replace("{{TZ}}", &cfg.display_tz),
    )
}

pub fn router(dash: Arc<Dashboard>) -> Router {
    let router = Router::new()
        .route("/", get(index_page))
        .route("/api/arb", get(api_arb))
        .route("/api/compare", get(api_compare))
        .route("/health", get(health));
    #[cfg(feature = "metrics")]
    let router = router.route("/metrics", get(metrics));
    router.layer(TraceLayer::new_for_http()).with_state(dash)
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Funding Rate Dashboard</title>
<script src="https://unpkg.com/lightweight-charts@4.1.0/dist/lightweight-charts.standalone.production.js"></script>
<style>
  body { font-family: sans-serif; margin: 24px; background: #131722; color: #d1d4dc; }
  .controls { display: flex; gap: 16px; align-items: end; flex-wrap: wrap; margin-bottom: 12px; }
  .controls label { display: flex; flex-direction: column; font-size: 13px; color: grey; }
  .stat-container { display: flex; justify-content: space-around; padding: 20px 0; }
  .stat { text-align: center; font-size: 24px; font-weight: bold; margin: 10px; }
  .stat-label { font-size: 14px; color: grey; }
  .chart { height: 280px; margin-bottom: 28px; }
  .warn { padding: 12px; background: #3b2f12; color: #f0c36d; display: none; }
  h2 { margin-top: 36px; }
</style>
</head>
<body>
<h1>Funding Rate Dashboard</h1>
<p class="stat-label">Times shown in {{TZ}}</p>

<h2>Aave / Hyperliquid carry</h2>
<div class="controls">
  <label>Coin <select id="arb-coin">{{ARB_COINS}}</select></label>
  <label>Days <input id="arb-days" type="range" min="1" max="{{ARB_MAX_DAYS}}" value="{{DEFAULT_DAYS}}"
    oninput="document.getElementById('arb-days-v').textContent=this.value"><span id="arb-days-v">{{DEFAULT_DAYS}}</span></label>
  <label>Leverage <input id="arb-lev" type="number" min="0.1" step="0.1" value="{{LEVERAGE}}"></label>
  <label>LTV <input id="arb-ltv" type="number" min="0" max="1" step="0.05" value="{{LTV}}"></label>
  <button onclick="loadAll()">Refresh now</button>
</div>
<div id="arb-warn" class="warn">No data available to display</div>
<div id="arb-stats" class="stat-container"></div>
<div id="arb-chart" class="chart"></div>
<div id="arb-legs" class="chart"></div>

<h2>Hyperliquid vs Bitfinex</h2>
<div class="controls">
  <label>Coin <select id="cmp-coin">{{COMPARE_COINS}}</select></label>
  <label>Days <input id="cmp-days" type="range" min="1" max="{{COMPARE_MAX_DAYS}}" value="{{DEFAULT_DAYS}}"
    oninput="document.getElementById('cmp-days-v').textContent=this.value"><span id="cmp-days-v">{{DEFAULT_DAYS}}</span></label>
</div>
<div id="cmp-warn" class="warn">No data available to display</div>
<div id="cmp-stats" class="stat-container"></div>
<div id="cmp-diff" class="chart"></div>
<div id="cmp-legs" class="chart"></div>

<script>
const charts = {};
function chart(id) {
  if (charts[id]) { charts[id].remove(); }
  const el = document.getElementById(id);
  charts[id] = LightweightCharts.createChart(el, {
    height: el.clientHeight,
    layout: { background: { type: 'solid', color: '#131722' }, textColor: '#d1d4dc' },
    grid: { vertLines: { color: '#2a2e39' }, horzLines: { color: '#2a2e39' } },
    timeScale: { timeVisible: true },
  });
  return charts[id];
}
function line(c, rows, key, color, title) {
  const s = c.addLineSeries({ color: color, lineWidth: 2, title: title });
  s.setData(rows.filter(r => r[key] !== null && r[key] !== undefined).map(r => ({ time: r.time, value: r[key] })));
}
function fmt(v) { return v === null || v === undefined ? 'n/a' : v.toFixed(2) + '%'; }
function stats(id, items) {
  document.getElementById(id).innerHTML = items.map(([v, label]) =>
    `<div class="stat">${fmt(v)}<div class="stat-label">${label}</div></div>`).join('');
}
function noData(prefix, empty) {
  document.getElementById(prefix + '-warn').style.display = empty ? 'block' : 'none';
  document.getElementById(prefix + '-stats').style.display = empty ? 'none' : 'flex';
}
async function loadArb() {
  const q = new URLSearchParams({
    coin: document.getElementById('arb-coin').value,
    days: document.getElementById('arb-days').value,
    leverage: document.getElementById('arb-lev').value,
    ltv: document.getElementById('arb-ltv').value,
  });
  const res = await fetch('/api/arb?' + q);
  const body = await res.json();
  if (!res.ok) { alert(body.error); return; }
  noData('arb', body.status !== 'ok');
  if (body.status !== 'ok') { chart('arb-chart'); chart('arb-legs'); return; }
  const s = body.summary;
  stats('arb-stats', [[s.avg_arb_return, 'Average Arb Return'], [s.avg_funding, 'Average Hyperliquid Funding Rate'],
    [s.avg_borrow, 'Average Borrow Rate'], [s.avg_lend, 'Average Lending Rate']]);
  line(chart('arb-chart'), body.rows, 'arb_return', '#FF0000', 'Arb Return');
  const legs = chart('arb-legs');
  line(legs, body.rows, 'adjusted_funding', '#00BFFF', 'Funding');
  line(legs, body.rows, 'adjusted_borrow', '#4682B4', 'Borrow');
  line(legs, body.rows, 'adjusted_lend', '#7CFC00', 'Lend');
}
async function loadCompare() {
  const q = new URLSearchParams({
    coin: document.getElementById('cmp-coin').value,
    days: document.getElementById('cmp-days').value,
  });
  const res = await fetch('/api/compare?' + q);
  const body = await res.json();
  if (!res.ok) { alert(body.error); return; }
  noData('cmp', body.status !== 'ok');
  if (body.status !== 'ok') { chart('cmp-diff'); chart('cmp-legs'); return; }
  const s = body.summary;
  stats('cmp-stats', [[s.avg_a, 'Average Hyperliquid Funding Rate'], [s.avg_b, 'Average Bitfinex Funding Rate'],
    [s.difference, 'Difference']]);
  line(chart('cmp-diff'), body.rows, 'differential', '#FF0000', 'Hyperliquid - Bitfinex');
  const legs = chart('cmp-legs');
  line(legs, body.hyperliquid, 'value', '#00BFFF', 'Hyperliquid');
  line(legs, body.bitfinex, 'value', '#4682B4', 'Bitfinex');
}
function loadAll() { loadArb(); loadCompare(); }
for (const id of ['arb-coin', 'arb-days', 'arb-lev', 'arb-ltv']) document.getElementById(id).addEventListener('change', loadArb);
for (const id of ['cmp-coin', 'cmp-days']) document.getElementById(id).addEventListener('change', loadCompare);
loadAll();
setTimeout(() => window.location.reload(), {{REFRESH_MS}});
</script>
</body>
</html>
"##;
