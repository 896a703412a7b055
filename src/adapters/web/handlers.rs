//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::comparison::{
    ComparisonTable, compare_latest, compare_ratios, relative_performance,
};
use crate::domain::error::DashboardError;
use crate::domain::macro_series::{
    DEFAULT_YEARS, MacroObservation, fetch_series, groups_from_map, observation_start, synthesize,
};
use crate::domain::news::summarize_urls;
use crate::domain::pivot::{RenderedTable, build_statement_table};
use crate::domain::provider::load_statement;
use crate::domain::quote::{CompanyOverview, HistoryInterval, HistoryRange, PriceBar};
use crate::domain::ratios::{RenderedRatioTable, StatementBundle, latest_ratios, ratio_table};
use crate::domain::statement::{DataSource, PeriodType, StatementKind, StatementRow, latest};

use super::{AppState, WebError};

const OVERVIEW_NOT_FOUND: &str = "Stock not found or error fetching data";
const MACRO_NOT_FOUND: &str = "Data not found or error fetching data";

fn parse_period(raw: Option<&str>) -> Result<PeriodType, DashboardError> {
    raw.map(str::parse).transpose().map(Option::unwrap_or_default)
}

/// Store first, quote provider as fallback. Provider failures are logged and
/// read as "no rows".
async fn statement_rows(
    state: &AppState,
    ticker: &str,
    kind: StatementKind,
    preferred: DataSource,
) -> Vec<StatementRow> {
    match load_statement(state.store.as_ref(), &state.quotes, ticker, kind, preferred).await {
        Ok(sourced) => {
            tracing::debug!(ticker, %kind, source = sourced.source.name(), rows = sourced.rows.len(), "statement loaded");
            sourced.rows
        }
        Err(e) => {
            tracing::warn!(ticker, %kind, error = %e, "statement fetch failed");
            Vec::new()
        }
    }
}

async fn statement_bundle(state: &AppState, ticker: &str) -> StatementBundle {
    let mut bundle = StatementBundle::default();
    for kind in StatementKind::ALL {
        let rows = statement_rows(state, ticker, kind, DataSource::Store).await;
        bundle.set(kind, rows);
    }
    bundle
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Finance Dashboard API is running" }))
}

pub async fn not_found() -> WebError {
    WebError::not_found("Not Found")
}

pub async fn stock_overview(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<Json<CompanyOverview>, WebError> {
    match state.quotes.overview(&ticker).await {
        Ok(Some(overview)) if overview.is_meaningful() => Ok(Json(overview)),
        Ok(_) => Err(WebError::not_found(OVERVIEW_NOT_FOUND)),
        Err(e) => {
            tracing::warn!(ticker, error = %e, "overview fetch failed");
            Err(WebError::not_found(OVERVIEW_NOT_FOUND))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub period: Option<String>,
    pub interval: Option<String>,
}

/// An empty array is a valid answer; only malformed parameters are errors.
pub async fn stock_history(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PriceBar>>, WebError> {
    let range: HistoryRange = match query.period.as_deref() {
        Some(raw) => raw.parse()?,
        None => HistoryRange::default(),
    };
    let interval: HistoryInterval = match query.interval.as_deref() {
        Some(raw) => raw.parse()?,
        None => HistoryInterval::default(),
    };

    match state.quotes.history(&ticker, &range, &interval).await {
        Ok(bars) => Ok(Json(bars)),
        Err(e) => {
            tracing::warn!(ticker, %range, %interval, error = %e, "history fetch failed");
            Ok(Json(Vec::new()))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FinancialsQuery {
    pub source: Option<String>,
}

pub async fn stock_financials(
    State(state): State<Arc<AppState>>,
    Path((ticker, statement_type)): Path<(String, String)>,
    Query(query): Query<FinancialsQuery>,
) -> Result<Json<Vec<Value>>, WebError> {
    let kind = StatementKind::from_path(&statement_type)?;
    let source: DataSource = match query.source.as_deref() {
        Some(raw) => raw.parse()?,
        None => DataSource::default(),
    };

    let rows = statement_rows(&state, &ticker, kind, source).await;
    if rows.is_empty() {
        return Err(WebError::not_found(format!(
            "No {} data found for {}",
            kind.label(),
            ticker.to_uppercase()
        )));
    }
    Ok(Json(rows.iter().map(StatementRow::to_record).collect()))
}

#[derive(Debug, Deserialize)]
pub struct TableQuery {
    pub period: Option<String>,
    #[serde(default)]
    pub yoy: bool,
}

pub async fn statement_table(
    State(state): State<Arc<AppState>>,
    Path((ticker, statement_type)): Path<(String, String)>,
    Query(query): Query<TableQuery>,
) -> Result<Json<RenderedTable>, WebError> {
    let kind = StatementKind::from_path(&statement_type)?;
    let period = parse_period(query.period.as_deref())?;

    let rows = statement_rows(&state, &ticker, kind, DataSource::Store).await;
    let table = build_statement_table(kind, &rows, period).ok_or_else(|| {
        WebError::not_found(format!(
            "No {} {} data found for {}",
            period.display_name().to_lowercase(),
            kind.label(),
            ticker.to_uppercase()
        ))
    })?;

    Ok(Json(if query.yoy {
        table.render_yoy()
    } else {
        table.render()
    }))
}

#[derive(Debug, Deserialize)]
pub struct RatiosQuery {
    pub period: Option<String>,
}

pub async fn stock_ratios(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<RatiosQuery>,
) -> Result<Json<RenderedRatioTable>, WebError> {
    let period = parse_period(query.period.as_deref())?;
    let bundle = statement_bundle(&state, &ticker).await;

    let missing = bundle.missing();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|k| k.label()).collect();
        return Err(WebError::not_found(format!(
            "Missing statements for {}: {}",
            ticker.to_uppercase(),
            names.join(", ")
        )));
    }

    ratio_table(&bundle, period)
        .map(|table| Json(table.render()))
        .ok_or_else(|| {
            WebError::not_found(format!(
                "No reporting dates shared by all statements for {}",
                ticker.to_uppercase()
            ))
        })
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub tickers: String,
    pub statement: Option<String>,
    pub period: Option<String>,
}

fn parse_tickers(raw: &str) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::new();
    for t in raw.split(',').map(|t| t.trim().to_uppercase()) {
        if !t.is_empty() && !tickers.contains(&t) {
            tickers.push(t);
        }
    }
    tickers
}

/// `statement` names a statement type, or `ratios` (the default) for the
/// latest key ratios of each company.
pub async fn compare(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<ComparisonTable>, WebError> {
    let tickers = parse_tickers(&query.tickers);
    if tickers.is_empty() {
        return Err(WebError::bad_request("No tickers specified"));
    }
    let period = parse_period(query.period.as_deref())?;

    let table = match query.statement.as_deref().unwrap_or("ratios") {
        "ratios" => {
            let mut sets = Vec::new();
            for ticker in &tickers {
                let bundle = statement_bundle(&state, ticker).await;
                match latest_ratios(&bundle, period) {
                    Some(set) => sets.push((ticker.clone(), set)),
                    None => tracing::info!(ticker, "not enough statements for ratios"),
                }
            }
            compare_ratios(&sets)
        }
        name => {
            let kind = StatementKind::from_path(name)?;
            let mut snapshots = Vec::new();
            for ticker in &tickers {
                let rows = statement_rows(&state, ticker, kind, DataSource::Store).await;
                snapshots.push((ticker.clone(), latest(&rows, period).cloned()));
            }
            compare_latest(&snapshots)
        }
    };

    table
        .map(Json)
        .ok_or_else(|| WebError::not_found("No data found for the requested tickers"))
}

#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    pub tickers: String,
    pub period: Option<String>,
    pub interval: Option<String>,
}

/// Percentage change of each ticker's close since the start of the window.
/// Tickers without history are left out.
pub async fn compare_performance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PerformanceQuery>,
) -> Result<Json<BTreeMap<String, Vec<Value>>>, WebError> {
    let tickers = parse_tickers(&query.tickers);
    if tickers.is_empty() {
        return Err(WebError::bad_request("No tickers specified"));
    }
    let range: HistoryRange = match query.period.as_deref() {
        Some(raw) => raw.parse()?,
        None => HistoryRange::default(),
    };
    let interval: HistoryInterval = match query.interval.as_deref() {
        Some(raw) => raw.parse()?,
        None => HistoryInterval::default(),
    };

    let mut series = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        match state.quotes.history(&ticker, &range, &interval).await {
            Ok(bars) => {
                let closes = bars.iter().map(|b| (b.date, b.close)).collect();
                series.push((ticker, closes));
            }
            Err(e) => tracing::warn!(ticker, error = %e, "history fetch failed"),
        }
    }

    let performance: BTreeMap<String, Vec<Value>> = relative_performance(&series)
        .into_iter()
        .map(|(ticker, points)| {
            let points = points
                .into_iter()
                .map(|(date, change)| {
                    json!({ "date": date.format("%Y-%m-%d").to_string(), "change_pct": change })
                })
                .collect();
            (ticker, points)
        })
        .collect();

    if performance.is_empty() {
        return Err(WebError::not_found("No price history for the requested tickers"));
    }
    Ok(Json(performance))
}

#[derive(Debug, Deserialize)]
pub struct MacroRequest {
    pub series_id: String,
    pub label: String,
    #[serde(default = "default_years")]
    pub years: u32,
}

fn default_years() -> u32 {
    DEFAULT_YEARS
}

pub async fn macro_data(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MacroRequest>,
) -> Result<Json<Vec<MacroObservation>>, WebError> {
    let Some(port) = state.macro_port.as_ref() else {
        return Err(WebError::internal("FRED client not initialized"));
    };

    let start = observation_start(chrono::Local::now().date_naive(), request.years)?;
    match fetch_series(port, &request.series_id, &request.label, start).await {
        Ok(points) if !points.is_empty() => Ok(Json(points)),
        Ok(_) => Err(WebError::not_found(MACRO_NOT_FOUND)),
        Err(e) => {
            tracing::warn!(series_id = %request.series_id, error = %e, "macro fetch failed");
            Err(WebError::not_found(MACRO_NOT_FOUND))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SynthesisRequest {
    pub grouped_indicators: Map<String, Value>,
    pub analysis_focus: String,
}

pub async fn macro_synthesize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SynthesisRequest>,
) -> Json<Value> {
    let groups = groups_from_map(request.grouped_indicators);
    let conclusion = synthesize(
        state.macro_port.as_ref(),
        state.llm.as_ref(),
        &groups,
        &request.analysis_focus,
    )
    .await;
    Json(json!({ "conclusion": conclusion }))
}

#[derive(Debug, Deserialize)]
pub struct NewsRequest {
    pub urls: Vec<String>,
    pub topic: String,
}

pub async fn news_summary(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewsRequest>,
) -> Result<Json<BTreeMap<String, String>>, WebError> {
    let Some(llm) = state.llm.as_ref() else {
        return Err(WebError::internal("Gemini client not initialized"));
    };
    let summary = summarize_urls(
        &state.fetcher,
        llm,
        &request.urls,
        &request.topic,
        chrono::Local::now().naive_local(),
    )
    .await;
    Ok(Json(summary))
}
