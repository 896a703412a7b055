#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use findash::domain::error::DashboardError;
use findash::domain::quote::{CompanyOverview, HistoryInterval, HistoryRange, PriceBar};
use findash::domain::statement::{StatementKind, StatementRow};
use findash::ports::fundamentals_port::FundamentalsPort;
use findash::ports::llm_port::LanguageModelPort;
use findash::ports::macro_port::MacroPort;
use findash::ports::page_port::PageFetchPort;
use findash::ports::quote_port::QuotePort;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_row(symbol: &str, day: &str, period: &str, items: &[(&str, f64)]) -> StatementRow {
    let mut row = StatementRow::new(symbol, date(day), Some(period));
    for (name, value) in items {
        row.push_item(name, Some(*value));
    }
    row
}

/// Two fiscal years of all five statements, shaped like the DoltHub tables.
pub fn full_statements(symbol: &str) -> Vec<(StatementKind, Vec<StatementRow>)> {
    let years = [("2022-12-31", 1.0), ("2023-12-31", 1.2)];
    let rows = |items: &[(&str, f64)]| -> Vec<StatementRow> {
        years
            .iter()
            .map(|(day, growth)| {
                let scaled: Vec<(&str, f64)> =
                    items.iter().map(|(n, v)| (*n, v * growth)).collect();
                make_row(symbol, day, "Year", &scaled)
            })
            .collect()
    };
    vec![
        (
            StatementKind::Income,
            rows(&[
                ("sales", 1_000e6),
                ("cost_of_goods", 600e6),
                ("pretax_income", 250e6),
                ("interest_expense", 50e6),
                ("net_income", 200e6),
            ]),
        ),
        (
            StatementKind::BalanceSheetAssets,
            rows(&[("total_current_assets", 800e6), ("total_assets", 2_000e6)]),
        ),
        (
            StatementKind::BalanceSheetLiabilities,
            rows(&[
                ("current_liabilities", 400e6),
                ("total_liabilities", 1_200e6),
            ]),
        ),
        (
            StatementKind::BalanceSheetEquity,
            rows(&[("total_equity", 800e6)]),
        ),
        (
            StatementKind::CashFlow,
            rows(&[("net_cash_from_operating_activities", 300e6)]),
        ),
    ]
}

#[derive(Default)]
pub struct MockFundamentalsPort {
    pub data: HashMap<(String, StatementKind), Vec<StatementRow>>,
    pub errors: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl MockFundamentalsPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, symbol: &str, kind: StatementKind, rows: Vec<StatementRow>) -> Self {
        self.data.insert((symbol.to_uppercase(), kind), rows);
        self
    }

    pub fn with_company(mut self, symbol: &str) -> Self {
        for (kind, rows) in full_statements(symbol) {
            self.data.insert((symbol.to_uppercase(), kind), rows);
        }
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_uppercase(), reason.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FundamentalsPort for MockFundamentalsPort {
    fn fetch_statement(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>, DashboardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(DashboardError::DatabaseQuery {
                reason: reason.clone(),
            });
        }
        let mut rows = self
            .data
            .get(&(symbol.to_string(), kind))
            .cloned()
            .unwrap_or_default();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }

    fn list_symbols(&self) -> Result<Vec<String>, DashboardError> {
        let mut symbols: Vec<String> = self.data.keys().map(|(s, _)| s.clone()).collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}

#[derive(Default)]
pub struct MockQuotePort {
    pub overviews: HashMap<String, CompanyOverview>,
    pub bars: HashMap<String, Vec<PriceBar>>,
    pub statements: HashMap<(String, StatementKind), Vec<StatementRow>>,
    pub fail: bool,
    pub financial_calls: AtomicUsize,
}

impl MockQuotePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overview(mut self, ticker: &str, name: &str, price: f64) -> Self {
        let mut overview = CompanyOverview::new(ticker);
        overview.name = Some(name.to_string());
        overview.price = Some(price);
        overview.sector = Some("Technology".to_string());
        self.overviews.insert(ticker.to_uppercase(), overview);
        self
    }

    pub fn with_bars(mut self, ticker: &str, closes: &[(&str, f64)]) -> Self {
        let bars = closes
            .iter()
            .map(|(day, close)| PriceBar {
                date: date(day),
                open: *close,
                high: close * 1.01,
                low: close * 0.99,
                close: *close,
                volume: 1_000_000,
            })
            .collect();
        self.bars.insert(ticker.to_uppercase(), bars);
        self
    }

    pub fn with_statement(
        mut self,
        ticker: &str,
        kind: StatementKind,
        rows: Vec<StatementRow>,
    ) -> Self {
        self.statements.insert((ticker.to_uppercase(), kind), rows);
        self
    }

    /// Full statements served only by the quote provider.
    pub fn with_company(mut self, ticker: &str) -> Self {
        for (kind, rows) in full_statements(ticker) {
            self.statements.insert((ticker.to_uppercase(), kind), rows);
        }
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn financial_call_count(&self) -> usize {
        self.financial_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuotePort for MockQuotePort {
    async fn overview(&self, ticker: &str) -> Result<Option<CompanyOverview>, DashboardError> {
        if self.fail {
            return Err(DashboardError::upstream("yahoo", "HTTP 500"));
        }
        Ok(self.overviews.get(&ticker.to_uppercase()).cloned())
    }

    async fn history(
        &self,
        ticker: &str,
        _range: &HistoryRange,
        _interval: &HistoryInterval,
    ) -> Result<Vec<PriceBar>, DashboardError> {
        if self.fail {
            return Err(DashboardError::upstream("yahoo", "HTTP 500"));
        }
        Ok(self.bars.get(&ticker.to_uppercase()).cloned().unwrap_or_default())
    }

    async fn financials(
        &self,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>, DashboardError> {
        self.financial_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DashboardError::upstream("yahoo", "HTTP 500"));
        }
        Ok(self
            .statements
            .get(&(ticker.to_uppercase(), kind))
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockMacroPort {
    pub series: HashMap<String, Vec<(NaiveDate, f64)>>,
    pub frequencies: HashMap<String, String>,
}

impl MockMacroPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, id: &str, frequency: &str, points: &[(&str, f64)]) -> Self {
        self.series.insert(
            id.to_string(),
            points.iter().map(|(d, v)| (date(d), *v)).collect(),
        );
        self.frequencies
            .insert(id.to_string(), frequency.to_string());
        self
    }
}

#[async_trait]
impl MacroPort for MockMacroPort {
    async fn observations(
        &self,
        series_id: &str,
        start: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, DashboardError> {
        match self.series.get(series_id) {
            Some(points) => Ok(points.iter().filter(|(d, _)| *d >= start).copied().collect()),
            None => Err(DashboardError::upstream("fred", "HTTP 400 Bad Request")),
        }
    }

    async fn latest_value(&self, series_id: &str) -> Result<Option<f64>, DashboardError> {
        match self.series.get(series_id) {
            Some(points) => Ok(points.last().map(|(_, v)| *v)),
            None => Err(DashboardError::upstream("fred", "HTTP 400 Bad Request")),
        }
    }

    async fn frequency(&self, series_id: &str) -> Result<String, DashboardError> {
        Ok(self
            .frequencies
            .get(series_id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string()))
    }
}

/// Records every prompt and answers with a fixed text.
pub struct MockLlm {
    pub reply: Result<String, String>,
    pub prompts: Mutex<Vec<(Option<String>, String)>>,
}

impl MockLlm {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<(Option<String>, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModelPort for MockLlm {
    async fn generate(
        &self,
        system_instruction: Option<&str>,
        prompt: &str,
    ) -> Result<String, DashboardError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system_instruction.map(str::to_string), prompt.to_string()));
        self.reply
            .clone()
            .map_err(|reason| DashboardError::upstream("gemini", reason))
    }
}

#[derive(Default)]
pub struct MockFetcher {
    pub pages: HashMap<String, String>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }
}

#[async_trait]
impl PageFetchPort for MockFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, DashboardError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| DashboardError::upstream("page", format!("HTTP 404 Not Found for {url}")))
    }
}
