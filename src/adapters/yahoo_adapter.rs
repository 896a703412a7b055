//! Yahoo Finance quote provider.
//!
//! Overview and statement histories come from the `quoteSummary` endpoint,
//! price bars from `chart`. Numeric fields in `quoteSummary` are wrapped as
//! `{"raw": 1.0, "fmt": "1.00"}`; bare numbers are accepted too.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::adapters::http::{build_client, send_json};
use crate::domain::error::DashboardError;
use crate::domain::quote::{CompanyOverview, HistoryInterval, HistoryRange, PriceBar};
use crate::domain::statement::{StatementKind, StatementRow};
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::QuotePort;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const PROVIDER: &str = "yahoo";
const OVERVIEW_MODULES: &str = "price,summaryProfile,summaryDetail,defaultKeyStatistics,financialData";

pub struct YahooAdapter {
    client: Client,
    base_url: String,
}

impl YahooAdapter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DashboardError> {
        Ok(Self {
            client: build_client(PROVIDER, timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &dyn ConfigPort, timeout: Duration) -> Result<Self, DashboardError> {
        let base_url = config
            .get_string("yahoo", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(&base_url, timeout)
    }

    async fn quote_summary(&self, ticker: &str, modules: &str) -> Result<Option<Value>, DashboardError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker.to_uppercase());
        let body = send_json(
            PROVIDER,
            self.client.get(&url).query(&[("modules", modules)]),
        )
        .await?;
        Ok(body.and_then(|json| {
            json.pointer("/quoteSummary/result/0").cloned()
        }))
    }
}

fn raw(node: &Value, key: &str) -> Option<f64> {
    let field = node.get(key)?;
    field
        .get("raw")
        .and_then(Value::as_f64)
        .or_else(|| field.as_f64())
        .filter(|v| v.is_finite())
}

fn text(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `totalRevenue` -> `total_revenue`
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Builds an overview from a `quoteSummary` result. `None` when the record
/// has neither a price nor a name.
pub fn parse_overview(ticker: &str, result: &Value) -> Option<CompanyOverview> {
    let empty = Value::Null;
    let price = result.get("price").unwrap_or(&empty);
    let profile = result.get("summaryProfile").unwrap_or(&empty);
    let detail = result.get("summaryDetail").unwrap_or(&empty);
    let stats = result.get("defaultKeyStatistics").unwrap_or(&empty);
    let financial = result.get("financialData").unwrap_or(&empty);

    let mut overview = CompanyOverview::new(ticker);
    overview.name = text(price, "longName").or_else(|| text(price, "shortName"));
    overview.sector = text(profile, "sector");
    overview.industry = text(profile, "industry");
    overview.country = text(profile, "country");
    overview.description = text(profile, "longBusinessSummary");
    overview.website = text(profile, "website");
    overview.market_cap = raw(price, "marketCap").or_else(|| raw(detail, "marketCap"));
    overview.pe_ratio = raw(detail, "trailingPE");
    overview.ps_ratio = raw(detail, "priceToSalesTrailing12Months");
    overview.pb_ratio = raw(stats, "priceToBook");
    overview.beta = raw(detail, "beta");
    overview.dividend_yield = raw(detail, "dividendYield");
    overview.fifty_two_week_high = raw(detail, "fiftyTwoWeekHigh");
    overview.fifty_two_week_low = raw(detail, "fiftyTwoWeekLow");
    overview.price = raw(financial, "currentPrice").or_else(|| raw(price, "regularMarketPrice"));
    if let Some(currency) = text(price, "currency") {
        overview.currency = currency;
    }

    overview.is_meaningful().then_some(overview)
}

fn history_modules(kind: StatementKind) -> [(&'static str, &'static str, &'static str); 2] {
    match kind {
        StatementKind::Income => [
            ("incomeStatementHistory", "incomeStatementHistory", "Year"),
            (
                "incomeStatementHistoryQuarterly",
                "incomeStatementHistory",
                "Quarter",
            ),
        ],
        StatementKind::CashFlow => [
            ("cashflowStatementHistory", "cashflowStatements", "Year"),
            (
                "cashflowStatementHistoryQuarterly",
                "cashflowStatements",
                "Quarter",
            ),
        ],
        _ => [
            ("balanceSheetHistory", "balanceSheetStatements", "Year"),
            (
                "balanceSheetHistoryQuarterly",
                "balanceSheetStatements",
                "Quarter",
            ),
        ],
    }
}

const INCOME_RENAMES: &[(&str, &str)] = &[
    ("totalRevenue", "sales"),
    ("costOfRevenue", "cost_of_goods"),
    ("grossProfit", "gross_profit"),
    ("sellingGeneralAdministrative", "selling_general_and_administrative_expense"),
    ("totalOtherIncomeExpenseNet", "other_income"),
    ("interestExpense", "interest_expense"),
    ("incomeBeforeTax", "pretax_income"),
    ("incomeTaxExpense", "income_taxes"),
    ("minorityInterest", "minority_interest"),
    ("netIncomeFromContinuingOps", "income_from_continuing_operations"),
    ("discontinuedOperations", "extras_and_discontinued_operations"),
    ("netIncome", "net_income"),
];

const CASH_FLOW_RENAMES: &[(&str, &str)] = &[
    ("netIncome", "net_income"),
    ("depreciation", "depreciation_amortization_and_depletion"),
    ("totalCashFromOperatingActivities", "net_cash_from_operating_activities"),
    ("capitalExpenditures", "property_and_equipment"),
    ("investments", "investments"),
    ("otherCashflowsFromInvestingActivities", "other_investing_activities"),
    ("totalCashflowsFromInvestingActivities", "net_cash_from_investing_activities"),
    ("issuanceOfStock", "issuance_of_capital_stock"),
    ("netBorrowings", "issuance_of_debt"),
    ("dividendsPaid", "payment_of_dividends_and_other_distributions"),
    ("otherCashflowsFromFinancingActivities", "other_financing_activities"),
    ("totalCashFromFinancingActivities", "net_cash_from_financing_activities"),
    ("effectOfExchangeRate", "effect_of_exchange_rate_changes"),
    ("changeInCash", "net_change_in_cash_and_equivalents"),
];

const BALANCE_SHEET_RENAMES: &[(&str, &str, StatementKind)] = &[
    ("cash", "cash_and_equivalents", StatementKind::BalanceSheetAssets),
    ("netReceivables", "receivables", StatementKind::BalanceSheetAssets),
    ("inventory", "inventories", StatementKind::BalanceSheetAssets),
    ("otherCurrentAssets", "other_current_assets", StatementKind::BalanceSheetAssets),
    ("totalCurrentAssets", "total_current_assets", StatementKind::BalanceSheetAssets),
    ("propertyPlantEquipment", "net_property_and_equipment", StatementKind::BalanceSheetAssets),
    ("longTermInvestments", "investments_and_advances", StatementKind::BalanceSheetAssets),
    ("intangibleAssets", "intangibles", StatementKind::BalanceSheetAssets),
    ("otherAssets", "other_non_current_assets", StatementKind::BalanceSheetAssets),
    ("deferredLongTermAssetCharges", "deferred_charges", StatementKind::BalanceSheetAssets),
    ("totalAssets", "total_assets", StatementKind::BalanceSheetAssets),
    ("accountsPayable", "accounts_payable", StatementKind::BalanceSheetLiabilities),
    ("shortLongTermDebt", "current_portion_long_term_debt", StatementKind::BalanceSheetLiabilities),
    ("otherCurrentLiab", "other_current_liabilities", StatementKind::BalanceSheetLiabilities),
    ("totalCurrentLiabilities", "current_liabilities", StatementKind::BalanceSheetLiabilities),
    ("longTermDebt", "long_term_debt", StatementKind::BalanceSheetLiabilities),
    ("deferredLongTermLiab", "deferred_taxes_or_income", StatementKind::BalanceSheetLiabilities),
    ("otherLiab", "other_non_current_liabilities", StatementKind::BalanceSheetLiabilities),
    ("minorityInterest", "minority_interest", StatementKind::BalanceSheetLiabilities),
    ("totalLiab", "total_liabilities", StatementKind::BalanceSheetLiabilities),
    ("commonStock", "common_stock", StatementKind::BalanceSheetEquity),
    ("capitalSurplus", "capital_surplus", StatementKind::BalanceSheetEquity),
    ("retainedEarnings", "retained_earnings", StatementKind::BalanceSheetEquity),
    ("otherStockholderEquity", "other_equity", StatementKind::BalanceSheetEquity),
    ("treasuryStock", "treasury_stock", StatementKind::BalanceSheetEquity),
    ("totalStockholderEquity", "total_equity", StatementKind::BalanceSheetEquity),
];

/// Balance sheet side for a provider field with no store column.
fn balance_sheet_side(field: &str) -> StatementKind {
    let lower = field.to_ascii_lowercase();
    if ["liab", "debt", "payable"].iter().any(|k| lower.contains(k)) {
        StatementKind::BalanceSheetLiabilities
    } else if ["stock", "equity", "earnings", "surplus", "tangible"]
        .iter()
        .any(|k| lower.contains(k))
    {
        StatementKind::BalanceSheetEquity
    } else {
        StatementKind::BalanceSheetAssets
    }
}

/// Store column name for a provider field and the statement it belongs to.
/// Fields the store does not carry keep their snake-cased name.
pub fn store_field(kind: StatementKind, field: &str) -> (StatementKind, String) {
    let table = match kind {
        StatementKind::Income => INCOME_RENAMES,
        StatementKind::CashFlow => CASH_FLOW_RENAMES,
        _ => {
            return match BALANCE_SHEET_RENAMES.iter().find(|(f, _, _)| *f == field) {
                Some((_, column, side)) => (*side, column.to_string()),
                None => (balance_sheet_side(field), camel_to_snake(field)),
            };
        }
    };
    let column = table
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, column)| column.to_string())
        .unwrap_or_else(|| camel_to_snake(field));
    (kind, column)
}

/// Transposes the provider's statement histories into store-shaped rows,
/// newest first. Line items are renamed to store columns and the balance
/// sheet is split into the side `kind` asks for.
pub fn parse_statements(ticker: &str, kind: StatementKind, result: &Value) -> Vec<StatementRow> {
    let mut rows = Vec::new();
    for (module, list_key, period) in history_modules(kind) {
        let Some(entries) = result
            .get(module)
            .and_then(|m| m.get(list_key))
            .and_then(Value::as_array)
        else {
            continue;
        };
        for entry in entries {
            let Some(date) = raw(entry, "endDate")
                .and_then(|ts| DateTime::from_timestamp(ts as i64, 0))
                .map(|dt| dt.date_naive())
            else {
                continue;
            };
            let mut row = StatementRow::new(ticker, date, Some(period));
            if let Some(fields) = entry.as_object() {
                for (field, _) in fields {
                    if field == "endDate" || field == "maxAge" {
                        continue;
                    }
                    let (side, column) = store_field(kind, field);
                    if side != kind {
                        continue;
                    }
                    let mut value = raw(entry, field);
                    // reported as an outflow; the store keeps it positive
                    if column == "interest_expense" {
                        value = value.map(f64::abs);
                    }
                    row.push_item(&column, value);
                }
            }
            rows.push(row);
        }
    }
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows
}

/// Price bars from a `chart` response; timestamps with any missing price
/// are skipped.
pub fn parse_chart(json: &Value) -> Vec<PriceBar> {
    let Some(result) = json.pointer("/chart/result/0") else {
        return Vec::new();
    };
    let Some(timestamps) = result.get("timestamp").and_then(Value::as_array) else {
        return Vec::new();
    };
    let Some(quote) = result.pointer("/indicators/quote/0") else {
        return Vec::new();
    };
    let series = |key: &str| -> Vec<Option<f64>> {
        quote
            .get(key)
            .and_then(Value::as_array)
            .map(|a| a.iter().map(Value::as_f64).collect())
            .unwrap_or_default()
    };
    let (open, high, low, close, volume) = (
        series("open"),
        series("high"),
        series("low"),
        series("close"),
        series("volume"),
    );

    let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();
    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let date: NaiveDate = DateTime::from_timestamp(ts.as_i64()?, 0)?.date_naive();
            Some(PriceBar {
                date,
                open: at(&open, i)?,
                high: at(&high, i)?,
                low: at(&low, i)?,
                close: at(&close, i)?,
                volume: at(&volume, i).unwrap_or(0.0).max(0.0) as u64,
            })
        })
        .collect()
}

#[async_trait]
impl QuotePort for YahooAdapter {
    async fn overview(&self, ticker: &str) -> Result<Option<CompanyOverview>, DashboardError> {
        let Some(result) = self.quote_summary(ticker, OVERVIEW_MODULES).await? else {
            tracing::info!(ticker, "quote provider does not know ticker");
            return Ok(None);
        };
        Ok(parse_overview(ticker, &result))
    }

    async fn history(
        &self,
        ticker: &str,
        range: &HistoryRange,
        interval: &HistoryInterval,
    ) -> Result<Vec<PriceBar>, DashboardError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker.to_uppercase());
        let request = self
            .client
            .get(&url)
            .query(&[("range", range.as_str()), ("interval", interval.as_str())]);
        Ok(send_json(PROVIDER, request)
            .await?
            .map(|json| parse_chart(&json))
            .unwrap_or_default())
    }

    async fn financials(
        &self,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>, DashboardError> {
        let modules: Vec<&str> = history_modules(kind).iter().map(|(m, _, _)| *m).collect();
        let Some(result) = self.quote_summary(ticker, &modules.join(",")).await? else {
            return Ok(Vec::new());
        };
        let rows = parse_statements(ticker, kind, &result);
        tracing::debug!(ticker, %kind, rows = rows.len(), "statements from quote provider");
        Ok(rows)
    }
}
