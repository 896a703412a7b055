//! Financial statement rows, kinds and reporting periods.

use crate::domain::error::DashboardError;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Columns that identify a row rather than carry a line item.
pub const METADATA_COLUMNS: [&str; 4] = ["act_symbol", "date", "period", "cik"];

/// Cash flow line items in the order the fundamentals store publishes them.
pub const CASH_FLOW_FIELDS: [&str; 22] = [
    "net_income",
    "depreciation_amortization_and_depletion",
    "net_change_from_assets",
    "net_cash_from_discontinued_operations",
    "other_operating_activities",
    "net_cash_from_operating_activities",
    "property_and_equipment",
    "acquisition_of_subsidiaries",
    "investments",
    "other_investing_activities",
    "net_cash_from_investing_activities",
    "issuance_of_capital_stock",
    "issuance_of_debt",
    "increase_short_term_debt",
    "payment_of_dividends_and_other_distributions",
    "other_financing_activities",
    "net_cash_from_financing_activities",
    "effect_of_exchange_rate_changes",
    "net_change_in_cash_and_equivalents",
    "cash_at_beginning_of_period",
    "cash_at_end_of_period",
    "diluted_net_eps",
];

pub fn is_metadata(column: &str) -> bool {
    METADATA_COLUMNS.contains(&column)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Income,
    BalanceSheetAssets,
    BalanceSheetLiabilities,
    BalanceSheetEquity,
    CashFlow,
}

impl StatementKind {
    pub const ALL: [StatementKind; 5] = [
        StatementKind::Income,
        StatementKind::BalanceSheetAssets,
        StatementKind::BalanceSheetLiabilities,
        StatementKind::BalanceSheetEquity,
        StatementKind::CashFlow,
    ];

    /// Parses the name used in request paths. `balance_sheet` is accepted as
    /// an alias for the assets side.
    pub fn from_path(name: &str) -> Result<Self, DashboardError> {
        match name.trim().to_lowercase().as_str() {
            "income" | "income_statement" => Ok(Self::Income),
            "balance_sheet" | "balance_sheet_assets" | "assets" => Ok(Self::BalanceSheetAssets),
            "balance_sheet_liabilities" | "liabilities" => Ok(Self::BalanceSheetLiabilities),
            "balance_sheet_equity" | "equity" => Ok(Self::BalanceSheetEquity),
            "cash_flow" | "cash_flow_statement" | "cashflow" => Ok(Self::CashFlow),
            _ => Err(DashboardError::UnknownStatement {
                name: name.to_string(),
            }),
        }
    }

    pub fn path_name(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::BalanceSheetAssets => "balance_sheet_assets",
            Self::BalanceSheetLiabilities => "balance_sheet_liabilities",
            Self::BalanceSheetEquity => "balance_sheet_equity",
            Self::CashFlow => "cash_flow",
        }
    }

    /// Table holding this statement in the fundamentals store.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Income => "income_statement",
            Self::BalanceSheetAssets => "balance_sheet_assets",
            Self::BalanceSheetLiabilities => "balance_sheet_liabilities",
            Self::BalanceSheetEquity => "balance_sheet_equity",
            Self::CashFlow => "cash_flow_statement",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Income => "Income Statement",
            Self::BalanceSheetAssets => "Assets",
            Self::BalanceSheetLiabilities => "Liabilities",
            Self::BalanceSheetEquity => "Equity",
            Self::CashFlow => "Cash Flow",
        }
    }

    pub fn is_balance_sheet(self) -> bool {
        matches!(
            self,
            Self::BalanceSheetAssets | Self::BalanceSheetLiabilities | Self::BalanceSheetEquity
        )
    }

    /// Fixed display order, if the statement has one.
    pub fn field_order(self) -> Option<&'static [&'static str]> {
        match self {
            Self::CashFlow => Some(&CASH_FLOW_FIELDS),
            _ => None,
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PeriodType {
    #[default]
    Annual,
    Quarterly,
}

impl PeriodType {
    /// Label used in the store's `period` column, compared case-insensitively.
    pub fn store_label(self) -> &'static str {
        match self {
            Self::Annual => "YEAR",
            Self::Quarterly => "QUARTER",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Annual => "Annual",
            Self::Quarterly => "Quarterly",
        }
    }

    pub fn matches(self, raw: &str) -> bool {
        raw.trim().to_uppercase() == self.store_label()
    }
}

impl FromStr for PeriodType {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "annual" | "year" | "yearly" | "a" => Ok(Self::Annual),
            "quarterly" | "quarter" | "q" => Ok(Self::Quarterly),
            other => Err(DashboardError::invalid(format!(
                "unknown period '{other}', expected annual or quarterly"
            ))),
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Where a set of statement rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSource {
    #[default]
    Store,
    QuoteProvider,
}

impl DataSource {
    pub fn name(self) -> &'static str {
        match self {
            Self::Store => "dolthub",
            Self::QuoteProvider => "yahoo",
        }
    }
}

impl FromStr for DataSource {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dolthub" | "store" | "db" => Ok(Self::Store),
            "yahoo" | "yfinance" | "quote" => Ok(Self::QuoteProvider),
            other => Err(DashboardError::invalid(format!("unknown source '{other}'"))),
        }
    }
}

/// One reported statement for one symbol on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub period: Option<String>,
    pub items: Vec<(String, Option<f64>)>,
}

impl StatementRow {
    pub fn new(symbol: &str, date: NaiveDate, period: Option<&str>) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            date,
            period: period.map(str::to_string),
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, name: &str, value: Option<f64>) -> Self {
        self.push_item(name, value);
        self
    }

    /// Adds or replaces a line item, ignoring metadata column names.
    pub fn push_item(&mut self, name: &str, value: Option<f64>) {
        if is_metadata(name) {
            return;
        }
        match self.items.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value,
            None => self.items.push((name.to_string(), value)),
        }
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.items
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| *v)
            .filter(|v| v.is_finite())
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.items.iter().any(|(n, _)| n == name)
    }

    pub fn matches_period(&self, period: PeriodType) -> bool {
        self.period.as_deref().is_none_or(|p| period.matches(p))
    }

    /// JSON record with the store's column names.
    pub fn to_record(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "date".to_string(),
            Value::String(self.date.format("%Y-%m-%d").to_string()),
        );
        map.insert("act_symbol".to_string(), Value::String(self.symbol.clone()));
        if let Some(period) = &self.period {
            map.insert("period".to_string(), Value::String(period.clone()));
        }
        for (name, value) in &self.items {
            let json = value
                .filter(|v| v.is_finite())
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null);
            map.insert(name.clone(), json);
        }
        Value::Object(map)
    }
}

/// Rows matching `period`; rows without a period label are kept.
pub fn filter_by_period(rows: &[StatementRow], period: PeriodType) -> Vec<StatementRow> {
    rows.iter()
        .filter(|r| r.matches_period(period))
        .cloned()
        .collect()
}

/// Most recent row for `period`.
pub fn latest(rows: &[StatementRow], period: PeriodType) -> Option<&StatementRow> {
    rows.iter()
        .filter(|r| r.matches_period(period))
        .max_by_key(|r| r.date)
}
