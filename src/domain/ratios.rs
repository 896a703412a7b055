//! Derived financial ratios.
//!
//! Every ratio divides through [`safe_div`], so a zero or missing denominator
//! yields 0 rather than an infinity or NaN.

use crate::domain::format::{format_percent, format_ratio, period_label};
use crate::domain::statement::{filter_by_period, latest, PeriodType, StatementKind, StatementRow};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !numerator.is_finite() || !denominator.is_finite() {
        return 0.0;
    }
    numerator / denominator
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioKind {
    NetProfitMargin,
    GrossMargin,
    ReturnOnAssets,
    ReturnOnEquity,
    DebtToEquity,
    DebtRatio,
    EquityRatio,
    InterestCoverage,
    OperatingCashFlowRatio,
}

impl RatioKind {
    pub const ALL: [RatioKind; 9] = [
        RatioKind::NetProfitMargin,
        RatioKind::GrossMargin,
        RatioKind::ReturnOnAssets,
        RatioKind::ReturnOnEquity,
        RatioKind::DebtToEquity,
        RatioKind::DebtRatio,
        RatioKind::EquityRatio,
        RatioKind::InterestCoverage,
        RatioKind::OperatingCashFlowRatio,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::NetProfitMargin => "Net Profit Margin",
            Self::GrossMargin => "Gross Margin",
            Self::ReturnOnAssets => "ROA",
            Self::ReturnOnEquity => "ROE",
            Self::DebtToEquity => "Debt to Equity",
            Self::DebtRatio => "Debt Ratio",
            Self::EquityRatio => "Equity Ratio",
            Self::InterestCoverage => "Interest Coverage",
            Self::OperatingCashFlowRatio => "Operating Cash Flow Ratio",
        }
    }

    pub fn is_percent(self) -> bool {
        matches!(
            self,
            Self::NetProfitMargin
                | Self::GrossMargin
                | Self::ReturnOnAssets
                | Self::ReturnOnEquity
                | Self::DebtRatio
                | Self::EquityRatio
        )
    }

    pub fn format(self, value: Option<f64>) -> String {
        if self.is_percent() {
            format_percent(value, 1)
        } else {
            format_ratio(value)
        }
    }
}

/// Statement line items a ratio set is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatioInputs {
    pub net_income: f64,
    pub sales: f64,
    pub cost_of_goods: f64,
    pub pretax_income: f64,
    pub interest_expense: f64,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_equity: f64,
    pub current_liabilities: Option<f64>,
    pub operating_cash_flow: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioSet {
    pub net_profit_margin: f64,
    pub gross_margin: f64,
    pub roa: f64,
    pub roe: f64,
    pub debt_to_equity: f64,
    pub debt_ratio: f64,
    pub equity_ratio: f64,
    pub interest_coverage: f64,
    pub operating_cash_flow_ratio: Option<f64>,
}

impl RatioSet {
    pub fn compute(i: &RatioInputs) -> Self {
        let operating_cash_flow_ratio = match (i.operating_cash_flow, i.current_liabilities) {
            (Some(ocf), Some(cl)) => Some(safe_div(ocf, cl)),
            _ => None,
        };
        Self {
            net_profit_margin: safe_div(i.net_income, i.sales),
            gross_margin: safe_div(i.sales - i.cost_of_goods, i.sales),
            roa: safe_div(i.net_income, i.total_assets),
            roe: safe_div(i.net_income, i.total_equity),
            debt_to_equity: safe_div(i.total_liabilities, i.total_equity),
            debt_ratio: safe_div(i.total_liabilities, i.total_assets),
            equity_ratio: safe_div(i.total_equity, i.total_assets),
            interest_coverage: safe_div(i.pretax_income, i.interest_expense),
            operating_cash_flow_ratio,
        }
    }

    pub fn get(&self, kind: RatioKind) -> Option<f64> {
        match kind {
            RatioKind::NetProfitMargin => Some(self.net_profit_margin),
            RatioKind::GrossMargin => Some(self.gross_margin),
            RatioKind::ReturnOnAssets => Some(self.roa),
            RatioKind::ReturnOnEquity => Some(self.roe),
            RatioKind::DebtToEquity => Some(self.debt_to_equity),
            RatioKind::DebtRatio => Some(self.debt_ratio),
            RatioKind::EquityRatio => Some(self.equity_ratio),
            RatioKind::InterestCoverage => Some(self.interest_coverage),
            RatioKind::OperatingCashFlowRatio => self.operating_cash_flow_ratio,
        }
    }
}

/// All five statements for one symbol.
#[derive(Debug, Clone, Default)]
pub struct StatementBundle {
    pub income: Vec<StatementRow>,
    pub assets: Vec<StatementRow>,
    pub liabilities: Vec<StatementRow>,
    pub equity: Vec<StatementRow>,
    pub cash_flow: Vec<StatementRow>,
}

impl StatementBundle {
    pub fn get(&self, kind: StatementKind) -> &[StatementRow] {
        match kind {
            StatementKind::Income => &self.income,
            StatementKind::BalanceSheetAssets => &self.assets,
            StatementKind::BalanceSheetLiabilities => &self.liabilities,
            StatementKind::BalanceSheetEquity => &self.equity,
            StatementKind::CashFlow => &self.cash_flow,
        }
    }

    pub fn set(&mut self, kind: StatementKind, rows: Vec<StatementRow>) {
        match kind {
            StatementKind::Income => self.income = rows,
            StatementKind::BalanceSheetAssets => self.assets = rows,
            StatementKind::BalanceSheetLiabilities => self.liabilities = rows,
            StatementKind::BalanceSheetEquity => self.equity = rows,
            StatementKind::CashFlow => self.cash_flow = rows,
        }
    }

    /// Statements with no rows at all.
    pub fn missing(&self) -> Vec<StatementKind> {
        StatementKind::ALL
            .into_iter()
            .filter(|k| self.get(*k).is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatioTable {
    pub period: PeriodType,
    pub columns: Vec<String>,
    pub sets: Vec<RatioSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRatioCell {
    pub text: String,
    pub value: Option<f64>,
}

impl RenderedRatioCell {
    fn new(text: String, value: Option<f64>) -> Self {
        Self { text, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRatioRow {
    pub name: String,
    pub cells: Vec<RenderedRatioCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRatioTable {
    pub label: String,
    pub columns: Vec<String>,
    pub rows: Vec<RenderedRatioRow>,
}

fn by_date(rows: &[StatementRow], period: PeriodType) -> BTreeMap<NaiveDate, StatementRow> {
    filter_by_period(rows, period)
        .into_iter()
        .map(|r| (r.date, r))
        .collect()
}

fn value_or_zero(row: &StatementRow, name: &str) -> f64 {
    row.value(name).unwrap_or(0.0)
}

fn inputs_from(
    income: &StatementRow,
    assets: &StatementRow,
    liabilities: &StatementRow,
    equity: &StatementRow,
    cash_flow: Option<&StatementRow>,
) -> RatioInputs {
    let current_liabilities = if liabilities.has_item("current_liabilities") {
        Some(value_or_zero(liabilities, "current_liabilities"))
    } else {
        None
    };
    RatioInputs {
        net_income: value_or_zero(income, "net_income"),
        sales: value_or_zero(income, "sales"),
        cost_of_goods: value_or_zero(income, "cost_of_goods"),
        pretax_income: value_or_zero(income, "pretax_income"),
        interest_expense: value_or_zero(income, "interest_expense"),
        total_assets: value_or_zero(assets, "total_assets"),
        total_liabilities: value_or_zero(liabilities, "total_liabilities"),
        total_equity: value_or_zero(equity, "total_equity"),
        current_liabilities,
        operating_cash_flow: cash_flow
            .map(|cf| value_or_zero(cf, "net_cash_from_operating_activities")),
    }
}

/// Ratios per reporting period. Only dates present in all five statements
/// contribute; `None` when any statement is empty or no date lines up.
pub fn ratio_table(bundle: &StatementBundle, period: PeriodType) -> Option<RatioTable> {
    if !bundle.missing().is_empty() {
        return None;
    }

    let income = by_date(&bundle.income, period);
    let assets = by_date(&bundle.assets, period);
    let liabilities = by_date(&bundle.liabilities, period);
    let equity = by_date(&bundle.equity, period);
    let cash_flow = by_date(&bundle.cash_flow, period);

    let mut columns: Vec<String> = Vec::new();
    let mut sets = Vec::new();
    for (date, inc) in &income {
        let (Some(a), Some(l), Some(e), Some(cf)) = (
            assets.get(date),
            liabilities.get(date),
            equity.get(date),
            cash_flow.get(date),
        ) else {
            continue;
        };
        let label = period_label(*date, period);
        if columns.contains(&label) {
            continue;
        }
        columns.push(label);
        sets.push(RatioSet::compute(&inputs_from(inc, a, l, e, Some(cf))));
    }

    if sets.is_empty() {
        return None;
    }
    Some(RatioTable {
        period,
        columns,
        sets,
    })
}

/// Ratios from the most recent row of each statement; used when comparing
/// companies whose fiscal dates do not line up. Cash flow is optional; when
/// it is present, missing current liabilities read as 0 like every other
/// line item here.
pub fn latest_ratios(bundle: &StatementBundle, period: PeriodType) -> Option<RatioSet> {
    let income = latest(&bundle.income, period)?;
    let assets = latest(&bundle.assets, period)?;
    let liabilities = latest(&bundle.liabilities, period)?;
    let equity = latest(&bundle.equity, period)?;
    let cash_flow = latest(&bundle.cash_flow, period);
    let mut inputs = inputs_from(income, assets, liabilities, equity, cash_flow);
    if cash_flow.is_some() {
        inputs.current_liabilities.get_or_insert(0.0);
    }
    Some(RatioSet::compute(&inputs))
}

impl RatioTable {
    pub fn render(&self) -> RenderedRatioTable {
        let rows = RatioKind::ALL
            .into_iter()
            .map(|kind| RenderedRatioRow {
                name: kind.label().to_string(),
                cells: self
                    .sets
                    .iter()
                    .map(|set| RenderedRatioCell::new(kind.format(set.get(kind)), set.get(kind)))
                    .collect(),
            })
            .collect();
        RenderedRatioTable {
            label: format!("Key Financial Ratios ({})", self.period),
            columns: self.columns.clone(),
            rows,
        }
    }
}
