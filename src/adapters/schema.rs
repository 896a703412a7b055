//! Table layout of the fundamentals store, shared by the SQL adapters and the
//! CSV importer.

use crate::domain::statement::{StatementKind, CASH_FLOW_FIELDS};
use chrono::{NaiveDate, NaiveDateTime};

const INCOME_COLUMNS: &[&str] = &[
    "sales",
    "amortization",
    "depreciation",
    "income_after_depreciation_and_amortization",
    "cost_of_goods",
    "gross_profit",
    "selling_general_and_administrative_expense",
    "non_operating_income",
    "interest_expense",
    "pretax_income",
    "income_taxes",
    "minority_interest",
    "investment_gains",
    "other_income",
    "income_from_continuing_operations",
    "extras_and_discontinued_operations",
    "net_income",
    "income_before_depreciation_and_amortization",
    "depreciation_and_amortization",
    "average_shares",
    "diluted_eps_before_non_recurring_items",
    "diluted_net_eps",
];

const ASSET_COLUMNS: &[&str] = &[
    "cash_and_equivalents",
    "receivables",
    "notes_receivable",
    "inventories",
    "other_current_assets",
    "total_current_assets",
    "net_property_and_equipment",
    "investments_and_advances",
    "other_non_current_assets",
    "deferred_charges",
    "intangibles",
    "deposits_and_other_assets",
    "total_assets",
];

const LIABILITY_COLUMNS: &[&str] = &[
    "notes_payable",
    "accounts_payable",
    "current_portion_long_term_debt",
    "current_portion_capital_leases",
    "accrued_expenses",
    "income_taxes_payable",
    "other_current_liabilities",
    "current_liabilities",
    "mortgages",
    "deferred_taxes_or_income",
    "convertible_debt",
    "long_term_debt",
    "non_current_capital_leases",
    "other_non_current_liabilities",
    "minority_interest",
    "total_liabilities",
];

const EQUITY_COLUMNS: &[&str] = &[
    "preferred_stock",
    "common_stock",
    "capital_surplus",
    "retained_earnings",
    "other_equity",
    "treasury_stock",
    "total_equity",
    "total_liabilities_and_equity",
    "shares_outstanding",
    "book_value_per_share",
];

pub fn line_item_columns(kind: StatementKind) -> &'static [&'static str] {
    match kind {
        StatementKind::Income => INCOME_COLUMNS,
        StatementKind::BalanceSheetAssets => ASSET_COLUMNS,
        StatementKind::BalanceSheetLiabilities => LIABILITY_COLUMNS,
        StatementKind::BalanceSheetEquity => EQUITY_COLUMNS,
        StatementKind::CashFlow => &CASH_FLOW_FIELDS,
    }
}

/// `CREATE TABLE` for one statement; `numeric` is the dialect's column type
/// for line items.
pub fn create_table_sql(kind: StatementKind, numeric: &str) -> String {
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    act_symbol TEXT NOT NULL,\n    date TEXT NOT NULL,\n    period TEXT NOT NULL",
        kind.table_name()
    );
    for column in line_item_columns(kind) {
        sql.push_str(&format!(",\n    {column} {numeric}"));
    }
    sql.push_str(",\n    PRIMARY KEY (act_symbol, date, period)\n)");
    sql
}

/// Dates arrive as `YYYY-MM-DD`, sometimes with a time part attached.
pub fn parse_store_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}
