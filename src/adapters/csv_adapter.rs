//! Fundamentals store over a directory of CSV exports, one `{table}.csv` per
//! statement.

use crate::adapters::schema::parse_store_date;
use crate::domain::error::DashboardError;
use crate::domain::format::parse_number;
use crate::domain::statement::{StatementKind, StatementRow};
use crate::ports::fundamentals_port::FundamentalsPort;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, kind: StatementKind) -> PathBuf {
        self.base_path.join(format!("{}.csv", kind.table_name()))
    }
}

/// Parses one exported table. Columns are matched by header name; rows
/// without a symbol or a readable date are skipped.
pub fn read_statement_file(path: &Path) -> Result<Vec<StatementRow>, DashboardError> {
    let content = fs::read_to_string(path).map_err(|e| DashboardError::Database {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| DashboardError::Database {
            reason: format!("CSV parse error: {}", e),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let symbol_idx = headers.iter().position(|h| h == "act_symbol");
    let date_idx = headers.iter().position(|h| h == "date");
    let (Some(symbol_idx), Some(date_idx)) = (symbol_idx, date_idx) else {
        return Err(DashboardError::Database {
            reason: format!("{}: missing act_symbol or date column", path.display()),
        });
    };
    let period_idx = headers.iter().position(|h| h == "period");

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| DashboardError::Database {
            reason: format!("CSV parse error: {}", e),
        })?;

        let symbol = record.get(symbol_idx).unwrap_or("").trim();
        let date = record.get(date_idx).and_then(parse_store_date);
        let Some(date) = date.filter(|_| !symbol.is_empty()) else {
            tracing::warn!(file = %path.display(), line = line + 2, "skipping incomplete row");
            continue;
        };

        let period = period_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|p| !p.is_empty());
        let mut row = StatementRow::new(symbol, date, period);
        for (i, name) in headers.iter().enumerate() {
            if i == symbol_idx || i == date_idx || Some(i) == period_idx {
                continue;
            }
            row.push_item(name, record.get(i).and_then(parse_number));
        }
        rows.push(row);
    }

    Ok(rows)
}

impl FundamentalsPort for CsvAdapter {
    fn fetch_statement(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>, DashboardError> {
        let path = self.csv_path(kind);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let symbol = symbol.to_uppercase();
        let mut rows: Vec<StatementRow> = read_statement_file(&path)?
            .into_iter()
            .filter(|r| r.symbol == symbol)
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }

    fn list_symbols(&self) -> Result<Vec<String>, DashboardError> {
        let path = self.csv_path(StatementKind::Income);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let symbols: BTreeSet<String> = read_statement_file(&path)?
            .into_iter()
            .map(|r| r.symbol)
            .collect();
        Ok(symbols.into_iter().collect())
    }
}
