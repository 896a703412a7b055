//! Fundamentals store port.

use crate::domain::error::DashboardError;
use crate::domain::statement::{StatementKind, StatementRow};

/// Read access to the relational store of financial statements.
///
/// Implementations are blocking; async callers go through
/// `tokio::task::spawn_blocking`.
pub trait FundamentalsPort {
    /// All rows of one statement for `symbol`, newest first. An unknown
    /// symbol yields an empty vector, not an error.
    fn fetch_statement(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>, DashboardError>;

    fn list_symbols(&self) -> Result<Vec<String>, DashboardError>;
}
