//! Source selection with fallback from the fundamentals store to the quote
//! provider.

use std::sync::Arc;

use crate::domain::error::DashboardError;
use crate::domain::ratios::StatementBundle;
use crate::domain::statement::{DataSource, StatementKind, StatementRow};
use crate::ports::fundamentals_port::FundamentalsPort;
use crate::ports::quote_port::QuotePort;

pub type SharedStore = Arc<dyn FundamentalsPort + Send + Sync>;
pub type SharedQuotes = Arc<dyn QuotePort + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct Sourced {
    pub source: DataSource,
    pub rows: Vec<StatementRow>,
}

/// Runs a blocking store query off the async executor.
pub async fn fetch_from_store(
    store: &SharedStore,
    symbol: &str,
    kind: StatementKind,
) -> Result<Vec<StatementRow>, DashboardError> {
    let store = Arc::clone(store);
    let symbol = symbol.to_uppercase();
    tokio::task::spawn_blocking(move || store.fetch_statement(&symbol, kind))
        .await
        .map_err(|e| DashboardError::Database {
            reason: format!("store task failed: {e}"),
        })?
}

/// Loads one statement. With the store preferred, the quote provider is only
/// consulted when the store has no rows or fails; a store failure is logged
/// and treated as empty.
pub async fn load_statement(
    store: Option<&SharedStore>,
    quotes: &SharedQuotes,
    ticker: &str,
    kind: StatementKind,
    preferred: DataSource,
) -> Result<Sourced, DashboardError> {
    if preferred == DataSource::Store {
        match store {
            Some(store) => match fetch_from_store(store, ticker, kind).await {
                Ok(rows) if !rows.is_empty() => {
                    tracing::debug!(ticker, %kind, rows = rows.len(), "statement served from store");
                    return Ok(Sourced {
                        source: DataSource::Store,
                        rows,
                    });
                }
                Ok(_) => {
                    tracing::info!(ticker, %kind, "store has no rows, falling back to quote provider");
                }
                Err(e) => {
                    tracing::warn!(ticker, %kind, error = %e, "store query failed, falling back to quote provider");
                }
            },
            None => {
                tracing::debug!(ticker, %kind, "no store configured, using quote provider");
            }
        }
    }

    let rows = quotes.financials(ticker, kind).await?;
    Ok(Sourced {
        source: DataSource::QuoteProvider,
        rows,
    })
}

/// All five statements from the store. Failed statements are logged and left
/// empty so the caller can report which ones are missing.
pub async fn load_bundle(store: &SharedStore, ticker: &str) -> StatementBundle {
    let mut bundle = StatementBundle::default();
    for kind in StatementKind::ALL {
        match fetch_from_store(store, ticker, kind).await {
            Ok(rows) => bundle.set(kind, rows),
            Err(e) => tracing::warn!(ticker, %kind, error = %e, "failed to load statement"),
        }
    }
    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::{CompanyOverview, HistoryInterval, HistoryRange, PriceBar};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedStore {
        rows: Vec<StatementRow>,
        fail: bool,
    }

    impl FundamentalsPort for FixedStore {
        fn fetch_statement(
            &self,
            _symbol: &str,
            _kind: StatementKind,
        ) -> Result<Vec<StatementRow>, DashboardError> {
            if self.fail {
                return Err(DashboardError::Database {
                    reason: "connection refused".into(),
                });
            }
            Ok(self.rows.clone())
        }

        fn list_symbols(&self) -> Result<Vec<String>, DashboardError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct CountingQuotes {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuotePort for CountingQuotes {
        async fn overview(&self, _t: &str) -> Result<Option<CompanyOverview>, DashboardError> {
            Ok(None)
        }

        async fn history(
            &self,
            _t: &str,
            _r: &HistoryRange,
            _i: &HistoryInterval,
        ) -> Result<Vec<PriceBar>, DashboardError> {
            Ok(vec![])
        }

        async fn financials(
            &self,
            ticker: &str,
            _kind: StatementKind,
        ) -> Result<Vec<StatementRow>, DashboardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![StatementRow::new(
                ticker,
                NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
                None,
            )])
        }
    }

    fn store(rows: Vec<StatementRow>, fail: bool) -> SharedStore {
        Arc::new(FixedStore { rows, fail })
    }

    fn one_row() -> Vec<StatementRow> {
        vec![StatementRow::new(
            "IBM",
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            Some("Year"),
        )]
    }

    #[tokio::test]
    async fn store_rows_skip_fallback() {
        let quotes = Arc::new(CountingQuotes::default());
        let shared: SharedQuotes = quotes.clone();
        let result = load_statement(
            Some(&store(one_row(), false)),
            &shared,
            "IBM",
            StatementKind::Income,
            DataSource::Store,
        )
        .await
        .unwrap();
        assert_eq!(result.source, DataSource::Store);
        assert_eq!(quotes.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_store_falls_back() {
        let quotes = Arc::new(CountingQuotes::default());
        let shared: SharedQuotes = quotes.clone();
        let result = load_statement(
            Some(&store(vec![], false)),
            &shared,
            "IBM",
            StatementKind::Income,
            DataSource::Store,
        )
        .await
        .unwrap();
        assert_eq!(result.source, DataSource::QuoteProvider);
        assert_eq!(quotes.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_store_falls_back() {
        let quotes = Arc::new(CountingQuotes::default());
        let shared: SharedQuotes = quotes.clone();
        let result = load_statement(
            Some(&store(one_row(), true)),
            &shared,
            "IBM",
            StatementKind::CashFlow,
            DataSource::Store,
        )
        .await
        .unwrap();
        assert_eq!(result.source, DataSource::QuoteProvider);
    }

    #[tokio::test]
    async fn quote_provider_requested_directly() {
        let quotes = Arc::new(CountingQuotes::default());
        let shared: SharedQuotes = quotes.clone();
        let result = load_statement(
            Some(&store(one_row(), false)),
            &shared,
            "IBM",
            StatementKind::Income,
            DataSource::QuoteProvider,
        )
        .await
        .unwrap();
        assert_eq!(result.source, DataSource::QuoteProvider);
        assert_eq!(quotes.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bundle_loads_every_statement() {
        let bundle = load_bundle(&store(one_row(), false), "IBM").await;
        assert!(bundle.missing().is_empty());
        let bundle = load_bundle(&store(one_row(), true), "IBM").await;
        assert_eq!(bundle.missing().len(), 5);
    }
}
