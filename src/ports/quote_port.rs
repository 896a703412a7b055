//! Quote provider port.

use async_trait::async_trait;

use crate::domain::error::DashboardError;
use crate::domain::quote::{CompanyOverview, HistoryInterval, HistoryRange, PriceBar};
use crate::domain::statement::{StatementKind, StatementRow};

#[async_trait]
pub trait QuotePort {
    /// `None` when the provider does not know the ticker.
    async fn overview(&self, ticker: &str) -> Result<Option<CompanyOverview>, DashboardError>;

    async fn history(
        &self,
        ticker: &str,
        range: &HistoryRange,
        interval: &HistoryInterval,
    ) -> Result<Vec<PriceBar>, DashboardError>;

    /// Statement rows in the store's shape; balance sheet kinds all map to
    /// the provider's single balance sheet.
    async fn financials(
        &self,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>, DashboardError>;
}
