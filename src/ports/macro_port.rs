//! Macroeconomic series port.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::error::DashboardError;

#[async_trait]
pub trait MacroPort {
    /// Observations from `start` onward, oldest first. Missing observations
    /// are skipped.
    async fn observations(
        &self,
        series_id: &str,
        start: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, DashboardError>;

    async fn latest_value(&self, series_id: &str) -> Result<Option<f64>, DashboardError>;

    /// Human-readable release frequency, e.g. `Monthly`.
    async fn frequency(&self, series_id: &str) -> Result<String, DashboardError>;
}
