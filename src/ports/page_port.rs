//! Web page text retrieval port.

use async_trait::async_trait;

use crate::domain::error::DashboardError;

#[async_trait]
pub trait PageFetchPort {
    /// Readable text of the page at `url`, with markup removed.
    async fn fetch_text(&self, url: &str) -> Result<String, DashboardError>;
}
