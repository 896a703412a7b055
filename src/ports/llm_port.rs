//! Hosted language model port.

use async_trait::async_trait;

use crate::domain::error::DashboardError;

#[async_trait]
pub trait LanguageModelPort {
    async fn generate(
        &self,
        system_instruction: Option<&str>,
        prompt: &str,
    ) -> Result<String, DashboardError>;
}
