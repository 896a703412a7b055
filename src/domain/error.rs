//! Domain error types.

/// Top-level error type for findash.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown statement type: {name}")]
    UnknownStatement { name: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("{service} client is not configured")]
    NotConfigured { service: String },

    #[error("{provider} request failed: {reason}")]
    Upstream { provider: String, reason: String },

    #[error("no data for {what}")]
    NoData { what: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    pub fn upstream(provider: &str, reason: impl ToString) -> Self {
        Self::Upstream {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<&DashboardError> for std::process::ExitCode {
    fn from(err: &DashboardError) -> Self {
        let code: u8 = match err {
            DashboardError::Io(_) => 1,
            DashboardError::ConfigParse { .. }
            | DashboardError::ConfigMissing { .. }
            | DashboardError::ConfigInvalid { .. }
            | DashboardError::NotConfigured { .. } => 2,
            DashboardError::Database { .. } | DashboardError::DatabaseQuery { .. } => 3,
            DashboardError::UnknownStatement { .. } | DashboardError::InvalidInput { .. } => 4,
            DashboardError::NoData { .. } | DashboardError::Upstream { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
