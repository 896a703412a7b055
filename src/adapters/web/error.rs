//! HTTP error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::DashboardError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::NoData { .. } | DashboardError::UnknownStatement { .. } => {
            StatusCode::NOT_FOUND
        }
        DashboardError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        DashboardError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        DashboardError::ConfigParse { .. }
        | DashboardError::ConfigMissing { .. }
        | DashboardError::ConfigInvalid { .. }
        | DashboardError::NotConfigured { .. }
        | DashboardError::Database { .. }
        | DashboardError::DatabaseQuery { .. }
        | DashboardError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DashboardError> for WebError {
    fn from(err: DashboardError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}
