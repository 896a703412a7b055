//! JSON HTTP API over axum.
//!
//! Every route reads from the shared [`AppState`]; optional clients are
//! `None` when their API key is not configured, and the affected routes
//! answer 500 instead of failing at startup.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domain::macro_series::{SharedLlm, SharedMacro};
use crate::domain::news::SharedFetcher;
use crate::domain::provider::{SharedQuotes, SharedStore};

pub struct AppState {
    pub store: Option<SharedStore>,
    pub quotes: SharedQuotes,
    pub macro_port: Option<SharedMacro>,
    pub llm: Option<SharedLlm>,
    pub fetcher: SharedFetcher,
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/stock/{ticker}/overview", get(handlers::stock_overview))
        .route("/api/stock/{ticker}/history", get(handlers::stock_history))
        .route(
            "/api/stock/{ticker}/financials/{statement_type}",
            get(handlers::stock_financials),
        )
        .route(
            "/api/stock/{ticker}/table/{statement_type}",
            get(handlers::statement_table),
        )
        .route("/api/stock/{ticker}/ratios", get(handlers::stock_ratios))
        .route("/api/compare", get(handlers::compare))
        .route("/api/compare/performance", get(handlers::compare_performance))
        .route("/api/macro/data", post(handlers::macro_data))
        .route("/api/macro/synthesize", post(handlers::macro_synthesize))
        .route("/api/news", post(handlers::news_summary))
        .fallback(handlers::not_found)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
