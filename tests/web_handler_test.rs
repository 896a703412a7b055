#![cfg(feature = "web")]
//! Web handler integration tests.
//!
//! Tests cover:
//! - 404 when the underlying fetch yields no data, 200 with JSON otherwise
//! - 400 on malformed query parameters
//! - 500 when an optional client is not configured
//! - Store-first financials with quote-provider fallback

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::*;
use findash::adapters::web::{AppState, build_router};
use findash::domain::macro_series::{SharedLlm, SharedMacro};
use findash::domain::statement::StatementKind;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn base_state() -> AppState {
    AppState {
        store: Some(Arc::new(MockFundamentalsPort::new().with_company("AAPL"))),
        quotes: Arc::new(
            MockQuotePort::new()
                .with_overview("AAPL", "Apple Inc.", 189.5)
                .with_bars("AAPL", &[("2024-01-02", 185.0), ("2024-01-03", 184.2)])
                .with_statement(
                    "NVDA",
                    StatementKind::Income,
                    vec![make_row("NVDA", "2024-01-28", "Year", &[("sales", 60.9e9)])],
                ),
        ),
        macro_port: None,
        llm: None,
        fetcher: Arc::new(MockFetcher::new()),
    }
}

fn app(state: AppState) -> Router {
    build_router(state, &["http://localhost:3000".to_string()])
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

mod root {
    use super::*;

    #[tokio::test]
    async fn reports_running() {
        let (status, body) = get(app(base_state()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Finance Dashboard API is running");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, body) = get(app(base_state()), "/api/nothing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].is_string());
    }
}

mod stock {
    use super::*;

    #[tokio::test]
    async fn overview_found() {
        let (status, body) = get(app(base_state()), "/api/stock/AAPL/overview").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Apple Inc.");
        assert_eq!(body["ticker"], "AAPL");
        assert_eq!(body["currency"], "USD");
    }

    #[tokio::test]
    async fn overview_unknown_ticker_is_404() {
        let (status, body) = get(app(base_state()), "/api/stock/ZZZZ/overview").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Stock not found or error fetching data");
    }

    #[tokio::test]
    async fn overview_provider_error_is_404() {
        let mut state = base_state();
        state.quotes = Arc::new(MockQuotePort::failing());
        let (status, _) = get(app(state), "/api/stock/AAPL/overview").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn history_returns_bars() {
        let (status, body) =
            get(app(base_state()), "/api/stock/AAPL/history?period=1mo&interval=1d").await;
        assert_eq!(status, StatusCode::OK);
        let bars = body.as_array().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0]["date"], "2024-01-02");
        assert_eq!(bars[0]["close"], 185.0);
    }

    #[tokio::test]
    async fn history_without_data_is_empty_array() {
        let (status, body) = get(app(base_state()), "/api/stock/ZZZZ/history").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn history_rejects_unknown_period() {
        let (status, body) = get(app(base_state()), "/api/stock/AAPL/history?period=7y").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("7y"));
    }

    #[tokio::test]
    async fn financials_from_store() {
        let (status, body) = get(app(base_state()), "/api/stock/aapl/financials/income").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["date"], "2023-12-31");
        assert_eq!(rows[0]["act_symbol"], "AAPL");
        assert!(rows[0]["sales"].is_number());
    }

    #[tokio::test]
    async fn financials_fall_back_to_quote_provider() {
        let (status, body) = get(app(base_state()), "/api/stock/NVDA/financials/income").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["sales"], 60.9e9);
    }

    #[tokio::test]
    async fn financials_missing_everywhere_is_404() {
        let (status, _) = get(app(base_state()), "/api/stock/ZZZZ/financials/cash_flow").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn financials_unknown_statement_is_404() {
        let (status, body) = get(app(base_state()), "/api/stock/AAPL/financials/balance").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "unknown statement type: balance");
    }

    #[tokio::test]
    async fn financials_yahoo_source_skips_store() {
        let (status, _) =
            get(app(base_state()), "/api/stock/AAPL/financials/income?source=yahoo").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn statement_table_renders() {
        let (status, body) =
            get(app(base_state()), "/api/stock/AAPL/table/income?period=annual").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["columns"], json!(["2022", "2023"]));
        assert_eq!(body["suffix"], "B");
    }

    #[tokio::test]
    async fn statement_table_yoy() {
        let (status, body) = get(app(base_state()), "/api/stock/AAPL/table/income?yoy=true").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["columns"], json!(["2023"]));
    }

    #[tokio::test]
    async fn statement_table_wrong_period_is_404() {
        let (status, _) =
            get(app(base_state()), "/api/stock/AAPL/table/income?period=quarterly").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ratios_render() {
        let (status, body) = get(app(base_state()), "/api/stock/AAPL/ratios").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rows"][0]["name"], "Net Profit Margin");
        assert_eq!(body["rows"][0]["cells"][1]["text"], "20.0%");
    }

    #[tokio::test]
    async fn ratios_for_provider_only_ticker_use_real_line_items() {
        let mut state = base_state();
        state.quotes = Arc::new(MockQuotePort::new().with_company("MSFT"));
        let (status, body) = get(app(state), "/api/stock/MSFT/ratios").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["rows"].as_array().unwrap();
        let cell = |name: &str| {
            rows.iter().find(|r| r["name"] == name).unwrap()["cells"][1]["text"].clone()
        };
        assert_eq!(cell("Net Profit Margin"), "20.0%");
        assert_eq!(cell("Gross Margin"), "40.0%");
        assert_eq!(cell("Debt to Equity"), "1.50");
        assert_eq!(cell("Interest Coverage"), "5.00");
        assert_eq!(cell("Operating Cash Flow Ratio"), "0.75");
    }

    #[tokio::test]
    async fn ratio_comparison_mixes_store_and_provider_tickers() {
        let mut state = base_state();
        state.quotes = Arc::new(MockQuotePort::new().with_company("MSFT"));
        let (status, body) = get(app(state), "/api/compare?tickers=AAPL,MSFT").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickers"], json!(["AAPL", "MSFT"]));
        assert_eq!(body["rows"][0]["cells"], json!(["20.0%", "20.0%"]));
        assert_eq!(body["rows"][0]["best"], json!([0, 1]));
    }

    #[tokio::test]
    async fn ratios_missing_statements_is_404() {
        let (status, body) = get(app(base_state()), "/api/stock/NVDA/ratios").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().starts_with("Missing statements"));
    }
}

mod compare {
    use super::*;

    #[tokio::test]
    async fn ratio_comparison() {
        let (status, body) = get(app(base_state()), "/api/compare?tickers=AAPL,ZZZZ").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickers"], json!(["AAPL"]));
    }

    #[tokio::test]
    async fn statement_comparison_uses_fallback() {
        let (status, body) =
            get(app(base_state()), "/api/compare?tickers=AAPL,NVDA&statement=income").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickers"], json!(["AAPL", "NVDA"]));
    }

    #[tokio::test]
    async fn empty_ticker_list_is_400() {
        let (status, _) = get(app(base_state()), "/api/compare?tickers=,").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn performance_is_relative_to_first_close() {
        let (status, body) =
            get(app(base_state()), "/api/compare/performance?tickers=AAPL,ZZZZ&period=5d").await;
        assert_eq!(status, StatusCode::OK);
        let points = body["AAPL"].as_array().unwrap();
        assert_eq!(points[0]["date"], "2024-01-02");
        assert_eq!(points[0]["change_pct"], 0.0);
        assert!(points[1]["change_pct"].as_f64().unwrap() < 0.0);
        assert!(body.get("ZZZZ").is_none());
    }

    #[tokio::test]
    async fn no_data_is_404() {
        let (status, _) = get(app(base_state()), "/api/compare?tickers=ZZZZ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod macro_routes {
    use super::*;

    fn with_macro(llm: Option<SharedLlm>) -> AppState {
        let port: SharedMacro = Arc::new(MockMacroPort::new().with_series(
            "UNRATE",
            "Monthly",
            &[("2099-01-01", 3.9)],
        ));
        AppState {
            macro_port: Some(port),
            llm,
            ..base_state()
        }
    }

    #[tokio::test]
    async fn data_returns_records() {
        let (status, body) = post(
            app(with_macro(None)),
            "/api/macro/data",
            json!({"series_id": "UNRATE", "label": "Unemployment"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"Date": "2099-01-01", "Value": 3.9, "Series": "Unemployment"}])
        );
    }

    #[tokio::test]
    async fn data_with_years_beyond_calendar_is_400() {
        let (status, body) = post(
            app(with_macro(None)),
            "/api/macro/data",
            json!({"series_id": "UNRATE", "label": "Unemployment", "years": 300000}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("300000"));
    }

    #[tokio::test]
    async fn unknown_series_is_404() {
        let (status, body) = post(
            app(with_macro(None)),
            "/api/macro/data",
            json!({"series_id": "NOPE", "label": "Nope", "years": 5}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Data not found or error fetching data");
    }

    #[tokio::test]
    async fn data_without_client_is_500() {
        let (status, _) = post(
            app(base_state()),
            "/api/macro/data",
            json!({"series_id": "UNRATE", "label": "Unemployment"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn synthesize_returns_conclusion() {
        let llm: SharedLlm = Arc::new(MockLlm::replying("Outlook: steady."));
        let (status, body) = post(
            app(with_macro(Some(llm))),
            "/api/macro/synthesize",
            json!({
                "grouped_indicators": {"Lagging": [["Unemployment Rate", "UNRATE", "%"]]},
                "analysis_focus": "recession risk"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["conclusion"], "Outlook: steady.");
    }

    #[tokio::test]
    async fn synthesize_prompt_follows_request_group_order() {
        let llm = Arc::new(MockLlm::replying("Outlook: mixed."));
        let port: SharedMacro = Arc::new(
            MockMacroPort::new()
                .with_series("ICSA", "Weekly", &[("2024-01-06", 202_000.0)])
                .with_series("FEDFUNDS", "Monthly", &[("2024-01-01", 5.33)])
                .with_series("UNRATE", "Monthly", &[("2024-01-01", 3.7)]),
        );
        let state = AppState {
            macro_port: Some(port),
            llm: Some(llm.clone()),
            ..base_state()
        };
        let (status, _) = post(
            app(state),
            "/api/macro/synthesize",
            json!({
                "grouped_indicators": {
                    "Leading": [["Initial Claims", "ICSA", "persons"]],
                    "Monetary": [["Fed Funds", "FEDFUNDS", "%"]],
                    "Lagging": [["Unemployment Rate", "UNRATE", "%"]]
                },
                "analysis_focus": "soft landing"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let prompts = llm.prompts();
        let query = &prompts[0].1;
        let leading = query.find("--- Leading ---").unwrap();
        let monetary = query.find("--- Monetary ---").unwrap();
        let lagging = query.find("--- Lagging ---").unwrap();
        assert!(leading < monetary && monetary < lagging);
    }

    #[tokio::test]
    async fn synthesize_without_llm_reports_in_body() {
        let (status, body) = post(
            app(with_macro(None)),
            "/api/macro/synthesize",
            json!({"grouped_indicators": {}, "analysis_focus": "growth"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["conclusion"].as_str().unwrap().starts_with("Synthesis failed"));
    }
}

mod news {
    use super::*;

    #[tokio::test]
    async fn without_llm_is_500() {
        let (status, body) = post(
            app(base_state()),
            "/api/news",
            json!({"urls": ["https://news.example/a"], "topic": "chips"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Gemini client not initialized");
    }

    #[tokio::test]
    async fn summaries_keyed_by_url() {
        let article = "Memory prices climbed for a third straight month. ".repeat(8);
        let state = AppState {
            llm: Some(Arc::new(MockLlm::replying("- Memory up"))),
            fetcher: Arc::new(MockFetcher::new().with_page("https://news.example/a", &article)),
            ..base_state()
        };
        let (status, body) = post(
            app(state),
            "/api/news",
            json!({"urls": ["https://news.example/a"], "topic": "memory"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["https://news.example/a"], "- Memory up");
        assert!(body["timestamp"].is_string());
    }
}
