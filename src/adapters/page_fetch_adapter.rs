//! Plain HTTP page fetcher with HTML-to-text extraction.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::adapters::http::BROWSER_USER_AGENT;
use crate::domain::error::DashboardError;
use crate::domain::news::{CONTENT_SELECTORS, MIN_SELECTOR_CHARS};
use crate::ports::page_port::PageFetchPort;

const PROVIDER: &str = "page";
const SKIPPED_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "svg"];

pub struct PageFetchAdapter {
    client: Client,
}

impl PageFetchAdapter {
    pub fn new(timeout: Duration) -> Result<Self, DashboardError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
        headers.insert(
            "upgrade-insecure-requests",
            HeaderValue::from_static("1"),
        );

        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::upstream(PROVIDER, e))?;
        Ok(Self { client })
    }
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIPPED_TAGS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

/// Text of the first content container with more than
/// [`MIN_SELECTOR_CHARS`] characters, falling back to the whole body.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    for css in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = visible_text(element);
            if text.chars().count() > MIN_SELECTOR_CHARS {
                return text;
            }
        }
    }
    visible_text(document.root_element())
}

#[async_trait]
impl PageFetchPort for PageFetchAdapter {
    async fn fetch_text(&self, url: &str) -> Result<String, DashboardError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DashboardError::upstream(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::upstream(PROVIDER, format!("HTTP {status} for {url}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| DashboardError::upstream(PROVIDER, e))?;
        let text = extract_text(&html);
        tracing::debug!(url, chars = text.chars().count(), "extracted page text");
        Ok(text)
    }
}
