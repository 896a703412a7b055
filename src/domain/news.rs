//! News page summarisation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::domain::macro_series::SharedLlm;
use crate::ports::page_port::PageFetchPort;

pub type SharedFetcher = Arc<dyn PageFetchPort + Send + Sync>;

/// Pages with less readable text than this are treated as blocked.
pub const MIN_CONTENT_CHARS: usize = 200;
pub const MAX_INPUT_CHARS: usize = 15_000;
/// Content containers tried in order; the first with enough text wins.
pub const CONTENT_SELECTORS: [&str; 7] = [
    "article",
    "[role='main']",
    ".ArticleBody-articleBody",
    ".paywall-article",
    ".story-text",
    "main",
    "body",
];
pub const MIN_SELECTOR_CHARS: usize = 500;

pub const TOO_SHORT: &str = "⚠️ Content too short or blocked. Try a different source URL.";

pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn summary_prompt(topic: &str, text: &str) -> String {
    format!(
        "You are a professional financial analyst. The text below is scraped from a market news overview page. \
Scan the headlines, short summaries, and data points to identify the **top 3 most significant** market-moving stories or trends related to '{topic}'. \
Synthesize these findings into 3 concise, high-impact bullet points. \
Ignore navigation menus, ads, and generic site links. Content: \n---\n{text}"
    )
}

/// Summarises each URL in turn. The map holds a `timestamp` entry plus one
/// entry per URL; per-URL failures are reported as text.
pub async fn summarize_urls(
    fetcher: &SharedFetcher,
    llm: &SharedLlm,
    urls: &[String],
    topic: &str,
    now: NaiveDateTime,
) -> BTreeMap<String, String> {
    let mut results = BTreeMap::new();
    results.insert(
        "timestamp".to_string(),
        now.format("%Y-%m-%d %H:%M:%S").to_string(),
    );

    for (i, url) in urls.iter().enumerate() {
        tracing::info!(url = %url, "reading {}/{}", i + 1, urls.len());
        let text = match fetcher.fetch_text(url).await {
            Ok(text) => text,
            Err(e) => {
                results.insert(url.clone(), format!("Error processing URL: {e}"));
                continue;
            }
        };

        if text.trim().chars().count() < MIN_CONTENT_CHARS {
            results.insert(url.clone(), TOO_SHORT.to_string());
            continue;
        }

        let prompt = summary_prompt(topic, truncate_chars(&text, MAX_INPUT_CHARS));
        let entry = match llm.generate(None, &prompt).await {
            Ok(summary) => summary,
            Err(e) => format!("Error processing URL: {e}"),
        };
        results.insert(url.clone(), entry);
    }
    results
}
