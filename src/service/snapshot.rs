//! Snapshot acquisition.
//!
//! The orchestrator only depends on the `SnapshotProvider` trait;
//! `SnapshotFetcher` is the bundled HTTP implementation. Richer
//! providers (headless browser, screenshotting) plug in behind the
//! same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use rquest::Client;
use scraper::Html;

use crate::domain::models::{DiscoveredLink, PageSnapshot};
use crate::error::{AppError, Result};
use crate::extractor::PageExtractor;
use crate::service::http::{create_client, ClientType};

/// Produces the immutable snapshot every validator reads.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn acquire(&self, url: &str) -> Result<PageSnapshot>;

    fn name(&self) -> &'static str;
}

/// Direct HTTP snapshot provider using the browser-emulating client.
pub struct SnapshotFetcher {
    client: Client,
}

impl SnapshotFetcher {
    pub fn new() -> Self {
        Self {
            client: create_client(ClientType::Emulated).expect("Failed to create HTTP client"),
        }
    }

    /// Markdown-like rendering: title, headings and paragraph text.
    fn build_text_representation(html: &Html) -> String {
        let mut out = String::new();

        if let Some(title) = PageExtractor::extract_title(html) {
            out.push_str(&format!("# {}\n\n", title));
        }
        for heading in PageExtractor::extract_headings(html) {
            if heading.text.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "{} {}\n",
                "#".repeat(heading.level as usize),
                heading.text
            ));
        }

        let body_text = html
            .root_element()
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !body_text.is_empty() {
            out.push('\n');
            out.push_str(&body_text);
            out.push('\n');
        }

        out
    }

    fn build_metadata(html: &Html, status: u16, elapsed_ms: u128) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("statusCode".to_string(), status.to_string());
        metadata.insert("responseTimeMs".to_string(), elapsed_ms.to_string());

        if let Some(title) = PageExtractor::extract_title(html) {
            metadata.insert("title".to_string(), title);
        }
        if let Some(description) = PageExtractor::extract_meta(html, "description") {
            metadata.insert("description".to_string(), description);
        }
        for (key, property) in [
            ("ogTitle", "og:title"),
            ("ogDescription", "og:description"),
            ("ogImage", "og:image"),
        ] {
            if let Some(value) = PageExtractor::extract_meta_property(html, property) {
                metadata.insert(key.to_string(), value);
            }
        }
        if let Some(card) = PageExtractor::extract_meta(html, "twitter:card") {
            metadata.insert("twitterCard".to_string(), card);
        }

        metadata
    }
}

impl Default for SnapshotFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotProvider for SnapshotFetcher {
    async fn acquire(&self, url: &str) -> Result<PageSnapshot> {
        log::info!("[SNAPSHOT] Fetching {}", url);
        let start = std::time::Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::acquisition(format!("fetch failed for {}: {}", url, e)))?;

        let status = response.status().as_u16();
        let raw_html = response
            .text()
            .await
            .map_err(|e| AppError::acquisition(format!("body read failed for {}: {}", url, e)))?;
        let elapsed_ms = start.elapsed().as_millis();

        log::debug!("[SNAPSHOT] {} bytes in {}ms, status {}", raw_html.len(), elapsed_ms, status);

        let html = Html::parse_document(&raw_html);
        let metadata = Self::build_metadata(&html, status, elapsed_ms);
        let text_representation = Self::build_text_representation(&html);
        let discovered_links = PageExtractor::extract_links(&html, url)
            .into_iter()
            .map(|link| DiscoveredLink {
                text: link.text.unwrap_or_default(),
                href: link.href,
            })
            .collect();

        Ok(PageSnapshot {
            source_url: url.to_string(),
            raw_html,
            text_representation,
            metadata,
            screenshot: None,
            discovered_links,
        })
    }

    fn name(&self) -> &'static str {
        "http-fetcher"
    }
}
