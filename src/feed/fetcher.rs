use std::time::Duration;

use feed_rs::parser;
use reqwest::Client;

use crate::error::Result;
use crate::models::{RawEntry, Source};

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("brightside/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Fetch and parse one source's feed into raw entries, in feed order.
    pub async fn fetch_source(&self, source: &Source) -> Result<Vec<RawEntry>> {
        let response = self.client.get(&source.url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        let feed = parser::parse(&bytes[..])?;

        let entries: Vec<RawEntry> = feed
            .entries
            .into_iter()
            .map(|entry| {
                let content = entry.content.as_ref().and_then(|c| c.body.clone());

                // Summary is often HTML; flatten it to a plain-text snippet
                let summary_html = entry.summary.as_ref().map(|s| s.content.as_str());
                let description = summary_html
                    .map(|html| flatten_html(html))
                    .unwrap_or_default();

                // feed-rs folds RSS enclosures and media:content into the same
                // media objects, so the first content url covers both
                let media_content = entry
                    .media
                    .iter()
                    .flat_map(|m| m.content.iter())
                    .filter_map(|c| c.url.as_ref())
                    .map(|u| u.to_string())
                    .next();
                let media_thumbnail = entry
                    .media
                    .iter()
                    .flat_map(|m| m.thumbnails.iter())
                    .map(|t| t.image.uri.clone())
                    .next();

                RawEntry {
                    title: entry
                        .title
                        .map(|t| t.content)
                        .unwrap_or_else(|| "Untitled".to_string()),
                    description,
                    content,
                    url: entry
                        .links
                        .first()
                        .map(|l| l.href.clone())
                        .unwrap_or_default(),
                    source: source.name.clone(),
                    published_at: entry.published.or(entry.updated),
                    media_content,
                    media_thumbnail,
                }
            })
            .collect();

        Ok(entries)
    }
}

/// Convert an HTML fragment to a single-line text snippet.
fn flatten_html(html: &str) -> String {
    let text = match html2text::from_read(html.as_bytes(), 80) {
        Ok(t) => t,
        Err(_) => html.to_string(),
    };

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}
