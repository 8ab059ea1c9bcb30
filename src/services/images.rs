use std::time::Duration;

use regex::Regex;
use reqwest::Client;

use crate::models::RawEntry;

const USER_AGENT_STRING: &str = "Brightside/1.0 (Positive News Aggregator)";

/// Scrape requests are bounded so a slow article page cannot stall a run.
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

/// Finds a representative image for an article. Feed-native fields first,
/// page scraping as a best-effort fallback; never an error.
pub struct ImageResolver {
    client: Client,
}

impl ImageResolver {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(SCRAPE_TIMEOUT)
            .user_agent(USER_AGENT_STRING)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    /// Extract an image from the feed entry itself, in priority order:
    /// media content (enclosures included), media thumbnail, first `<img>`
    /// in the full content, first `<img>` in the description.
    pub fn from_entry(&self, entry: &RawEntry) -> Option<String> {
        if let Some(url) = &entry.media_content {
            return Some(url.clone());
        }
        if let Some(url) = &entry.media_thumbnail {
            return Some(url.clone());
        }
        if let Some(found) = entry.content.as_deref().and_then(extract_image_from_html) {
            return Some(found);
        }
        extract_image_from_html(&entry.description)
    }

    /// Fetch the article page and look for a featured image. Any fetch error,
    /// timeout, or non-success status means "no image", not a failure.
    pub async fn scrape_page(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Image scrape failed for {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Image scrape for {} got HTTP {}", url, response.status());
            return None;
        }

        let html = match response.text().await {
            Ok(h) => h,
            Err(_) => return None,
        };

        extract_meta_image(&html)
            .or_else(|| extract_image_from_html(&html))
            .map(|img| resolve_url(&img, url))
    }

    /// Full resolution: feed fields first, then the page scrape.
    pub async fn resolve(&self, entry: &RawEntry) -> Option<String> {
        if let Some(url) = self.from_entry(entry) {
            return Some(url);
        }
        if entry.url.is_empty() {
            return None;
        }
        self.scrape_page(&entry.url).await
    }
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// First `<img src>` in an HTML fragment.
fn extract_image_from_html(html: &str) -> Option<String> {
    let img_re = Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#).ok()?;
    img_re
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// og:image or twitter:image meta content, tolerating both attribute orders.
fn extract_meta_image(html: &str) -> Option<String> {
    let patterns = [
        r#"<meta[^>]+property=["']og:image["'][^>]+content=["']([^"']+)["']"#,
        r#"<meta[^>]+content=["']([^"']+)["'][^>]+property=["']og:image["']"#,
        r#"<meta[^>]+name=["']twitter:image["'][^>]+content=["']([^"']+)["']"#,
        r#"<meta[^>]+content=["']([^"']+)["'][^>]+name=["']twitter:image["']"#,
    ];

    for pattern in patterns {
        let re = Regex::new(pattern).ok()?;
        if let Some(cap) = re.captures(html) {
            if let Some(m) = cap.get(1) {
                return Some(m.as_str().to_string());
            }
        }
    }

    None
}

/// Resolve a potentially relative image URL against the page URL.
fn resolve_url(href: &str, base_url: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    if let Ok(base) = url::Url::parse(base_url) {
        if let Ok(resolved) = base.join(href) {
            return resolved.to_string();
        }
    }

    href.to_string()
}
