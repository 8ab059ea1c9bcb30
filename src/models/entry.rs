use chrono::{DateTime, Utc};

/// A feed item as fetched, before any accept/reject decision.
///
/// `media_content` covers both classic RSS enclosures and media:content
/// attachments (feed-rs folds them into the same media objects).
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub title: String,
    pub description: String,
    pub content: Option<String>,
    pub url: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub media_content: Option<String>,
    pub media_thumbnail: Option<String>,
}
