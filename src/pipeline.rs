use std::sync::Arc;

use chrono::Utc;

use crate::ai::SentimentScorer;
use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::feed::FeedFetcher;
use crate::models::{NewArticle, RawEntry, RejectionReason, Source};
use crate::services::{is_english_like, ImageResolver};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: u64,
    pub added: u64,
    pub skipped: u64,
}

/// Drives every feed entry to a terminal accept/reject decision.
///
/// Decisions are memoized: an accepted url lives in the articles table, a
/// permanently rejected one in the rejection memo, and neither is ever
/// re-scored. Only transient scoring failures stay undecided so a later run
/// can retry them.
pub struct Pipeline {
    repo: Arc<Repository>,
    sources: Vec<Source>,
    fetcher: FeedFetcher,
    scorer: SentimentScorer,
    images: ImageResolver,
}

impl Pipeline {
    pub fn new(repo: Arc<Repository>, sources: Vec<Source>, scorer: SentimentScorer) -> Self {
        Self {
            repo,
            sources,
            fetcher: FeedFetcher::new(),
            scorer,
            images: ImageResolver::new(),
        }
    }

    pub fn from_config(repo: Arc<Repository>, config: &Config) -> Self {
        let scorer = SentimentScorer::new(
            config.claude_api_key.clone(),
            config.positivity_threshold,
        );
        Self::new(repo, config.sources.clone(), scorer)
    }

    /// Run one ingestion pass over all sources, in configured order, entries
    /// in feed order. `limit` caps the total number of entries processed.
    ///
    /// Per-source fetch failures and per-entry scoring failures are contained;
    /// only a store-level error aborts the run.
    pub async fn run(&self, limit: Option<usize>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        'sources: for source in &self.sources {
            if let Some(max) = limit {
                if summary.processed >= max as u64 {
                    break;
                }
            }

            tracing::info!("Fetching from {}...", source.name);

            let entries = match self.fetcher.fetch_source(source).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Failed to fetch {}: {}", source.name, e);
                    continue;
                }
            };

            for entry in entries {
                if let Some(max) = limit {
                    if summary.processed >= max as u64 {
                        break 'sources;
                    }
                }

                summary.processed += 1;

                if self.process_entry(&entry).await? {
                    summary.added += 1;
                } else {
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!(
            "Fetch complete: {} processed, {} added, {} skipped",
            summary.processed,
            summary.added,
            summary.skipped
        );

        Ok(summary)
    }

    /// Decide one entry. Returns true when a new article was inserted.
    async fn process_entry(&self, entry: &RawEntry) -> Result<bool> {
        if entry.url.is_empty()
            || self.repo.article_exists(&entry.url).await?
            || self.repo.url_was_rejected(&entry.url).await?
        {
            return Ok(false);
        }

        if !is_english_like(&entry.title, &entry.description) {
            tracing::debug!("Skipped (non-English): {}", entry.title);
            self.repo
                .insert_rejected_url(&entry.url, &entry.source, RejectionReason::Language, None)
                .await?;
            return Ok(false);
        }

        let sentiment = match self.scorer.score(&entry.title, &entry.description).await {
            Ok(sentiment) => sentiment,
            Err(e) => {
                // Not memoized: eligible for retry on the next run
                tracing::warn!("Scoring failed for {}: {}", entry.url, e);
                return Ok(false);
            }
        };

        if !sentiment.is_positive {
            tracing::debug!(
                "Skipped (low score {:.2}): {}",
                sentiment.score,
                entry.title
            );
            self.repo
                .insert_rejected_url(
                    &entry.url,
                    &entry.source,
                    RejectionReason::Sentiment,
                    Some(sentiment.score),
                )
                .await?;
            return Ok(false);
        }

        let image_url = self.images.resolve(entry).await;

        let article = NewArticle {
            title: entry.title.clone(),
            description: entry.description.clone(),
            content: entry.content.clone(),
            url: entry.url.clone(),
            source: entry.source.clone(),
            published_at: entry.published_at.unwrap_or_else(Utc::now),
            positivity_score: sentiment.score,
            image_url,
        };

        let inserted = self.repo.insert_article(article).await?;
        if inserted {
            tracing::info!("Added: {} (score: {:.2})", entry.title, sentiment.score);
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Mock;
    use serde_json::json;

    fn feed_xml(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Good News Network</title>
    <link>https://example.com</link>
    <description>Test feed</description>
    {items}
  </channel>
</rss>"#
        )
    }

    // Carries an enclosure so accepted entries resolve an image from the
    // feed itself and never reach the page-scrape fallback.
    fn item(title: &str, link: &str, description: &str) -> String {
        format!(
            r#"<item>
      <title>{title}</title>
      <link>{link}</link>
      <description>{description}</description>
      <pubDate>Mon, 01 Jan 2024 12:00:00 GMT</pubDate>
      <enclosure url="https://example.com/feed-image.jpg" type="image/jpeg" length="1"/>
    </item>"#
        )
    }

    fn bare_item(title: &str, link: &str, description: &str) -> String {
        format!(
            r#"<item>
      <title>{title}</title>
      <link>{link}</link>
      <description>{description}</description>
      <pubDate>Mon, 01 Jan 2024 12:00:00 GMT</pubDate>
    </item>"#
        )
    }

    fn mock_feed<'a>(server: &'a MockServer, body: String) -> Mock<'a> {
        server.mock(|when, then| {
            when.method(GET).path("/feed");
            then.status(200)
                .header("content-type", "application/rss+xml")
                .body(body);
        })
    }

    fn mock_claude<'a>(server: &'a MockServer, reply: &str) -> Mock<'a> {
        let body = json!({ "content": [{ "type": "text", "text": reply }] });
        server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(body);
        })
    }

    async fn pipeline_for(server: &MockServer) -> Pipeline {
        let repo = Arc::new(Repository::new(":memory:").await.unwrap());
        let scorer = SentimentScorer::new(Some("test-key".to_string()), 0.7)
            .with_api_url(server.url("/v1/messages"));
        let sources = vec![Source::feed("Good News Network", &server.url("/feed"))];
        Pipeline::new(repo, sources, scorer)
    }

    const ENGLISH_DESC: &str =
        "Volunteers in a small town have grown enough vegetables to supply everyone all winter.";

    #[tokio::test]
    async fn accepts_positive_article_with_scraped_image() {
        let server = MockServer::start();
        mock_feed(
            &server,
            feed_xml(&bare_item(
                "Community garden feeds hundreds",
                &server.url("/article-a"),
                ENGLISH_DESC,
            )),
        );
        mock_claude(&server, r#"{"score": 0.9}"#);
        server.mock(|when, then| {
            when.method(GET).path("/article-a");
            then.status(200).body(
                r#"<html><head><meta property="og:image" content="https://example.com/featured.jpg"></head></html>"#,
            );
        });

        let pipeline = pipeline_for(&server).await;
        let summary = pipeline.run(None).await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                processed: 1,
                added: 1,
                skipped: 0
            }
        );

        let page = pipeline.repo.get_articles(1, 10, None).await.unwrap();
        assert_eq!(page.data.len(), 1);
        let article = &page.data[0];
        assert_eq!(article.positivity_score, 0.9);
        assert_eq!(
            article.image_url.as_deref(),
            Some("https://example.com/featured.jpg")
        );
        assert_eq!(article.source, "Good News Network");
    }

    #[tokio::test]
    async fn second_run_adds_nothing() {
        let server = MockServer::start();
        mock_feed(
            &server,
            feed_xml(&item(
                "Community garden feeds hundreds",
                "https://example.com/a",
                ENGLISH_DESC,
            )),
        );
        let claude = mock_claude(&server, r#"{"score": 0.9}"#);

        let pipeline = pipeline_for(&server).await;
        let first = pipeline.run(None).await.unwrap();
        assert_eq!(first.added, 1);

        let second = pipeline.run(None).await.unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.processed, 1);
        assert_eq!(second.skipped, 1);
        // The dedup check must short-circuit before any scoring call
        claude.assert_hits(1);
    }

    #[tokio::test]
    async fn low_score_is_memoized_with_real_score() {
        let server = MockServer::start();
        mock_feed(
            &server,
            feed_xml(&item(
                "Markets tumble on grim outlook",
                "https://example.com/gloom",
                "Analysts expect further losses across every sector this quarter amid uncertainty.",
            )),
        );
        let claude = mock_claude(&server, r#"{"score": 0.2}"#);

        let pipeline = pipeline_for(&server).await;
        let summary = pipeline.run(None).await.unwrap();
        assert_eq!(summary.added, 0);
        assert_eq!(summary.skipped, 1);

        let memo = pipeline
            .repo
            .get_rejected_url("https://example.com/gloom")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(memo.reason, RejectionReason::Sentiment);
        assert_eq!(memo.score, Some(0.2));
        assert!(memo.score.unwrap() < 0.7);

        // Rejected urls are never re-scored
        pipeline.run(None).await.unwrap();
        claude.assert_hits(1);
    }

    #[tokio::test]
    async fn non_english_is_memoized_without_scoring() {
        let server = MockServer::start();
        mock_feed(
            &server,
            feed_xml(&item(
                "Bonjour le monde",
                "https://example.com/fr",
                "ceci est un texte francais assez long pour etre detecte sans aucun doute",
            )),
        );
        let claude = mock_claude(&server, r#"{"score": 0.9}"#);

        let pipeline = pipeline_for(&server).await;
        let summary = pipeline.run(None).await.unwrap();
        assert_eq!(summary.added, 0);
        assert_eq!(summary.skipped, 1);
        claude.assert_hits(0);

        let memo = pipeline
            .repo
            .get_rejected_url("https://example.com/fr")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(memo.reason, RejectionReason::Language);
        assert_eq!(memo.score, None);
    }

    #[tokio::test]
    async fn scoring_outage_skips_without_memoizing() {
        let server = MockServer::start();
        mock_feed(
            &server,
            feed_xml(&item(
                "Community garden feeds hundreds",
                "https://example.com/retry",
                ENGLISH_DESC,
            )),
        );
        let mut outage = server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(529).body("overloaded");
        });

        let pipeline = pipeline_for(&server).await;
        let summary = pipeline.run(None).await.unwrap();
        assert_eq!(summary.added, 0);
        assert_eq!(summary.skipped, 1);

        // No memo: the url stays eligible for retry
        assert!(!pipeline
            .repo
            .url_was_rejected("https://example.com/retry")
            .await
            .unwrap());

        // Service recovers; the same entry is accepted on the next run
        outage.delete();
        mock_claude(&server, r#"{"score": 0.8}"#);
        let retry = pipeline.run(None).await.unwrap();
        assert_eq!(retry.added, 1);
    }

    #[tokio::test]
    async fn feed_failure_is_isolated_per_source() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/broken");
            then.status(500);
        });
        server.mock(|when, then| {
            when.method(GET).path("/feed");
            then.status(200)
                .header("content-type", "application/rss+xml")
                .body(feed_xml(&item(
                    "Community garden feeds hundreds",
                    "https://example.com/ok",
                    ENGLISH_DESC,
                )));
        });
        mock_claude(&server, r#"{"score": 0.9}"#);

        let repo = Arc::new(Repository::new(":memory:").await.unwrap());
        let scorer = SentimentScorer::new(Some("test-key".to_string()), 0.7)
            .with_api_url(server.url("/v1/messages"));
        let sources = vec![
            Source::feed("Broken Source", &server.url("/broken")),
            Source::feed("Good News Network", &server.url("/feed")),
        ];
        let pipeline = Pipeline::new(repo, sources, scorer);

        let summary = pipeline.run(None).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.added, 1);
    }

    #[tokio::test]
    async fn limit_caps_total_processed() {
        let server = MockServer::start();
        let items: String = (0..5)
            .map(|i| {
                item(
                    &format!("Community garden feeds hundreds {i}"),
                    &format!("https://example.com/{i}"),
                    ENGLISH_DESC,
                )
            })
            .collect();
        mock_feed(&server, feed_xml(&items));
        mock_claude(&server, r#"{"score": 0.9}"#);

        let pipeline = pipeline_for(&server).await;
        let summary = pipeline.run(Some(2)).await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.added, 2);
    }

    #[tokio::test]
    async fn empty_url_is_skipped() {
        let server = MockServer::start();
        mock_feed(
            &server,
            feed_xml(
                r#"<item>
      <title>No link at all</title>
      <description>This item has no link element in the feed entry body.</description>
    </item>"#,
            ),
        );
        let claude = mock_claude(&server, r#"{"score": 0.9}"#);

        let pipeline = pipeline_for(&server).await;
        let summary = pipeline.run(None).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.added, 0);
        claude.assert_hits(0);
    }

    #[tokio::test]
    async fn accepted_article_without_any_image_is_persisted() {
        let server = MockServer::start();
        mock_feed(
            &server,
            feed_xml(&bare_item(
                "Community garden feeds hundreds",
                &server.url("/no-image"),
                ENGLISH_DESC,
            )),
        );
        mock_claude(&server, r#"{"score": 0.9}"#);
        server.mock(|when, then| {
            when.method(GET).path("/no-image");
            then.status(200).body("<html><body>plain page</body></html>");
        });

        let pipeline = pipeline_for(&server).await;
        let summary = pipeline.run(None).await.unwrap();
        assert_eq!(summary.added, 1);

        let page = pipeline.repo.get_articles(1, 10, None).await.unwrap();
        assert_eq!(page.data[0].image_url, None);
    }
}
