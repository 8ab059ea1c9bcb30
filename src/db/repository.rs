use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Article, NewArticle, Paginated, Pagination, RejectedUrl, RejectionReason};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Article operations

    /// Insert if the url is not already present. Returns true when a row was
    /// actually added; a url conflict is not an error.
    pub async fn insert_article(&self, article: NewArticle) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"INSERT OR IGNORE INTO articles
                       (title, description, content, url, source, published_at, fetched_at, positivity_score, image_url)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
                    params![
                        article.title,
                        article.description,
                        article.content,
                        article.url,
                        article.source,
                        article.published_at.to_rfc3339(),
                        Utc::now().to_rfc3339(),
                        article.positivity_score,
                        article.image_url,
                    ],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(inserted)
    }

    pub async fn article_exists(&self, url: &str) -> Result<bool> {
        let url = url.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let found: Option<i64> = conn
                    .query_row("SELECT 1 FROM articles WHERE url = ?1", params![url], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(found.is_some())
            })
            .await?;
        Ok(exists)
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, title, description, content, url, source, published_at,
                              fetched_at, positivity_score, image_url
                       FROM articles WHERE id = ?1"#,
                )?;
                let article = stmt
                    .query_row(params![id], |row| Ok(article_from_row(row)))
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Paginated read, newest first, optionally restricted to one source.
    pub async fn get_articles(
        &self,
        page: u32,
        limit: u32,
        source: Option<String>,
    ) -> Result<Paginated<Article>> {
        let offset = (page.saturating_sub(1) as i64) * limit as i64;

        let (articles, total) = self
            .conn
            .call(move |conn| {
                let (total, articles) = match &source {
                    Some(name) => {
                        let total: i64 = conn.query_row(
                            "SELECT COUNT(*) FROM articles WHERE source = ?1",
                            params![name],
                            |row| row.get(0),
                        )?;
                        let mut stmt = conn.prepare(
                            r#"SELECT id, title, description, content, url, source, published_at,
                                      fetched_at, positivity_score, image_url
                               FROM articles WHERE source = ?1
                               ORDER BY published_at DESC LIMIT ?2 OFFSET ?3"#,
                        )?;
                        let articles = stmt
                            .query_map(params![name, limit, offset], |row| {
                                Ok(article_from_row(row))
                            })?
                            .collect::<std::result::Result<Vec<_>, _>>()?;
                        (total, articles)
                    }
                    None => {
                        let total: i64 =
                            conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
                        let mut stmt = conn.prepare(
                            r#"SELECT id, title, description, content, url, source, published_at,
                                      fetched_at, positivity_score, image_url
                               FROM articles
                               ORDER BY published_at DESC LIMIT ?1 OFFSET ?2"#,
                        )?;
                        let articles = stmt
                            .query_map(params![limit, offset], |row| Ok(article_from_row(row)))?
                            .collect::<std::result::Result<Vec<_>, _>>()?;
                        (total, articles)
                    }
                };
                Ok((articles, total))
            })
            .await?;

        let total = total.max(0) as u64;
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64)
        };

        Ok(Paginated {
            data: articles,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages,
            },
        })
    }

    // Rejection memo operations

    pub async fn url_was_rejected(&self, url: &str) -> Result<bool> {
        let url = url.to_string();
        let rejected = self
            .conn
            .call(move |conn| {
                let found: Option<i64> = conn
                    .query_row(
                        "SELECT 1 FROM rejected_urls WHERE url = ?1",
                        params![url],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(found.is_some())
            })
            .await?;
        Ok(rejected)
    }

    pub async fn insert_rejected_url(
        &self,
        url: &str,
        source: &str,
        reason: RejectionReason,
        score: Option<f64>,
    ) -> Result<()> {
        let url = url.to_string();
        let source = source.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT OR IGNORE INTO rejected_urls (url, source, reason, score, rejected_at)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    params![url, source, reason.as_str(), score, Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_rejected_url(&self, url: &str) -> Result<Option<RejectedUrl>> {
        let url = url.to_string();
        let rejected = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, url, source, reason, score, rejected_at FROM rejected_urls WHERE url = ?1",
                )?;
                let rejected = stmt
                    .query_row(params![url], |row| Ok(rejected_from_row(row)))
                    .optional()?;
                Ok(rejected)
            })
            .await?;
        Ok(rejected)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn article_from_row(row: &Row) -> Article {
    Article {
        id: row.get(0).unwrap(),
        title: row.get(1).unwrap(),
        description: row.get(2).unwrap(),
        content: row.get(3).unwrap(),
        url: row.get(4).unwrap(),
        source: row.get(5).unwrap(),
        published_at: row
            .get::<_, String>(6)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        fetched_at: row
            .get::<_, String>(7)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        positivity_score: row.get(8).unwrap(),
        image_url: row.get(9).unwrap(),
    }
}

fn rejected_from_row(row: &Row) -> RejectedUrl {
    RejectedUrl {
        id: row.get(0).unwrap(),
        url: row.get(1).unwrap(),
        source: row.get(2).unwrap(),
        reason: row
            .get::<_, String>(3)
            .ok()
            .and_then(|s| RejectionReason::parse(&s))
            .unwrap_or(RejectionReason::Sentiment),
        score: row.get(4).unwrap(),
        rejected_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}
