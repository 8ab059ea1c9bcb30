use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SentimentResult;

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_MODEL: &str = "claude-3-5-haiku-20241022";

/// Descriptions are truncated before submission to keep cost and latency down.
const MAX_DESCRIPTION_CHARS: usize = 300;

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    content_type: String,
    text: Option<String>,
}

pub struct SentimentScorer {
    client: Client,
    api_key: Option<String>,
    threshold: f64,
    api_url: String,
}

impl SentimentScorer {
    pub fn new(api_key: Option<String>, threshold: f64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            api_key,
            threshold,
            api_url: CLAUDE_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    /// Score an article's positivity in [0, 1].
    ///
    /// An unparseable model response falls back to a neutral 0.5; transport
    /// and API errors surface as `Err` so the caller can retry on a later run.
    pub async fn score(&self, title: &str, description: &str) -> Result<SentimentResult> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::ClaudeApi("API key not configured".to_string()))?;

        let clean_desc: String = if description.is_empty() {
            "No description".to_string()
        } else {
            description.chars().take(MAX_DESCRIPTION_CHARS).collect()
        };

        let prompt = format!(
            "Rate this news article's positivity from 0 to 1. Respond with ONLY a JSON object like {{\"score\": 0.85}}\n\n\
             Title: {}\n\
             Description: {}\n\n\
             JSON only:",
            title, clean_desc
        );

        let request = MessageRequest {
            model: CLAUDE_MODEL.to_string(),
            max_tokens: 50,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::ClaudeApi(format!("API error: {}", error_text)));
        }

        let message_response: MessageResponse = response.json().await?;

        let text = message_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        let score = match parse_score(&text) {
            Some(score) => score.clamp(0.0, 1.0),
            None => {
                tracing::warn!("Could not parse sentiment from response: {}", text);
                0.5
            }
        };

        Ok(SentimentResult {
            score,
            is_positive: score >= self.threshold,
        })
    }
}

/// Extract a score from the model's reply. A JSON object with a `score` field
/// wins; a bare decimal in [0, 1] is accepted as a fallback.
fn parse_score(text: &str) -> Option<f64> {
    let json_re = Regex::new(r#"\{[^}]*"score"\s*:\s*[\d.]+[^}]*\}"#).ok()?;
    if let Some(m) = json_re.find(text) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(m.as_str()) {
            if let Some(score) = value.get("score").and_then(|v| v.as_f64()) {
                return Some(score);
            }
        }
    }

    let number_re = Regex::new(r"\b(0\.\d+|1\.0*|0|1)\b").ok()?;
    if let Some(m) = number_re.find(text) {
        if let Ok(score) = m.as_str().parse::<f64>() {
            if (0.0..=1.0).contains(&score) {
                return Some(score);
            }
        }
    }

    None
}
