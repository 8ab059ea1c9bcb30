use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a url was permanently rejected.
///
/// Stored as text so the rejection memo never has to overload the score
/// column with sentinel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionReason {
    Language,
    Sentiment,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::Language => "language",
            RejectionReason::Sentiment => "sentiment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "language" => Some(RejectionReason::Language),
            "sentiment" => Some(RejectionReason::Sentiment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RejectedUrl {
    pub id: i64,
    pub url: String,
    pub source: String,
    pub reason: RejectionReason,
    pub score: Option<f64>,
    pub rejected_at: DateTime<Utc>,
}
