#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentResult {
    pub score: f64,
    pub is_positive: bool,
}
