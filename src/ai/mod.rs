mod sentiment;

pub use sentiment::SentimentScorer;
