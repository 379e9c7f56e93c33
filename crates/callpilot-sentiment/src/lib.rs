//! Per-call sentiment scoring with an LLM.
//!
//! [`SentimentAnalyzer`] sends one transcript to a chat-completions endpoint
//! and [`normalize_response`] turns whatever comes back into a score in
//! `0..=100` and one of three labels. [`run_sentiment_batch`] applies that to
//! every call still waiting for a sentiment row.

pub mod analyzer;
pub mod batch;
pub mod error;
pub mod normalize;

pub use analyzer::SentimentAnalyzer;
pub use batch::{run_sentiment_batch, SentimentBatchReport, MAX_SENTIMENT_ATTEMPTS};
pub use error::SentimentError;
pub use normalize::{normalize_response, SentimentAnalysis};
