//! LLM integration: chat client, intent classifier and summarizer.

pub mod client;
pub mod intent;
pub mod summary;

pub use client::{ChatMessage, ChatOptions, LlmClient};
pub use intent::LlmIntentClassifier;
pub use summary::{MovieSummary, ShortSummary, SimilarMovies, Summarizer, SummaryRequest};
