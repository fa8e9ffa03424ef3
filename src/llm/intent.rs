//! LLM-backed intent classification.

use std::sync::Arc;

use async_trait::async_trait;
use moviehub_common::{Error, Result};

use super::client::{ChatMessage, ChatOptions, LlmClient};
use crate::orchestrator::{Intent, IntentClassifier};

const INTENT_PROMPT: &str = r#"You analyse movie search queries. Classify the user's intent and answer with JSON only, no other text.

Query: "{query}"
Context: {context}

Answer in this shape:
{
  "type": "search_movies|get_movie_details|compare_movies|recommend_movies",
  "confidence": 0.0-1.0,
  "reasoning": "short explanation",
  "extractedEntities": {
    "genres": ["科幻", "action"],
    "years": [2020],
    "actors": [],
    "directors": [],
    "keywords": []
  },
  "searchStrategy": {
    "type": "direct_search|genre_search|popular_search|director_search",
    "parameters": {}
  }
}

Strategies:
- direct_search: search the query text as a title
- genre_search: the query names a genre ("科幻电影", "horror movies")
- popular_search: the query asks for popular, trending or classic movies ("热门电影")
- director_search: the query names a director ("Christopher Nolan导演的电影")"#;

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub struct LlmIntentClassifier {
    client: Arc<LlmClient>,
}

impl LlmIntentClassifier {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, query: &str, context: &str) -> Result<Intent> {
        let prompt = INTENT_PROMPT
            .replace("{query}", query)
            .replace("{context}", context);
        let content = self
            .client
            .chat(&[ChatMessage::user(prompt)], ChatOptions::new(0.1, 1000))
            .await?;

        let json = strip_code_fences(&content);
        serde_json::from_str(json).map_err(|e| {
            tracing::debug!(content = %content, "Unparsable intent response");
            Error::malformed("llm", e)
        })
    }
}
