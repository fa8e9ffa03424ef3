//! Movie pitches, highlights and similar-title suggestions.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use moviehub_common::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::client::{ChatMessage, ChatOptions, LlmClient};
use crate::cache::CacheManager;

const MAX_SIMILAR: usize = 5;
const MAX_HIGHLIGHTS: usize = 3;

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9\-\*\.、]+").expect("list marker pattern is valid"));

/// Body of the summary routes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSummary {
    pub summary: String,
    pub highlights: Vec<String>,
    pub similar_movies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortSummary {
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarMovies {
    pub similar_movies: Vec<String>,
}

/// Split a comma list (ASCII or CJK separators) into at most five titles.
pub fn parse_similar(content: &str) -> Vec<String> {
    content
        .split([',', '，', '、'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .take(MAX_SIMILAR)
        .map(str::to_string)
        .collect()
}

/// One highlight per line, list markers removed, at most three.
pub fn parse_highlights(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| LIST_MARKER.replace(line.trim(), "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(MAX_HIGHLIGHTS)
        .collect()
}

/// LLM-generated movie copy, cached per title.
#[derive(Clone)]
pub struct Summarizer {
    client: Arc<LlmClient>,
    cache: CacheManager,
    ttl: Duration,
}

impl Summarizer {
    pub fn new(client: Arc<LlmClient>, cache: CacheManager, ttl: Duration) -> Self {
        Self { client, cache, ttl }
    }

    fn validate(request: &SummaryRequest) -> Result<()> {
        if request.title.trim().is_empty() {
            return Err(Error::Validation("title is required".into()));
        }
        Ok(())
    }

    async fn pitch(&self, request: &SummaryRequest) -> Result<String> {
        let mut prompt = format!(
            "Write a short, engaging recommendation (under 100 words) for the movie \"{}\".",
            request.title
        );
        if let Some(plot) = request.plot.as_deref().filter(|p| !p.is_empty()) {
            prompt.push_str(&format!("\nPlot: {plot}"));
        }
        if !request.genres.is_empty() {
            prompt.push_str(&format!("\nGenres: {}", request.genres.join(", ")));
        }
        let messages = [
            ChatMessage::system(
                "You are a professional film critic. Summarize movies concisely and highlight what makes them worth watching.",
            ),
            ChatMessage::user(prompt),
        ];
        let content = self.client.chat(&messages, ChatOptions::new(0.8, 500)).await?;
        Ok(content.trim().to_string())
    }

    async fn highlights(&self, request: &SummaryRequest) -> Result<Vec<String>> {
        let plot = request
            .plot
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| format!(" Plot: {p}."))
            .unwrap_or_default();
        let messages = [
            ChatMessage::system(
                "You are a film critic. Extract the 3 key highlights of a movie, one short sentence each.",
            ),
            ChatMessage::user(format!(
                "Movie \"{}\".{plot} List 3 highlights, one per line, without numbering.",
                request.title
            )),
        ];
        let content = self.client.chat(&messages, ChatOptions::new(0.6, 300)).await?;
        Ok(parse_highlights(&content))
    }

    async fn similar_titles(&self, request: &SummaryRequest) -> Result<Vec<String>> {
        let genres = if request.genres.is_empty() {
            String::new()
        } else {
            format!(" (genres: {})", request.genres.join(", "))
        };
        let messages = [
            ChatMessage::system(
                "You are a movie recommendation expert. Suggest 5 similar movies. Reply with titles only, separated by commas.",
            ),
            ChatMessage::user(format!(
                "Suggest 5 movies similar to \"{}\"{genres}. Titles only, comma separated, no explanation.",
                request.title
            )),
        ];
        let content = self.client.chat(&messages, ChatOptions::new(0.7, 300)).await?;
        Ok(parse_similar(&content))
    }

    /// Pitch, highlights and similar titles, generated concurrently.
    pub async fn full(&self, request: &SummaryRequest) -> Result<MovieSummary> {
        Self::validate(request)?;
        let key = self.cache.llm_key("full", &request.title);
        self.cache
            .get_or_set(&key, self.ttl, || async {
                tracing::info!(title = %request.title, "Generating movie summary");
                let (summary, highlights, similar_movies) = tokio::try_join!(
                    self.pitch(request),
                    self.highlights(request),
                    self.similar_titles(request)
                )?;
                Ok(MovieSummary {
                    summary,
                    highlights,
                    similar_movies,
                })
            })
            .await
    }

    pub async fn summary_only(&self, request: &SummaryRequest) -> Result<ShortSummary> {
        Self::validate(request)?;
        let key = self.cache.llm_key("short", &request.title);
        self.cache
            .get_or_set(&key, self.ttl, || async {
                Ok(ShortSummary {
                    summary: self.pitch(request).await?,
                })
            })
            .await
    }

    pub async fn similar(&self, request: &SummaryRequest) -> Result<SimilarMovies> {
        Self::validate(request)?;
        let key = self.cache.llm_key("similar", &request.title);
        self.cache
            .get_or_set(&key, self.ttl, || async {
                Ok(SimilarMovies {
                    similar_movies: self.similar_titles(request).await?,
                })
            })
            .await
    }
}
