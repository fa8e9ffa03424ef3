//! Query intent types and the rule-based classifier.

use async_trait::async_trait;
use moviehub_common::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    SearchMovies,
    GetMovieDetails,
    CompareMovies,
    RecommendMovies,
}

/// Search approach a classifier may suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectSearch,
    GenreSearch,
    PopularSearch,
    DirectorSearch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyHint {
    #[serde(rename = "type")]
    pub kind: StrategyKind,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub years: Vec<i32>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A classified query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: IntentType,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_entities: Option<ExtractedEntities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_strategy: Option<StrategyHint>,
}

impl Intent {
    pub fn new(kind: IntentType, confidence: f64) -> Self {
        Self {
            kind,
            confidence,
            reasoning: None,
            extracted_entities: None,
            search_strategy: None,
        }
    }
}

/// Maps a query to an [`Intent`]. Implementations may be unreliable; the
/// workflow always has [`RuleIntentClassifier`] to fall back on.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, query: &str, context: &str) -> Result<Intent>;
}

const DETAIL_KEYWORDS: &[&str] = &["详情", "details", "信息"];
const COMPARE_KEYWORDS: &[&str] = &["对比", "compare"];
const COMPARE_JOINERS: &[&str] = &["和", "vs", "与"];
const RECOMMEND_KEYWORDS: &[&str] = &["推荐", "recommend", "类似"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Keyword classifier. Never fails; unmatched queries are plain searches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleIntentClassifier;

impl RuleIntentClassifier {
    pub fn classify_query(&self, query: &str) -> Intent {
        let lower = query.to_lowercase();

        if contains_any(&lower, DETAIL_KEYWORDS) {
            Intent::new(IntentType::GetMovieDetails, 0.9)
        } else if contains_any(&lower, COMPARE_KEYWORDS) && contains_any(&lower, COMPARE_JOINERS) {
            Intent::new(IntentType::CompareMovies, 0.8)
        } else if contains_any(&lower, RECOMMEND_KEYWORDS) {
            Intent::new(IntentType::RecommendMovies, 0.8)
        } else {
            Intent::new(IntentType::SearchMovies, 0.7)
        }
    }
}

#[async_trait]
impl IntentClassifier for RuleIntentClassifier {
    async fn classify(&self, query: &str, _context: &str) -> Result<Intent> {
        Ok(self.classify_query(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(query: &str) -> IntentType {
        RuleIntentClassifier.classify_query(query).kind
    }

    #[test]
    fn rule_order() {
        assert_eq!(kind("Dune details"), IntentType::GetMovieDetails);
        assert_eq!(kind("沙丘的详情"), IntentType::GetMovieDetails);
        assert_eq!(kind("compare Dune vs Inception"), IntentType::CompareMovies);
        assert_eq!(kind("对比沙丘和盗梦空间"), IntentType::CompareMovies);
        assert_eq!(kind("recommend something like Alien"), IntentType::RecommendMovies);
        assert_eq!(kind("类似星际穿越的电影"), IntentType::RecommendMovies);
    }

    #[test]
    fn compare_needs_a_joiner() {
        assert_eq!(kind("compare prices"), IntentType::SearchMovies);
    }

    #[test]
    fn fallback_always_answers() {
        for query in ["", "   ", "Dune 2021", "🎬", "\u{0}"] {
            let intent = RuleIntentClassifier.classify_query(query);
            assert_eq!(intent.kind, IntentType::SearchMovies);
            assert!((intent.confidence - 0.7).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn parses_classifier_json() {
        let intent: Intent = serde_json::from_str(
            r#"{
                "type": "search_movies",
                "confidence": 0.95,
                "extractedEntities": {"genres": ["科幻"], "directors": []},
                "searchStrategy": {"type": "genre_search", "parameters": {}}
            }"#,
        )
        .unwrap();
        assert_eq!(intent.kind, IntentType::SearchMovies);
        assert_eq!(
            intent.search_strategy.map(|s| s.kind),
            Some(StrategyKind::GenreSearch)
        );
        assert_eq!(intent.extracted_entities.unwrap().genres, vec!["科幻"]);
    }
}
