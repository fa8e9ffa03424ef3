//! Search strategy selection for the search branch.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::intent::{Intent, StrategyKind};

/// Genre names (Chinese and English) to TMDB genre ids, in match order.
pub const GENRE_TABLE: &[(&str, u32)] = &[
    ("科幻", 878),
    ("science fiction", 878),
    ("sci-fi", 878),
    ("科幻电影", 878),
    ("动作", 28),
    ("action", 28),
    ("动作片", 28),
    ("喜剧", 35),
    ("comedy", 35),
    ("喜剧片", 35),
    ("恐怖", 27),
    ("horror", 27),
    ("恐怖片", 27),
    ("爱情", 10749),
    ("romance", 10749),
    ("爱情片", 10749),
    ("剧情", 18),
    ("drama", 18),
    ("剧情片", 18),
    ("惊悚", 53),
    ("thriller", 53),
    ("惊悚片", 53),
    ("冒险", 12),
    ("adventure", 12),
    ("冒险片", 12),
    ("动画", 16),
    ("animation", 16),
    ("动画片", 16),
    ("犯罪", 80),
    ("crime", 80),
    ("犯罪片", 80),
    ("悬疑", 9648),
    ("mystery", 9648),
    ("悬疑片", 9648),
];

const POPULAR_KEYWORDS: &[&str] = &["热门", "popular", "推荐", "recommend", "经典", "classic", "trending"];
const DIRECTOR_KEYWORDS: &[&str] = &["导演", "director", "执导", "directed by"];

/// Exact genre name lookup, case-insensitive.
pub fn genre_id(name: &str) -> Option<u32> {
    let name = name.trim().to_lowercase();
    GENRE_TABLE
        .iter()
        .find(|(keyword, _)| *keyword == name)
        .map(|(_, id)| *id)
}

/// English search keyword for a TMDB genre id, used for providers that
/// only support free-text search.
pub fn genre_keyword(id: u32) -> &'static str {
    match id {
        878 => "sci-fi",
        28 => "action",
        12 => "adventure",
        16 => "animation",
        35 => "comedy",
        80 => "crime",
        18 => "drama",
        10751 => "family",
        14 => "fantasy",
        36 => "history",
        27 => "horror",
        10402 => "music",
        9648 => "mystery",
        10749 => "romance",
        53 => "thriller",
        10752 => "war",
        37 => "western",
        _ => "movie",
    }
}

/// How the search branch queries the providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchStrategy {
    DirectSearch { query: String },
    GenreSearch { genre: u32, keyword: String },
    PopularSearch,
    DirectorSearch {
        #[serde(rename = "directorName")]
        director_name: String,
    },
}

// ---------------------------------------------------------------------------
// Director extraction
// ---------------------------------------------------------------------------

/// Pulls a director's name out of a free-text query.
pub trait DirectorExtractor: Send + Sync {
    fn extract(&self, query: &str) -> Option<String>;
}

static DEFAULT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)directed by\s+(.+)",
        r"(?i)(?:movies|films)\s+by\s+director\s+(.+)",
        r"(.+?)导演的电影",
        r"(.+?)执导的电影",
        r"(?i)(.+?)\s*director",
        r"(.+?)执导",
        r"(.+?)导演",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("director pattern is valid"))
    .collect()
});

/// Ordered regex patterns; the first pattern whose capture is non-empty wins.
#[derive(Debug, Clone)]
pub struct PatternDirectorExtractor {
    patterns: Vec<Regex>,
}

impl PatternDirectorExtractor {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }
}

impl Default for PatternDirectorExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS.clone())
    }
}

impl DirectorExtractor for PatternDirectorExtractor {
    fn extract(&self, query: &str) -> Option<String> {
        self.patterns.iter().find_map(|pattern| {
            let name = pattern.captures(query)?.get(1)?.as_str();
            let name = name.trim().trim_end_matches(['的', ',', '.', '?', '？']).trim();
            (!name.is_empty()).then(|| name.to_string())
        })
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Pick a strategy, trusting the classifier's suggestion when it gave one.
pub fn select_strategy(
    query: &str,
    intent: Option<&Intent>,
    directors: &dyn DirectorExtractor,
) -> SearchStrategy {
    match intent.and_then(|i| i.search_strategy.as_ref().map(|s| (i, s.kind))) {
        Some((intent, kind)) => strategy_from_hint(query, intent, kind),
        None => rule_strategy(query, directors),
    }
}

fn strategy_from_hint(query: &str, intent: &Intent, kind: StrategyKind) -> SearchStrategy {
    let entities = intent.extracted_entities.clone().unwrap_or_default();
    match kind {
        StrategyKind::GenreSearch => {
            if let Some((name, id)) = entities
                .genres
                .iter()
                .find_map(|g| genre_id(g).map(|id| (g, id)))
            {
                return SearchStrategy::GenreSearch {
                    genre: id,
                    keyword: name.clone(),
                };
            }
        }
        StrategyKind::PopularSearch => return SearchStrategy::PopularSearch,
        StrategyKind::DirectorSearch => {
            if let Some(name) = entities.directors.iter().find(|d| !d.trim().is_empty()) {
                return SearchStrategy::DirectorSearch {
                    director_name: name.trim().to_string(),
                };
            }
        }
        StrategyKind::DirectSearch => {}
    }
    SearchStrategy::DirectSearch {
        query: query.to_string(),
    }
}

/// Keyword strategy: director, then genre, then popular, else direct.
pub fn rule_strategy(query: &str, directors: &dyn DirectorExtractor) -> SearchStrategy {
    let lower = query.to_lowercase();

    if DIRECTOR_KEYWORDS.iter().any(|k| lower.contains(k)) {
        if let Some(director_name) = directors.extract(query) {
            return SearchStrategy::DirectorSearch { director_name };
        }
    }

    if let Some((keyword, id)) = GENRE_TABLE.iter().find(|(k, _)| lower.contains(k)) {
        return SearchStrategy::GenreSearch {
            genre: *id,
            keyword: keyword.to_string(),
        };
    }

    if POPULAR_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return SearchStrategy::PopularSearch;
    }

    SearchStrategy::DirectSearch {
        query: query.to_string(),
    }
}
