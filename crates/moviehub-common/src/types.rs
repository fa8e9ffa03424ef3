//! Canonical movie model shared by providers, aggregation, and the API.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// A single rating as reported by one source, on that source's own scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    /// Source tag such as `"imdb"`, `"tmdb"`, or `"rotten_tomatoes"`.
    pub source: String,
    pub value: f64,
    /// Upper bound of the scale `value` is expressed on (10, 100, ...).
    pub max_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<u64>,
}

impl Rating {
    pub fn new(source: impl Into<String>, value: f64, max_value: f64) -> Self {
        Self {
            source: source.into(),
            value,
            max_value,
            votes: None,
        }
    }

    pub fn with_votes(mut self, votes: u64) -> Self {
        self.votes = Some(votes);
        self
    }

    /// The rating expressed on a 0-10 scale, or `None` when the scale is unusable.
    pub fn normalized(&self) -> Option<f64> {
        if self.max_value > 0.0 && self.value.is_finite() {
            Some((self.value / self.max_value * 10.0).clamp(0.0, 10.0))
        } else {
            None
        }
    }
}

/// Cross-source score derived from a movie's ratings. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRating {
    /// Weighted score on a 0-10 scale, rounded to one decimal.
    pub score: f64,
    /// Each source's own normalized 0-10 value.
    pub breakdown: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// External ids
// ---------------------------------------------------------------------------

/// Native identifiers of the same title in each upstream catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvmaze: Option<u64>,
}

impl ExternalIds {
    /// Overwrite every key for which `other` carries a non-empty value.
    pub fn overlay(&mut self, other: &ExternalIds) {
        if let Some(imdb) = other.imdb.as_deref().filter(|s| !s.is_empty()) {
            self.imdb = Some(imdb.to_string());
        }
        if let Some(tmdb) = other.tmdb.filter(|id| *id != 0) {
            self.tmdb = Some(tmdb);
        }
        if let Some(tvmaze) = other.tvmaze.filter(|id| *id != 0) {
            self.tvmaze = Some(tvmaze);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.imdb.is_none() && self.tmdb.is_none() && self.tvmaze.is_none()
    }
}

/// Which catalog an external id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalIdKind {
    Imdb,
    Tmdb,
    Tvmaze,
}

impl fmt::Display for ExternalIdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExternalIdKind::Imdb => "imdb",
            ExternalIdKind::Tmdb => "tmdb",
            ExternalIdKind::Tvmaze => "tvmaze",
        })
    }
}

// ---------------------------------------------------------------------------
// Movie
// ---------------------------------------------------------------------------

/// Canonical movie record.
///
/// `id` is source-prefixed (`"tmdb-603"`, `"omdb-tt0133093"`, `"tvmaze-82"`).
/// After a merge, `ratings` holds at most one entry per source and `sources`
/// lists every provider that contributed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop: Option<String>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub external_ids: ExternalIds,
    #[serde(default)]
    pub sources: Vec<String>,
    /// Attached by the aggregation service on the way out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregated_rating: Option<AggregatedRating>,
}

impl Movie {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Sum of all rating vote counts, missing counts treated as zero.
    /// Saturates instead of overflowing.
    pub fn total_votes(&self) -> u64 {
        self.ratings
            .iter()
            .filter_map(|r| r.votes)
            .fold(0u64, u64::saturating_add)
    }
}

// ---------------------------------------------------------------------------
// Provider contract
// ---------------------------------------------------------------------------

/// Parameters for a provider keyword search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Outcome of one provider operation.
///
/// Providers never return `Err`; failures are reported with
/// `success == false` and a message in `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub source: String,
}

impl<T> ProviderResponse<T> {
    pub fn ok(source: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            source: source.into(),
        }
    }

    pub fn failure(source: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            source: source.into(),
        }
    }

    /// Build a response from an internal result, flattening the error.
    pub fn from_result<E: fmt::Display>(
        source: impl Into<String>,
        result: std::result::Result<T, E>,
    ) -> Self {
        match result {
            Ok(data) => Self::ok(source, data),
            Err(e) => Self::failure(source, e),
        }
    }

    /// The payload if the call succeeded.
    pub fn into_data(self) -> Option<T> {
        if self.success {
            self.data
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Ordering applied to aggregated search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Relevance,
    YearDesc,
    YearAsc,
    TitleAz,
    TitleZa,
    VotesDesc,
    VotesAsc,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Relevance => "relevance",
            SortMode::YearDesc => "year_desc",
            SortMode::YearAsc => "year_asc",
            SortMode::TitleAz => "title_az",
            SortMode::TitleZa => "title_za",
            SortMode::VotesDesc => "votes_desc",
            SortMode::VotesAsc => "votes_asc",
        }
    }

    /// Parse a mode string; anything unrecognized falls back to relevance.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(SortMode::Relevance),
            "year_desc" => Ok(SortMode::YearDesc),
            "year_asc" => Ok(SortMode::YearAsc),
            "title_az" => Ok(SortMode::TitleAz),
            "title_za" => Ok(SortMode::TitleZa),
            "votes_desc" => Ok(SortMode::VotesDesc),
            "votes_asc" => Ok(SortMode::VotesAsc),
            other => Err(format!("unknown sort mode: {other}")),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_normalization() {
        let rt = Rating::new("rotten_tomatoes", 87.0, 100.0).normalized().unwrap();
        assert!((rt - 8.7).abs() < 1e-9);
        assert_eq!(Rating::new("imdb", 8.0, 10.0).normalized(), Some(8.0));
        assert_eq!(Rating::new("broken", 5.0, 0.0).normalized(), None);
        assert_eq!(Rating::new("over", 12.0, 10.0).normalized(), Some(10.0));
    }

    #[test]
    fn total_votes_saturates() {
        let mut movie = Movie::new("tmdb-1", "Dune");
        for votes in [Some(u64::MAX), None, Some(10)] {
            let mut rating = Rating::new("imdb", 8.0, 10.0);
            rating.votes = votes;
            movie.ratings.push(rating);
        }
        assert_eq!(movie.total_votes(), u64::MAX);
    }

    #[test]
    fn external_ids_overlay_skips_empty() {
        let mut ids = ExternalIds {
            imdb: Some("tt0133093".into()),
            tmdb: Some(603),
            tvmaze: None,
        };
        ids.overlay(&ExternalIds {
            imdb: Some(String::new()),
            tmdb: None,
            tvmaze: Some(82),
        });
        assert_eq!(ids.imdb.as_deref(), Some("tt0133093"));
        assert_eq!(ids.tmdb, Some(603));
        assert_eq!(ids.tvmaze, Some(82));
    }

    #[test]
    fn movie_serializes_camel_case() {
        let mut movie = Movie::new("tmdb-603", "The Matrix");
        movie.original_title = Some("The Matrix".into());
        movie.external_ids.imdb = Some("tt0133093".into());
        movie.ratings.push(Rating::new("tmdb", 8.2, 10.0));

        let json = serde_json::to_value(&movie).unwrap();
        assert_eq!(json["originalTitle"], "The Matrix");
        assert_eq!(json["externalIds"]["imdb"], "tt0133093");
        assert_eq!(json["ratings"][0]["maxValue"], 10.0);
        assert!(json.get("aggregatedRating").is_none());
    }

    #[test]
    fn movie_total_votes() {
        let mut movie = Movie::new("x", "X");
        movie.ratings.push(Rating::new("imdb", 8.0, 10.0).with_votes(100));
        movie.ratings.push(Rating::new("metacritic", 70.0, 100.0));
        movie.ratings.push(Rating::new("tmdb", 7.5, 10.0).with_votes(20));
        assert_eq!(movie.total_votes(), 120);
    }

    #[test]
    fn provider_response_from_result() {
        let ok: ProviderResponse<u32> = ProviderResponse::from_result("tmdb", Ok::<_, String>(3));
        assert!(ok.success);
        assert_eq!(ok.into_data(), Some(3));

        let err: ProviderResponse<u32> =
            ProviderResponse::from_result("omdb", Err::<u32, _>("boom"));
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("boom"));
        assert_eq!(err.into_data(), None);
    }

    #[test]
    fn sort_mode_parsing() {
        assert_eq!(SortMode::parse_lenient("year_desc"), SortMode::YearDesc);
        assert_eq!(SortMode::parse_lenient("title_za"), SortMode::TitleZa);
        assert_eq!(SortMode::parse_lenient("bogus"), SortMode::Relevance);
        assert_eq!(SortMode::VotesAsc.to_string(), "votes_asc");
    }
}
