//! TMDB (The Movie Database) catalog provider.
//!
//! Implements [`MovieProvider`] by querying the TMDB v3 REST API, and exposes
//! the catalog-only queries (popular, discover, by director) used by the
//! `tmdb-provider` tool server.
//!
//! Features:
//! - Token-bucket rate limiting via [`governor`] (configurable, 4 req/s default).
//! - Bounded retry with exponential backoff on 429, 5xx, and transport errors.
//! - Multi-page search collection up to the requested limit.

use anyhow::Context;
use async_trait::async_trait;
use moviehub_common::{
    ExternalIdKind, ExternalIds, Movie, ProviderResponse, Rating, SearchParams,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{non_empty, parse_year, ProviderHttp};
use crate::config::ProviderConfig;
use crate::metadata::provider::MovieProvider;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const MAX_SEARCH_PAGES: u32 = 5;
const DEFAULT_SEARCH_LIMIT: usize = 20;
const MAX_CAST: usize = 10;

/// TMDB's fixed movie genre ids.
const GENRES: &[(u32, &str)] = &[
    (28, "Action"),
    (12, "Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Science Fiction"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
];

/// Display name of a TMDB genre id.
pub fn genre_name(id: u32) -> Option<&'static str> {
    GENRES.iter().find(|(gid, _)| *gid == id).map(|(_, name)| *name)
}

/// Convert a TMDB image path fragment to a full URL.
pub fn image_url(path: &str) -> String {
    format!("{TMDB_IMAGE_BASE}{path}")
}

// ---------------------------------------------------------------------------
// Public payloads
// ---------------------------------------------------------------------------
//
// These are what the `tmdb-provider` tools return. They deserialize from
// TMDB's snake_case wire format and serialize as camelCase.

/// A movie as it appears in TMDB list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmdbMovieSummary {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "original_title")]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default, alias = "release_date")]
    pub release_date: Option<String>,
    #[serde(default, alias = "poster_path")]
    pub poster_path: Option<String>,
    #[serde(default, alias = "backdrop_path")]
    pub backdrop_path: Option<String>,
    #[serde(default, alias = "vote_average")]
    pub vote_average: f64,
    #[serde(default, alias = "vote_count")]
    pub vote_count: u64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default, alias = "genre_ids")]
    pub genre_ids: Vec<u32>,
}

/// One page of TMDB list results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmdbPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<TmdbMovieSummary>,
    #[serde(default, alias = "total_pages")]
    pub total_pages: u32,
    #[serde(default, alias = "total_results")]
    pub total_results: u64,
}

/// Full movie details including credits and external ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmdbMovieDetails {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub cast: Vec<String>,
}

/// Filters for `/discover/movie`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverParams {
    #[serde(default)]
    pub genre_id: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub page: Option<u32>,
}

// ---------------------------------------------------------------------------
// TMDB wire types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireCastMember {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireCrewMember {
    name: String,
    job: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireCredits {
    #[serde(default)]
    cast: Vec<WireCastMember>,
    #[serde(default)]
    crew: Vec<WireCrewMember>,
}

#[derive(Debug, Default, Deserialize)]
struct WireExternalIds {
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMovieDetail {
    id: u64,
    title: Option<String>,
    original_title: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    runtime: Option<u32>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u64,
    #[serde(default)]
    genres: Vec<WireGenre>,
    imdb_id: Option<String>,
    #[serde(default)]
    external_ids: Option<WireExternalIds>,
    #[serde(default)]
    credits: Option<WireCredits>,
}

impl From<WireMovieDetail> for TmdbMovieDetails {
    fn from(w: WireMovieDetail) -> Self {
        let credits = w.credits.unwrap_or_default();
        let imdb_id = non_empty(w.imdb_id)
            .or_else(|| w.external_ids.and_then(|e| non_empty(e.imdb_id)));
        TmdbMovieDetails {
            id: w.id,
            title: w.title.unwrap_or_default(),
            original_title: w.original_title,
            overview: w.overview,
            release_date: w.release_date,
            runtime: w.runtime,
            poster_path: w.poster_path,
            backdrop_path: w.backdrop_path,
            vote_average: w.vote_average,
            vote_count: w.vote_count,
            genres: w.genres.into_iter().map(|g| g.name).collect(),
            imdb_id,
            directors: credits
                .crew
                .into_iter()
                .filter(|c| c.job.as_deref() == Some("Director"))
                .map(|c| c.name)
                .collect(),
            cast: credits
                .cast
                .into_iter()
                .take(MAX_CAST)
                .map(|c| c.name)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireFindResponse {
    #[serde(default)]
    movie_results: Vec<TmdbMovieSummary>,
}

#[derive(Debug, Deserialize)]
struct WirePerson {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct WirePersonSearch {
    #[serde(default)]
    results: Vec<WirePerson>,
}

// ---------------------------------------------------------------------------
// Conversion to the canonical model
// ---------------------------------------------------------------------------

fn tmdb_rating(vote_average: f64, vote_count: u64) -> Option<Rating> {
    (vote_average > 0.0 || vote_count > 0)
        .then(|| Rating::new("tmdb", vote_average, 10.0).with_votes(vote_count))
}

/// Map a list entry into a [`Movie`].
pub fn movie_from_summary(s: &TmdbMovieSummary) -> Movie {
    let poster = s.poster_path.as_deref().or(s.backdrop_path.as_deref());
    let backdrop = s.backdrop_path.as_deref().or(s.poster_path.as_deref());
    let release_date = non_empty(s.release_date.clone());

    Movie {
        id: format!("tmdb-{}", s.id),
        title: s.title.clone(),
        original_title: non_empty(s.original_title.clone()),
        year: parse_year(release_date.as_deref()),
        release_date,
        genres: s
            .genre_ids
            .iter()
            .filter_map(|id| genre_name(*id))
            .map(str::to_string)
            .collect(),
        plot: non_empty(s.overview.clone()),
        poster: poster.map(image_url),
        backdrop: backdrop.map(image_url),
        ratings: tmdb_rating(s.vote_average, s.vote_count).into_iter().collect(),
        external_ids: ExternalIds {
            tmdb: Some(s.id),
            ..Default::default()
        },
        sources: vec!["tmdb".to_string()],
        ..Default::default()
    }
}

/// Map a details record into a [`Movie`].
pub fn movie_from_details(d: &TmdbMovieDetails) -> Movie {
    let poster = d.poster_path.as_deref().or(d.backdrop_path.as_deref());
    let backdrop = d.backdrop_path.as_deref().or(d.poster_path.as_deref());
    let release_date = non_empty(d.release_date.clone());

    Movie {
        id: format!("tmdb-{}", d.id),
        title: d.title.clone(),
        original_title: non_empty(d.original_title.clone()),
        year: parse_year(release_date.as_deref()),
        release_date,
        runtime: d.runtime.filter(|r| *r > 0),
        genres: d.genres.clone(),
        directors: d.directors.clone(),
        cast: d.cast.clone(),
        plot: non_empty(d.overview.clone()),
        poster: poster.map(image_url),
        backdrop: backdrop.map(image_url),
        ratings: tmdb_rating(d.vote_average, d.vote_count).into_iter().collect(),
        external_ids: ExternalIds {
            imdb: d.imdb_id.clone(),
            tmdb: Some(d.id),
            tvmaze: None,
        },
        sources: vec!["tmdb".to_string()],
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// TMDB catalog provider.
///
/// # Examples
///
/// ```no_run
/// use moviehub::config::Config;
/// use moviehub::metadata::providers::TmdbProvider;
///
/// let config = Config::default();
/// let provider = TmdbProvider::new(&config.providers.tmdb);
/// ```
pub struct TmdbProvider {
    http: ProviderHttp,
    api_key: String,
    language: String,
}

impl TmdbProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            http: ProviderHttp::new("tmdb", config, TMDB_BASE_URL),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        }
    }

    /// Query pairs every TMDB request carries.
    fn params(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("language", self.language.clone()),
        ];
        params.extend(extra.iter().cloned());
        params
    }

    /// One page of `/search/movie`.
    pub async fn search_page(
        &self,
        query: &str,
        year: Option<i32>,
        page: u32,
    ) -> anyhow::Result<TmdbPage> {
        let mut extra = vec![("query", query.to_string()), ("page", page.max(1).to_string())];
        if let Some(year) = year {
            extra.push(("year", year.to_string()));
        }
        self.http
            .get_json("/search/movie", &self.params(&extra))
            .await
            .context("TMDB search failed")
    }

    pub async fn popular(&self, page: u32) -> anyhow::Result<TmdbPage> {
        self.http
            .get_json("/movie/popular", &self.params(&[("page", page.max(1).to_string())]))
            .await
            .context("TMDB popular movies failed")
    }

    pub async fn discover(&self, params: &DiscoverParams) -> anyhow::Result<TmdbPage> {
        let mut extra = vec![
            (
                "sort_by",
                params
                    .sort_by
                    .clone()
                    .unwrap_or_else(|| "popularity.desc".to_string()),
            ),
            ("page", params.page.unwrap_or(1).max(1).to_string()),
        ];
        if let Some(genre) = params.genre_id {
            extra.push(("with_genres", genre.to_string()));
        }
        if let Some(year) = params.year {
            extra.push(("primary_release_year", year.to_string()));
        }
        self.http
            .get_json("/discover/movie", &self.params(&extra))
            .await
            .context("TMDB discover failed")
    }

    /// Movies crewed by the best-matching person for `name`.
    ///
    /// Returns an empty page when no person matches.
    pub async fn search_by_director(&self, name: &str, page: u32) -> anyhow::Result<TmdbPage> {
        let people: WirePersonSearch = self
            .http
            .get_json("/search/person", &self.params(&[("query", name.to_string())]))
            .await
            .context("TMDB person search failed")?;

        let Some(person) = people.results.first() else {
            debug!(director = name, "No TMDB person matched");
            return Ok(TmdbPage::default());
        };

        self.http
            .get_json(
                "/discover/movie",
                &self.params(&[
                    ("with_crew", person.id.to_string()),
                    ("sort_by", "popularity.desc".to_string()),
                    ("page", page.max(1).to_string()),
                ]),
            )
            .await
            .context("TMDB director discover failed")
    }

    pub async fn details(&self, id: u64) -> anyhow::Result<TmdbMovieDetails> {
        let wire: WireMovieDetail = self
            .http
            .get_json(
                &format!("/movie/{id}"),
                &self.params(&[("append_to_response", "external_ids,credits".to_string())]),
            )
            .await
            .with_context(|| format!("TMDB details failed for {id}"))?;
        Ok(wire.into())
    }

    /// Resolve an IMDb id to a TMDB movie, if TMDB knows it.
    pub async fn find_by_imdb(&self, imdb_id: &str) -> anyhow::Result<Option<TmdbMovieSummary>> {
        let found: WireFindResponse = self
            .http
            .get_json(
                &format!("/find/{imdb_id}"),
                &self.params(&[("external_source", "imdb_id".to_string())]),
            )
            .await
            .with_context(|| format!("TMDB find failed for {imdb_id}"))?;
        Ok(found.movie_results.into_iter().next())
    }

    async fn collect_search(&self, params: &SearchParams) -> anyhow::Result<Vec<Movie>> {
        let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let mut page = params.page.unwrap_or(1).max(1);
        let last_page = page + MAX_SEARCH_PAGES - 1;
        let mut movies = Vec::new();

        loop {
            let body = self.search_page(&params.query, params.year, page).await?;
            movies.extend(body.results.iter().map(movie_from_summary));
            if movies.len() >= limit || page >= body.total_pages || page >= last_page {
                break;
            }
            page += 1;
        }

        movies.truncate(limit);
        Ok(movies)
    }

    async fn lookup(&self, id: &str) -> anyhow::Result<Movie> {
        let id: u64 = id
            .parse()
            .with_context(|| format!("invalid TMDB id: {id}"))?;
        Ok(movie_from_details(&self.details(id).await?))
    }

    async fn lookup_external(&self, external_id: &str, kind: ExternalIdKind) -> anyhow::Result<Movie> {
        match kind {
            ExternalIdKind::Tmdb => self.lookup(external_id).await,
            ExternalIdKind::Imdb => {
                let summary = self
                    .find_by_imdb(external_id)
                    .await?
                    .with_context(|| format!("no TMDB movie for {external_id}"))?;
                self.lookup(&summary.id.to_string()).await
            }
            ExternalIdKind::Tvmaze => anyhow::bail!("TMDB cannot resolve TVMaze ids"),
        }
    }
}

#[async_trait]
impl MovieProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search(&self, params: &SearchParams) -> ProviderResponse<Vec<Movie>> {
        ProviderResponse::from_result(
            "tmdb",
            self.collect_search(params).await.map_err(|e| format!("{e:#}")),
        )
    }

    async fn get_by_id(&self, id: &str) -> ProviderResponse<Movie> {
        ProviderResponse::from_result(
            "tmdb",
            self.lookup(id).await.map_err(|e| format!("{e:#}")),
        )
    }

    async fn get_by_external_id(
        &self,
        external_id: &str,
        kind: ExternalIdKind,
    ) -> ProviderResponse<Movie> {
        ProviderResponse::from_result(
            "tmdb",
            self.lookup_external(external_id, kind)
                .await
                .map_err(|e| format!("{e:#}")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> TmdbProvider {
        let mut config: ProviderConfig = toml::from_str("").unwrap();
        config.api_key = "test-key".into();
        config.base_url = server.uri();
        config.requests_per_second = 100;
        config.retry_base_delay_ms = 1;
        TmdbProvider::new(&config)
    }

    fn matrix_summary() -> serde_json::Value {
        json!({
            "id": 603,
            "title": "The Matrix",
            "original_title": "The Matrix",
            "overview": "A hacker learns the truth.",
            "release_date": "1999-03-30",
            "poster_path": "/poster.jpg",
            "backdrop_path": null,
            "vote_average": 8.2,
            "vote_count": 24000,
            "popularity": 80.5,
            "genre_ids": [28, 878]
        })
    }

    #[test]
    fn image_url_construction() {
        assert_eq!(
            image_url("/abc123.jpg"),
            "https://image.tmdb.org/t/p/w500/abc123.jpg"
        );
    }

    #[test]
    fn genre_lookup() {
        assert_eq!(genre_name(878), Some("Science Fiction"));
        assert_eq!(genre_name(1), None);
    }

    #[test]
    fn summary_maps_to_movie() {
        let summary: TmdbMovieSummary = serde_json::from_value(matrix_summary()).unwrap();
        let movie = movie_from_summary(&summary);

        assert_eq!(movie.id, "tmdb-603");
        assert_eq!(movie.year, Some(1999));
        assert_eq!(movie.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(movie.poster.as_deref(), Some("https://image.tmdb.org/t/p/w500/poster.jpg"));
        // Backdrop falls back to the poster.
        assert_eq!(movie.backdrop, movie.poster);
        assert_eq!(movie.ratings, vec![Rating::new("tmdb", 8.2, 10.0).with_votes(24000)]);
        assert_eq!(movie.external_ids.tmdb, Some(603));
        assert_eq!(movie.sources, vec!["tmdb"]);
    }

    #[test]
    fn summary_serializes_camel_case() {
        let summary: TmdbMovieSummary = serde_json::from_value(matrix_summary()).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["posterPath"], "/poster.jpg");
        assert_eq!(json["voteCount"], 24000);
        // And reads back from its own output.
        let again: TmdbMovieSummary = serde_json::from_value(json).unwrap();
        assert_eq!(again, summary);
    }

    #[test]
    fn provider_is_available() {
        let mut config: ProviderConfig = toml::from_str("").unwrap();
        assert!(!TmdbProvider::new(&config).is_available());
        config.api_key = "key".into();
        let provider = TmdbProvider::new(&config);
        assert!(provider.is_available());
        assert_eq!(provider.name(), "tmdb");
    }

    #[tokio::test]
    async fn search_collects_pages_until_limit() {
        let server = MockServer::start().await;
        let mut second = matrix_summary();
        second["id"] = json!(604);
        second["title"] = json!("The Matrix Reloaded");

        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("page", "1"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1, "results": [matrix_summary()], "total_pages": 3, "total_results": 3
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 2, "results": [second], "total_pages": 3, "total_results": 3
            })))
            .mount(&server)
            .await;

        let response = provider(&server)
            .search(&SearchParams::new("matrix").with_limit(2))
            .await;
        assert!(response.success);
        let movies = response.data.unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[1].id, "tmdb-604");
    }

    #[tokio::test]
    async fn search_failure_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let response = provider(&server).search(&SearchParams::new("x")).await;
        assert!(!response.success);
        assert_eq!(response.source, "tmdb");
        assert!(response.error.unwrap().contains("401"));
    }

    #[tokio::test]
    async fn get_by_id_reads_credits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .and(query_param("append_to_response", "external_ids,credits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 603,
                "title": "The Matrix",
                "release_date": "1999-03-30",
                "runtime": 136,
                "vote_average": 8.2,
                "vote_count": 24000,
                "genres": [{"id": 28, "name": "Action"}],
                "external_ids": {"imdb_id": "tt0133093"},
                "credits": {
                    "cast": [{"name": "Keanu Reeves"}, {"name": "Carrie-Anne Moss"}],
                    "crew": [
                        {"name": "Lana Wachowski", "job": "Director"},
                        {"name": "Bill Pope", "job": "Director of Photography"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let movie = provider(&server).get_by_id("603").await.into_data().unwrap();
        assert_eq!(movie.runtime, Some(136));
        assert_eq!(movie.directors, vec!["Lana Wachowski"]);
        assert_eq!(movie.cast, vec!["Keanu Reeves", "Carrie-Anne Moss"]);
        assert_eq!(movie.external_ids.imdb.as_deref(), Some("tt0133093"));
    }

    #[tokio::test]
    async fn get_by_id_rejects_non_numeric_ids() {
        let server = MockServer::start().await;
        let response = provider(&server).get_by_id("abc").await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("invalid TMDB id"));
    }

    #[tokio::test]
    async fn external_imdb_lookup_goes_through_find() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/find/tt0133093"))
            .and(query_param("external_source", "imdb_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "movie_results": [matrix_summary()]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 603, "title": "The Matrix", "imdb_id": "tt0133093"
            })))
            .mount(&server)
            .await;

        let movie = provider(&server)
            .get_by_external_id("tt0133093", ExternalIdKind::Imdb)
            .await
            .into_data()
            .unwrap();
        assert_eq!(movie.id, "tmdb-603");

        let unsupported = provider(&server)
            .get_by_external_id("82", ExternalIdKind::Tvmaze)
            .await;
        assert!(!unsupported.success);
    }

    #[tokio::test]
    async fn director_search_returns_empty_page_without_person() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/person"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let page = provider(&server).search_by_director("Nobody", 1).await.unwrap();
        assert!(page.results.is_empty());
    }
}
