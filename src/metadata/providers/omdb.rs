//! OMDb ratings database provider.
//!
//! OMDb is keyed by IMDb id and is the source of the IMDb, Rotten Tomatoes,
//! and Metacritic ratings. Search hits carry very little data, so each hit is
//! enriched with a detail lookup (in parallel) before it is returned.

use anyhow::Context;
use async_trait::async_trait;
use futures::future::join_all;
use moviehub_common::{
    ExternalIdKind, ExternalIds, Movie, ProviderResponse, Rating, SearchParams,
};
use serde::{Deserialize, Serialize};

use super::http::{non_empty, parse_year, ProviderHttp};
use crate::config::ProviderConfig;
use crate::metadata::provider::MovieProvider;

pub const OMDB_BASE_URL: &str = "https://www.omdbapi.com";
const PAGE_SIZE: usize = 10;
const MAX_SEARCH_PAGES: u32 = 3;
const DEFAULT_SEARCH_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Public payloads
// ---------------------------------------------------------------------------

/// A bare search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmdbSearchHit {
    pub title: String,
    #[serde(default)]
    pub year: Option<String>,
    pub imdb_id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmdbSearchPage {
    #[serde(default)]
    pub results: Vec<OmdbSearchHit>,
    #[serde(default)]
    pub total_results: u64,
}

/// A full OMDb record with its ratings already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmdbMovieDetails {
    pub imdb_id: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
}

// ---------------------------------------------------------------------------
// OMDb wire types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireSearch {
    #[serde(default)]
    search: Vec<WireSearchHit>,
    #[serde(default, rename = "totalResults")]
    total_results: Option<String>,
    response: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireSearchHit {
    title: String,
    year: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Type")]
    kind: Option<String>,
    poster: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireRating {
    source: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireDetail {
    title: Option<String>,
    year: Option<String>,
    released: Option<String>,
    runtime: Option<String>,
    genre: Option<String>,
    director: Option<String>,
    actors: Option<String>,
    plot: Option<String>,
    poster: Option<String>,
    #[serde(default)]
    ratings: Vec<WireRating>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "imdbVotes")]
    imdb_votes: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    response: String,
    #[serde(default)]
    error: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn split_list(value: Option<String>) -> Vec<String> {
    non_empty(value)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `"136 min"` → 136.
fn parse_runtime(value: Option<&str>) -> Option<u32> {
    value?
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .filter(|n| *n > 0)
}

/// `"1,234,567"` → 1234567.
fn parse_votes(value: Option<&str>) -> Option<u64> {
    let digits: String = value?.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Translate OMDb's per-source rating strings into normalized [`Rating`]s.
fn parse_ratings(detail: &WireDetail) -> Vec<Rating> {
    let mut ratings = Vec::new();

    if let Some(value) = detail
        .imdb_rating
        .as_deref()
        .and_then(|v| v.parse::<f64>().ok())
    {
        let mut rating = Rating::new("imdb", value, 10.0);
        rating.votes = parse_votes(detail.imdb_votes.as_deref());
        ratings.push(rating);
    }

    for wire in &detail.ratings {
        match wire.source.as_str() {
            "Rotten Tomatoes" => {
                if let Ok(value) = wire.value.trim_end_matches('%').parse::<f64>() {
                    ratings.push(Rating::new("rotten_tomatoes", value, 100.0));
                }
            }
            "Metacritic" => {
                let score = wire.value.split('/').next().unwrap_or_default();
                if let Ok(value) = score.parse::<f64>() {
                    ratings.push(Rating::new("metacritic", value, 100.0));
                }
            }
            _ => {}
        }
    }

    ratings
}

fn details_from_wire(detail: WireDetail) -> anyhow::Result<OmdbMovieDetails> {
    if detail.response != "True" {
        anyhow::bail!(
            "OMDb error: {}",
            detail.error.as_deref().unwrap_or("unknown error")
        );
    }
    let ratings = parse_ratings(&detail);
    let imdb_id = non_empty(detail.imdb_id).context("OMDb record without imdbID")?;

    Ok(OmdbMovieDetails {
        imdb_id,
        title: detail.title.unwrap_or_default(),
        year: parse_year(detail.year.as_deref()),
        released: non_empty(detail.released),
        runtime: parse_runtime(detail.runtime.as_deref()),
        genres: split_list(detail.genre),
        directors: split_list(detail.director),
        actors: split_list(detail.actors),
        plot: non_empty(detail.plot),
        poster: non_empty(detail.poster),
        ratings,
    })
}

/// Map a full OMDb record into a [`Movie`].
pub fn movie_from_details(d: &OmdbMovieDetails) -> Movie {
    Movie {
        id: format!("omdb-{}", d.imdb_id),
        title: d.title.clone(),
        year: d.year,
        release_date: d.released.clone(),
        runtime: d.runtime,
        genres: d.genres.clone(),
        directors: d.directors.clone(),
        cast: d.actors.clone(),
        plot: d.plot.clone(),
        poster: d.poster.clone(),
        ratings: d.ratings.clone(),
        external_ids: ExternalIds {
            imdb: Some(d.imdb_id.clone()),
            ..Default::default()
        },
        sources: vec!["omdb".to_string()],
        ..Default::default()
    }
}

/// Map a bare search hit into a [`Movie`].
pub fn movie_from_hit(hit: &OmdbSearchHit) -> Movie {
    Movie {
        id: format!("omdb-{}", hit.imdb_id),
        title: hit.title.clone(),
        year: parse_year(hit.year.as_deref()),
        poster: non_empty(hit.poster.clone()),
        external_ids: ExternalIds {
            imdb: Some(hit.imdb_id.clone()),
            ..Default::default()
        },
        sources: vec!["omdb".to_string()],
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// OMDb provider.
pub struct OmdbProvider {
    http: ProviderHttp,
    api_key: String,
}

impl OmdbProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            http: ProviderHttp::new("omdb", config, OMDB_BASE_URL),
            api_key: config.api_key.clone(),
        }
    }

    fn params(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut params = vec![("apikey", self.api_key.clone())];
        params.extend(extra.iter().cloned());
        params
    }

    /// One page of `?s=` search. "Movie not found!" yields an empty page.
    pub async fn search_page(
        &self,
        query: &str,
        year: Option<i32>,
        kind: Option<&str>,
        page: u32,
    ) -> anyhow::Result<OmdbSearchPage> {
        let mut extra = vec![("s", query.to_string()), ("page", page.max(1).to_string())];
        if let Some(year) = year {
            extra.push(("y", year.to_string()));
        }
        if let Some(kind) = kind {
            extra.push(("type", kind.to_string()));
        }

        let wire: WireSearch = self
            .http
            .get_json("/", &self.params(&extra))
            .await
            .context("OMDb search failed")?;

        if wire.response != "True" {
            let message = wire.error.unwrap_or_default();
            if message.contains("not found") {
                return Ok(OmdbSearchPage::default());
            }
            anyhow::bail!("OMDb error: {}", message);
        }

        Ok(OmdbSearchPage {
            total_results: wire
                .total_results
                .as_deref()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0),
            results: wire
                .search
                .into_iter()
                .map(|h| OmdbSearchHit {
                    title: h.title,
                    year: h.year,
                    imdb_id: h.imdb_id,
                    kind: h.kind,
                    poster: h.poster,
                })
                .collect(),
        })
    }

    /// Full record by IMDb id.
    pub async fn details(&self, imdb_id: &str) -> anyhow::Result<OmdbMovieDetails> {
        let wire: WireDetail = self
            .http
            .get_json(
                "/",
                &self.params(&[("i", imdb_id.to_string()), ("plot", "full".to_string())]),
            )
            .await
            .with_context(|| format!("OMDb lookup failed for {imdb_id}"))?;
        details_from_wire(wire)
    }

    /// Full record by exact title.
    pub async fn details_by_title(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> anyhow::Result<OmdbMovieDetails> {
        let mut extra = vec![("t", title.to_string()), ("plot", "full".to_string())];
        if let Some(year) = year {
            extra.push(("y", year.to_string()));
        }
        let wire: WireDetail = self
            .http
            .get_json("/", &self.params(&extra))
            .await
            .with_context(|| format!("OMDb title lookup failed for {title}"))?;
        details_from_wire(wire)
    }

    async fn collect_search(&self, params: &SearchParams) -> anyhow::Result<Vec<Movie>> {
        let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let mut page = params.page.unwrap_or(1).max(1);
        let last_page = page + MAX_SEARCH_PAGES - 1;
        let mut hits = Vec::new();

        loop {
            let body = self
                .search_page(&params.query, params.year, Some("movie"), page)
                .await?;
            let got = body.results.len();
            hits.extend(body.results);
            let seen = (page as usize) * PAGE_SIZE;
            if hits.len() >= limit || got < PAGE_SIZE || seen as u64 >= body.total_results || page >= last_page {
                break;
            }
            page += 1;
        }
        hits.truncate(limit);

        // Hits only carry title/year/poster; fill in ratings from the detail
        // endpoint and keep the bare hit when that fails.
        let detailed = join_all(hits.iter().map(|hit| self.details(&hit.imdb_id))).await;
        Ok(hits
            .iter()
            .zip(detailed)
            .map(|(hit, detail)| match detail {
                Ok(d) => movie_from_details(&d),
                Err(e) => {
                    tracing::debug!(imdb_id = %hit.imdb_id, error = %e, "OMDb enrichment failed");
                    movie_from_hit(hit)
                }
            })
            .collect())
    }
}

#[async_trait]
impl MovieProvider for OmdbProvider {
    fn name(&self) -> &'static str {
        "omdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search(&self, params: &SearchParams) -> ProviderResponse<Vec<Movie>> {
        ProviderResponse::from_result(
            "omdb",
            self.collect_search(params).await.map_err(|e| format!("{e:#}")),
        )
    }

    async fn get_by_id(&self, id: &str) -> ProviderResponse<Movie> {
        let result = self.details(id).await.map(|d| movie_from_details(&d));
        ProviderResponse::from_result("omdb", result.map_err(|e| format!("{e:#}")))
    }

    async fn get_by_external_id(
        &self,
        external_id: &str,
        kind: ExternalIdKind,
    ) -> ProviderResponse<Movie> {
        match kind {
            ExternalIdKind::Imdb => self.get_by_id(external_id).await,
            other => ProviderResponse::failure("omdb", format!("OMDb cannot resolve {other} ids")),
        }
    }
}
