//! TVMaze schedule database provider.
//!
//! TVMaze needs no API key. Its records are shows rather than films, so they
//! mostly contribute cast, artwork, and an extra rating to merged records.

use std::sync::LazyLock;

use anyhow::Context;
use async_trait::async_trait;
use moviehub_common::{
    ExternalIdKind, ExternalIds, Movie, ProviderResponse, Rating, SearchParams,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::http::{non_empty, parse_year, ProviderHttp};
use crate::config::ProviderConfig;
use crate::metadata::provider::MovieProvider;

pub const TVMAZE_BASE_URL: &str = "https://api.tvmaze.com";
const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_CAST: usize = 10;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("HTML tag regex is valid"));

/// Remove HTML tags from a TVMaze summary.
pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").trim().to_string()
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TvmazeImage {
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub original: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TvmazeRating {
    #[serde(default)]
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TvmazeExternals {
    #[serde(default)]
    pub imdb: Option<String>,
}

/// A show as TVMaze returns it. The same shape is used on the wire and in
/// tool payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvmazeShow {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub premiered: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub image: Option<TvmazeImage>,
    #[serde(default)]
    pub rating: TvmazeRating,
    #[serde(default)]
    pub externals: TvmazeExternals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvmazeSearchHit {
    #[serde(default)]
    pub score: f64,
    pub show: TvmazeShow,
}

#[derive(Debug, Deserialize)]
struct WireCastMember {
    person: WirePerson,
}

#[derive(Debug, Deserialize)]
struct WirePerson {
    name: String,
}

/// Map a show into a [`Movie`].
pub fn movie_from_show(show: &TvmazeShow) -> Movie {
    let image = show.image.clone().unwrap_or_default();
    let medium = non_empty(image.medium);
    let original = non_empty(image.original);
    let premiered = non_empty(show.premiered.clone());

    let ratings = show
        .rating
        .average
        .filter(|avg| *avg > 0.0)
        .map(|avg| Rating::new("tvmaze", avg, 10.0))
        .into_iter()
        .collect();

    Movie {
        id: format!("tvmaze-{}", show.id),
        title: show.name.clone(),
        year: parse_year(premiered.as_deref()),
        release_date: premiered,
        runtime: show.runtime.filter(|r| *r > 0),
        genres: show.genres.clone(),
        plot: show
            .summary
            .as_deref()
            .map(strip_html)
            .filter(|s| !s.is_empty()),
        poster: medium.clone().or_else(|| original.clone()),
        backdrop: original.or(medium),
        ratings,
        external_ids: ExternalIds {
            imdb: non_empty(show.externals.imdb.clone()),
            tvmaze: Some(show.id),
            ..Default::default()
        },
        sources: vec!["tvmaze".to_string()],
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// TVMaze provider.
pub struct TvmazeProvider {
    http: ProviderHttp,
}

impl TvmazeProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            http: ProviderHttp::new("tvmaze", config, TVMAZE_BASE_URL),
        }
    }

    pub async fn search_shows(&self, query: &str) -> anyhow::Result<Vec<TvmazeSearchHit>> {
        self.http
            .get_json("/search/shows", &[("q", query.to_string())])
            .await
            .context("TVMaze search failed")
    }

    pub async fn show(&self, id: u64) -> anyhow::Result<TvmazeShow> {
        self.http
            .get_json(&format!("/shows/{id}"), &[])
            .await
            .with_context(|| format!("TVMaze show lookup failed for {id}"))
    }

    /// Top-billed cast names. Failures are logged and yield an empty list.
    pub async fn cast(&self, id: u64) -> Vec<String> {
        match self
            .http
            .get_json::<Vec<WireCastMember>>(&format!("/shows/{id}/cast"), &[])
            .await
        {
            Ok(cast) => cast
                .into_iter()
                .take(MAX_CAST)
                .map(|c| c.person.name)
                .collect(),
            Err(e) => {
                tracing::debug!(show_id = id, error = %e, "TVMaze cast lookup failed");
                Vec::new()
            }
        }
    }

    pub async fn lookup_imdb(&self, imdb_id: &str) -> anyhow::Result<TvmazeShow> {
        self.http
            .get_json("/lookup/shows", &[("imdb", imdb_id.to_string())])
            .await
            .with_context(|| format!("TVMaze lookup failed for {imdb_id}"))
    }

    async fn lookup(&self, id: &str) -> anyhow::Result<Movie> {
        let id: u64 = id
            .parse()
            .with_context(|| format!("invalid TVMaze id: {id}"))?;
        let (show, cast) = tokio::join!(self.show(id), self.cast(id));
        let mut movie = movie_from_show(&show?);
        movie.cast = cast;
        Ok(movie)
    }

    async fn lookup_external(&self, external_id: &str, kind: ExternalIdKind) -> anyhow::Result<Movie> {
        match kind {
            ExternalIdKind::Imdb => {
                let show = self.lookup_imdb(external_id).await?;
                let mut movie = movie_from_show(&show);
                movie.cast = self.cast(show.id).await;
                Ok(movie)
            }
            ExternalIdKind::Tvmaze => self.lookup(external_id).await,
            ExternalIdKind::Tmdb => anyhow::bail!("TVMaze only supports IMDb lookups"),
        }
    }
}

#[async_trait]
impl MovieProvider for TvmazeProvider {
    fn name(&self) -> &'static str {
        "tvmaze"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn search(&self, params: &SearchParams) -> ProviderResponse<Vec<Movie>> {
        let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let result = self.search_shows(&params.query).await.map(|hits| {
            hits.iter()
                .take(limit)
                .map(|hit| movie_from_show(&hit.show))
                .collect::<Vec<_>>()
        });
        ProviderResponse::from_result("tvmaze", result.map_err(|e| format!("{e:#}")))
    }

    async fn get_by_id(&self, id: &str) -> ProviderResponse<Movie> {
        ProviderResponse::from_result(
            "tvmaze",
            self.lookup(id).await.map_err(|e| format!("{e:#}")),
        )
    }

    async fn get_by_external_id(
        &self,
        external_id: &str,
        kind: ExternalIdKind,
    ) -> ProviderResponse<Movie> {
        ProviderResponse::from_result(
            "tvmaze",
            self.lookup_external(external_id, kind)
                .await
                .map_err(|e| format!("{e:#}")),
        )
    }
}
