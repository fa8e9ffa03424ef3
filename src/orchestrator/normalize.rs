//! Typed decoding of raw tool outputs and the loose first-seen merge used by
//! the workflow's search branch.

use std::collections::HashSet;

use moviehub_common::{Error, Movie, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::metadata::providers::omdb::{self, OmdbSearchPage};
use crate::metadata::providers::tmdb::{self, TmdbPage};
use crate::metadata::providers::tvmaze;
use crate::tools::local::ShowSearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderTag {
    Tmdb,
    Omdb,
    Tvmaze,
}

impl ProviderTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTag::Tmdb => "tmdb",
            ProviderTag::Omdb => "omdb",
            ProviderTag::Tvmaze => "tvmaze",
        }
    }
}

/// A search tool's output, decoded per provider.
#[derive(Debug, Clone, PartialEq)]
pub enum RawToolOutput {
    Tmdb(TmdbPage),
    Omdb(OmdbSearchPage),
    Tvmaze(ShowSearchResult),
}

impl RawToolOutput {
    pub fn decode(tag: ProviderTag, value: Value) -> Result<Self> {
        let decoded = match tag {
            ProviderTag::Tmdb => serde_json::from_value(value).map(RawToolOutput::Tmdb),
            ProviderTag::Omdb => serde_json::from_value(value).map(RawToolOutput::Omdb),
            ProviderTag::Tvmaze => serde_json::from_value(value).map(RawToolOutput::Tvmaze),
        };
        decoded.map_err(|e| Error::malformed(tag.as_str(), e))
    }

    /// Map into the common shape. Every movie is tagged with its provider.
    pub fn into_movies(self) -> Vec<Movie> {
        match self {
            RawToolOutput::Tmdb(page) => page.results.iter().map(tmdb::movie_from_summary).collect(),
            RawToolOutput::Omdb(page) => page.results.iter().map(omdb::movie_from_hit).collect(),
            RawToolOutput::Tvmaze(found) => found
                .results
                .iter()
                .map(|hit| tvmaze::movie_from_show(&hit.show))
                .collect(),
        }
    }
}

/// Per-provider outputs of one fan-out. `None` means the call failed or was
/// not made.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchBag {
    pub tmdb: Option<Value>,
    pub omdb: Option<Value>,
    pub tvmaze: Option<Value>,
}

impl SearchBag {
    /// Entries in provider priority order.
    fn entries(&self) -> [(ProviderTag, Option<&Value>); 3] {
        [
            (ProviderTag::Tmdb, self.tmdb.as_ref()),
            (ProviderTag::Omdb, self.omdb.as_ref()),
            (ProviderTag::Tvmaze, self.tvmaze.as_ref()),
        ]
    }

    /// Providers that answered.
    pub fn sources(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(_, value)| value.is_some())
            .map(|(tag, _)| tag.as_str().to_string())
            .collect()
    }
}

/// Raw `title-year`; unlike the aggregator's grouping key, case is kept.
fn dedup_key(movie: &Movie) -> String {
    let year = movie.year.map(|y| y.to_string()).unwrap_or_default();
    format!("{}-{}", movie.title, year)
}

/// Drop every movie whose `title-year` key was already seen. No fields are
/// merged.
pub fn dedupe_first_seen(movies: Vec<Movie>) -> Vec<Movie> {
    let mut seen = HashSet::new();
    movies
        .into_iter()
        .filter(|movie| seen.insert(dedup_key(movie)))
        .collect()
}

/// Normalize every answered provider, concatenate in priority order
/// (catalog, ratings, schedule) and suppress duplicates.
pub fn aggregate_search_results(bag: &SearchBag) -> Vec<Movie> {
    let mut all = Vec::new();
    for (tag, value) in bag.entries() {
        let Some(value) = value else {
            debug!(provider = tag.as_str(), "No results to normalize");
            continue;
        };
        match RawToolOutput::decode(tag, value.clone()) {
            Ok(raw) => all.extend(raw.into_movies()),
            Err(e) => warn!(provider = tag.as_str(), error = %e, "Skipping unreadable tool output"),
        }
    }
    let total = all.len();
    let unique = dedupe_first_seen(all);
    debug!(total, unique = unique.len(), "Aggregated workflow search results");
    unique
}
