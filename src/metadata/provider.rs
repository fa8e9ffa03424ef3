//! Trait definition for movie catalog providers.
//!
//! This module defines the [`MovieProvider`] trait that every upstream catalog
//! adapter (TMDB, OMDb, TVMaze) implements. Adapters translate one upstream
//! API into the shared [`Movie`] shape and tag each record with its source.

use async_trait::async_trait;
use moviehub_common::{ExternalIdKind, Movie, ProviderResponse, SearchParams};

/// Async trait that all catalog providers must implement.
///
/// Every operation reports failure through [`ProviderResponse::success`]
/// rather than an `Err`, so callers can fan out to several providers and keep
/// whatever succeeded. Implementations must be safe to call concurrently.
#[async_trait]
pub trait MovieProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"tmdb"`).
    ///
    /// Also used as the prefix of the movie ids it produces.
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider has the credentials it needs.
    fn is_available(&self) -> bool;

    /// Keyword search, optionally constrained by year.
    async fn search(&self, params: &SearchParams) -> ProviderResponse<Vec<Movie>>;

    /// Fetch one record by this provider's native id (without prefix).
    async fn get_by_id(&self, id: &str) -> ProviderResponse<Movie>;

    /// Resolve a record through another catalog's id.
    async fn get_by_external_id(
        &self,
        external_id: &str,
        kind: ExternalIdKind,
    ) -> ProviderResponse<Movie>;
}

/// Split a prefixed movie id such as `"tmdb-603"` into provider and native id.
pub fn split_movie_id(id: &str) -> Option<(&str, &str)> {
    let (prefix, native) = id.split_once('-')?;
    if prefix.is_empty() || native.is_empty() {
        return None;
    }
    Some((prefix, native))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_prefixed_ids() {
        assert_eq!(split_movie_id("tmdb-603"), Some(("tmdb", "603")));
        assert_eq!(split_movie_id("omdb-tt0133093"), Some(("omdb", "tt0133093")));
        assert_eq!(split_movie_id("tvmaze-82"), Some(("tvmaze", "82")));
        assert_eq!(split_movie_id("603"), None);
        assert_eq!(split_movie_id("tmdb-"), None);
        assert_eq!(split_movie_id("-603"), None);
    }
}
