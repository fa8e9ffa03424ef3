//! Search and detail aggregation across all registered providers.
//!
//! Every provider call runs concurrently with its own timeout and the service
//! waits for all of them to settle. A failing provider only removes its own
//! contribution; the rest of the result is still merged, ranked, and
//! returned.

use std::future::Future;
use std::time::Duration;

use futures::future::{join_all, BoxFuture, FutureExt};
use moviehub_common::{
    Error, ExternalIdKind, Movie, ProviderResponse, Result, SearchParams, SortMode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::aggregator::{deduplicate_movies, merge_movies, sort_movies, with_aggregated_rating};
use super::provider::split_movie_id;
use super::registry::ProviderRegistry;
use crate::cache::CacheManager;
use crate::config::AggregationConfig;

/// A keyword search against every provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub sort: SortMode,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// How one provider fared during a fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub source: String,
    pub success: bool,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// True when at least one provider answered.
    pub success: bool,
    pub data: Vec<Movie>,
    /// Number of distinct titles before the limit was applied.
    pub total_results: usize,
    pub providers: Vec<ProviderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub cached: bool,
}

/// The search aggregation orchestrator.
#[derive(Clone)]
pub struct AggregationService {
    providers: ProviderRegistry,
    cache: CacheManager,
    provider_timeout: Duration,
    default_limit: usize,
    search_ttl: Duration,
    details_ttl: Duration,
}

impl AggregationService {
    pub fn new(providers: ProviderRegistry, cache: CacheManager, config: &AggregationConfig) -> Self {
        Self {
            providers,
            cache,
            provider_timeout: Duration::from_secs(config.provider_timeout_secs),
            default_limit: config.default_limit,
            search_ttl: Duration::from_secs(config.search_ttl_secs),
            details_ttl: Duration::from_secs(config.details_ttl_secs),
        }
    }

    /// Override the per-provider timeout.
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Run `call` against `provider` with the per-provider timeout.
    async fn settle<T>(
        &self,
        provider: &str,
        call: impl Future<Output = ProviderResponse<T>>,
    ) -> ProviderResponse<T> {
        match tokio::time::timeout(self.provider_timeout, call).await {
            Ok(response) => response,
            Err(_) => ProviderResponse::failure(
                provider,
                format!("timed out after {}ms", self.provider_timeout.as_millis()),
            ),
        }
    }

    /// Fan out a keyword search, merge duplicates, rank, and trim to the limit.
    ///
    /// The assembled response is cached only when at least one provider
    /// succeeded. A cache hit skips the fan-out entirely.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(Error::Validation("query parameter is required".into()));
        }

        let key = self.cache.search_key(query, request.year, request.sort.as_str());
        if let Some(mut cached) = self.cache.get::<SearchResponse>(&key).await {
            info!(query, "Returning cached aggregated results");
            cached.cached = true;
            return Ok(cached);
        }

        let limit = request.limit.unwrap_or(self.default_limit).max(1);
        let params = SearchParams {
            query: query.to_string(),
            year: request.year,
            page: request.page,
            limit: Some(limit),
        };

        info!(query, providers = self.providers.len(), "Aggregating search");

        let calls = self.providers.list().iter().map(|provider| {
            let params = &params;
            async move {
                if !provider.is_available() {
                    return ProviderResponse::failure(provider.name(), "provider not configured");
                }
                self.settle(provider.name(), provider.search(params)).await
            }
        });
        let responses = join_all(calls).await;

        let mut statuses = Vec::with_capacity(responses.len());
        let mut all_movies = Vec::new();
        for response in responses {
            let status = ProviderStatus {
                source: response.source.clone(),
                success: response.success,
                count: response.data.as_ref().map_or(0, Vec::len),
                error: response.error.clone(),
            };
            if status.success {
                debug!(provider = %status.source, count = status.count, "Provider answered");
            } else {
                warn!(
                    provider = %status.source,
                    error = status.error.as_deref().unwrap_or("unknown"),
                    "Provider search failed"
                );
            }
            statuses.push(status);
            if let Some(movies) = response.into_data() {
                all_movies.extend(movies);
            }
        }

        let any_success = statuses.iter().any(|s| s.success);
        let unique = deduplicate_movies(&all_movies);
        let sorted = sort_movies(&unique, request.sort, Some(query));
        let total_results = sorted.len();
        let data: Vec<Movie> = sorted
            .into_iter()
            .take(limit)
            .map(with_aggregated_rating)
            .collect();

        let response = SearchResponse {
            success: any_success,
            data,
            total_results,
            providers: statuses,
            error: (!any_success).then(|| "all providers failed".to_string()),
            cached: false,
        };

        if any_success {
            self.cache.set(&key, &response, self.search_ttl).await;
        } else {
            warn!(query, "Skipping cache, every provider failed");
        }

        Ok(response)
    }

    /// Fetch one movie from its owning provider and enrich it from the others.
    ///
    /// Fails with `NotFound` when the id prefix names no registered provider
    /// or the owning provider cannot resolve it. Enrichment failures are
    /// logged and ignored.
    pub async fn get_movie_details(&self, id: &str) -> Result<Movie> {
        let key = self.cache.movie_key(id);
        if let Some(cached) = self.cache.get::<Movie>(&key).await {
            info!(id, "Returning cached movie details");
            return Ok(cached);
        }

        let (prefix, native_id) = split_movie_id(id).ok_or_else(|| Error::not_found("movie", id))?;
        let primary_provider = self
            .providers
            .get(prefix)
            .ok_or_else(|| Error::not_found("movie", id))?;

        let primary = self
            .settle(prefix, primary_provider.get_by_id(native_id))
            .await;
        let primary = match primary.into_data() {
            Some(movie) => movie,
            None => {
                warn!(id, "Primary provider could not resolve movie");
                return Err(Error::not_found("movie", id));
            }
        };

        let enrichments = self.enrichment_calls(prefix, &primary);
        debug!(id, calls = enrichments.len(), "Enriching movie details");
        let extra = join_all(enrichments).await;

        let mut records = vec![primary];
        for response in extra {
            let source = response.source.clone();
            match response.into_data() {
                Some(movie) => records.push(movie),
                None => debug!(id, provider = %source, "Enrichment lookup failed"),
            }
        }

        let merged = with_aggregated_rating(merge_movies(&records)?);
        self.cache.set(&key, &merged, self.details_ttl).await;
        Ok(merged)
    }

    /// Lookups against the non-owning providers using the primary record's
    /// external ids.
    fn enrichment_calls<'a>(
        &'a self,
        owner: &str,
        primary: &Movie,
    ) -> Vec<BoxFuture<'a, ProviderResponse<Movie>>> {
        let ids = &primary.external_ids;
        let mut calls: Vec<BoxFuture<'a, ProviderResponse<Movie>>> = Vec::new();

        for provider in self.providers.list() {
            let name = provider.name();
            if name == owner || !provider.is_available() {
                continue;
            }
            let provider = provider.clone();

            let native = match name {
                "tmdb" => ids.tmdb.map(|v| v.to_string()),
                "tvmaze" => ids.tvmaze.map(|v| v.to_string()),
                "omdb" => ids.imdb.clone(),
                _ => None,
            };

            if let Some(native) = native {
                calls.push(
                    async move { self.settle(name, provider.get_by_id(&native)).await }.boxed(),
                );
            } else if let Some(imdb) = ids.imdb.clone() {
                calls.push(
                    async move {
                        self.settle(name, provider.get_by_external_id(&imdb, ExternalIdKind::Imdb))
                            .await
                    }
                    .boxed(),
                );
            }
        }

        calls
    }

    /// Merge caller-supplied records and attach their aggregated rating.
    pub fn merge(&self, movies: &[Movie]) -> Result<Movie> {
        Ok(with_aggregated_rating(merge_movies(movies)?))
    }
}
