//! Movie metadata from multiple upstream catalogs.
//!
//! # Module layout
//!
//! - [`provider`] -- The [`MovieProvider`] adapter trait.
//! - [`providers`] -- TMDB, OMDb, and TVMaze adapters.
//! - [`registry`] -- Ordered provider registry for multi-source lookups.
//! - [`aggregator`] -- Pure merge, dedupe, rating, and ranking functions.
//! - [`aggregation`] -- Concurrent search and detail aggregation with caching.

pub mod aggregation;
pub mod aggregator;
pub mod provider;
pub mod providers;
pub mod registry;

pub use aggregation::{AggregationService, ProviderStatus, SearchRequest, SearchResponse};
pub use provider::MovieProvider;
pub use registry::ProviderRegistry;

use std::sync::Arc;

use crate::config::ProvidersConfig;
use providers::{OmdbProvider, TmdbProvider, TvmazeProvider};

/// The concrete adapters for every enabled upstream.
///
/// Aggregation only needs the [`MovieProvider`] view; the tool servers also
/// use the catalog-specific queries, so both are built from the same handles.
#[derive(Clone, Default)]
pub struct ProviderSet {
    pub tmdb: Option<Arc<TmdbProvider>>,
    pub omdb: Option<Arc<OmdbProvider>>,
    pub tvmaze: Option<Arc<TvmazeProvider>>,
}

impl ProviderSet {
    pub fn from_config(config: &ProvidersConfig) -> Self {
        Self {
            tmdb: config
                .tmdb
                .enabled
                .then(|| Arc::new(TmdbProvider::new(&config.tmdb))),
            omdb: config
                .omdb
                .enabled
                .then(|| Arc::new(OmdbProvider::new(&config.omdb))),
            tvmaze: config
                .tvmaze
                .enabled
                .then(|| Arc::new(TvmazeProvider::new(&config.tvmaze))),
        }
    }

    /// Registry in fan-out priority order: catalog, ratings, schedule.
    pub fn registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        if let Some(tmdb) = &self.tmdb {
            registry.register(tmdb.clone());
        }
        if let Some(omdb) = &self.omdb {
            registry.register(omdb.clone());
        }
        if let Some(tvmaze) = &self.tvmaze {
            registry.register(tvmaze.clone());
        }
        tracing::debug!(providers = ?registry.names(), "Provider registry built");
        registry
    }
}
