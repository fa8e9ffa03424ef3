//! Provider registry for managing multiple [`MovieProvider`] implementations.

use std::sync::Arc;

use super::provider::MovieProvider;

/// An ordered collection of catalog providers.
///
/// Registration order is significant: it is the fan-out order used by search
/// and the priority order when results are concatenated. Registering a second
/// provider under an existing name replaces the first in place.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use moviehub::metadata::registry::ProviderRegistry;
///
/// let mut registry = ProviderRegistry::new();
/// registry.register(Arc::new(my_provider));
/// let tmdb = registry.get("tmdb");
/// ```
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MovieProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry with no providers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any existing one with the same name.
    pub fn register(&mut self, provider: Arc<dyn MovieProvider>) {
        match self.providers.iter().position(|p| p.name() == provider.name()) {
            Some(idx) => self.providers[idx] = provider,
            None => self.providers.push(provider),
        }
    }

    /// Look up a provider by its [`MovieProvider::name`].
    pub fn get(&self, name: &str) -> Option<Arc<dyn MovieProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    /// All registered providers in registration order.
    pub fn list(&self) -> &[Arc<dyn MovieProvider>] {
        &self.providers
    }

    /// Providers that are currently configured to serve requests.
    pub fn available(&self) -> Vec<Arc<dyn MovieProvider>> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .cloned()
            .collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
