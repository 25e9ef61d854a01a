//! Process-wide provider registry.
//!
//! A single `id → provider` map built up during process startup by
//! monotonic `register` calls (no unregister), then read concurrently for
//! the rest of the process's life. Generalizes the teacher's `Sources`
//! collection, which kept providers in a `Vec` indexed by a side `HashMap`;
//! here the map is the only index and is protected by a `RwLock` since
//! registration and lookup can happen from different tasks.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::{Error, TrackedError};
use crate::provider::Provider;

/// Maps provider id → provider instance, in registration order.
pub struct Registry {
    providers: RwLock<Vec<Arc<dyn Provider>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
        }
    }

    /// Registers a provider. Duplicate ids are rejected with a
    /// `provider`-category error; registration is otherwise a one-time
    /// assertion, never replaced or removed.
    pub fn register(&self, provider: Arc<dyn Provider>) -> Result<(), TrackedError> {
        let mut providers = self.providers.write();
        if providers.iter().any(|p| p.id() == provider.id()) {
            return Err(TrackedError::from(Error::provider(
                provider.id(),
                "provider already registered",
            )));
        }
        providers.push(provider);
        Ok(())
    }

    /// Looks up a provider by id.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Provider>, TrackedError> {
        self.providers
            .read()
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or_else(|| TrackedError::from(Error::not_found(format!("unknown provider: {id}"))))
    }

    /// Returns every registered provider, in registration order.
    pub fn list(&self) -> Vec<Arc<dyn Provider>> {
        self.providers.read().clone()
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::HttpClient;
    use crate::types::{Chapter, Manga, MangaInfo, SearchOptions};
    use async_trait::async_trait;

    struct Stub {
        id: &'static str,
        client: HttpClient,
    }

    #[async_trait]
    impl Provider for Stub {
        fn id(&self) -> &'static str {
            self.id
        }
        fn name(&self) -> &'static str {
            "Stub"
        }
        fn site_url(&self) -> &str {
            "https://example.com"
        }
        fn http_client(&self) -> &HttpClient {
            &self.client
        }
        async fn search(
            &self,
            _query: &str,
            _options: &SearchOptions,
        ) -> Result<Vec<Manga>, TrackedError> {
            Ok(vec![])
        }
        async fn get_manga(&self, _manga_id: &str) -> Result<MangaInfo, TrackedError> {
            Err(TrackedError::from(crate::error::Error::not_found("stub")))
        }
        async fn get_chapter(&self, _chapter_id: &str) -> Result<Chapter, TrackedError> {
            Err(TrackedError::from(crate::error::Error::not_found("stub")))
        }
    }

    fn stub(id: &'static str) -> Arc<dyn Provider> {
        Arc::new(Stub {
            id,
            client: HttpClient::new(id),
        })
    }

    #[test]
    fn register_rejects_duplicate_id() {
        let registry = Registry::new();
        registry.register(stub("mgd")).unwrap();
        let err = registry.register(stub("mgd")).unwrap_err();
        assert_eq!(err.category(), crate::error::Category::Provider);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let registry = Registry::new();
        let err = registry.get("nope").unwrap_err();
        assert_eq!(err.category(), crate::error::Category::NotFound);
    }

    #[test]
    fn list_preserves_registration_order() {
        let registry = Registry::new();
        registry.register(stub("b")).unwrap();
        registry.register(stub("a")).unwrap();
        let ids: Vec<_> = registry.list().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
