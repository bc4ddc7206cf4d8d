//! Cached model catalog.
//!
//! The model list and default model change rarely; both are fetched
//! together and shared process-wide for ten minutes.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::warn;

use crate::backend::{BackendClient, BackendError};

const CACHE_TTL: Duration = Duration::from_secs(600);
const CACHE_KEY: &str = "models";

/// The available models and the backend's default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub models: Vec<String>,
    pub default_model: String,
}

/// Process-wide model catalog with a 10-minute cache.
#[derive(Clone)]
pub struct ModelCatalog {
    backend: BackendClient,
    cache: Cache<&'static str, Arc<ModelInfo>>,
}

impl ModelCatalog {
    /// Create a catalog with the standard 10-minute TTL.
    #[must_use]
    pub fn new(backend: BackendClient) -> Self {
        Self::with_ttl(backend, CACHE_TTL)
    }

    /// Create a catalog with a custom TTL. Used by tests.
    #[must_use]
    pub fn with_ttl(backend: BackendClient, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { backend, cache }
    }

    /// The cached catalog, fetching on a miss.
    ///
    /// A failed fetch is retried once before the error surfaces.
    ///
    /// # Errors
    ///
    /// Returns an error if both fetch attempts fail.
    pub async fn info(&self) -> Result<Arc<ModelInfo>, BackendError> {
        if let Some(info) = self.cache.get(&CACHE_KEY).await {
            return Ok(info);
        }

        let info = Arc::new(self.fetch_with_retry().await?);
        self.cache.insert(CACHE_KEY, Arc::clone(&info)).await;
        Ok(info)
    }

    /// The cached model list.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be fetched.
    pub async fn models(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.info().await?.models.clone())
    }

    /// The cached default model name.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be fetched.
    pub async fn default_model(&self) -> Result<String, BackendError> {
        Ok(self.info().await?.default_model.clone())
    }

    /// Drop the cached entry, forcing a refetch on the next access.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&CACHE_KEY).await;
    }

    async fn fetch_with_retry(&self) -> Result<ModelInfo, BackendError> {
        match self.fetch().await {
            Ok(info) => Ok(info),
            Err(first) => {
                warn!(error = %first, "Model catalog fetch failed, retrying once");
                self.fetch().await
            }
        }
    }

    async fn fetch(&self) -> Result<ModelInfo, BackendError> {
        let models = self.backend.model_list().await?;
        let default_model = self.backend.default_model().await?;
        Ok(ModelInfo {
            models,
            default_model,
        })
    }
}
