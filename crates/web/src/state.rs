//! Shared application state.

use std::sync::Arc;

use crate::backend::BackendClient;
use crate::config::WebConfig;
use crate::error::AppError;
use crate::services::ModelCatalog;
use crate::store::PrototypeStore;

/// Application state shared across all request handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    backend: BackendClient,
    models: ModelCatalog,
    prototype: Option<PrototypeStore>,
}

impl AppState {
    /// Build the application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be constructed or the
    /// prototype store file cannot be loaded.
    pub fn new(config: WebConfig) -> Result<Self, AppError> {
        let backend = BackendClient::new(&config.backend)?;
        let models = ModelCatalog::new(backend.clone());

        let prototype = match &config.prototype_db_path {
            Some(path) => Some(
                PrototypeStore::load(path)
                    .map_err(|e| AppError::Internal(format!("prototype store: {e}")))?,
            ),
            None => None,
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                models,
                prototype,
            }),
        })
    }

    /// Application configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Backend API client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Cached model catalog.
    #[must_use]
    pub fn models(&self) -> &ModelCatalog {
        &self.inner.models
    }

    /// Flat-file user store, when configured.
    #[must_use]
    pub fn prototype(&self) -> Option<&PrototypeStore> {
        self.inner.prototype.as_ref()
    }
}
