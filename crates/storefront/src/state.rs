//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError, Backends};
use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::session::SessionRegistry;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the backend collaborators, the shared catalog and the live sessions.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backends: Backends,
    catalog: Catalog,
    sessions: SessionRegistry,
}

impl AppState {
    /// Create application state talking to the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, BackendError> {
        let client = BackendClient::new(&config.backend)?;
        Ok(Self::with_backends(config, Backends::from_client(client)))
    }

    /// Create application state over the given collaborators.
    #[must_use]
    pub fn with_backends(config: StorefrontConfig, backends: Backends) -> Self {
        let catalog = Catalog::default();
        let sessions = SessionRegistry::new(config.shop.clone(), catalog.clone(), backends.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backends,
                catalog,
                sessions,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backends(&self) -> &Backends {
        &self.inner.backends
    }

    /// The product catalog shared by every session.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }
}
