//! Remote backend collaborators.
//!
//! # Architecture
//!
//! The storefront does not own inventory, carts or the catalog. It talks to
//! a JSON backend that plays three roles, each behind its own trait so the
//! cart reconciler and the HTTP layer can be driven by in-memory fakes:
//!
//! - [`StockOracle`] - live stock figures for a batch of products
//! - [`CartPersistence`] - the authoritative copy of a signed-in shopper's cart
//! - [`CatalogSource`] - product list, filter definitions and stock alerts
//!
//! [`BackendClient`] implements all three over `reqwest`.

mod client;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use threadline_core::{Cart, Email, FilterDefinition, Product, ProductId, Stock};

pub use client::BackendClient;

/// Fresh stock per product, as reported by the oracle.
pub type StockLevels = HashMap<ProductId, Stock>;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Backend answered `success: false`.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl BackendError {
    /// Short text suitable for a shopper-facing notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            Self::RateLimited(_) => "Too many requests, please try again shortly".to_string(),
            Self::Http(_) | Self::Parse(_) | Self::Status { .. } => {
                "Could not reach the store, please try again".to_string()
            }
        }
    }
}

/// Live inventory source.
#[async_trait]
pub trait StockOracle: Send + Sync {
    /// Current stock for each requested product. Products the oracle does not
    /// know are absent from the result.
    async fn batch_stock(&self, ids: &[ProductId]) -> Result<StockLevels, BackendError>;
}

/// Remote copy of a signed-in shopper's cart.
#[async_trait]
pub trait CartPersistence: Send + Sync {
    async fn add(
        &self,
        token: &SecretString,
        item: &ProductId,
        variant: Option<&str>,
    ) -> Result<(), BackendError>;

    async fn update(
        &self,
        token: &SecretString,
        item: &ProductId,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<(), BackendError>;

    async fn fetch(&self, token: &SecretString) -> Result<Cart, BackendError>;
}

/// Read-only catalog data plus stock alert subscriptions.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn products(&self) -> Result<Vec<Product>, BackendError>;

    async fn filters(&self) -> Result<Arc<Vec<FilterDefinition>>, BackendError>;

    async fn subscribe_stock_alert(
        &self,
        token: Option<&SecretString>,
        product: &ProductId,
        email: &Email,
    ) -> Result<(), BackendError>;
}

/// The three backend roles, bundled for wiring application state.
#[derive(Clone)]
pub struct Backends {
    pub oracle: Arc<dyn StockOracle>,
    pub persistence: Arc<dyn CartPersistence>,
    pub catalog: Arc<dyn CatalogSource>,
}

impl Backends {
    /// Use one client for every role.
    #[must_use]
    pub fn from_client(client: BackendClient) -> Self {
        let client = Arc::new(client);
        Self {
            oracle: client.clone(),
            persistence: client.clone(),
            catalog: client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::Rejected("Item unavailable".to_string());
        assert_eq!(err.to_string(), "Rejected: Item unavailable");

        let err = BackendError::Status {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: maintenance");
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = BackendError::Status {
            status: 500,
            body: "stack trace at line 42".to_string(),
        };
        assert!(!err.user_message().contains("stack trace"));
        assert_eq!(
            BackendError::Rejected("Please login again".to_string()).user_message(),
            "Please login again"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = BackendError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
