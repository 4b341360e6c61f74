//! HTTP client for the catalog/cart backend.
//!
//! Uses `reqwest` with JSON bodies.
//!
//! Product and filter lists are cached using `moka` (TTL from
//! configuration); stock and carts are never cached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, instrument};

use threadline_core::filters::parse_definitions;
use threadline_core::{Cart, Email, FilterDefinition, Product, ProductId};

use super::types::{
    CartAddRequest, CartResponse, CartUpdateRequest, Envelope, FilterListResponse,
    ProductListResponse, StockAlertRequest, StockLevelsRequest, StockLevelsResponse,
};
use super::{BackendError, CartPersistence, CatalogSource, StockLevels, StockOracle};
use crate::config::BackendConfig;

/// Header carrying the shopper's session token.
const TOKEN_HEADER: &str = "token";

/// Per-request timeout; stock checks sit on the add-to-cart path.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const PRODUCTS_KEY: &str = "product/list";
const FILTERS_KEY: &str = "filter";

/// Client for the remote backend.
///
/// Cheap to clone; clones share the connection pool and cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
    products: Cache<&'static str, Arc<Vec<Product>>>,
    filters: Cache<&'static str, Arc<Vec<FilterDefinition>>>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let products = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.cache_ttl)
            .build();
        let filters = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                products,
                filters,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.base_url)
    }

    fn post(&self, path: &str, token: Option<&SecretString>) -> RequestBuilder {
        let request = self.inner.client.post(self.endpoint(path));
        match token {
            Some(token) => request.header(TOKEN_HEADER, token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and decode the payload of a `success: true` response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let envelope: Envelope = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            e
        })?;
        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| "request was not accepted".to_string());
            debug!(%message, "backend rejected request");
            return Err(BackendError::Rejected(message));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl StockOracle for BackendClient {
    #[instrument(skip(self), fields(count = ids.len()))]
    async fn batch_stock(&self, ids: &[ProductId]) -> Result<StockLevels, BackendError> {
        let request = self
            .post("product/stock-levels", None)
            .json(&StockLevelsRequest { product_ids: ids });
        let response: StockLevelsResponse = self.send(request).await?;
        Ok(response.into_levels())
    }
}

#[async_trait]
impl CartPersistence for BackendClient {
    #[instrument(skip(self, token))]
    async fn add(
        &self,
        token: &SecretString,
        item: &ProductId,
        variant: Option<&str>,
    ) -> Result<(), BackendError> {
        let request = self.post("cart/add", Some(token)).json(&CartAddRequest {
            item_id: item,
            size: variant,
        });
        let _: IgnoredAny = self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn update(
        &self,
        token: &SecretString,
        item: &ProductId,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<(), BackendError> {
        let request = self.post("cart/update", Some(token)).json(&CartUpdateRequest {
            item_id: item,
            size: variant,
            quantity,
        });
        let _: IgnoredAny = self.send(request).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn fetch(&self, token: &SecretString) -> Result<Cart, BackendError> {
        let request = self
            .post("cart/get", Some(token))
            .json(&serde_json::json!({}));
        let response: CartResponse = self.send(request).await?;
        Ok(response.cart_data)
    }
}

#[async_trait]
impl CatalogSource for BackendClient {
    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>, BackendError> {
        if let Some(cached) = self.inner.products.get(&PRODUCTS_KEY).await {
            debug!("Cache hit for product list");
            return Ok(cached.as_ref().clone());
        }

        let request = self.inner.client.get(self.endpoint(PRODUCTS_KEY));
        let response: ProductListResponse = self.send(request).await?;
        let products = response.into_products();

        self.inner
            .products
            .insert(PRODUCTS_KEY, Arc::new(products.clone()))
            .await;
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn filters(&self) -> Result<Arc<Vec<FilterDefinition>>, BackendError> {
        if let Some(cached) = self.inner.filters.get(&FILTERS_KEY).await {
            debug!("Cache hit for filter definitions");
            return Ok(cached);
        }

        let request = self.inner.client.get(self.endpoint(FILTERS_KEY));
        let response: FilterListResponse = self.send(request).await?;
        let definitions = Arc::new(parse_definitions(response.filters));

        self.inner
            .filters
            .insert(FILTERS_KEY, Arc::clone(&definitions))
            .await;
        Ok(definitions)
    }

    #[instrument(skip(self, token, email), fields(product = %product))]
    async fn subscribe_stock_alert(
        &self,
        token: Option<&SecretString>,
        product: &ProductId,
        email: &Email,
    ) -> Result<(), BackendError> {
        let request = self.post("product/stock-alert", token).json(&StockAlertRequest {
            product_id: product,
            email: email.as_str(),
        });
        let _: IgnoredAny = self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url: Url::parse(base).unwrap(),
            cache_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_paths_under_base() {
        let client = client("http://localhost:4000/api/");
        assert_eq!(
            client.endpoint("cart/get"),
            "http://localhost:4000/api/cart/get"
        );
    }

    #[test]
    fn test_endpoint_on_bare_host() {
        let client = client("http://localhost:4000");
        assert_eq!(
            client.endpoint("product/stock-levels"),
            "http://localhost:4000/product/stock-levels"
        );
    }
}
