//! Integration tests for Threadline.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p threadline-integration-tests
//! ```
//!
//! Everything runs in-process: the storefront is driven through its router
//! or its cart reconciler, with the remote backend replaced by the in-memory
//! collaborators below.
//!
//! # Test Categories
//!
//! - `cart_reconciliation` - Stock checks, remote sync and refresh races
//! - `filter_resolution` - Filter definitions from backend JSON to panel
//! - `http_api` - Router-level request/response behaviour

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::Notify;
use url::Url;

use threadline_core::filters::parse_definitions;
use threadline_core::{Cart, Email, FilterDefinition, Product, ProductId, Stock};
use threadline_storefront::backend::{
    BackendError, Backends, CartPersistence, CatalogSource, StockLevels, StockOracle,
};
use threadline_storefront::config::{BackendConfig, ShopConfig, StorefrontConfig};
use threadline_storefront::state::AppState;

/// Stock refresh period used by every fixture.
pub const REFRESH: Duration = Duration::from_secs(30);

fn unavailable() -> BackendError {
    BackendError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

// =============================================================================
// Catalog fixtures
// =============================================================================

/// Products as the backend lists them.
#[must_use]
pub fn products() -> Vec<Product> {
    let raw = json!([
        {"_id": "tee", "name": "Cotton Tee", "price": 499, "stock": 3,
         "category": " Shirts ", "gender": "Men"},
        {"_id": "saree", "name": "Silk Saree", "price": 2500, "hasSize": true,
         "sizes": ["M", "L"], "stock": {"M": 2, "L": 0}, "category": "Sarees",
         "occasion": ["Wedding", " "]},
        {"_id": "scarf", "name": "Scarf", "price": 150, "stock": 0}
    ]);
    serde_json::from_value::<Vec<Product>>(raw)
        .unwrap()
        .into_iter()
        .map(Product::normalized)
        .collect()
}

/// Filter definitions as the backend returns them, including one the
/// storefront cannot use.
#[must_use]
pub fn filter_json() -> Vec<Value> {
    serde_json::from_value(json!([
        {"name": "occasion", "displayName": "Occasion", "type": "global",
         "filterType": "multi-select",
         "values": [{"value": "wedding", "displayName": "Wedding", "isActive": true}]},
        {"name": "fabric", "displayName": "Fabric", "type": "category-specific",
         "applicableCategories": ["Sarees"], "filterType": "single-select",
         "values": [{"value": "silk", "displayName": "Silk", "isActive": true},
                    {"value": "nylon", "displayName": "Nylon", "isActive": false}]},
        {"name": "color", "displayName": "Colour", "type": "global",
         "filterType": "multi-select",
         "values": [{"value": "red", "displayName": "Red", "isActive": true, "colorCode": "#ff0000"}]},
        {"name": "neckline", "displayName": "Neckline", "type": "category-specific",
         "applicableCategories": ["Kurtis"],
         "values": [{"value": "round", "displayName": "Round", "isActive": false}]},
        {"name": "broken", "type": "everywhere", "values": []}
    ]))
    .unwrap()
}

#[must_use]
pub fn filter_definitions() -> Vec<FilterDefinition> {
    parse_definitions(filter_json())
}

#[must_use]
pub fn config() -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        backend: BackendConfig {
            base_url: Url::parse("http://backend.test").unwrap(),
            cache_ttl: Duration::from_secs(300),
        },
        shop: ShopConfig {
            stock_refresh_interval: REFRESH,
            ..ShopConfig::default()
        },
        log_json: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

// =============================================================================
// Collaborators
// =============================================================================

/// Stock oracle answering from a table.
#[derive(Default)]
pub struct TableOracle {
    levels: Mutex<StockLevels>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl TableOracle {
    pub fn set(&self, id: &str, stock: Stock) {
        self.levels
            .lock()
            .unwrap()
            .insert(ProductId::new(id), stock);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StockOracle for TableOracle {
    async fn batch_stock(&self, ids: &[ProductId]) -> Result<StockLevels, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let levels = self.levels.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| levels.get(id).map(|s| (id.clone(), s.clone())))
            .collect())
    }
}

/// Remote cart whose `fetch` can be held open to stage races.
#[derive(Default)]
pub struct RemoteCart {
    cart: Mutex<Cart>,
    hold_fetch: AtomicBool,
    /// Signalled when a held fetch has started.
    pub fetch_started: Notify,
    /// Signal to let a held fetch return.
    pub release_fetch: Notify,
    failing: AtomicBool,
}

impl RemoteCart {
    pub fn replace(&self, cart: Value) {
        *self.cart.lock().unwrap() = serde_json::from_value(cart).unwrap();
    }

    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.cart.lock().unwrap().clone()
    }

    pub fn hold_fetches(&self, hold: bool) {
        self.hold_fetch.store(hold, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected("Cart service unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CartPersistence for RemoteCart {
    async fn add(
        &self,
        _token: &SecretString,
        item: &ProductId,
        variant: Option<&str>,
    ) -> Result<(), BackendError> {
        self.check()?;
        self.cart.lock().unwrap().increment(item, variant);
        Ok(())
    }

    async fn update(
        &self,
        _token: &SecretString,
        item: &ProductId,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<(), BackendError> {
        self.check()?;
        self.cart
            .lock()
            .unwrap()
            .set_quantity(item, variant, quantity);
        Ok(())
    }

    async fn fetch(&self, _token: &SecretString) -> Result<Cart, BackendError> {
        self.check()?;
        if self.hold_fetch.load(Ordering::SeqCst) {
            self.fetch_started.notify_one();
            self.release_fetch.notified().await;
        }
        Ok(self.snapshot())
    }
}

/// Catalog source serving the fixtures and recording stock alerts.
pub struct FixtureCatalog {
    products: Vec<Product>,
    filters: Arc<Vec<FilterDefinition>>,
    alerts: Mutex<Vec<(ProductId, String, bool)>>,
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self {
            products: products(),
            filters: Arc::new(filter_definitions()),
            alerts: Mutex::default(),
        }
    }
}

impl FixtureCatalog {
    /// Recorded alerts as (product, email, sent with a token).
    #[must_use]
    pub fn alerts(&self) -> Vec<(ProductId, String, bool)> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSource for FixtureCatalog {
    async fn products(&self) -> Result<Vec<Product>, BackendError> {
        Ok(self.products.clone())
    }

    async fn filters(&self) -> Result<Arc<Vec<FilterDefinition>>, BackendError> {
        Ok(Arc::clone(&self.filters))
    }

    async fn subscribe_stock_alert(
        &self,
        token: Option<&SecretString>,
        product: &ProductId,
        email: &Email,
    ) -> Result<(), BackendError> {
        self.alerts
            .lock()
            .unwrap()
            .push((product.clone(), email.to_string(), token.is_some()));
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Application state over in-memory collaborators.
pub struct TestShop {
    pub state: AppState,
    pub oracle: Arc<TableOracle>,
    pub remote: Arc<RemoteCart>,
    pub catalog: Arc<FixtureCatalog>,
}

impl TestShop {
    /// State with the fixture catalog already loaded.
    #[must_use]
    pub fn new() -> Self {
        let oracle = Arc::new(TableOracle::default());
        let remote = Arc::new(RemoteCart::default());
        let catalog = Arc::new(FixtureCatalog::default());

        let backends = Backends {
            oracle: oracle.clone(),
            persistence: remote.clone(),
            catalog: catalog.clone(),
        };
        let state = AppState::with_backends(config(), backends);
        state.catalog().replace(products());

        Self {
            state,
            oracle,
            remote,
            catalog,
        }
    }
}

impl Default for TestShop {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use]
pub fn token() -> SecretString {
    SecretString::from("shopper-token".to_string())
}
