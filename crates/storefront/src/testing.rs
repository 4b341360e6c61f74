//! In-memory backends for unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;

use threadline_core::{Cart, Email, FilterDefinition, Product, ProductId, Stock};

use crate::backend::{
    BackendError, Backends, CartPersistence, CatalogSource, StockLevels, StockOracle,
};

pub fn product(id: &str, price: i64, stock: Stock) -> Product {
    let has_size = matches!(stock, Stock::BySize(_));
    serde_json::from_value(serde_json::json!({
        "_id": id,
        "name": format!("Product {id}"),
        "price": price,
        "hasSize": has_size,
        "stock": stock,
    }))
    .unwrap()
}

fn unavailable() -> BackendError {
    BackendError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[derive(Default)]
pub struct FakeOracle {
    levels: Mutex<StockLevels>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeOracle {
    pub fn set(&self, id: &ProductId, stock: Stock) {
        self.levels.lock().unwrap().insert(id.clone(), stock);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StockOracle for FakeOracle {
    async fn batch_stock(&self, ids: &[ProductId]) -> Result<StockLevels, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let levels = self.levels.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| levels.get(id).map(|stock| (id.clone(), stock.clone())))
            .collect())
    }
}

/// Remote cart that applies adds and updates the way the backend does.
#[derive(Default)]
pub struct FakePersistence {
    remote: Mutex<Cart>,
    failing: AtomicBool,
    requests: Mutex<Vec<String>>,
}

impl FakePersistence {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn replace_remote(&self, cart: Cart) {
        *self.remote.lock().unwrap() = cart;
    }

    pub fn remote(&self) -> Cart {
        self.remote.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: String) -> Result<(), BackendError> {
        self.requests.lock().unwrap().push(request);
        if self.failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl CartPersistence for FakePersistence {
    async fn add(
        &self,
        _token: &SecretString,
        item: &ProductId,
        variant: Option<&str>,
    ) -> Result<(), BackendError> {
        self.record(format!("add {item} {variant:?}"))?;
        self.remote.lock().unwrap().increment(item, variant);
        Ok(())
    }

    async fn update(
        &self,
        _token: &SecretString,
        item: &ProductId,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<(), BackendError> {
        self.record(format!("update {item} {variant:?} {quantity}"))?;
        self.remote
            .lock()
            .unwrap()
            .set_quantity(item, variant, quantity);
        Ok(())
    }

    async fn fetch(&self, _token: &SecretString) -> Result<Cart, BackendError> {
        self.record("fetch".to_string())?;
        Ok(self.remote())
    }
}

#[derive(Default)]
pub struct FakeCatalogSource {
    pub products: Vec<Product>,
    pub filters: Arc<Vec<FilterDefinition>>,
    alerts: Mutex<Vec<(ProductId, String)>>,
}

impl FakeCatalogSource {
    pub fn new(products: Vec<Product>, filters: Vec<FilterDefinition>) -> Self {
        Self {
            products,
            filters: Arc::new(filters),
            alerts: Mutex::default(),
        }
    }

    pub fn alerts(&self) -> Vec<(ProductId, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSource for FakeCatalogSource {
    async fn products(&self) -> Result<Vec<Product>, BackendError> {
        Ok(self.products.clone())
    }

    async fn filters(&self) -> Result<Arc<Vec<FilterDefinition>>, BackendError> {
        Ok(Arc::clone(&self.filters))
    }

    async fn subscribe_stock_alert(
        &self,
        _token: Option<&SecretString>,
        product: &ProductId,
        email: &Email,
    ) -> Result<(), BackendError> {
        self.alerts
            .lock()
            .unwrap()
            .push((product.clone(), email.to_string()));
        Ok(())
    }
}

/// Fakes wired as [`Backends`], with handles kept for assertions.
pub struct FakeBackends {
    pub oracle: Arc<FakeOracle>,
    pub persistence: Arc<FakePersistence>,
    pub catalog: Arc<FakeCatalogSource>,
}

impl FakeBackends {
    pub fn new(products: Vec<Product>, filters: Vec<FilterDefinition>) -> Self {
        Self {
            oracle: Arc::new(FakeOracle::default()),
            persistence: Arc::new(FakePersistence::default()),
            catalog: Arc::new(FakeCatalogSource::new(products, filters)),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            oracle: self.oracle.clone(),
            persistence: self.persistence.clone(),
            catalog: self.catalog.clone(),
        }
    }
}
