//! In-memory product catalog shared by every session.
//!
//! The catalog answers price and cached-stock lookups for carts. It is
//! loaded at startup and reloaded on its own interval; the per-session stock
//! refresher overlays fresher `stock` figures between reloads.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use threadline_core::{Product, ProductId};

use crate::backend::{CatalogSource, StockLevels};

/// Cloneable handle to the product list.
#[derive(Clone, Default)]
pub struct Catalog {
    inner: Arc<RwLock<CatalogInner>>,
}

#[derive(Default)]
struct CatalogInner {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
}

impl CatalogInner {
    fn reindex(&mut self) {
        self.index = self
            .products
            .iter()
            .enumerate()
            .map(|(i, product)| (product.id.clone(), i))
            .collect();
    }

    fn get(&self, id: &ProductId) -> Option<&Product> {
        self.index.get(id).and_then(|&i| self.products.get(i))
    }
}

impl Catalog {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        let catalog = Self::default();
        catalog.replace(products);
        catalog
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in a freshly loaded product list.
    pub fn replace(&self, products: Vec<Product>) {
        let mut inner = self.write();
        inner.products = products;
        inner.reindex();
    }

    /// Snapshot of every product, in catalog order.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.read().products.clone()
    }

    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<Product> {
        self.read().get(id).cloned()
    }

    #[must_use]
    pub fn price_of(&self, id: &ProductId) -> Option<Decimal> {
        self.read().get(id).map(|product| product.price)
    }

    /// Last known stock for a product or one of its sizes.
    #[must_use]
    pub fn cached_stock(&self, id: &ProductId, variant: Option<&str>) -> Option<i64> {
        self.read().get(id).map(|product| product.stock_for(variant))
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ProductId> {
        self.read().products.iter().map(|p| p.id.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the `stock` field of every product present in `levels`.
    ///
    /// Products missing from `levels` keep their current figures. Returns the
    /// number of products updated.
    pub fn overlay_stock(&self, levels: &StockLevels) -> usize {
        let mut inner = self.write();
        let mut updated = 0;
        for product in &mut inner.products {
            if let Some(stock) = levels.get(&product.id) {
                product.stock = stock.clone();
                updated += 1;
            }
        }
        updated
    }
}

/// Load the catalog now, then reload it every `interval` until cancelled.
///
/// A failed load keeps the previous product list.
pub fn start_catalog_refresh(
    catalog: Catalog,
    source: Arc<dyn CatalogSource>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("catalog refresh stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match source.products().await {
                        Ok(products) => {
                            info!(count = products.len(), "catalog loaded");
                            catalog.replace(products);
                        }
                        Err(e) => warn!(error = %e, "catalog reload failed, keeping previous list"),
                    }
                }
            }
        }
    })
}
