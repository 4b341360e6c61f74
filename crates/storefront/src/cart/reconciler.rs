//! Stock-aware cart mutations for one shopper session.

use std::slice;
use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};

use threadline_core::cart::CartAmount;
use threadline_core::{Cart, ProductId, format_amount};

use super::error::CartError;
use super::refresh::StockRefresher;
use crate::backend::{BackendError, Backends, CartPersistence, StockOracle};
use crate::catalog::Catalog;
use crate::config::ShopConfig;
use crate::notify::{Notice, NotificationSink};

/// Whether a mutation reached the remote cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum SyncStatus {
    /// Guest session; only the local cart changed.
    Local,
    /// The remote cart accepted the change.
    Synced,
    /// The remote call failed. The local change stands.
    Failed(String),
}

/// Result of a successful [`CartReconciler::add`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    /// Quantity of the product (or size) now in the cart.
    pub quantity: u32,
    pub sync: SyncStatus,
}

/// Cart totals as shown at checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Cart,
    pub count: u64,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub formatted: FormattedTotals,
    /// Cart entries the catalog no longer prices.
    pub unpriced: Vec<ProductId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedTotals {
    pub subtotal: String,
    pub delivery_fee: String,
    pub total: String,
}

struct CartState {
    cart: Cart,
    token: Option<SecretString>,
}

/// Validates cart changes against live stock before applying them.
///
/// The cart lock is held for the whole of each mutation, remote calls
/// included, so one session's mutations apply in the order they were issued.
/// The background stock refresher never takes this lock; it only rewrites
/// catalog stock figures.
pub struct CartReconciler {
    catalog: Catalog,
    oracle: Arc<dyn StockOracle>,
    persistence: Arc<dyn CartPersistence>,
    notices: Arc<dyn NotificationSink>,
    refresher: StockRefresher,
    currency: String,
    delivery_fee: Decimal,
    state: Mutex<CartState>,
}

impl CartReconciler {
    #[must_use]
    pub fn new(
        shop: &ShopConfig,
        catalog: Catalog,
        backends: &Backends,
        notices: Arc<dyn NotificationSink>,
    ) -> Self {
        let refresher = StockRefresher::new(
            shop.stock_refresh_interval,
            catalog.clone(),
            Arc::clone(&backends.oracle),
        );
        Self {
            catalog,
            oracle: Arc::clone(&backends.oracle),
            persistence: Arc::clone(&backends.persistence),
            notices,
            refresher,
            currency: shop.currency.clone(),
            delivery_fee: shop.delivery_fee,
            state: Mutex::new(CartState {
                cart: Cart::new(),
                token: None,
            }),
        }
    }

    /// Add one unit of a product (or one of its sizes).
    ///
    /// When signed in, the add is sent to the remote cart and the remote
    /// copy then replaces the local cart.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Validation`, `OutOfStock` or `QuantityExceeded`
    /// without touching the cart. Remote failures are reported through
    /// [`AddOutcome::sync`] instead.
    #[instrument(skip(self), fields(product = %id))]
    pub async fn add(&self, id: &ProductId, variant: Option<&str>) -> Result<AddOutcome, CartError> {
        let mut state = self.state.lock().await;
        let result = self.try_add(&mut state, id, variant).await;
        if let Err(e) = &result {
            debug!(error = %e, "add to cart refused");
            self.notices.notify(e.notice());
        }
        self.refresher.reconcile(state.cart.len());
        result
    }

    async fn try_add(
        &self,
        state: &mut CartState,
        id: &ProductId,
        variant: Option<&str>,
    ) -> Result<AddOutcome, CartError> {
        let product = self
            .catalog
            .get(id)
            .ok_or_else(|| CartError::NotFound(id.clone()))?;

        let variant = if product.has_size {
            let size = variant
                .map(str::trim)
                .filter(|size| !size.is_empty())
                .ok_or_else(CartError::missing_size)?;
            Some(size)
        } else {
            None
        };

        let available = self.real_time_stock(id, variant).await;
        if available <= 0 {
            return Err(CartError::OutOfStock {
                product: id.clone(),
                variant: variant.map(str::to_owned),
            });
        }

        let in_cart = state.cart.quantity(id, variant);
        if i64::from(in_cart) >= available {
            return Err(CartError::QuantityExceeded { available, in_cart });
        }

        let mut quantity = state.cart.increment(id, variant);
        self.notices.notify(Notice::success("Product added to cart!"));

        let sync = match &state.token {
            None => SyncStatus::Local,
            Some(token) => match self.push_add(token, id, variant).await {
                Ok(remote) => {
                    // Last writer wins: the remote copy replaces the local increment.
                    state.cart = remote;
                    quantity = state.cart.quantity(id, variant);
                    SyncStatus::Synced
                }
                Err(e) => self.sync_failed(&e),
            },
        };

        Ok(AddOutcome { quantity, sync })
    }

    // TODO: drop the follow-up fetch once cart/add returns the updated line.
    async fn push_add(
        &self,
        token: &SecretString,
        id: &ProductId,
        variant: Option<&str>,
    ) -> Result<Cart, BackendError> {
        self.persistence.add(token, id, variant).await?;
        self.persistence.fetch(token).await
    }

    fn sync_failed(&self, e: &BackendError) -> SyncStatus {
        error!(error = %e, "remote cart sync failed");
        let message = e.user_message();
        self.notices.notify(Notice::error(message.clone()));
        SyncStatus::Failed(message)
    }

    /// Overwrite a quantity; zero removes the entry.
    ///
    /// No stock check happens here. When signed in, the update is sent to the
    /// remote cart; a failure is reported but the local change is kept.
    #[instrument(skip(self), fields(product = %id))]
    pub async fn set_quantity(&self, id: &ProductId, variant: Option<&str>, quantity: u32) -> SyncStatus {
        let variant = match self.catalog.get(id) {
            Some(product) if !product.has_size => None,
            _ => variant,
        };

        let mut state = self.state.lock().await;
        if !state.cart.set_quantity(id, variant, quantity) {
            debug!("quantity update left the local cart unchanged");
        }

        let sync = match &state.token {
            None => SyncStatus::Local,
            Some(token) => match self.persistence.update(token, id, variant, quantity).await {
                Ok(()) => SyncStatus::Synced,
                Err(e) => self.sync_failed(&e),
            },
        };

        self.refresher.reconcile(state.cart.len());
        sync
    }

    /// Current stock for a product or size.
    ///
    /// Asks the stock oracle; if the call fails or the oracle has no record,
    /// falls back to the catalog's cached figure, then to 0.
    pub async fn real_time_stock(&self, id: &ProductId, variant: Option<&str>) -> i64 {
        match self.oracle.batch_stock(slice::from_ref(id)).await {
            Ok(levels) => {
                if let Some(stock) = levels.get(id) {
                    return stock.available(variant);
                }
                debug!(product = %id, "no live stock record, using cached stock");
            }
            Err(e) => warn!(product = %id, error = %e, "stock check failed, using cached stock"),
        }
        self.catalog.cached_stock(id, variant).unwrap_or(0)
    }

    /// Snapshot of the cart.
    pub async fn cart(&self) -> Cart {
        self.state.lock().await.cart.clone()
    }

    /// Total units in the cart.
    pub async fn cart_count(&self) -> u64 {
        self.state.lock().await.cart.count()
    }

    /// Cart value at catalog prices; unknown products are skipped.
    pub async fn cart_amount(&self) -> CartAmount {
        let cart = self.cart().await;
        cart.amount(|id| self.catalog.price_of(id))
    }

    /// Totals including the delivery fee (charged only on a non-zero subtotal).
    pub async fn summary(&self) -> CartSummary {
        let items = self.cart().await;
        let amount = items.amount(|id| self.catalog.price_of(id));
        let delivery_fee = if amount.total.is_zero() {
            Decimal::ZERO
        } else {
            self.delivery_fee
        };
        let total = amount.total + delivery_fee;

        CartSummary {
            count: items.count(),
            formatted: FormattedTotals {
                subtotal: format_amount(&self.currency, amount.total),
                delivery_fee: format_amount(&self.currency, delivery_fee),
                total: format_amount(&self.currency, total),
            },
            items,
            subtotal: amount.total,
            delivery_fee,
            total,
            unpriced: amount.unpriced,
        }
    }

    /// Attach a session token and replace the local cart with the remote one.
    ///
    /// # Errors
    ///
    /// Returns `RemoteSync` if the remote cart cannot be fetched. The token
    /// is kept, so later mutations still sync.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, token: SecretString) -> Result<u64, CartError> {
        let mut state = self.state.lock().await;
        let fetched = self.persistence.fetch(&token).await;
        state.token = Some(token);

        let result = match fetched {
            Ok(remote) => {
                state.cart = remote;
                Ok(state.cart.count())
            }
            Err(e) => {
                error!(error = %e, "initial cart sync failed");
                let err = CartError::RemoteSync(e);
                self.notices.notify(err.notice());
                Err(err)
            }
        };
        self.refresher.reconcile(state.cart.len());
        result
    }

    /// Forget the token and empty the local cart.
    pub async fn sign_out(&self) {
        let mut state = self.state.lock().await;
        state.token = None;
        state.cart = Cart::new();
        self.refresher.stop();
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.token.is_some()
    }

    /// The session token, for calls made on the shopper's behalf.
    pub async fn token(&self) -> Option<SecretString> {
        self.state.lock().await.token.clone()
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refresher.is_running()
    }

    /// Stop background work. Safe to call more than once.
    pub fn shutdown(&self) {
        self.refresher.stop();
    }
}
