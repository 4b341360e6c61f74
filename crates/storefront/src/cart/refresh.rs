//! Background stock refresh while a cart is non-empty.
//!
//! # Lifecycle
//!
//! The refresher is owned by a [`CartReconciler`](super::CartReconciler)
//! and re-evaluated after every cart mutation through
//! [`StockRefresher::reconcile`]:
//!
//! - an empty cart stops the task
//! - a change in (cart entries, catalog size) restarts it
//! - otherwise the running task is left alone
//!
//! The task is also cancelled on [`StockRefresher::stop`] and when the
//! refresher is dropped, so a torn-down session never leaves a timer behind.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::{BackendError, StockOracle};
use crate::catalog::Catalog;

/// Re-fetch stock for every catalog product and overlay it onto the catalog.
///
/// Only `stock` fields change; products the oracle does not report keep their
/// cached figures. Returns the number of products updated.
///
/// # Errors
///
/// Returns the oracle's error; the catalog is left untouched in that case.
pub async fn refresh_stock(catalog: &Catalog, oracle: &dyn StockOracle) -> Result<usize, BackendError> {
    let ids = catalog.ids();
    if ids.is_empty() {
        return Ok(0);
    }
    let levels = oracle.batch_stock(&ids).await?;
    Ok(catalog.overlay_stock(&levels))
}

/// What the running task was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RefreshKey {
    cart_entries: usize,
    catalog_len: usize,
}

struct ActiveRefresh {
    key: RefreshKey,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ActiveRefresh {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Owner of at most one periodic stock refresh task.
pub struct StockRefresher {
    interval: Duration,
    catalog: Catalog,
    oracle: Arc<dyn StockOracle>,
    active: Mutex<Option<ActiveRefresh>>,
}

impl StockRefresher {
    #[must_use]
    pub fn new(interval: Duration, catalog: Catalog, oracle: Arc<dyn StockOracle>) -> Self {
        Self {
            interval,
            catalog,
            oracle,
            active: Mutex::new(None),
        }
    }

    /// Start, restart or stop the task for a cart holding `cart_entries`
    /// products.
    ///
    /// Must be called from within a tokio runtime.
    pub fn reconcile(&self, cart_entries: usize) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);

        if cart_entries == 0 {
            if let Some(running) = active.take() {
                debug!("cart empty, stopping stock refresh");
                running.stop();
            }
            return;
        }

        let key = RefreshKey {
            cart_entries,
            catalog_len: self.catalog.len(),
        };
        let unchanged = active
            .as_ref()
            .is_some_and(|running| running.key == key && !running.handle.is_finished());
        if unchanged {
            return;
        }

        if let Some(previous) = active.take() {
            previous.stop();
        }
        debug!(?key, interval_secs = self.interval.as_secs(), "starting stock refresh");
        *active = Some(self.spawn(key));
    }

    /// Cancel the running task, if any.
    pub fn stop(&self) {
        let running = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(running) = running {
            running.stop();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    fn spawn(&self, key: RefreshKey) -> ActiveRefresh {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let catalog = self.catalog.clone();
        let oracle = Arc::clone(&self.oracle);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    result = refresh_stock(&catalog, oracle.as_ref()) => match result {
                        Ok(updated) => debug!(updated, "stock refreshed"),
                        Err(e) => warn!(error = %e, "stock refresh failed"),
                    }
                }
            }
        });

        ActiveRefresh {
            key,
            cancel,
            handle,
        }
    }
}

impl Drop for StockRefresher {
    fn drop(&mut self) {
        self.stop();
    }
}
