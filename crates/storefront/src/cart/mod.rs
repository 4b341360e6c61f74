//! Per-session cart handling.
//!
//! - [`CartReconciler`] - validates adds against live stock and mirrors
//!   changes to the remote cart when the shopper is signed in
//! - [`StockRefresher`] - keeps catalog stock fresh while a cart is non-empty
//! - [`CartError`] - why an add was refused

mod error;
mod reconciler;
mod refresh;

pub use error::CartError;
pub use reconciler::{AddOutcome, CartReconciler, CartSummary, FormattedTotals, SyncStatus};
pub use refresh::{StockRefresher, refresh_stock};
