//! Cart operation failures.

use thiserror::Error;

use threadline_core::ProductId;

use crate::backend::BackendError;
use crate::notify::Notice;

/// Why a cart operation did not go through.
///
/// Every variant except `RemoteSync` is raised before the cart is touched.
#[derive(Debug, Error)]
pub enum CartError {
    /// A required selection (the size) is missing.
    #[error("{0}")]
    Validation(String),

    #[error("Product not found: {0}")]
    NotFound(ProductId),

    #[error("Out of stock: {product}")]
    OutOfStock {
        product: ProductId,
        variant: Option<String>,
    },

    #[error("Cannot add more. Only {available} available, {in_cart} already in cart.")]
    QuantityExceeded { available: i64, in_cart: u32 },

    /// The persistence service or stock oracle call failed.
    #[error("Remote sync failed: {0}")]
    RemoteSync(#[from] BackendError),
}

impl CartError {
    /// The notice shown to the shopper for this failure.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::Validation(message) => Notice::error(message.clone()),
            Self::NotFound(_) => Notice::error("Product not found"),
            Self::OutOfStock { .. } => Notice::alert("Out of stock"),
            Self::QuantityExceeded { .. } => Notice::error(self.to_string()),
            Self::RemoteSync(e) => Notice::error(e.user_message()),
        }
    }

    pub(crate) fn missing_size() -> Self {
        Self::Validation("Select Product Size".to_string())
    }
}
