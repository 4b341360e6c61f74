//! Cart route handlers.
//!
//! Every response carries the notices raised since the shopper's previous
//! request, so the client can show them as toasts.

use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use threadline_core::ProductId;

use crate::cart::{CartSummary, SyncStatus};
use crate::error::{AppError, WithNotices, add_breadcrumb};
use crate::middleware::CurrentShop;
use crate::notify::Notice;

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    pub cart: CartSummary,
    pub notices: Vec<Notice>,
}

/// Cart contents and totals.
#[instrument(skip_all)]
pub async fn show(CurrentShop(shop): CurrentShop) -> Json<CartResponse> {
    Json(CartResponse {
        success: true,
        cart: shop.cart.summary().await,
        notices: shop.notices.drain(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest {
    pub item_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub success: bool,
    pub quantity: u32,
    pub sync: SyncStatus,
    pub count: u64,
    pub notices: Vec<Notice>,
}

/// Add one unit.
///
/// A refused add answers with its notices, so they are not repeated by the
/// next response.
#[instrument(skip(shop, body), fields(product = %body.item_id))]
pub async fn add(
    CurrentShop(shop): CurrentShop,
    Json(body): Json<AddRequest>,
) -> std::result::Result<Json<AddResponse>, WithNotices> {
    let outcome = shop
        .cart
        .add(&body.item_id, body.size.as_deref())
        .await
        .map_err(|e| AppError::from(e).with_notices(shop.notices.drain()))?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", body.item_id.as_str()),
            ("size", body.size.as_deref().unwrap_or("")),
        ],
    );

    Ok(Json(AddResponse {
        success: true,
        quantity: outcome.quantity,
        sync: outcome.sync,
        count: shop.cart.cart_count().await,
        notices: shop.notices.drain(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub item_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub sync: SyncStatus,
    pub count: u64,
    pub notices: Vec<Notice>,
}

/// Overwrite a quantity; zero removes the entry.
#[instrument(skip(shop, body), fields(product = %body.item_id, quantity = body.quantity))]
pub async fn update(
    CurrentShop(shop): CurrentShop,
    Json(body): Json<UpdateRequest>,
) -> Json<UpdateResponse> {
    let sync = shop
        .cart
        .set_quantity(&body.item_id, body.size.as_deref(), body.quantity)
        .await;

    Json(UpdateResponse {
        success: true,
        sync,
        count: shop.cart.cart_count().await,
        notices: shop.notices.drain(),
    })
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub success: bool,
    pub count: u64,
}

/// Cart badge count.
#[instrument(skip_all)]
pub async fn count(CurrentShop(shop): CurrentShop) -> Json<CountResponse> {
    Json(CountResponse {
        success: true,
        count: shop.cart.cart_count().await,
    })
}
