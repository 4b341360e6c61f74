//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use threadline_core::{Email, Product, ProductId};

use crate::error::{AppError, Result, WithNotices};
use crate::middleware::CurrentShop;
use crate::notify::{Notice, NotificationSink};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub success: bool,
    pub products: Vec<Product>,
}

/// Every product in the catalog.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Json<ProductList> {
    Json(ProductList {
        success: true,
        products: state.catalog().products(),
    })
}

/// One product by id.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<ProductId>) -> Result<Json<Value>> {
    let product = state
        .catalog()
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(Json(json!({ "success": true, "product": product })))
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub size: Option<String>,
}

/// Live stock for a product or one of its sizes.
#[instrument(skip(state, shop))]
pub async fn stock(
    State(state): State<AppState>,
    CurrentShop(shop): CurrentShop,
    Path(id): Path<ProductId>,
    Query(query): Query<StockQuery>,
) -> Result<Json<Value>> {
    if state.catalog().get(&id).is_none() {
        return Err(AppError::NotFound(format!("product {id}")));
    }
    let size = query.size.as_deref().filter(|s| !s.is_empty());
    let stock = shop.cart.real_time_stock(&id, size).await;

    Ok(Json(json!({
        "success": true,
        "productId": id,
        "size": size,
        "stock": stock,
    })))
}

#[derive(Debug, Deserialize)]
pub struct StockAlertRequest {
    pub email: String,
}

/// Ask to be emailed when a product is back in stock.
#[instrument(skip(state, shop, body))]
pub async fn stock_alert(
    State(state): State<AppState>,
    CurrentShop(shop): CurrentShop,
    Path(id): Path<ProductId>,
    Json(body): Json<StockAlertRequest>,
) -> std::result::Result<Json<Value>, WithNotices> {
    let email = Email::parse(&body.email).map_err(|e| {
        shop.notices.notify(Notice::error("Invalid email address"));
        AppError::from(e).with_notices(shop.notices.drain())
    })?;

    let token = shop.cart.token().await;
    let subscribed = state
        .backends()
        .catalog
        .subscribe_stock_alert(token.as_ref(), &id, &email)
        .await;

    match subscribed {
        Ok(()) => {
            let message = "You'll be notified when back in stock!";
            shop.notices.notify(Notice::success(message));
            Ok(Json(json!({ "success": true, "message": message })))
        }
        Err(e) => {
            shop.notices.notify(Notice::error(e.user_message()));
            Err(AppError::from(e).with_notices(shop.notices.drain()))
        }
    }
}
