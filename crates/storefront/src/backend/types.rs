//! Backend JSON request and response bodies.
//!
//! Every response carries `success` and an optional `message`; the payload
//! fields sit next to them at the top level.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use threadline_core::{Cart, Product, ProductId, Stock};

use super::StockLevels;

/// The common part of every response.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevelsRequest<'a> {
    pub product_ids: &'a [ProductId],
}

/// `stockLevels` is kept raw so one malformed record cannot spoil the batch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevelsResponse {
    #[serde(default)]
    pub stock_levels: HashMap<String, Value>,
}

impl StockLevelsResponse {
    /// Parse each record's `stock` field, skipping records that have none or
    /// an unreadable one.
    #[must_use]
    pub fn into_levels(self) -> StockLevels {
        self.stock_levels
            .into_iter()
            .filter_map(|(id, record)| {
                let stock = record.get("stock").cloned()?;
                match serde_json::from_value::<Stock>(stock) {
                    Ok(stock) => Some((ProductId::new(id), stock)),
                    Err(e) => {
                        warn!(product = %id, error = %e, "ignoring malformed stock record");
                        None
                    }
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductListResponse {
    #[serde(default)]
    pub products: Vec<Value>,
}

impl ProductListResponse {
    /// Parse and normalise each product, skipping unreadable ones.
    #[must_use]
    pub fn into_products(self) -> Vec<Product> {
        self.products
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Product>(raw) {
                Ok(product) => Some(product.normalized()),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable product");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct FilterListResponse {
    #[serde(default)]
    pub filters: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    #[serde(default)]
    pub cart_data: Cart,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAddRequest<'a> {
    pub item_id: &'a ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUpdateRequest<'a> {
    pub item_id: &'a ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<&'a str>,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlertRequest<'a> {
    pub product_id: &'a ProductId,
    pub email: &'a str,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_stock_levels_skip_bad_records() {
        let body = json!({
            "success": true,
            "stockLevels": {
                "p1": {"stock": 4},
                "p2": {"stock": {"M": 1, "L": 0}},
                "p3": {"stock": "lots"},
                "p4": {}
            }
        });
        let levels = serde_json::from_value::<StockLevelsResponse>(body)
            .unwrap()
            .into_levels();

        assert_eq!(levels.len(), 2);
        assert_eq!(levels[&ProductId::new("p1")], Stock::Flat(4));
        assert_eq!(levels[&ProductId::new("p2")].available(Some("M")), 1);
    }

    #[test]
    fn test_product_list_skips_unreadable_products() {
        let body = json!({
            "success": true,
            "products": [
                {"_id": "p1", "price": 100, "category": "Sarees"},
                {"_id": "p2"},
                {"_id": "p3", "price": 250, "hasSize": true, "stock": {"M": 2}}
            ]
        });
        let products = serde_json::from_value::<ProductListResponse>(body)
            .unwrap()
            .into_products();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].category, "sarees");
        assert_eq!(products[1].id, ProductId::new("p3"));
    }

    #[test]
    fn test_cart_response_tolerates_missing_cart() {
        let body: CartResponse = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(body.cart_data.is_empty());
    }

    #[test]
    fn test_cart_requests_use_backend_field_names() {
        let id = ProductId::new("p1");
        let add = serde_json::to_value(CartAddRequest {
            item_id: &id,
            size: None,
        })
        .unwrap();
        assert_eq!(add, json!({"itemId": "p1"}));

        let update = serde_json::to_value(CartUpdateRequest {
            item_id: &id,
            size: Some("M"),
            quantity: 0,
        })
        .unwrap();
        assert_eq!(update, json!({"itemId": "p1", "size": "M", "quantity": 0}));
    }
}
