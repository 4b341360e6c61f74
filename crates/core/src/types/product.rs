//! Catalog product records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ProductId, Stock};

/// A product as listed by the backend catalog.
///
/// Field names follow the backend's JSON (`_id`, `hasSize`, ...). Call
/// [`Product::normalized`] after loading so filterable attributes compare
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub has_size: bool,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub stock: Stock,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub occasion: Vec<String>,
    #[serde(default, rename = "type")]
    pub product_type: Vec<String>,
    #[serde(default)]
    pub filter_tags: Vec<String>,
}

impl Product {
    /// Trim and lower-case the filterable attributes.
    ///
    /// List attributes also lose entries that are blank after trimming.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.gender = normalize(&self.gender);
        self.category = normalize(&self.category);
        self.sub_category = normalize(&self.sub_category);
        self.occasion = normalize_all(self.occasion);
        self.product_type = normalize_all(self.product_type);
        self.filter_tags = normalize_all(self.filter_tags);
        self
    }

    /// Cached units for an optional size.
    #[must_use]
    pub fn stock_for(&self, variant: Option<&str>) -> i64 {
        self.stock.available(variant)
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalize_all(values: Vec<String>) -> Vec<String> {
    values
        .iter()
        .map(|v| normalize(v))
        .filter(|v| !v.is_empty())
        .collect()
}
