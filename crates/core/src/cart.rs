//! The cart store.
//!
//! A [`Cart`] maps product ids to [`CartLine`]s. The backend stores lines in
//! two JSON shapes (`{"quantity": n}` for products without sizes, and
//! `{"M": 2, "L": 1}` for sized products) and has historically written bare
//! numbers too. All of that is resolved once, when a cart is deserialised;
//! after that every caller works with the tagged [`CartLine`].
//!
//! # Invariants
//!
//! - Every stored quantity is `> 0`.
//! - A size entry is removed when its quantity reaches zero.
//! - A product entry is removed when it has no size entries left.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::types::ProductId;

/// Quantities held for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartLine {
    /// A product without sizes.
    Unsized(u32),
    /// Per-size quantities for a sized product.
    Sized(BTreeMap<String, u32>),
}

impl CartLine {
    /// Total units across every size.
    #[must_use]
    pub fn total(&self) -> u32 {
        match self {
            Self::Unsized(quantity) => *quantity,
            Self::Sized(sizes) => sizes.values().fold(0, |sum, q| sum.saturating_add(*q)),
        }
    }

    /// Units held for an optional size.
    ///
    /// Without a size this is the line total, so an unsized lookup against a
    /// line stored by size still sees everything in the cart. A size lookup
    /// against an unsized line is 0.
    #[must_use]
    pub fn quantity_for(&self, variant: Option<&str>) -> u32 {
        match (self, variant) {
            (Self::Sized(sizes), Some(size)) => sizes.get(size).copied().unwrap_or(0),
            (Self::Unsized(_), Some(_)) => 0,
            (line, None) => line.total(),
        }
    }

    fn fresh(variant: Option<&str>) -> Self {
        variant.map_or(Self::Unsized(1), |size| {
            Self::Sized(BTreeMap::from([(size.to_owned(), 1)]))
        })
    }

    /// Resolve one backend entry. `None` means the entry holds nothing.
    fn from_wire(product: &str, value: &Value) -> Option<Self> {
        match value {
            Value::Number(_) => wire_quantity(product, "quantity", value).map(Self::Unsized),
            Value::Object(fields) => {
                if let Some(quantity) = fields.get("quantity") {
                    if fields.len() > 1 {
                        warn!(product, "cart entry mixes quantity with size keys; keeping quantity");
                    }
                    return wire_quantity(product, "quantity", quantity).map(Self::Unsized);
                }
                let sizes: BTreeMap<String, u32> = fields
                    .iter()
                    .filter_map(|(size, v)| wire_quantity(product, size, v).map(|q| (size.clone(), q)))
                    .collect();
                (!sizes.is_empty()).then_some(Self::Sized(sizes))
            }
            other => {
                warn!(product, entry = %other, "skipping malformed cart entry");
                None
            }
        }
    }
}

/// A positive quantity from the wire, or `None` for zero and malformed values.
fn wire_quantity(product: &str, key: &str, value: &Value) -> Option<u32> {
    match value.as_u64().map(u32::try_from) {
        Some(Ok(0)) => None,
        Some(Ok(quantity)) => Some(quantity),
        _ => {
            warn!(product, key, value = %value, "skipping malformed cart quantity");
            None
        }
    }
}

impl Serialize for CartLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unsized(quantity) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("quantity", quantity)?;
                map.end()
            }
            Self::Sized(sizes) => sizes.serialize(serializer),
        }
    }
}

/// Result of pricing a cart against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartAmount {
    pub total: Decimal,
    /// Cart entries with no catalog price, or whose line total overflows;
    /// left out of `total`.
    pub unpriced: Vec<ProductId>,
}

/// Product id to line mapping for one shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: BTreeMap<ProductId, CartLine>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from the backend's `cartData` object.
    ///
    /// Malformed entries are logged and skipped rather than rejected, so a
    /// single bad line can never make the whole cart unreadable.
    #[must_use]
    pub fn from_wire(raw: Map<String, Value>) -> Self {
        let lines = raw
            .iter()
            .filter_map(|(id, value)| {
                CartLine::from_wire(id, value).map(|line| (ProductId::new(id.as_str()), line))
            })
            .collect();
        Self { lines }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn line(&self, id: &ProductId) -> Option<&CartLine> {
        self.lines.get(id)
    }

    pub fn lines(&self) -> impl Iterator<Item = (&ProductId, &CartLine)> {
        self.lines.iter()
    }

    pub fn product_ids(&self) -> impl Iterator<Item = &ProductId> {
        self.lines.keys()
    }

    /// Units of a product (or one of its sizes) currently in the cart.
    #[must_use]
    pub fn quantity(&self, id: &ProductId, variant: Option<&str>) -> u32 {
        self.lines
            .get(id)
            .map_or(0, |line| line.quantity_for(variant))
    }

    /// Add one unit and return the new quantity for that product or size.
    ///
    /// A line stored in the other shape (sized vs unsized) is replaced by a
    /// fresh line of the requested shape.
    pub fn increment(&mut self, id: &ProductId, variant: Option<&str>) -> u32 {
        let Some(line) = self.lines.get_mut(id) else {
            self.lines.insert(id.clone(), CartLine::fresh(variant));
            return 1;
        };

        match (line, variant) {
            (CartLine::Sized(sizes), Some(size)) => {
                let quantity = sizes.entry(size.to_owned()).or_insert(0);
                *quantity = quantity.saturating_add(1);
                *quantity
            }
            (CartLine::Unsized(quantity), None) => {
                *quantity = quantity.saturating_add(1);
                *quantity
            }
            (line, variant) => {
                warn!(product = %id, ?variant, "cart line shape mismatch; replacing line");
                *line = CartLine::fresh(variant);
                1
            }
        }
    }

    /// Overwrite a quantity. Zero removes the size (or the whole product when
    /// no size is given); a product left without sizes is removed too.
    ///
    /// Positive quantities only update products already in the cart. Returns
    /// whether anything changed.
    pub fn set_quantity(&mut self, id: &ProductId, variant: Option<&str>, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(id, variant);
        }

        match (self.lines.get_mut(id), variant) {
            (Some(CartLine::Sized(sizes)), Some(size)) => {
                sizes.insert(size.to_owned(), quantity);
                true
            }
            (Some(CartLine::Unsized(current)), None) => {
                *current = quantity;
                true
            }
            (Some(_), variant) => {
                warn!(product = %id, ?variant, "quantity update does not match cart line shape");
                false
            }
            (None, _) => false,
        }
    }

    fn remove(&mut self, id: &ProductId, variant: Option<&str>) -> bool {
        let Some(size) = variant else {
            return self.lines.remove(id).is_some();
        };
        let Some(CartLine::Sized(sizes)) = self.lines.get_mut(id) else {
            return false;
        };
        let removed = sizes.remove(size).is_some();
        if sizes.is_empty() {
            self.lines.remove(id);
        }
        removed
    }

    /// Total units across every product and size.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.lines.values().map(|line| u64::from(line.total())).sum()
    }

    /// Sum of price times quantity, using `price_of` to look prices up.
    ///
    /// Entries without a price are skipped and reported in
    /// [`CartAmount::unpriced`]; the catalog and the cart can disagree for a
    /// while after a product is delisted. Lines whose total would overflow
    /// are reported the same way.
    pub fn amount<F>(&self, mut price_of: F) -> CartAmount
    where
        F: FnMut(&ProductId) -> Option<Decimal>,
    {
        let mut amount = CartAmount::default();
        for (id, line) in &self.lines {
            let Some(price) = price_of(id) else {
                warn!(product = %id, "product not found for cart item");
                amount.unpriced.push(id.clone());
                continue;
            };
            let total = price
                .checked_mul(Decimal::from(line.total()))
                .and_then(|line_total| amount.total.checked_add(line_total));
            match total {
                Some(total) => amount.total = total,
                None => {
                    warn!(product = %id, quantity = line.total(), "cart line total overflowed");
                    amount.unpriced.push(id.clone());
                }
            }
        }
        amount
    }
}

impl Serialize for Cart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.lines.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Cart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Map<String, Value>>::deserialize(deserializer)?;
        Ok(Self::from_wire(raw.unwrap_or_default()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cart(value: Value) -> Cart {
        serde_json::from_value(value).unwrap()
    }

    fn id(raw: &str) -> ProductId {
        ProductId::new(raw)
    }

    #[test]
    fn test_count_sums_every_size() {
        let cart = cart(json!({"P1": {"quantity": 3}, "P2": {"S": 1, "M": 2}}));
        assert_eq!(cart.count(), 6);
    }

    #[test]
    fn test_malformed_entries_count_as_zero() {
        let cart = cart(json!({
            "P1": {"quantity": 2},
            "P2": {"S": "two", "M": 1, "L": -4, "XL": null},
            "P3": "broken",
            "P4": {"quantity": 1.5},
            "P5": 4
        }));
        assert_eq!(cart.count(), 7);
        assert_eq!(cart.len(), 3);
        assert!(cart.line(&id("P3")).is_none());
        assert!(cart.line(&id("P4")).is_none());
        assert_eq!(cart.line(&id("P5")), Some(&CartLine::Unsized(4)));
    }

    #[test]
    fn test_zero_quantities_are_dropped_on_load() {
        let cart = cart(json!({"P1": {"M": 0}, "P2": {"quantity": 0}, "P3": {"L": 1, "M": 0}}));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity(&id("P3"), Some("M")), 0);
        assert_eq!(cart.quantity(&id("P3"), Some("L")), 1);
    }

    #[test]
    fn test_null_cart_data_is_empty() {
        assert!(cart(Value::Null).is_empty());
    }

    #[test]
    fn test_serializes_back_to_backend_shapes() {
        let cart = cart(json!({"P1": {"quantity": 3}, "P2": {"M": 2}}));
        assert_eq!(
            serde_json::to_value(&cart).unwrap(),
            json!({"P1": {"quantity": 3}, "P2": {"M": 2}})
        );
    }

    #[test]
    fn test_increment_creates_and_grows_lines() {
        let mut cart = Cart::new();
        assert_eq!(cart.increment(&id("P1"), None), 1);
        assert_eq!(cart.increment(&id("P1"), None), 2);
        assert_eq!(cart.increment(&id("P2"), Some("M")), 1);
        assert_eq!(cart.increment(&id("P2"), Some("L")), 1);
        assert_eq!(cart.increment(&id("P2"), Some("M")), 2);
        assert_eq!(cart.count(), 5);
    }

    #[test]
    fn test_increment_replaces_mismatched_shape() {
        let mut cart = cart(json!({"P1": {"quantity": 4}}));
        assert_eq!(cart.increment(&id("P1"), Some("M")), 1);
        assert_eq!(cart.line(&id("P1")), Some(&CartLine::Sized(BTreeMap::from([("M".to_string(), 1)]))));
    }

    #[test]
    fn test_unsized_quantity_sums_sized_line() {
        let cart = cart(json!({"P1": {"S": 1, "M": 2}}));
        assert_eq!(cart.quantity(&id("P1"), None), 3);
        assert_eq!(cart.quantity(&id("P1"), Some("M")), 2);
        assert_eq!(cart.quantity(&id("missing"), None), 0);
    }

    #[test]
    fn test_set_quantity_zero_removes_only_that_size() {
        let mut cart = cart(json!({"P1": {"M": 2, "L": 1}}));
        assert!(cart.set_quantity(&id("P1"), Some("M"), 0));
        assert_eq!(serde_json::to_value(&cart).unwrap(), json!({"P1": {"L": 1}}));
    }

    #[test]
    fn test_set_quantity_zero_on_last_size_removes_product() {
        let mut cart = cart(json!({"P1": {"L": 1}, "P2": {"quantity": 1}}));
        assert!(cart.set_quantity(&id("P1"), Some("L"), 0));
        assert!(cart.line(&id("P1")).is_none());
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_set_quantity_zero_without_size_removes_product() {
        let mut cart = cart(json!({"P1": {"S": 1, "M": 1}}));
        assert!(cart.set_quantity(&id("P1"), None, 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_overwrites_without_limit() {
        let mut cart = cart(json!({"P1": {"M": 2}, "P2": {"quantity": 1}}));
        assert!(cart.set_quantity(&id("P1"), Some("M"), 40));
        assert!(cart.set_quantity(&id("P1"), Some("S"), 1));
        assert!(cart.set_quantity(&id("P2"), None, 9));
        assert_eq!(cart.quantity(&id("P1"), Some("M")), 40);
        assert_eq!(cart.quantity(&id("P1"), Some("S")), 1);
        assert_eq!(cart.quantity(&id("P2"), None), 9);
    }

    #[test]
    fn test_set_quantity_on_absent_product_is_noop() {
        let mut cart = Cart::new();
        assert!(!cart.set_quantity(&id("P1"), Some("M"), 2));
        assert!(!cart.set_quantity(&id("P1"), None, 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_amount_skips_unknown_products() {
        let cart = cart(json!({"P1": {"quantity": 2}, "gone": {"M": 5}, "P2": {"S": 1, "M": 1}}));
        let prices = std::collections::HashMap::from([
            (id("P1"), Decimal::new(49_950, 2)),
            (id("P2"), Decimal::from(1200)),
        ]);

        let amount = cart.amount(|pid| prices.get(pid).copied());
        assert_eq!(amount.total, Decimal::new(339_900, 2));
        assert_eq!(amount.unpriced, vec![id("gone")]);
    }

    #[test]
    fn test_amount_skips_overflowing_line() {
        let cart = cart(json!({"P1": {"quantity": u32::MAX}, "P2": {"quantity": 2}}));
        let prices = std::collections::HashMap::from([
            (id("P1"), Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0)),
            (id("P2"), Decimal::from(15)),
        ]);

        let amount = cart.amount(|pid| prices.get(pid).copied());
        assert_eq!(amount.total, Decimal::from(30));
        assert_eq!(amount.unpriced, vec![id("P1")]);
    }
}
