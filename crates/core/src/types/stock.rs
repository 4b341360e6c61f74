//! Stock records reported by the stock oracle and cached on products.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Available inventory for one product.
///
/// The backend reports a bare integer for products without sizes and a
/// size-label map for sized products. Figures are signed because the
/// backend can report oversold (negative) stock; anything `<= 0` is out of
/// stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stock {
    Flat(i64),
    BySize(BTreeMap<String, i64>),
}

impl Default for Stock {
    fn default() -> Self {
        Self::Flat(0)
    }
}

impl Stock {
    /// Units available for an optional variant.
    ///
    /// A variant lookup against a flat record, or a flat lookup against a
    /// sized record, yields 0: the shapes are never mixed.
    #[must_use]
    pub fn available(&self, variant: Option<&str>) -> i64 {
        match (self, variant) {
            (Self::Flat(units), None) => *units,
            (Self::BySize(sizes), Some(size)) => sizes.get(size).copied().unwrap_or(0),
            (Self::Flat(_), Some(_)) | (Self::BySize(_), None) => 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_parses_both_wire_shapes() {
        let flat: Stock = serde_json::from_str("7").unwrap();
        assert_eq!(flat, Stock::Flat(7));

        let sized: Stock = serde_json::from_str(r#"{"M": 2, "L": 0}"#).unwrap();
        assert_eq!(sized.available(Some("M")), 2);
        assert_eq!(sized.available(Some("L")), 0);
        assert_eq!(sized.available(Some("XL")), 0);
    }

    #[test]
    fn test_stock_shape_mismatch_is_zero() {
        assert_eq!(Stock::Flat(5).available(Some("M")), 0);
        let sized = Stock::BySize(BTreeMap::from([("M".to_string(), 3)]));
        assert_eq!(sized.available(None), 0);
    }

    #[test]
    fn test_negative_stock_survives_parsing() {
        let oversold: Stock = serde_json::from_str("-2").unwrap();
        assert_eq!(oversold.available(None), -2);
    }
}
