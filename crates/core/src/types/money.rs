//! Money formatting.
//!
//! Prices arrive from the backend as plain numbers in a single store
//! currency, so amounts are bare `Decimal`s and the currency is only a
//! display prefix taken from configuration.

use rust_decimal::Decimal;

/// Format an amount with a currency prefix and two decimal places.
///
/// ```
/// use rust_decimal::Decimal;
/// use threadline_core::format_amount;
///
/// assert_eq!(format_amount("Rs. ", Decimal::new(124_950, 2)), "Rs. 1249.50");
/// ```
#[must_use]
pub fn format_amount(prefix: &str, amount: Decimal) -> String {
    format!("{prefix}{:.2}", amount.round_dp(2))
}
