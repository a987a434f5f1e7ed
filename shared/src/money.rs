//! Money calculation utilities using rust_decimal for precision
//!
//! All sums are done using `Decimal` internally, then converted to `f64`
//! for storage/serialization.

use crate::models::{OrderItem, Refund};
use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal (non-finite values become 0)
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// unit_price × qty
#[inline]
pub fn line_total(unit_price: f64, qty: i64) -> Decimal {
    to_decimal(unit_price) * Decimal::from(qty)
}

/// Σ unit_price × qty over order lines
pub fn items_total(items: &[OrderItem]) -> Decimal {
    items
        .iter()
        .map(|i| line_total(i.unit_price, i.qty))
        .sum()
}

/// Stored order total: Σ price × qty, or 0 for employee orders
pub fn order_total(items: &[OrderItem], is_employee_order: bool) -> f64 {
    if is_employee_order {
        0.0
    } else {
        to_f64(items_total(items))
    }
}

/// Σ refund_amount
pub fn refunds_total(refunds: &[Refund]) -> Decimal {
    refunds.iter().map(|r| to_decimal(r.refund_amount)).sum()
}

/// Two amounts equal within one cent
pub fn money_eq(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() < Decimal::new(1, DECIMAL_PLACES)
}

/// Plain machine-parseable amount: `80`, `12.5`, never a currency symbol
pub fn format_amount(value: Decimal) -> String {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
        .to_string()
}
