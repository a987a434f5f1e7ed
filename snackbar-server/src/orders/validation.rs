//! Order input validation
//!
//! Every check here runs before storage is touched.

use shared::models::OrderItem;
use shared::{AppError, AppResult, ErrorCode};

/// Item / category names
pub const MAX_NAME_LEN: usize = 200;

/// Maximum allowed unit price
pub const MAX_PRICE: f64 = 1_000_000.0;

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: i64 = 9999;

/// Maximum number of lines in one order
pub const MAX_LINES: usize = 200;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field: &str, code: ErrorCode) -> AppResult<()> {
    if !value.is_finite() {
        return Err(AppError::with_message(
            code,
            format!("{field} must be a finite number, got {value}"),
        )
        .with_detail("field", field));
    }
    Ok(())
}

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(
            AppError::with_message(ErrorCode::RequiredField, format!("{field} must not be empty"))
                .with_detail("field", field),
        );
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        ))
        .with_detail("field", field));
    }
    Ok(())
}

/// Quantity must be positive and within bounds
pub fn validate_quantity(qty: i64, field: &str) -> AppResult<()> {
    if qty <= 0 {
        return Err(AppError::with_message(
            ErrorCode::InvalidQuantity,
            format!("{field} must be positive, got {qty}"),
        )
        .with_detail("field", field));
    }
    if qty > MAX_QUANTITY {
        return Err(AppError::with_message(
            ErrorCode::InvalidQuantity,
            format!("{field} exceeds maximum allowed ({MAX_QUANTITY}), got {qty}"),
        )
        .with_detail("field", field));
    }
    Ok(())
}

/// Validate one snapshotted order line
pub fn validate_item(item: &OrderItem, index: usize) -> AppResult<()> {
    let at = |e: AppError| e.with_detail("index", index);

    validate_required_text(&item.name, "name", MAX_NAME_LEN).map_err(at)?;
    validate_required_text(&item.category, "category", MAX_NAME_LEN).map_err(at)?;
    validate_quantity(item.qty, "qty").map_err(at)?;

    require_finite(item.unit_price, "price", ErrorCode::InvalidPrice).map_err(at)?;
    if item.unit_price < 0.0 {
        return Err(at(AppError::with_message(
            ErrorCode::InvalidPrice,
            format!("price must be non-negative, got {}", item.unit_price),
        )));
    }
    if item.unit_price > MAX_PRICE {
        return Err(at(AppError::with_message(
            ErrorCode::InvalidPrice,
            format!(
                "price exceeds maximum allowed ({MAX_PRICE}), got {}",
                item.unit_price
            ),
        )));
    }

    for add_on in &item.add_ons {
        validate_required_text(add_on, "addOns", MAX_NAME_LEN).map_err(at)?;
    }
    Ok(())
}

/// Non-empty list of valid lines
pub fn validate_items(items: &[OrderItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }
    if items.len() > MAX_LINES {
        return Err(AppError::validation(format!(
            "too many lines ({}, max {MAX_LINES})",
            items.len()
        )));
    }
    items
        .iter()
        .enumerate()
        .try_for_each(|(i, item)| validate_item(item, i))
}

/// Client-supplied total: finite and non-negative
pub fn validate_total(total: f64) -> AppResult<()> {
    require_finite(total, "totalAmount", ErrorCode::InvalidTotal)?;
    if total < 0.0 {
        return Err(AppError::with_message(
            ErrorCode::InvalidTotal,
            format!("totalAmount must be non-negative, got {total}"),
        ));
    }
    Ok(())
}

/// Every supplied category is a non-empty name
pub fn validate_categories(categories: &[String]) -> AppResult<()> {
    categories
        .iter()
        .try_for_each(|c| validate_required_text(c, "categories", MAX_NAME_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, qty: i64, price: f64) -> OrderItem {
        OrderItem {
            name: name.into(),
            category: "Bites".into(),
            qty,
            unit_price: price,
            add_ons: vec![],
        }
    }

    #[test]
    fn empty_order_rejected() {
        assert_eq!(validate_items(&[]).unwrap_err().code, ErrorCode::OrderEmpty);
    }

    #[test]
    fn bad_lines_rejected_with_index() {
        let err = validate_items(&[item("Fries", 1, 50.0), item("Fries", 0, 50.0)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);
        assert_eq!(err.details.unwrap()["index"], 1);

        assert_eq!(
            validate_item(&item("Fries", 1, -1.0), 0).unwrap_err().code,
            ErrorCode::InvalidPrice
        );
        assert_eq!(
            validate_item(&item("Fries", 1, f64::NAN), 0).unwrap_err().code,
            ErrorCode::InvalidPrice
        );
        assert_eq!(
            validate_item(&item("  ", 1, 5.0), 0).unwrap_err().code,
            ErrorCode::RequiredField
        );

        let mut no_category = item("Fries", 1, 5.0);
        no_category.category.clear();
        assert!(validate_item(&no_category, 0).is_err());
    }

    #[test]
    fn zero_price_is_fine() {
        assert!(validate_items(&[item("Water", 1, 0.0)]).is_ok());
    }

    #[test]
    fn total_must_be_finite_and_non_negative() {
        assert!(validate_total(0.0).is_ok());
        assert_eq!(validate_total(-1.0).unwrap_err().code, ErrorCode::InvalidTotal);
        assert_eq!(
            validate_total(f64::INFINITY).unwrap_err().code,
            ErrorCode::InvalidTotal
        );
    }
}
