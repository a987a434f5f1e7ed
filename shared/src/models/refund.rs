//! Refund Model

use super::order::{Order, OrderItem};
use serde::{Deserialize, Serialize};

/// Persisted refund record (immutable)
///
/// One record per refunded item per refund action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub id: i64,
    pub order_number: u64,
    pub refunded_items: Vec<OrderItem>,
    pub refund_amount: f64,
    pub created_at: i64,
}

impl Refund {
    /// Refunded quantity for an item name in this record
    pub fn refunded_qty(&self, name: &str) -> i64 {
        self.refunded_items
            .iter()
            .filter(|i| i.name == name)
            .map(|i| i.qty)
            .sum()
    }

    /// Whether this record was written against `order`'s current lifetime.
    ///
    /// Order numbers restart at 1 after a purge, so a stored refund for the
    /// same number but older than the order belongs to a purged order.
    pub fn belongs_to(&self, order: &Order) -> bool {
        self.order_number == order.order_number && self.created_at >= order.created_at
    }
}

/// One requested refund line
///
/// Only `name`, `qty` and `addOns` are read; price and category come from
/// the order snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundItemRequest {
    #[serde(default)]
    pub name: String,
    pub qty: i64,
    #[serde(default, alias = "dressings")]
    pub add_ons: Vec<String>,
}

/// Create refund payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRefundRequest {
    pub order_number: u64,
    #[serde(default)]
    pub refunded_items: Vec<RefundItemRequest>,
}

/// Per-item refund position of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundLine {
    pub name: String,
    pub category: String,
    pub ordered: i64,
    pub refunded: i64,
    pub remaining: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;

    fn order(number: u64, created_at: i64) -> Order {
        Order {
            id: 1,
            order_number: number,
            categories: vec![],
            items: vec![],
            total_amount: 0.0,
            status: OrderStatus::Pending,
            is_employee_order: false,
            created_at,
            updated_at: created_at,
            delivered_at: None,
        }
    }

    fn refund(number: u64, created_at: i64) -> Refund {
        Refund {
            id: 2,
            order_number: number,
            refunded_items: vec![],
            refund_amount: 0.0,
            created_at,
        }
    }

    #[test]
    fn refunds_older_than_the_order_belong_to_a_purged_order() {
        let current = order(1, 1_000);
        assert!(refund(1, 1_000).belongs_to(&current));
        assert!(refund(1, 2_000).belongs_to(&current));
        assert!(!refund(1, 999).belongs_to(&current));
        assert!(!refund(2, 2_000).belongs_to(&current));
    }
}
