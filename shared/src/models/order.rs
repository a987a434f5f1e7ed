//! Order Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle status
///
/// `PENDING → CONFIRMED → DELIVERED`; the derived `Ord` follows that order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Delivered,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Delivered => "DELIVERED",
        }
    }

    /// Case-insensitive parse of a status string
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(OrderStatus::Pending),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "DELIVERED" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }

    /// Whether the state machine has an edge from `self` to `next`
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Confirmed)
                | (OrderStatus::Confirmed, OrderStatus::Delivered)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshotted order line
///
/// `price` already includes add-on deltas; later menu edits never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub qty: i64,
    #[serde(rename = "price")]
    pub unit_price: f64,
    #[serde(default, alias = "dressings", skip_serializing_if = "Vec::is_empty")]
    pub add_ons: Vec<String>,
}

impl OrderItem {
    /// Add-ons in canonical order, joined with `+`
    pub fn add_ons_label(&self) -> String {
        let mut add_ons: Vec<&str> = self.add_ons.iter().map(String::as_str).collect();
        add_ons.sort_unstable();
        add_ons.join("+")
    }
}

/// Persisted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_number: u64,
    pub categories: Vec<String>,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    #[serde(rename = "employee", default)]
    pub is_employee_order: bool,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<i64>,
}

impl Order {
    /// Ordered quantity of a line by name, summed over duplicate lines
    pub fn ordered_qty(&self, name: &str) -> i64 {
        self.items
            .iter()
            .filter(|i| i.name == name)
            .map(|i| i.qty)
            .sum()
    }
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(rename = "employee", default)]
    pub is_employee_order: bool,
}

/// Update order payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub items: Option<Vec<OrderItem>>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<String>,
}
