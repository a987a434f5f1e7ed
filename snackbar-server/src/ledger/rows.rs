//! Ledger row builders
//!
//! Pure functions turning a confirmed order / refund records into
//! spreadsheet rows. No I/O here.
//!
//! | Sheet | Header range | Append range | Row |
//! |-------|--------------|--------------|-----|
//! | Orders (`Sheet1`) | `A1:O1` | `A:O` | 每个分类一行，最多 3 个商品 |
//! | Refunds (`Sheet2`) | `A1:F1` | `A:F` | 每条退款记录一行 |

use chrono::TimeZone;
use chrono_tz::Tz;
use serde_json::{Value, json};
use shared::models::{Menu, Order, OrderItem, Refund};
use shared::money::{items_total, to_f64};
use shared::report::resolve_category;

/// Item slots per order row
pub const ITEMS_PER_ROW: usize = 3;

/// Status column value for refund rows
pub const REFUNDED_MARKER: &str = "REFUNDED";

/// Employee column value
pub const EMPLOYEE_MARKER: &str = "EMPLOYEE";

const ORDER_HEADER: [&str; 15] = [
    "Order Number",
    "Date",
    "Category",
    "Item 1",
    "Qty 1",
    "Dressings 1",
    "Item 2",
    "Qty 2",
    "Dressings 2",
    "Item 3",
    "Qty 3",
    "Dressings 3",
    "Category Total",
    "Status",
    "Employee",
];

const REFUND_HEADER: [&str; 6] = [
    "Order Number",
    "Refund Date",
    "Item Refunded",
    "Quantity",
    "Refund Amount",
    "Status",
];

/// Target sheet of the ledger spreadsheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sheet {
    Orders,
    Refunds,
}

impl Sheet {
    pub const fn name(&self) -> &'static str {
        match self {
            Sheet::Orders => "Sheet1",
            Sheet::Refunds => "Sheet2",
        }
    }

    pub const fn header(&self) -> &'static [&'static str] {
        match self {
            Sheet::Orders => &ORDER_HEADER,
            Sheet::Refunds => &REFUND_HEADER,
        }
    }

    fn last_column(&self) -> char {
        // header 长度决定最后一列（A + n - 1）
        (b'A' + (self.header().len() as u8) - 1) as char
    }

    /// `Sheet1!A1:O1`
    pub fn header_range(&self) -> String {
        format!("{}!A1:{}1", self.name(), self.last_column())
    }

    /// `Sheet1!A:O`
    pub fn append_range(&self) -> String {
        format!("{}!A:{}", self.name(), self.last_column())
    }

    pub fn header_row(&self) -> Vec<Value> {
        self.header().iter().map(|h| json!(h)).collect()
    }
}

fn local_time(ts: i64, tz: Tz) -> Option<chrono::DateTime<Tz>> {
    tz.timestamp_millis_opt(ts).single()
}

/// `DD/MM/YYYY` in the business timezone
pub fn ledger_date(ts: i64, tz: Tz) -> String {
    local_time(ts, tz)
        .map(|t| t.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

/// `DD/MM/YYYY, HH:MM:SS` in the business timezone
pub fn ledger_datetime(ts: i64, tz: Tz) -> String {
    local_time(ts, tz)
        .map(|t| t.format("%d/%m/%Y, %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Categories in row order: the order's own list first, then any category
/// that only shows up on the lines.
fn row_categories(order: &Order, menu: &Menu) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    let listed = order.categories.iter().cloned();
    let from_lines = order.items.iter().map(|i| resolve_category(i, menu));
    for category in listed.chain(from_lines) {
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories
}

/// One row per category with at most [`ITEMS_PER_ROW`] items.
///
/// A category with more items continues on extra rows repeating number,
/// date and category; each row's total covers only its own items, so the
/// column still sums to the category total. Employee orders record 0.
pub fn order_rows(order: &Order, menu: &Menu, tz: Tz) -> Vec<Vec<Value>> {
    let date = ledger_date(order.created_at, tz);
    let employee = if order.is_employee_order {
        EMPLOYEE_MARKER
    } else {
        ""
    };

    let mut rows = Vec::new();
    for category in row_categories(order, menu) {
        let lines: Vec<OrderItem> = order
            .items
            .iter()
            .filter(|i| resolve_category(i, menu) == category)
            .cloned()
            .collect();

        for chunk in lines.chunks(ITEMS_PER_ROW) {
            let mut row = vec![json!(order.order_number), json!(date), json!(category)];
            for slot in 0..ITEMS_PER_ROW {
                match chunk.get(slot) {
                    Some(item) => {
                        row.push(json!(item.name));
                        row.push(json!(item.qty));
                        row.push(json!(item.add_ons_label()));
                    }
                    None => row.extend([json!(""), json!(""), json!("")]),
                }
            }
            let total = if order.is_employee_order {
                0.0
            } else {
                to_f64(items_total(chunk))
            };
            row.push(json!(total));
            row.push(json!(order.status.as_str()));
            row.push(json!(employee));
            rows.push(row);
        }
    }
    rows
}

/// One row per refunded line of each record
pub fn refund_rows(refunds: &[Refund], tz: Tz) -> Vec<Vec<Value>> {
    refunds
        .iter()
        .flat_map(|refund| {
            let when = ledger_datetime(refund.created_at, tz);
            let single = refund.refunded_items.len() == 1;
            refund.refunded_items.iter().map(move |item| {
                // 单条记录直接用记录金额，避免重复舍入
                let amount = if single {
                    refund.refund_amount
                } else {
                    to_f64(items_total(std::slice::from_ref(item)))
                };
                vec![
                    json!(refund.order_number),
                    json!(when),
                    json!(item.name),
                    json!(item.qty),
                    json!(amount),
                    json!(REFUNDED_MARKER),
                ]
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{MENU, OrderStatus};

    fn line(name: &str, category: &str, qty: i64, price: f64) -> OrderItem {
        OrderItem {
            name: name.into(),
            category: category.into(),
            qty,
            unit_price: price,
            add_ons: vec![],
        }
    }

    fn order(items: Vec<OrderItem>, employee: bool) -> Order {
        Order {
            id: 1,
            order_number: 42,
            categories: vec![],
            items,
            total_amount: 0.0,
            status: OrderStatus::Confirmed,
            is_employee_order: employee,
            // 2024-03-05 12:00 IST
            created_at: 1_709_620_200_000,
            updated_at: 1_709_620_200_000,
            delivered_at: None,
        }
    }

    #[test]
    fn ranges_match_headers() {
        assert_eq!(Sheet::Orders.header_range(), "Sheet1!A1:O1");
        assert_eq!(Sheet::Orders.append_range(), "Sheet1!A:O");
        assert_eq!(Sheet::Refunds.header_range(), "Sheet2!A1:F1");
        assert_eq!(Sheet::Refunds.append_range(), "Sheet2!A:F");
    }

    #[test]
    fn one_row_per_category() {
        let mut salad = line("Protein-Packed Soya Salad", "Salad Bowls", 1, 80.0);
        salad.add_ons = vec!["Mint".into(), "Chipotle".into()];
        let o = order(
            vec![
                line("Tea", "Hot Beverages", 2, 30.0),
                salad,
                line("Coffee", "Hot Beverages", 1, 40.0),
            ],
            false,
        );

        let rows = order_rows(&o, &MENU, chrono_tz::Asia::Kolkata);
        assert_eq!(rows.len(), 2);

        let tea_row = &rows[0];
        assert_eq!(tea_row.len(), 15);
        assert_eq!(tea_row[0], json!(42));
        assert_eq!(tea_row[1], json!("05/03/2024"));
        assert_eq!(tea_row[2], json!("Hot Beverages"));
        assert_eq!(tea_row[3], json!("Tea"));
        assert_eq!(tea_row[4], json!(2));
        assert_eq!(tea_row[6], json!("Coffee"));
        assert_eq!(tea_row[9], json!(""));
        assert_eq!(tea_row[12], json!(100.0));
        assert_eq!(tea_row[13], json!("CONFIRMED"));
        assert_eq!(tea_row[14], json!(""));

        assert_eq!(rows[1][5], json!("Chipotle+Mint"));
    }

    #[test]
    fn overflow_spills_into_continuation_rows() {
        let items = (0..4)
            .map(|i| line(&format!("Juice {i}"), "Juices", 1, 10.0))
            .collect();
        let rows = order_rows(&order(items, false), &MENU, chrono_tz::Asia::Kolkata);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][12], json!(30.0));
        assert_eq!(rows[1][3], json!("Juice 3"));
        assert_eq!(rows[1][12], json!(10.0));
    }

    #[test]
    fn employee_rows_record_zero() {
        let rows = order_rows(
            &order(vec![line("Tea", "Hot Beverages", 2, 30.0)], true),
            &MENU,
            chrono_tz::Asia::Kolkata,
        );
        assert_eq!(rows[0][12], json!(0.0));
        assert_eq!(rows[0][14], json!(EMPLOYEE_MARKER));
    }

    #[test]
    fn refund_row_layout() {
        let refund = Refund {
            id: 9,
            order_number: 42,
            refunded_items: vec![line("Tea", "Hot Beverages", 3, 30.0)],
            refund_amount: 90.0,
            created_at: 1_709_620_200_000,
        };
        let rows = refund_rows(&[refund], chrono_tz::Asia::Kolkata);
        assert_eq!(
            rows,
            vec![vec![
                json!(42),
                json!("05/03/2024, 12:00:00"),
                json!("Tea"),
                json!(3),
                json!(90.0),
                json!("REFUNDED"),
            ]]
        );
    }
}
