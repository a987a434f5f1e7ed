//! Customer receipt renderer
//!
//! Renders an order as fixed-width plain text for 80mm thermal paper.

use chrono::TimeZone;
use chrono_tz::Tz;
use shared::models::{Order, OrderItem};
use shared::money::{format_amount, line_total, to_decimal};

/// 80mm paper: 48 characters
pub const RECEIPT_WIDTH: usize = 48;

const QTY_WIDTH: usize = 6;
const AMOUNT_WIDTH: usize = 10;

/// Receipt renderer
pub struct ReceiptRenderer {
    width: usize,
    timezone: Tz,
}

impl ReceiptRenderer {
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize, timezone: Tz) -> Self {
        Self { width, timezone }
    }

    pub fn render(&self, brand: &str, order: &Order) -> String {
        let mut out = String::new();

        // Header
        self.center(&mut out, &brand.to_uppercase());
        self.center(&mut out, &format!("Order #{}", order.order_number));
        self.center(&mut out, &format_timestamp(order.created_at, self.timezone));
        self.sep(&mut out, '=');

        self.columns(&mut out, "Items", "Qty", "Amount");
        self.sep(&mut out, '-');
        for item in &order.items {
            self.render_item(&mut out, item);
        }
        self.sep(&mut out, '-');

        // Footer
        self.columns(
            &mut out,
            "Total",
            "",
            &format_amount(to_decimal(order.total_amount)),
        );
        if order.is_employee_order {
            self.center(&mut out, "** EMPLOYEE ORDER **");
        }
        self.sep(&mut out, '-');
        self.center(&mut out, "Thank you!");
        out
    }

    fn name_width(&self) -> usize {
        self.width.saturating_sub(QTY_WIDTH + AMOUNT_WIDTH).max(1)
    }

    fn render_item(&self, out: &mut String, item: &OrderItem) {
        let amount = format_amount(line_total(item.unit_price, item.qty));
        let name: Vec<char> = item.name.chars().collect();
        let mut chunks = name.chunks(self.name_width());

        let first: String = chunks.next().map(|c| c.iter().collect()).unwrap_or_default();
        self.columns(out, &first, &item.qty.to_string(), &amount);
        // 长名称换行
        for chunk in chunks {
            out.push_str(&chunk.iter().collect::<String>());
            out.push('\n');
        }
        if !item.add_ons.is_empty() {
            out.push_str(&format!("  + {}\n", item.add_ons.join(", ")));
        }
    }

    fn columns(&self, out: &mut String, name: &str, qty: &str, amount: &str) {
        out.push_str(&format!(
            "{:<name_w$}{:>qty_w$}{:>amount_w$}\n",
            name,
            qty,
            amount,
            name_w = self.name_width(),
            qty_w = QTY_WIDTH,
            amount_w = AMOUNT_WIDTH,
        ));
    }

    fn center(&self, out: &mut String, text: &str) {
        let len = text.chars().count();
        let pad = self.width.saturating_sub(len) / 2;
        out.push_str(&" ".repeat(pad));
        out.push_str(text);
        out.push('\n');
    }

    fn sep(&self, out: &mut String, c: char) {
        out.push_str(&c.to_string().repeat(self.width));
        out.push('\n');
    }
}

/// `DD/MM/YYYY, HH:MM:SS` in the business timezone
fn format_timestamp(ts: i64, tz: Tz) -> String {
    tz.timestamp_millis_opt(ts)
        .single()
        .map(|t| t.format("%d/%m/%Y, %H:%M:%S").to_string())
        .unwrap_or_default()
}
