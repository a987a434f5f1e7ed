//! Refund service
//!
//! 退款数量按订单剩余量截断：`finalQty = min(requested, ordered − refunded)`。
//! 读取订单、历史退款并写入新记录在同一个 redb 写事务内完成，
//! 并发退款不会超退。

use shared::models::{CreateRefundRequest, Order, OrderItem, Refund, RefundItemRequest, RefundLine};
use shared::money::{items_total, to_f64};
use shared::util::{now_millis, snowflake_id};
use shared::{AppError, AppResult, ErrorCode};

use crate::db::Storage;
use crate::ledger::LedgerHandle;
use crate::orders::validation::{MAX_NAME_LEN, MAX_QUANTITY, validate_required_text};

fn validate_line(line: &RefundItemRequest, index: usize) -> AppResult<()> {
    validate_required_text(&line.name, "name", MAX_NAME_LEN)
        .map_err(|e| e.with_detail("index", index))?;
    if line.qty < 0 || line.qty > MAX_QUANTITY {
        return Err(AppError::with_message(
            ErrorCode::InvalidQuantity,
            format!("Refund quantity out of range: {}", line.qty),
        )
        .with_detail("index", index));
    }
    Ok(())
}

fn sorted(add_ons: &[String]) -> Vec<&str> {
    let mut v: Vec<&str> = add_ons.iter().map(String::as_str).collect();
    v.sort_unstable();
    v
}

/// Unrefunded quantity of each order line, indexed like `order.items`
struct LineBalance<'a> {
    order: &'a Order,
    left: Vec<i64>,
}

impl<'a> LineBalance<'a> {
    /// Start from the ordered quantities and consume `prior` refunds
    fn new(order: &'a Order, prior: &[Refund]) -> Self {
        let mut balance = Self {
            order,
            left: order.items.iter().map(|i| i.qty.max(0)).collect(),
        };
        for item in prior.iter().flat_map(|r| &r.refunded_items) {
            balance.take(&item.name, &item.add_ons, item.qty);
        }
        balance
    }

    fn has(&self, name: &str) -> bool {
        self.order.items.iter().any(|i| i.name == name)
    }

    /// Take up to `qty` units of `name` and return `(line index, qty)`
    /// portions.
    ///
    /// Lines with the exact add-on set are drained first, then the other
    /// lines of that name in order. No line gives more than it has left.
    fn take(&mut self, name: &str, add_ons: &[String], qty: i64) -> Vec<(usize, i64)> {
        let wanted = sorted(add_ons);
        let items: &'a [OrderItem] = &self.order.items;
        let (exact, other): (Vec<usize>, Vec<usize>) = (0..items.len())
            .filter(|&idx| items[idx].name == name)
            .partition(|&idx| sorted(&items[idx].add_ons) == wanted);

        let mut wanted_qty = qty.max(0);
        let mut portions = Vec::new();
        for idx in exact.into_iter().chain(other) {
            if wanted_qty == 0 {
                break;
            }
            let portion = wanted_qty.min(self.left[idx]);
            if portion > 0 {
                self.left[idx] -= portion;
                wanted_qty -= portion;
                portions.push((idx, portion));
            }
        }
        portions
    }
}

fn remaining(order: &Order, refunds: &[Refund], name: &str) -> i64 {
    let refunded: i64 = refunds.iter().map(|r| r.refunded_qty(name)).sum();
    (order.ordered_qty(name) - refunded).max(0)
}

/// Clamp every requested line against what is left and build the records.
///
/// `prior` holds every refund already stored for this order. Each request
/// line is spread over the order lines of that name, never taking more
/// than a line has left, and every portion is priced at its own line's
/// price. Lines draw from one shared balance, so repeating a name in one
/// request cannot exceed the ordered quantity either.
pub fn plan_refunds(order: &Order, prior: &[Refund], lines: &[RefundItemRequest]) -> Vec<Refund> {
    let mut balance = LineBalance::new(order, prior);
    let now = now_millis();
    let mut created = Vec::new();

    for line in lines.iter().filter(|l| l.qty > 0) {
        if !balance.has(&line.name) {
            tracing::debug!(
                order_number = order.order_number,
                item = %line.name,
                "Refund line not on order, skipped"
            );
            continue;
        }

        let portions = balance.take(&line.name, &line.add_ons, line.qty);
        if portions.is_empty() {
            continue;
        }

        let refunded_items: Vec<OrderItem> = portions
            .into_iter()
            .map(|(idx, qty)| OrderItem {
                qty,
                ..order.items[idx].clone()
            })
            .collect();

        // 员工单未收款，退款金额为 0，明细仍保留原价
        let refund_amount = if order.is_employee_order {
            0.0
        } else {
            to_f64(items_total(&refunded_items))
        };

        created.push(Refund {
            id: snowflake_id(),
            order_number: order.order_number,
            refunded_items,
            refund_amount,
            created_at: now,
        });
    }
    created
}

#[derive(Debug, Clone)]
pub struct RefundService {
    storage: Storage,
    ledger: LedgerHandle,
}

impl RefundService {
    pub fn new(storage: Storage, ledger: LedgerHandle) -> Self {
        Self { storage, ledger }
    }

    /// Record refunds; returns the created records (possibly empty)
    pub fn create(&self, req: CreateRefundRequest) -> AppResult<Vec<Refund>> {
        let order_number = req.order_number;
        if req.refunded_items.is_empty() {
            return Err(AppError::new(ErrorCode::RefundEmpty).with_detail("orderNumber", order_number));
        }
        for (index, line) in req.refunded_items.iter().enumerate() {
            validate_line(line, index).map_err(|e| e.with_detail("orderNumber", order_number))?;
        }

        let created = self
            .storage
            .insert_refunds(order_number, |order, prior| -> AppResult<Vec<Refund>> {
                Ok(plan_refunds(order, prior, &req.refunded_items))
            })?
            .ok_or_else(|| {
                AppError::order_not_found(order_number).with_detail("operation", "refund")
            })?;

        if created.is_empty() {
            tracing::info!(order_number, "Nothing left to refund, no records written");
            return Ok(created);
        }

        for refund in &created {
            tracing::info!(
                order_number,
                refund_id = refund.id,
                refund_amount = refund.refund_amount,
                "Refund recorded"
            );
        }
        self.ledger.export_refunds(&created);
        Ok(created)
    }

    /// Newest first
    pub fn list_all(&self) -> AppResult<Vec<Refund>> {
        let mut refunds = self.storage.list_refunds()?;
        sort_newest_first(&mut refunds);
        Ok(refunds)
    }

    pub fn list_by_order(&self, order_number: u64) -> AppResult<Vec<Refund>> {
        let mut refunds = self.storage.list_refunds_for_order(order_number)?;
        sort_newest_first(&mut refunds);
        Ok(refunds)
    }

    fn order(&self, order_number: u64, operation: &str) -> AppResult<Order> {
        self.storage
            .find_order_by_number(order_number)?
            .ok_or_else(|| AppError::order_not_found(order_number).with_detail("operation", operation))
    }

    /// `ordered − Σ refunded`, floored at 0
    pub fn remaining_for(&self, order_number: u64, item_name: &str) -> AppResult<i64> {
        let order = self.order(order_number, "remaining")?;
        let refunds = self.storage.list_refunds_of(&order)?;
        Ok(remaining(&order, &refunds, item_name))
    }

    /// Per-item refund position, in order line order
    pub fn refund_summary(&self, order_number: u64) -> AppResult<Vec<RefundLine>> {
        let order = self.order(order_number, "refund_summary")?;
        let refunds = self.storage.list_refunds_of(&order)?;

        let mut lines: Vec<RefundLine> = Vec::new();
        for item in &order.items {
            if lines.iter().any(|l| l.name == item.name) {
                continue;
            }
            let ordered = order.ordered_qty(&item.name);
            let refunded: i64 = refunds.iter().map(|r| r.refunded_qty(&item.name)).sum();
            lines.push(RefundLine {
                name: item.name.clone(),
                category: item.category.clone(),
                ordered,
                refunded,
                remaining: (ordered - refunded).max(0),
            });
        }
        Ok(lines)
    }
}

fn sort_newest_first(refunds: &mut [Refund]) {
    refunds.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}
