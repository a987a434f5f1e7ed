//! Order lifecycle service
//!
//! ```text
//! PENDING ──confirm──► CONFIRMED ──deliver──► DELIVERED
//! ```
//!
//! 所有校验都在写入之前完成；状态检查在 redb 写事务内执行，失败即回滚。
//! 确认后的账本导出在提交之后入队。

use shared::models::{CreateOrderRequest, Order, OrderItem, OrderStatus, UpdateOrderRequest};
use shared::money::{money_eq, order_total};
use shared::util::now_millis;
use shared::{AppError, AppResult, ErrorCode};

use super::validation::{validate_categories, validate_items, validate_total};
use crate::db::{Storage, StorageError};
use crate::ledger::LedgerHandle;

/// Bounded retries when the order number is taken
pub const MAX_CREATE_ATTEMPTS: usize = 5;

/// Distinct categories in first-seen order
fn distinct_categories(items: &[OrderItem]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for item in items {
        if !categories.contains(&item.category) {
            categories.push(item.category.clone());
        }
    }
    categories
}

fn not_found(id: i64, operation: &str) -> AppError {
    AppError::order_not_found(id).with_detail("operation", operation)
}

#[derive(Debug, Clone)]
pub struct OrderService {
    storage: Storage,
    ledger: LedgerHandle,
}

impl OrderService {
    pub fn new(storage: Storage, ledger: LedgerHandle) -> Self {
        Self { storage, ledger }
    }

    /// Validate, recompute the total and insert with the next order number
    pub fn create(&self, req: CreateOrderRequest) -> AppResult<Order> {
        validate_items(&req.items)?;
        if let Some(total) = req.total_amount {
            validate_total(total)?;
        }
        if let Some(categories) = &req.categories {
            validate_categories(categories)?;
        }

        let total_amount = order_total(&req.items, req.is_employee_order);
        if let Some(client_total) = req.total_amount
            && !money_eq(client_total, total_amount)
        {
            tracing::warn!(
                client_total,
                total_amount,
                employee = req.is_employee_order,
                "Client total disagrees with line items, using recomputed total"
            );
        }

        let categories = match req.categories {
            Some(categories) if !categories.is_empty() => categories,
            _ => distinct_categories(&req.items),
        };

        let now = now_millis();
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let result = self.storage.create_order(|id, order_number| Order {
                id,
                order_number,
                categories: categories.clone(),
                items: req.items.clone(),
                total_amount,
                status: OrderStatus::Pending,
                is_employee_order: req.is_employee_order,
                created_at: now,
                updated_at: now,
                delivered_at: None,
            });

            match result {
                Ok(order) => {
                    tracing::info!(
                        order_id = order.id,
                        order_number = order.order_number,
                        total_amount = order.total_amount,
                        employee = order.is_employee_order,
                        "Order created"
                    );
                    return Ok(order);
                }
                Err(StorageError::DuplicateOrderNumber(number)) => {
                    tracing::warn!(attempt, order_number = number, "Order number taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::new(ErrorCode::OrderNumberConflict)
            .with_detail("operation", "create")
            .with_detail("attempts", MAX_CREATE_ATTEMPTS))
    }

    pub fn get(&self, id: i64) -> AppResult<Order> {
        self.storage
            .get_order(id)?
            .ok_or_else(|| not_found(id, "get"))
    }

    pub fn get_by_number(&self, order_number: u64) -> AppResult<Order> {
        self.storage
            .find_order_by_number(order_number)?
            .ok_or_else(|| {
                AppError::order_not_found(order_number).with_detail("operation", "get_by_number")
            })
    }

    /// Newest first: createdAt desc, then orderNumber desc
    pub fn list(&self) -> AppResult<Vec<Order>> {
        let mut orders = self.storage.list_orders()?;
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.order_number.cmp(&a.order_number))
        });
        Ok(orders)
    }

    /// Edit items / categories / status
    ///
    /// Items on a DELIVERED order are frozen. Status may only follow the
    /// state machine; repeating the current status changes nothing.
    pub fn update(&self, id: i64, req: UpdateOrderRequest) -> AppResult<Order> {
        if let Some(items) = &req.items {
            validate_items(items)?;
        }
        if let Some(categories) = &req.categories {
            validate_categories(categories)?;
        }
        let target = match req.status.as_deref() {
            Some(raw) => Some(OrderStatus::parse(raw).ok_or_else(|| {
                AppError::with_message(ErrorCode::InvalidStatus, format!("Unknown status: {raw}"))
                    .with_detail("order", id)
                    .with_detail("status", raw)
            })?),
            None => None,
        };

        let updated = self.storage.update_order(id, |order| -> AppResult<()> {
            if req.items.is_some() && order.status == OrderStatus::Delivered {
                return Err(AppError::new(ErrorCode::OrderAlreadyDelivered)
                    .with_detail("order", id)
                    .with_detail("operation", "update"));
            }
            if let Some(next) = target
                && next != order.status
                && !order.status.can_transition_to(next)
            {
                return Err(AppError::with_message(
                    ErrorCode::InvalidStatusTransition,
                    format!("Cannot move order from {} to {}", order.status, next),
                )
                .with_detail("order", id)
                .with_detail("operation", "update"));
            }

            let now = now_millis();
            if let Some(items) = &req.items {
                order.total_amount = order_total(items, order.is_employee_order);
                order.items = items.clone();
                if req.categories.is_none() {
                    order.categories = distinct_categories(items);
                }
            }
            if let Some(categories) = &req.categories {
                order.categories = categories.clone();
            }
            if let Some(next) = target {
                order.status = next;
                if next == OrderStatus::Delivered && order.delivered_at.is_none() {
                    order.delivered_at = Some(now);
                }
            }
            order.updated_at = now;
            Ok(())
        })?;

        let order = updated.ok_or_else(|| not_found(id, "update"))?;
        tracing::info!(
            order_id = order.id,
            order_number = order.order_number,
            status = %order.status,
            "Order updated"
        );
        Ok(order)
    }

    /// PENDING / CONFIRMED → CONFIRMED, then queue the ledger export
    pub fn confirm(&self, id: i64) -> AppResult<Order> {
        let updated = self.storage.update_order(id, |order| -> AppResult<()> {
            if order.status == OrderStatus::Delivered {
                return Err(AppError::with_message(
                    ErrorCode::InvalidStatusTransition,
                    "Delivered orders cannot be confirmed again",
                )
                .with_detail("order", id)
                .with_detail("operation", "confirm"));
            }
            order.status = OrderStatus::Confirmed;
            order.updated_at = now_millis();
            Ok(())
        })?;

        let order = updated.ok_or_else(|| not_found(id, "confirm"))?;
        tracing::info!(
            order_id = order.id,
            order_number = order.order_number,
            "Order confirmed"
        );
        self.ledger.export_order(&order);
        Ok(order)
    }

    /// CONFIRMED → DELIVERED
    pub fn deliver(&self, id: i64) -> AppResult<Order> {
        let updated = self.storage.update_order(id, |order| -> AppResult<()> {
            if order.status != OrderStatus::Confirmed {
                return Err(AppError::with_message(
                    ErrorCode::OrderNotConfirmed,
                    format!("Order is {}, only CONFIRMED orders can be delivered", order.status),
                )
                .with_detail("order", id)
                .with_detail("operation", "deliver"));
            }
            let now = now_millis();
            order.status = OrderStatus::Delivered;
            order.delivered_at = Some(now);
            order.updated_at = now;
            Ok(())
        })?;

        let order = updated.ok_or_else(|| not_found(id, "deliver"))?;
        tracing::info!(
            order_id = order.id,
            order_number = order.order_number,
            "Order delivered"
        );
        Ok(order)
    }

    /// Purge every order; refunds are kept
    pub fn delete_all(&self) -> AppResult<u64> {
        let count = self.storage.delete_all_orders()?;
        tracing::warn!(deleted = count, "All orders deleted");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerJob;
    use tokio::sync::mpsc;

    fn service() -> OrderService {
        OrderService::new(Storage::open_in_memory().unwrap(), LedgerHandle::disabled())
    }

    fn tea(qty: i64) -> OrderItem {
        OrderItem {
            name: "Tea".into(),
            category: "Hot Beverages".into(),
            qty,
            unit_price: 30.0,
            add_ons: vec![],
        }
    }

    fn request(items: Vec<OrderItem>, employee: bool) -> CreateOrderRequest {
        CreateOrderRequest {
            categories: None,
            items,
            total_amount: Some(999.0),
            is_employee_order: employee,
        }
    }

    #[test]
    fn create_recomputes_total_and_categories() {
        let svc = service();
        let order = svc.create(request(vec![tea(2)], false)).unwrap();
        assert_eq!(order.order_number, 1);
        assert_eq!(order.total_amount, 60.0);
        assert_eq!(order.categories, vec!["Hot Beverages"]);
        assert_eq!(order.status, OrderStatus::Pending);

        let employee = svc.create(request(vec![tea(2)], true)).unwrap();
        assert_eq!(employee.order_number, 2);
        assert_eq!(employee.total_amount, 0.0);
        assert_eq!(employee.items[0].unit_price, 30.0);
    }

    #[test]
    fn create_rejects_bad_input() {
        let svc = service();
        assert_eq!(
            svc.create(request(vec![], false)).unwrap_err().code,
            ErrorCode::OrderEmpty
        );
        let mut req = request(vec![tea(1)], false);
        req.total_amount = Some(-5.0);
        assert_eq!(svc.create(req).unwrap_err().code, ErrorCode::InvalidTotal);
        assert!(svc.list().unwrap().is_empty());
    }

    #[test]
    fn update_then_get_round_trips() {
        let svc = service();
        let order = svc.create(request(vec![tea(1)], false)).unwrap();
        let updated = svc
            .update(
                order.id,
                UpdateOrderRequest {
                    items: Some(vec![tea(3)]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.total_amount, 90.0);
        assert_eq!(svc.get(order.id).unwrap(), updated);
    }

    #[test]
    fn status_rules() {
        let svc = service();
        let order = svc.create(request(vec![tea(1)], false)).unwrap();

        let bad = UpdateOrderRequest {
            status: Some("CANCELLED".into()),
            ..Default::default()
        };
        assert_eq!(svc.update(order.id, bad).unwrap_err().code, ErrorCode::InvalidStatus);

        let skip = UpdateOrderRequest {
            status: Some("delivered".into()),
            ..Default::default()
        };
        assert_eq!(
            svc.update(order.id, skip).unwrap_err().code,
            ErrorCode::InvalidStatusTransition
        );

        let same = UpdateOrderRequest {
            status: Some("pending".into()),
            ..Default::default()
        };
        assert_eq!(svc.update(order.id, same).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn deliver_requires_confirmed() {
        let svc = service();
        let order = svc.create(request(vec![tea(1)], false)).unwrap();

        assert_eq!(svc.deliver(order.id).unwrap_err().code, ErrorCode::OrderNotConfirmed);
        svc.confirm(order.id).unwrap();
        let delivered = svc.deliver(order.id).unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(delivered.delivered_at.is_some());
        assert_eq!(svc.deliver(order.id).unwrap_err().code, ErrorCode::OrderNotConfirmed);
        assert_eq!(
            svc.confirm(order.id).unwrap_err().code,
            ErrorCode::InvalidStatusTransition
        );
    }

    #[test]
    fn delivered_items_are_frozen() {
        let svc = service();
        let order = svc.create(request(vec![tea(1)], false)).unwrap();
        svc.confirm(order.id).unwrap();
        let delivered = svc.deliver(order.id).unwrap();

        let err = svc
            .update(
                order.id,
                UpdateOrderRequest {
                    items: Some(vec![tea(5)]),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderAlreadyDelivered);
        assert_eq!(svc.get(order.id).unwrap(), delivered);
    }

    #[test]
    fn missing_order_is_not_found() {
        let svc = service();
        assert_eq!(svc.get(1).unwrap_err().code, ErrorCode::OrderNotFound);
        assert_eq!(svc.confirm(1).unwrap_err().code, ErrorCode::OrderNotFound);
        assert_eq!(svc.deliver(1).unwrap_err().code, ErrorCode::OrderNotFound);
    }

    #[test]
    fn confirm_queues_export_after_commit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let svc = OrderService::new(Storage::open_in_memory().unwrap(), LedgerHandle::new(tx));
        let order = svc.create(request(vec![tea(1)], false)).unwrap();
        svc.confirm(order.id).unwrap();

        match rx.try_recv().unwrap() {
            LedgerJob::OrderConfirmed(exported) => {
                assert_eq!(exported.order_number, order.order_number);
                assert_eq!(exported.status, OrderStatus::Confirmed);
            }
            other => panic!("unexpected job: {other:?}"),
        }
    }

    #[test]
    fn list_is_newest_first_and_delete_all_resets() {
        let svc = service();
        for _ in 0..3 {
            svc.create(request(vec![tea(1)], false)).unwrap();
        }
        let numbers: Vec<u64> = svc.list().unwrap().iter().map(|o| o.order_number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);

        assert_eq!(svc.delete_all().unwrap(), 3);
        assert!(svc.list().unwrap().is_empty());
        assert_eq!(svc.create(request(vec![tea(1)], false)).unwrap().order_number, 1);
    }
}
