//! Category / item rollups
//!
//! | Function | Input | Output |
//! |----------|-------|--------|
//! | [`aggregate_orders`] | orders | per-category item table |
//! | [`aggregate_refunds`] | refunds | per-category item table |
//! | [`category_performance`] | orders + refunds | per-category KPIs |
//! | [`summary`] | orders + refunds | headline KPIs |

use super::range::local_date;
use crate::models::{Category, Menu, Order, OrderItem, Refund};
use crate::money::{line_total, refunds_total, to_decimal, to_f64};
use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Bucket for lines whose category cannot be resolved
pub const OTHERS: &str = "Others";

/// Category of a stored line: explicit field, else catalog lookup by name,
/// else [`OTHERS`].
pub fn resolve_category(item: &OrderItem, menu: &Menu) -> String {
    let explicit = item.category.trim();
    if !explicit.is_empty() {
        return Category::parse(explicit)
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| explicit.to_string());
    }
    menu.category_of_name(&item.name)
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|| OTHERS.to_string())
}

/// Stable section order: catalog categories, then unknown names
/// alphabetically, then [`OTHERS`].
fn section_order(extra: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut known: Vec<String> = Category::ALL.iter().map(|c| c.as_str().to_string()).collect();
    let mut unknown: Vec<String> = extra
        .into_iter()
        .filter(|c| c != OTHERS && Category::parse(c).is_none())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    unknown.sort();
    known.extend(unknown);
    known
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRow {
    pub name: String,
    pub total_qty: i64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySection {
    pub category: String,
    pub items: Vec<ItemRow>,
    pub total_qty: i64,
    pub total_amount: f64,
}

/// Item table grouped by category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReport {
    pub sections: Vec<CategorySection>,
}

impl CategoryReport {
    pub fn section(&self, category: &str) -> Option<&CategorySection> {
        self.sections.iter().find(|s| s.category == category)
    }

    /// Keep only items whose name contains `search` (case-insensitive);
    /// section totals follow the remaining rows.
    pub fn filter_items(&self, search: &str) -> CategoryReport {
        let needle = search.trim().to_lowercase();
        if needle.is_empty() {
            return self.clone();
        }
        let sections = self
            .sections
            .iter()
            .map(|s| {
                let items: Vec<ItemRow> = s
                    .items
                    .iter()
                    .filter(|i| i.name.to_lowercase().contains(&needle))
                    .cloned()
                    .collect();
                CategorySection {
                    category: s.category.clone(),
                    total_qty: items.iter().map(|i| i.total_qty).sum(),
                    total_amount: to_f64(items.iter().map(|i| to_decimal(i.total_amount)).sum()),
                    items,
                }
            })
            .collect();
        CategoryReport { sections }
    }
}

fn aggregate_lines<'a>(lines: impl Iterator<Item = &'a OrderItem>, menu: &Menu) -> CategoryReport {
    let mut buckets: HashMap<String, BTreeMap<String, (i64, Decimal)>> = HashMap::new();
    for line in lines {
        let entry = buckets
            .entry(resolve_category(line, menu))
            .or_default()
            .entry(line.name.clone())
            .or_insert((0, Decimal::ZERO));
        entry.0 += line.qty;
        entry.1 += line_total(line.unit_price, line.qty);
    }

    let mut order = section_order(buckets.keys().cloned());
    if buckets.contains_key(OTHERS) {
        order.push(OTHERS.to_string());
    }

    let sections = order
        .into_iter()
        .map(|category| {
            let mut items: Vec<(String, i64, Decimal)> = buckets
                .remove(&category)
                .unwrap_or_default()
                .into_iter()
                .map(|(name, (qty, amount))| (name, qty, amount))
                .collect();
            items.sort_by(|a, b| {
                a.0.to_lowercase()
                    .cmp(&b.0.to_lowercase())
                    .then_with(|| a.0.cmp(&b.0))
            });
            let total_qty = items.iter().map(|i| i.1).sum();
            let total_amount = to_f64(items.iter().map(|i| i.2).sum());
            CategorySection {
                category,
                items: items
                    .into_iter()
                    .map(|(name, total_qty, amount)| ItemRow {
                        name,
                        total_qty,
                        total_amount: to_f64(amount),
                    })
                    .collect(),
                total_qty,
                total_amount,
            }
        })
        .collect();

    CategoryReport { sections }
}

/// Per category and item: Σ qty and Σ price × qty over all order lines.
/// Every catalog category is present, even when empty.
pub fn aggregate_orders(orders: &[Order], menu: &Menu) -> CategoryReport {
    aggregate_lines(orders.iter().flat_map(|o| o.items.iter()), menu)
}

/// Same rollup over refunded lines
pub fn aggregate_refunds(refunds: &[Refund], menu: &Menu) -> CategoryReport {
    aggregate_lines(refunds.iter().flat_map(|r| r.refunded_items.iter()), menu)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPerformance {
    pub category: String,
    /// Distinct orders with at least one line in this category
    pub total_orders: u64,
    pub total_qty: i64,
    pub total_sales: f64,
    pub total_refunds: f64,
    pub net: f64,
}

#[derive(Default)]
struct PerfAcc {
    orders: u64,
    qty: i64,
    sales: Decimal,
    refunds: Decimal,
}

/// Per-category KPIs. Only categories with activity are listed.
pub fn category_performance(
    orders: &[Order],
    refunds: &[Refund],
    menu: &Menu,
) -> Vec<CategoryPerformance> {
    let mut acc: HashMap<String, PerfAcc> = HashMap::new();

    for order in orders {
        let mut seen: HashSet<String> = HashSet::new();
        for line in &order.items {
            let category = resolve_category(line, menu);
            let entry = acc.entry(category.clone()).or_default();
            entry.qty += line.qty;
            entry.sales += line_total(line.unit_price, line.qty);
            if seen.insert(category) {
                entry.orders += 1;
            }
        }
    }

    for refund in refunds {
        for line in &refund.refunded_items {
            let entry = acc.entry(resolve_category(line, menu)).or_default();
            entry.refunds += line_total(line.unit_price, line.qty);
        }
    }

    let mut order = section_order(acc.keys().cloned());
    order.push(OTHERS.to_string());

    order
        .into_iter()
        .filter_map(|category| {
            let a = acc.remove(&category)?;
            Some(CategoryPerformance {
                category,
                total_orders: a.orders,
                total_qty: a.qty,
                total_sales: to_f64(a.sales),
                total_refunds: to_f64(a.refunds),
                net: to_f64(a.sales - a.refunds),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    /// Display label, e.g. `05 Mar`
    pub date: String,
    /// ISO calendar day the bucket covers
    pub day: NaiveDate,
    pub sales: f64,
    pub refunds: f64,
}

/// Daily sales (order totals) and refunds, chronological, zero-filled on
/// whichever side has no activity that day.
pub fn revenue_timeline(orders: &[Order], refunds: &[Refund], tz: Tz) -> Vec<TimelinePoint> {
    let mut days: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    for order in orders {
        days.entry(local_date(order.created_at, tz)).or_default().0 +=
            to_decimal(order.total_amount);
    }
    for refund in refunds {
        days.entry(local_date(refund.created_at, tz)).or_default().1 +=
            to_decimal(refund.refund_amount);
    }
    days.into_iter()
        .map(|(day, (sales, refunds))| TimelinePoint {
            date: day.format("%d %b").to_string(),
            day,
            sales: to_f64(sales),
            refunds: to_f64(refunds),
        })
        .collect()
}

/// Headline KPIs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_orders: usize,
    pub total_sales: f64,
    pub total_refunds: f64,
    pub net_revenue: f64,
}

/// Sales use stored order totals, so employee orders add nothing.
pub fn summary(orders: &[Order], refunds: &[Refund]) -> ReportSummary {
    let sales: Decimal = orders.iter().map(|o| to_decimal(o.total_amount)).sum();
    let refunded = refunds_total(refunds);
    ReportSummary {
        total_orders: orders.len(),
        total_sales: to_f64(sales),
        total_refunds: to_f64(refunded),
        net_revenue: to_f64(sales - refunded),
    }
}
