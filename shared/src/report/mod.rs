//! Reporting / aggregation
//!
//! Pure functions over already-fetched orders and refunds. Nothing here
//! touches storage; the caller passes the data and the business timezone.

pub mod aggregate;
pub mod export;
pub mod range;


pub use aggregate::{
    CategoryPerformance, CategoryReport, CategorySection, ItemRow, OTHERS, ReportSummary,
    TimelinePoint, aggregate_orders, aggregate_refunds, category_performance, resolve_category,
    revenue_timeline, summary,
};
pub use export::{ExportError, ReportKind, export_csv, export_filename};
pub use range::{DateRange, RangePreset, Timestamped, local_date, local_midnight};
