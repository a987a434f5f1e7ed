//! Report API Handlers
//!
//! 报表全部在内存中由已取出的订单 / 退款计算，存储只负责读取。

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderName, header},
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::blocking;
use crate::core::ServerState;
use crate::utils::time::{parse_date, today};
use shared::models::{MENU, Order, Refund};
use shared::report::{
    self, CategoryPerformance, CategoryReport, DateRange, RangePreset, ReportKind, ReportSummary,
    TimelinePoint,
};
use shared::util::now_millis;
use shared::{ApiResponse, AppError, AppResult};

/// 报表查询参数
///
/// `date` 优先于 `range`。
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub range: Option<String>,
    /// YYYY-MM-DD
    pub date: Option<String>,
    pub search: Option<String>,
}

impl ReportQuery {
    fn day(&self) -> AppResult<Option<NaiveDate>> {
        self.date.as_deref().map(parse_date).transpose()
    }

    fn date_range(&self, state: &ServerState) -> AppResult<DateRange> {
        let tz = state.config.timezone;
        if let Some(day) = self.day()? {
            return Ok(DateRange::day(day, tz));
        }
        let preset = match self.range.as_deref() {
            Some(value) => RangePreset::parse(value)
                .ok_or_else(|| AppError::validation(format!("Unknown range: {value}")))?,
            None => RangePreset::All,
        };
        Ok(DateRange::preset(preset, now_millis(), tz))
    }

    fn search(&self) -> &str {
        self.search.as_deref().unwrap_or_default()
    }
}

/// 读取范围内的订单和退款
async fn load(state: &ServerState, range: DateRange) -> AppResult<(Vec<Order>, Vec<Refund>)> {
    let orders = state.orders.clone();
    let refunds = state.refunds.clone();
    blocking(move || {
        let all_orders = orders.list()?;
        let all_refunds = refunds.list_all()?;
        Ok((range.filter(&all_orders), range.filter(&all_refunds)))
    })
    .await
}

/// GET /api/reports/orders
pub async fn orders(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<CategoryReport>>> {
    let (orders, _) = load(&state, query.date_range(&state)?).await?;
    let report = report::aggregate_orders(&orders, &MENU).filter_items(query.search());
    Ok(Json(ApiResponse::success(report)))
}

/// GET /api/reports/refunds
pub async fn refunds(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<CategoryReport>>> {
    let (_, refunds) = load(&state, query.date_range(&state)?).await?;
    let report = report::aggregate_refunds(&refunds, &MENU).filter_items(query.search());
    Ok(Json(ApiResponse::success(report)))
}

/// GET /api/reports/performance
pub async fn performance(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<Vec<CategoryPerformance>>>> {
    let (orders, refunds) = load(&state, query.date_range(&state)?).await?;
    let rows = report::category_performance(&orders, &refunds, &MENU);
    Ok(Json(ApiResponse::success(rows)))
}

/// GET /api/reports/timeline
pub async fn timeline(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<Vec<TimelinePoint>>>> {
    let (orders, refunds) = load(&state, query.date_range(&state)?).await?;
    let points = report::revenue_timeline(&orders, &refunds, state.config.timezone);
    Ok(Json(ApiResponse::success(points)))
}

/// GET /api/reports/summary
pub async fn summary(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<ReportSummary>>> {
    let (orders, refunds) = load(&state, query.date_range(&state)?).await?;
    Ok(Json(ApiResponse::success(report::summary(&orders, &refunds))))
}

/// GET /api/reports/orders.csv
pub async fn orders_csv(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<impl IntoResponse> {
    let (orders, _) = load(&state, query.date_range(&state)?).await?;
    let report = report::aggregate_orders(&orders, &MENU).filter_items(query.search());
    csv_download(&state, &query, &report, ReportKind::Orders)
}

/// GET /api/reports/refunds.csv
pub async fn refunds_csv(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<impl IntoResponse> {
    let (_, refunds) = load(&state, query.date_range(&state)?).await?;
    let report = report::aggregate_refunds(&refunds, &MENU).filter_items(query.search());
    csv_download(&state, &query, &report, ReportKind::Refunds)
}

/// CSV 响应：Content-Type + Content-Disposition
type CsvDownload = ([(HeaderName, String); 2], String);

fn csv_download(
    state: &ServerState,
    query: &ReportQuery,
    report: &CategoryReport,
    kind: ReportKind,
) -> AppResult<CsvDownload> {
    let body = report::export_csv(report, kind)
        .map_err(|e| AppError::internal(format!("CSV export failed: {e}")))?;

    let date = query.day()?.unwrap_or_else(|| today(state.config.timezone));
    let filename = report::export_filename(&state.config.brand_name, kind, date);
    let disposition = format!("attachment; filename=\"{filename}\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
