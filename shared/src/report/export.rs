//! CSV export of category reports

use super::aggregate::CategoryReport;
use crate::money::{format_amount, to_decimal};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv flush failed: {0}")]
    Flush(String),
    #[error("csv output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Which collection a report was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Orders,
    Refunds,
}

impl ReportKind {
    pub const fn label(&self) -> &'static str {
        match self {
            ReportKind::Orders => "Orders",
            ReportKind::Refunds => "Refunds",
        }
    }

    const fn amount_header(&self) -> &'static str {
        match self {
            ReportKind::Orders => "Amount",
            ReportKind::Refunds => "Refund Amount",
        }
    }
}

/// `Category,Item,Quantity,Amount` rows; each non-empty section ends with a
/// `,,Total,<sum>` row. Empty sections are skipped.
pub fn export_csv(report: &CategoryReport, kind: ReportKind) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Category", "Item", "Quantity", kind.amount_header()])?;

    for section in report.sections.iter().filter(|s| !s.items.is_empty()) {
        for item in &section.items {
            let qty = item.total_qty.to_string();
            let amount = format_amount(to_decimal(item.total_amount));
            writer.write_record([
                section.category.as_str(),
                item.name.as_str(),
                qty.as_str(),
                amount.as_str(),
            ])?;
        }
        let total = format_amount(to_decimal(section.total_amount));
        writer.write_record(["", "", "Total", total.as_str()])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// `<Brand>-<Orders|Refunds>-<DD-MM-YYYY>.csv`
pub fn export_filename(brand: &str, kind: ReportKind, date: NaiveDate) -> String {
    format!("{}-{}-{}.csv", brand, kind.label(), date.format("%d-%m-%Y"))
}
