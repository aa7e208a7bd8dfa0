//! Row shaping for the cost report.
//!
//! Athena hands back rows of optional strings with a header row first. This module turns
//! them into [`CostRecord`]s and a [`CostReport`] total, and renders the CSV export.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::query::Row;

/// Value substituted for cells that are missing or hold the literal `null`.
pub const MISSING_CELL: &str = "0";

/// Column header of the CSV export.
pub const CSV_HEADER: &str = "Date,Service,Region,Usage_Type,Operation,Usage_Qty,Unit,Cost";

/// One line item of the cost report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CostRecord {
    /// AWS product code, e.g. `AmazonEC2`
    pub service: String,
    pub region: String,
    pub operation: String,
    pub usage_type: String,
    /// Usage quantity exactly as Athena returned it
    pub amount: String,
    pub unit: String,
    /// Usage start date
    pub date: String,
    /// Unblended cost in USD
    pub cost: f64,
}

/// Response body of a successful report request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CostReport {
    /// Line items in the order Athena returned them
    pub results: Vec<CostRecord>,
    /// Sum of `cost` over `results`, rounded to cents
    pub total_monthly: f64,
}

/// Read the cell at `index`, mapping absent values and the literal `null` to [`MISSING_CELL`].
pub fn cell_value(row: &[Option<String>], index: usize) -> String {
    match row.get(index).and_then(Option::as_deref) {
        Some("null") | None => MISSING_CELL.to_string(),
        Some(value) => value.to_string(),
    }
}

/// Parse a cost cell. Only finite numbers count as costs.
pub fn parse_cost(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|cost| cost.is_finite())
}

/// Parse the leading number of a usage quantity the way the dashboard's `parseFloat` does:
/// `"12abc"` reads as 12, `"abc"` as nothing.
pub fn parse_amount(value: &str) -> Option<f64> {
    let value = value.trim_start();
    value
        .char_indices()
        .map(|(start, c)| start + c.len_utf8())
        .rev()
        .find_map(|end| value[..end].parse::<f64>().ok())
        .filter(|amount| amount.is_finite())
}

/// Round half-to-even at two decimals on the exact binary value, so `2.675` becomes `2.67`.
pub fn round_to_cents(value: f64) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(2))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

impl CostRecord {
    /// Map a positional row to a record, or `None` when its cost does not parse.
    pub fn from_row(row: &[Option<String>]) -> Option<Self> {
        let cost = parse_cost(&cell_value(row, 7))?;
        Some(Self {
            service: cell_value(row, 0),
            region: cell_value(row, 1),
            operation: cell_value(row, 2),
            usage_type: cell_value(row, 3),
            amount: cell_value(row, 4),
            unit: cell_value(row, 5),
            date: cell_value(row, 6),
            cost,
        })
    }
}

impl CostReport {
    /// Build the report from a raw result set. The first row is the header and is skipped.
    pub fn from_rows(rows: &[Row]) -> Self {
        let results: Vec<CostRecord> = rows
            .iter()
            .skip(1)
            .filter_map(|row| {
                let record = CostRecord::from_row(row);
                if record.is_none() {
                    tracing::trace!(cost = %cell_value(row, 7), "Dropping row with unparsable cost");
                }
                record
            })
            .collect();

        // Folding from +0.0 keeps an empty report's total from serializing as -0.0
        let total_monthly = round_to_cents(results.iter().fold(0.0, |total, record| total + record.cost));

        Self { results, total_monthly }
    }

    /// Render the report in the dashboard's CSV export layout.
    pub fn to_csv(&self) -> String {
        let mut out = String::from(CSV_HEADER);
        for record in &self.results {
            let amount = parse_amount(&record.amount).map_or_else(|| "0.00".to_string(), |a| format!("{a:.2}"));
            let usage_type = if record.usage_type.is_empty() { "N/A" } else { &record.usage_type };
            let fields: [&str; 8] = [
                record.date.as_str(),
                &record.service,
                &record.region,
                usage_type,
                &record.operation,
                &amount,
                &record.unit,
                &record.cost.to_string(),
            ];
            out.push('\n');
            out.push_str(&fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(","));
        }
        out
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
