//! Load balance sheet rows from CSV

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::{Reader, ReaderBuilder, Trim};

use super::{BalanceSheet, BalanceSheetItem};
use crate::error::{ProjectionError, Result};

/// Raw CSV row; optional columns fall back to the item defaults
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    id: String,
    redemption: String,
    #[serde(default)]
    valuation: Option<String>,
    #[serde(default)]
    accounting_method: Option<String>,
    #[serde(default)]
    metric_group: Option<String>,
    frequency: String,
    #[serde(default)]
    coupon_type: Option<String>,
    #[serde(default)]
    curve: Option<String>,
    nominal: f64,
    #[serde(default)]
    book_value: Option<f64>,
    interest_rate: f64,
    #[serde(default)]
    spread: Option<f64>,
    #[serde(default)]
    accrued_interest: Option<f64>,
    #[serde(default)]
    prepayment_rate: Option<f64>,
    origination_date: NaiveDate,
    maturity_date: NaiveDate,
    #[serde(default)]
    next_coupon_date: Option<NaiveDate>,
}

impl CsvRow {
    fn into_item(self) -> Result<BalanceSheetItem> {
        if self.id.is_empty() {
            return Err(ProjectionError::InvalidInput("row without an id".to_string()));
        }
        if self.maturity_date < self.origination_date {
            return Err(ProjectionError::InvalidInput(format!(
                "item '{}' matures {} before its origination {}",
                self.id, self.maturity_date, self.origination_date
            )));
        }

        let mut item = BalanceSheetItem::new(
            &self.id,
            &self.redemption,
            &self.frequency,
            self.nominal,
            self.interest_rate,
            self.origination_date,
            self.maturity_date,
            self.next_coupon_date,
        );
        if let Some(valuation) = self.valuation.filter(|v| !v.is_empty()) {
            item.valuation = valuation;
        }
        if let Some(method) = self.accounting_method.filter(|m| !m.is_empty()) {
            item.accounting_method = method;
        }
        if let Some(group) = self.metric_group.filter(|g| !g.is_empty()) {
            item.metric_group = group;
        }
        if let Some(coupon_type) = self.coupon_type.filter(|c| !c.is_empty()) {
            item.coupon_type = coupon_type;
        }
        if let Some(curve) = self.curve {
            item.curve = curve;
        }
        if let Some(spread) = self.spread {
            item.spread = spread;
        }
        if let Some(accrued_interest) = self.accrued_interest {
            item.accrued_interest = accrued_interest;
        }
        if let Some(book_value) = self.book_value {
            item.book_value = book_value;
        }
        if let Some(rate) = self.prepayment_rate {
            item.prepayment_rate = rate;
        }
        Ok(item)
    }
}

/// Fields are trimmed so padded exports parse the same from any source
fn csv_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.trim(Trim::All);
    builder
}

/// Load a balance sheet as of `as_of` from a CSV file
pub fn load_balance_sheet<P: AsRef<Path>>(path: P, as_of: NaiveDate) -> Result<BalanceSheet> {
    let reader = csv_builder().from_path(path)?;
    read_rows(reader, as_of)
}

/// Load a balance sheet from any reader (string buffer, network stream)
pub fn load_balance_sheet_from_reader<R: Read>(reader: R, as_of: NaiveDate) -> Result<BalanceSheet> {
    let reader = csv_builder().from_reader(reader);
    read_rows(reader, as_of)
}

fn read_rows<R: Read>(mut reader: Reader<R>, as_of: NaiveDate) -> Result<BalanceSheet> {
    let mut items = Vec::new();
    for result in reader.deserialize() {
        let row: CsvRow = result?;
        items.push(row.into_item()?);
    }
    log::info!("Loaded {} balance sheet rows as of {}", items.len(), as_of);
    BalanceSheet::from_items(as_of, items)
}
