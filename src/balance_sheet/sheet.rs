//! Column-oriented balance sheet snapshot

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use super::item::BalanceSheetItem;
use crate::error::{ProjectionError, Result};
use crate::registry::clean_identifier;
use crate::rules::redemption::check_prepayment_rate;

/// Classification columns that rows are grouped by for handler dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyColumn {
    Redemption,
    Valuation,
    AccountingMethod,
    MetricGroup,
    Frequency,
    CouponType,
}

impl KeyColumn {
    pub const ALL: [KeyColumn; 6] = [
        KeyColumn::Redemption,
        KeyColumn::Valuation,
        KeyColumn::AccountingMethod,
        KeyColumn::MetricGroup,
        KeyColumn::Frequency,
        KeyColumn::CouponType,
    ];
}

/// Rows sharing one (normalised) classification key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGroup {
    /// Key as written on the first row of the group
    pub key: String,
    pub rows: Vec<usize>,
}

/// Columns that never change over a projection, shared between snapshots
#[derive(Debug)]
struct FixedColumns {
    ids: Vec<String>,
    id_index: HashMap<String, usize>,
    redemption: Vec<String>,
    valuation: Vec<String>,
    accounting_method: Vec<String>,
    metric_group: Vec<String>,
    frequency: Vec<String>,
    coupon_type: Vec<String>,
    curve: Vec<String>,
    spread: Vec<f64>,
    prepayment_rate: Vec<f64>,
    origination_date: Vec<NaiveDate>,
    maturity_date: Vec<NaiveDate>,
    /// First coupon date the schedule of each row is counted from
    coupon_anchor: Vec<Option<NaiveDate>>,
    groups: HashMap<KeyColumn, Vec<KeyGroup>>,
}

impl FixedColumns {
    fn keys(&self, column: KeyColumn) -> &[String] {
        match column {
            KeyColumn::Redemption => &self.redemption,
            KeyColumn::Valuation => &self.valuation,
            KeyColumn::AccountingMethod => &self.accounting_method,
            KeyColumn::MetricGroup => &self.metric_group,
            KeyColumn::Frequency => &self.frequency,
            KeyColumn::CouponType => &self.coupon_type,
        }
    }

    fn build_groups(&mut self) {
        for column in KeyColumn::ALL {
            let mut groups: Vec<KeyGroup> = Vec::new();
            let mut position: HashMap<String, usize> = HashMap::new();
            for (row, key) in self.keys(column).iter().enumerate() {
                let cleaned = clean_identifier(key);
                match position.get(&cleaned) {
                    Some(&at) => groups[at].rows.push(row),
                    None => {
                        position.insert(cleaned, groups.len());
                        groups.push(KeyGroup {
                            key: key.clone(),
                            rows: vec![row],
                        });
                    }
                }
            }
            self.groups.insert(column, groups);
        }
    }
}

/// Columns the redemption step rewrites every period
#[derive(Debug, Clone, Default)]
pub(crate) struct RunoffColumns {
    pub nominal: Vec<f64>,
    pub interest_rate: Vec<f64>,
    pub accrued_interest: Vec<f64>,
    pub next_coupon_date: Vec<Option<NaiveDate>>,
    pub coupon_index: Vec<u32>,
}

impl RunoffColumns {
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            nominal: Vec::with_capacity(rows),
            interest_rate: Vec::with_capacity(rows),
            accrued_interest: Vec::with_capacity(rows),
            next_coupon_date: Vec::with_capacity(rows),
            coupon_index: Vec::with_capacity(rows),
        }
    }
}

/// Immutable snapshot of every instrument row at one as-of date for one scenario
///
/// Each period transition produces a new snapshot; the classification and
/// contractual columns are shared with the previous snapshot, the balances
/// and the coupon rate in force are copied.
#[derive(Debug, Clone)]
pub struct BalanceSheet {
    as_of: NaiveDate,
    scenario: Option<String>,
    fixed: Arc<FixedColumns>,
    nominal: Vec<f64>,
    book_value: Vec<f64>,
    market_value: Vec<Option<f64>>,
    interest_rate: Vec<f64>,
    accrued_interest: Vec<f64>,
    next_coupon_date: Vec<Option<NaiveDate>>,
    coupon_index: Vec<u32>,
}

impl BalanceSheet {
    /// Build a snapshot from rows; identifiers must be unique and amounts finite
    pub fn from_items(as_of: NaiveDate, items: Vec<BalanceSheetItem>) -> Result<Self> {
        let n = items.len();
        let mut fixed = FixedColumns {
            ids: Vec::with_capacity(n),
            id_index: HashMap::with_capacity(n),
            redemption: Vec::with_capacity(n),
            valuation: Vec::with_capacity(n),
            accounting_method: Vec::with_capacity(n),
            metric_group: Vec::with_capacity(n),
            frequency: Vec::with_capacity(n),
            coupon_type: Vec::with_capacity(n),
            curve: Vec::with_capacity(n),
            spread: Vec::with_capacity(n),
            prepayment_rate: Vec::with_capacity(n),
            origination_date: Vec::with_capacity(n),
            maturity_date: Vec::with_capacity(n),
            coupon_anchor: Vec::with_capacity(n),
            groups: HashMap::new(),
        };
        let mut nominal = Vec::with_capacity(n);
        let mut book_value = Vec::with_capacity(n);
        let mut interest_rate = Vec::with_capacity(n);
        let mut accrued_interest = Vec::with_capacity(n);
        let mut next_coupon_date = Vec::with_capacity(n);

        for (row, item) in items.into_iter().enumerate() {
            if fixed.id_index.insert(item.id.clone(), row).is_some() {
                return Err(ProjectionError::InvalidInput(format!(
                    "duplicate balance sheet item id '{}'",
                    item.id
                )));
            }
            let quantities = [
                ("nominal", item.nominal),
                ("book_value", item.book_value),
                ("interest_rate", item.interest_rate),
                ("spread", item.spread),
                ("accrued_interest", item.accrued_interest),
                ("prepayment_rate", item.prepayment_rate),
            ];
            for (field, value) in quantities {
                check_finite(&item.id, field, value)?;
            }
            check_prepayment_rate(&item.id, "prepayment_rate", item.prepayment_rate)?;

            fixed.ids.push(item.id);
            fixed.redemption.push(item.redemption);
            fixed.valuation.push(item.valuation);
            fixed.accounting_method.push(item.accounting_method);
            fixed.metric_group.push(item.metric_group);
            fixed.frequency.push(item.frequency);
            fixed.coupon_type.push(item.coupon_type);
            fixed.curve.push(item.curve);
            fixed.spread.push(item.spread);
            fixed.prepayment_rate.push(item.prepayment_rate);
            fixed.origination_date.push(item.origination_date);
            fixed.maturity_date.push(item.maturity_date);
            fixed.coupon_anchor.push(item.next_coupon_date);
            nominal.push(item.nominal);
            book_value.push(item.book_value);
            interest_rate.push(item.interest_rate);
            accrued_interest.push(item.accrued_interest);
            next_coupon_date.push(item.next_coupon_date);
        }
        fixed.build_groups();

        Ok(Self {
            as_of,
            scenario: None,
            fixed: Arc::new(fixed),
            market_value: vec![None; n],
            coupon_index: vec![0; n],
            nominal,
            book_value,
            interest_rate,
            accrued_interest,
            next_coupon_date,
        })
    }

    /// Copy of this snapshot tagged with a scenario name
    pub fn for_scenario(&self, scenario: &str) -> Self {
        let mut tagged = self.clone();
        tagged.scenario = Some(scenario.to_string());
        tagged
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    pub fn len(&self) -> usize {
        self.nominal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nominal.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.fixed.ids
    }

    pub fn id(&self, row: usize) -> &str {
        &self.fixed.ids[row]
    }

    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.fixed.id_index.get(id).copied()
    }

    pub fn key(&self, column: KeyColumn, row: usize) -> &str {
        &self.fixed.keys(column)[row]
    }

    /// Rows grouped by a classification column, in first-seen key order
    pub fn groups(&self, column: KeyColumn) -> &[KeyGroup] {
        self.fixed.groups.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn curve(&self, row: usize) -> &str {
        &self.fixed.curve[row]
    }

    pub fn nominal(&self) -> &[f64] {
        &self.nominal
    }

    pub fn book_value(&self) -> &[f64] {
        &self.book_value
    }

    pub fn market_value(&self) -> &[Option<f64>] {
        &self.market_value
    }

    /// Coupon rate in force; for floating rows the fixing of the last period
    pub fn interest_rate(&self) -> &[f64] {
        &self.interest_rate
    }

    pub fn accrued_interest(&self) -> &[f64] {
        &self.accrued_interest
    }

    pub fn next_coupon_date(&self) -> &[Option<NaiveDate>] {
        &self.next_coupon_date
    }

    pub fn spread(&self) -> &[f64] {
        &self.fixed.spread
    }

    pub fn prepayment_rate(&self) -> &[f64] {
        &self.fixed.prepayment_rate
    }

    pub fn origination_date(&self) -> &[NaiveDate] {
        &self.fixed.origination_date
    }

    pub fn maturity_date(&self) -> &[NaiveDate] {
        &self.fixed.maturity_date
    }

    pub(crate) fn coupon_anchor(&self, row: usize) -> Option<NaiveDate> {
        self.fixed.coupon_anchor[row]
    }

    pub(crate) fn coupon_index(&self) -> &[u32] {
        &self.coupon_index
    }

    /// Matured or fully extinguished as of this snapshot's date
    pub fn is_matured(&self, row: usize) -> bool {
        self.nominal[row] == 0.0 || self.as_of >= self.fixed.maturity_date[row]
    }

    /// Row view
    pub fn item(&self, row: usize) -> BalanceSheetItem {
        let fixed = &self.fixed;
        BalanceSheetItem {
            id: fixed.ids[row].clone(),
            redemption: fixed.redemption[row].clone(),
            valuation: fixed.valuation[row].clone(),
            accounting_method: fixed.accounting_method[row].clone(),
            metric_group: fixed.metric_group[row].clone(),
            frequency: fixed.frequency[row].clone(),
            coupon_type: fixed.coupon_type[row].clone(),
            curve: fixed.curve[row].clone(),
            nominal: self.nominal[row],
            book_value: self.book_value[row],
            interest_rate: self.interest_rate[row],
            spread: fixed.spread[row],
            accrued_interest: self.accrued_interest[row],
            prepayment_rate: fixed.prepayment_rate[row],
            origination_date: fixed.origination_date[row],
            maturity_date: fixed.maturity_date[row],
            next_coupon_date: self.next_coupon_date[row],
        }
    }

    pub fn items(&self) -> Vec<BalanceSheetItem> {
        (0..self.len()).map(|row| self.item(row)).collect()
    }

    /// Same balances re-dated to `as_of`
    pub(crate) fn at(&self, as_of: NaiveDate) -> Self {
        let mut moved = self.clone();
        moved.as_of = as_of;
        moved
    }

    /// Successor snapshot after the redemption step
    pub(crate) fn with_runoff(&self, as_of: NaiveDate, columns: RunoffColumns) -> Self {
        debug_assert_eq!(columns.nominal.len(), self.len());
        debug_assert_eq!(columns.interest_rate.len(), self.len());
        debug_assert_eq!(columns.accrued_interest.len(), self.len());
        debug_assert_eq!(columns.next_coupon_date.len(), self.len());
        debug_assert_eq!(columns.coupon_index.len(), self.len());
        Self {
            as_of,
            scenario: self.scenario.clone(),
            fixed: Arc::clone(&self.fixed),
            nominal: columns.nominal,
            book_value: self.book_value.clone(),
            market_value: self.market_value.clone(),
            interest_rate: columns.interest_rate,
            accrued_interest: columns.accrued_interest,
            next_coupon_date: columns.next_coupon_date,
            coupon_index: columns.coupon_index,
        }
    }

    /// Successor snapshot after revaluation
    pub(crate) fn with_values(&self, book_value: Vec<f64>, market_value: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(book_value.len(), self.len());
        debug_assert_eq!(market_value.len(), self.len());
        Self {
            book_value,
            market_value,
            ..self.clone()
        }
    }

    /// Check the input invariants before a projection starts
    ///
    /// Rows must exist by `as_of`, live rows need a coupon date within
    /// `[as_of, maturity]`; balances must not be negative.
    pub fn validate_input(&self) -> Result<()> {
        for row in 0..self.len() {
            self.check_amounts(row)?;
            self.check_origination(row)?;
            if self.is_matured(row) {
                continue;
            }
            self.check_coupon_date(row)?;
        }
        Ok(())
    }

    /// Check the snapshot invariants that hold after every period
    pub fn validate(&self) -> Result<()> {
        for row in 0..self.len() {
            self.check_amounts(row)?;
            self.check_origination(row)?;
            if self.is_matured(row) {
                if self.next_coupon_date[row].is_some() {
                    return Err(ProjectionError::InconsistentSchedule {
                        item: self.id(row).to_string(),
                        reason: format!("matured at {} but still has a next coupon date", self.as_of),
                    });
                }
            } else {
                self.check_coupon_date(row)?;
            }
        }
        Ok(())
    }

    fn check_amounts(&self, row: usize) -> Result<()> {
        let id = self.id(row);
        check_finite(id, "nominal", self.nominal[row])?;
        check_finite(id, "book_value", self.book_value[row])?;
        check_finite(id, "interest_rate", self.interest_rate[row])?;
        check_finite(id, "accrued_interest", self.accrued_interest[row])?;
        if let Some(value) = self.market_value[row] {
            check_finite(id, "market_value", value)?;
        }
        if self.nominal[row] < 0.0 {
            return Err(ProjectionError::NegativeBalanceViolation {
                item: id.to_string(),
                period_end: self.as_of,
                nominal: self.nominal[row],
            });
        }
        Ok(())
    }

    fn check_origination(&self, row: usize) -> Result<()> {
        let origination = self.fixed.origination_date[row];
        if origination > self.as_of {
            return Err(ProjectionError::InconsistentSchedule {
                item: self.id(row).to_string(),
                reason: format!("originated {} after the balance sheet date {}", origination, self.as_of),
            });
        }
        Ok(())
    }

    fn check_coupon_date(&self, row: usize) -> Result<()> {
        let maturity = self.fixed.maturity_date[row];
        let reason = match self.next_coupon_date[row] {
            None => Some("live item without a next coupon date".to_string()),
            Some(date) if date < self.as_of => Some(format!("next coupon date {} before {}", date, self.as_of)),
            Some(date) if date > maturity => Some(format!("next coupon date {} after maturity {}", date, maturity)),
            Some(_) => None,
        };
        match reason {
            Some(reason) => Err(ProjectionError::InconsistentSchedule {
                item: self.id(row).to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

fn check_finite(item: &str, field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProjectionError::NonFiniteValue {
            item: item.to_string(),
            field,
            value,
        })
    }
}
