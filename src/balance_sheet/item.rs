//! Balance sheet item (one logical row)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One instrument row of the balance sheet
///
/// The string keys are resolved through the registries at the start of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetItem {
    pub id: String,

    // Classification keys
    pub redemption: String,
    pub valuation: String,
    pub accounting_method: String,
    pub metric_group: String,
    pub frequency: String,
    #[serde(default = "default_coupon_type")]
    pub coupon_type: String,
    /// Market curve looked up in each scenario for valuation and floating
    /// coupons; empty when the item needs none
    #[serde(default)]
    pub curve: String,

    // Quantities
    pub nominal: f64,
    pub book_value: f64,
    pub interest_rate: f64,
    /// Margin over the reference rate of a floating coupon
    #[serde(default)]
    pub spread: f64,
    /// Coupon interest earned since the last coupon date and not yet paid
    #[serde(default)]
    pub accrued_interest: f64,
    /// Annual prepayment rate in `[0, 1]`, overridable per scenario
    #[serde(default)]
    pub prepayment_rate: f64,

    // Dates
    pub origination_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub next_coupon_date: Option<NaiveDate>,
}

impl BalanceSheetItem {
    /// Fixed rate item with book value at par
    pub fn new(
        id: &str,
        redemption: &str,
        frequency: &str,
        nominal: f64,
        interest_rate: f64,
        origination_date: NaiveDate,
        maturity_date: NaiveDate,
        next_coupon_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: id.to_string(),
            redemption: redemption.to_string(),
            valuation: "par".to_string(),
            accounting_method: "amortizedcost".to_string(),
            metric_group: "loans".to_string(),
            frequency: frequency.to_string(),
            coupon_type: default_coupon_type(),
            curve: String::new(),
            nominal,
            book_value: nominal,
            interest_rate,
            spread: 0.0,
            accrued_interest: 0.0,
            prepayment_rate: 0.0,
            origination_date,
            maturity_date,
            next_coupon_date,
        }
    }

    pub fn with_accounting(mut self, accounting_method: &str, valuation: &str, curve: &str) -> Self {
        self.accounting_method = accounting_method.to_string();
        self.valuation = valuation.to_string();
        self.curve = curve.to_string();
        self
    }

    pub fn with_metric_group(mut self, metric_group: &str) -> Self {
        self.metric_group = metric_group.to_string();
        self
    }

    pub fn with_book_value(mut self, book_value: f64) -> Self {
        self.book_value = book_value;
        self
    }

    /// Coupon reset every period to the `curve` rate plus `spread`
    pub fn with_floating_coupon(mut self, curve: &str, spread: f64) -> Self {
        self.coupon_type = "floating".to_string();
        self.curve = curve.to_string();
        self.spread = spread;
        self
    }

    pub fn with_coupon_type(mut self, coupon_type: &str) -> Self {
        self.coupon_type = coupon_type.to_string();
        self
    }

    pub fn with_accrued_interest(mut self, accrued_interest: f64) -> Self {
        self.accrued_interest = accrued_interest;
        self
    }

    pub fn with_prepayment_rate(mut self, prepayment_rate: f64) -> Self {
        self.prepayment_rate = prepayment_rate;
        self
    }

    /// Matured or fully extinguished as of `date`
    pub fn is_matured(&self, date: NaiveDate) -> bool {
        self.nominal == 0.0 || date >= self.maturity_date
    }
}

fn default_coupon_type() -> String {
    "fixed".to_string()
}
