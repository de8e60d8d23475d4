//! Per-row flows produced by one period transition

use serde::{Deserialize, Serialize};

/// Flow columns recorded for every row in every period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowColumn {
    Interest,
    /// Change in interest accrued since the last coupon date
    Accrual,
    ScheduledPrincipal,
    Prepayment,
    BeginningNominal,
    EndingNominal,
    PremiumAmortization,
    ValuationIncome,
    Oci,
}

impl FlowColumn {
    pub const ALL: [FlowColumn; 9] = [
        FlowColumn::Interest,
        FlowColumn::Accrual,
        FlowColumn::ScheduledPrincipal,
        FlowColumn::Prepayment,
        FlowColumn::BeginningNominal,
        FlowColumn::EndingNominal,
        FlowColumn::PremiumAmortization,
        FlowColumn::ValuationIncome,
        FlowColumn::Oci,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FlowColumn::Interest => "interest",
            FlowColumn::Accrual => "accrual",
            FlowColumn::ScheduledPrincipal => "scheduled_principal",
            FlowColumn::Prepayment => "prepayment",
            FlowColumn::BeginningNominal => "beginning_nominal",
            FlowColumn::EndingNominal => "ending_nominal",
            FlowColumn::PremiumAmortization => "premium_amortization",
            FlowColumn::ValuationIncome => "valuation_income",
            FlowColumn::Oci => "oci",
        }
    }
}

/// Columnar flow record, row-aligned with the balance sheet it belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodFlows {
    pub interest: Vec<f64>,
    pub accrual: Vec<f64>,
    pub scheduled_principal: Vec<f64>,
    pub prepayment: Vec<f64>,
    pub beginning_nominal: Vec<f64>,
    pub ending_nominal: Vec<f64>,
    pub premium_amortization: Vec<f64>,
    pub valuation_income: Vec<f64>,
    pub oci: Vec<f64>,
}

impl PeriodFlows {
    /// All-zero flows for `rows` rows with nominal carried through unchanged
    pub fn unchanged(nominal: &[f64]) -> Self {
        let zeros = vec![0.0; nominal.len()];
        Self {
            interest: zeros.clone(),
            accrual: zeros.clone(),
            scheduled_principal: zeros.clone(),
            prepayment: zeros.clone(),
            beginning_nominal: nominal.to_vec(),
            ending_nominal: nominal.to_vec(),
            premium_amortization: zeros.clone(),
            valuation_income: zeros.clone(),
            oci: zeros,
        }
    }

    pub fn len(&self) -> usize {
        self.beginning_nominal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beginning_nominal.is_empty()
    }

    pub fn column(&self, column: FlowColumn) -> &[f64] {
        match column {
            FlowColumn::Interest => &self.interest,
            FlowColumn::Accrual => &self.accrual,
            FlowColumn::ScheduledPrincipal => &self.scheduled_principal,
            FlowColumn::Prepayment => &self.prepayment,
            FlowColumn::BeginningNominal => &self.beginning_nominal,
            FlowColumn::EndingNominal => &self.ending_nominal,
            FlowColumn::PremiumAmortization => &self.premium_amortization,
            FlowColumn::ValuationIncome => &self.valuation_income,
            FlowColumn::Oci => &self.oci,
        }
    }

    /// Scheduled plus prepaid principal of one row
    pub fn principal_repaid(&self, row: usize) -> f64 {
        self.scheduled_principal[row] + self.prepayment[row]
    }

    pub fn total(&self, column: FlowColumn) -> f64 {
        self.column(column).iter().sum()
    }
}
