//! Market value and book value at the period end

use rayon::prelude::*;

use super::accounting::{AccountingInput, AccountingMethod};
use super::redemption::RedemptionMethod;
use super::valuation::{ValuationInput, ValuationMethod};
use super::{Dispatch, PeriodState, Rule, RuleContext};
use crate::balance_sheet::{BalanceSheet, KeyColumn};
use crate::calendar::Frequency;
use crate::error::Result;

/// Valuation-dependent rule, applied after runoff
#[derive(Debug, Clone, Copy, Default)]
pub struct Revaluation;

struct Handlers {
    valuation: Dispatch<dyn ValuationMethod>,
    accounting: Dispatch<dyn AccountingMethod>,
    redemption: Dispatch<dyn RedemptionMethod>,
    frequency: Dispatch<Frequency>,
}

#[derive(Debug, Clone, Copy)]
struct RowValue {
    market_value: Option<f64>,
    book_value: f64,
    premium_amortization: f64,
    valuation_income: f64,
    oci: f64,
}

impl Rule for Revaluation {
    fn name(&self) -> &str {
        "revaluation"
    }

    fn apply(&self, opening: &BalanceSheet, state: PeriodState, context: &RuleContext<'_>) -> Result<PeriodState> {
        let registries = context.registries;
        let handlers = Handlers {
            valuation: Dispatch::resolve(opening, KeyColumn::Valuation, &registries.valuation)?,
            accounting: Dispatch::resolve(opening, KeyColumn::AccountingMethod, &registries.accounting)?,
            redemption: Dispatch::resolve(opening, KeyColumn::Redemption, &registries.redemption)?,
            frequency: Dispatch::resolve(opening, KeyColumn::Frequency, &registries.frequency)?,
        };

        let current = &state.balance_sheet;
        let flows = &state.flows;
        let rows: Vec<RowValue> = (0..current.len())
            .into_par_iter()
            .map(|row| revalue_row(row, opening, current, flows.principal_repaid(row), &handlers, context))
            .collect::<Result<Vec<_>>>()?;

        let mut flows = state.flows;
        let mut book_value = Vec::with_capacity(rows.len());
        let mut market_value = Vec::with_capacity(rows.len());
        for (row, value) in rows.into_iter().enumerate() {
            flows.premium_amortization[row] += value.premium_amortization;
            flows.valuation_income[row] += value.valuation_income;
            flows.oci[row] += value.oci;
            book_value.push(value.book_value);
            market_value.push(value.market_value);
        }

        let balance_sheet = state.balance_sheet.with_values(book_value, market_value);
        Ok(PeriodState { balance_sheet, flows })
    }
}

fn revalue_row(
    row: usize,
    opening: &BalanceSheet,
    current: &BalanceSheet,
    principal_repaid: f64,
    handlers: &Handlers,
    context: &RuleContext<'_>,
) -> Result<RowValue> {
    let as_of = current.as_of();
    let nominal = current.nominal()[row];
    let maturity = current.maturity_date()[row];
    let valuation = handlers.valuation.get(row);

    let curve = if valuation.needs_curve() && nominal > 0.0 && as_of < maturity {
        Some(context.scenario.curve(current.curve(row), as_of)?)
    } else {
        None
    };
    let frequency = handlers.frequency.get(row);
    let schedule = match (current.next_coupon_date()[row], current.coupon_anchor(row)) {
        (Some(_), Some(anchor)) => Some(frequency.schedule(anchor, maturity)),
        _ => None,
    };
    let market_value = valuation.market_value(
        &ValuationInput {
            id: current.id(row),
            as_of,
            nominal,
            rate: current.interest_rate()[row],
            origination: current.origination_date()[row],
            maturity,
            schedule,
            coupon_index: current.coupon_index()[row],
            redemption: handlers.redemption.get(row),
        },
        curve,
    )?;

    let outcome = handlers.accounting.get(row).revalue(&AccountingInput {
        id: current.id(row),
        period_start: context.period.start,
        period_end: context.period.end,
        maturity,
        opening_nominal: opening.nominal()[row],
        opening_book_value: opening.book_value()[row],
        ending_nominal: nominal,
        principal_repaid,
        market_value,
    })?;

    Ok(RowValue {
        market_value,
        book_value: outcome.book_value,
        premium_amortization: outcome.premium_amortization,
        valuation_income: outcome.valuation_income,
        oci: outcome.oci,
    })
}
