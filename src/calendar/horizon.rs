//! Projection time horizon

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::date::{add_days, add_months, days_between, is_end_of_month};
use super::daycount::DayCount;
use crate::error::{ProjectionError, Result};

/// One period transition `(start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end <= start {
            return Err(ProjectionError::InvalidPeriodBounds {
                start,
                end,
                reason: "period end must be after its start".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn days(&self) -> i64 {
        days_between(self.start, self.end)
    }

    /// Actual/365.25 year fraction covered by the period
    pub fn portion_year(&self) -> f64 {
        DayCount::Actual36525.year_fraction(self.start, self.end)
    }
}

/// Stepping configuration for building a horizon
///
/// Steps are laid out in order: days, then weeks, then months, then years,
/// each continuing from the last date of the previous block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonConfig {
    pub start_date: NaiveDate,
    pub number_of_days: u32,
    pub number_of_weeks: u32,
    pub number_of_months: u32,
    pub number_of_years: u32,
    /// Align month and year steps to month ends; detected from the start date when unset
    pub end_of_month: Option<bool>,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            number_of_days: 0,
            number_of_weeks: 0,
            number_of_months: 12,
            number_of_years: 0,
            end_of_month: None,
        }
    }
}

/// Ordered, contiguous period boundaries starting at the projection date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeHorizon {
    dates: Vec<NaiveDate>,
}

impl TimeHorizon {
    /// Build from explicit boundaries; they must be strictly increasing
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.is_empty() {
            return Err(ProjectionError::InvalidInput(
                "time horizon needs at least a start date".to_string(),
            ));
        }
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ProjectionError::InvalidPeriodBounds {
                    start: pair[0],
                    end: pair[1],
                    reason: if pair[1] == pair[0] {
                        "zero-length period".to_string()
                    } else {
                        "boundaries are not increasing".to_string()
                    },
                });
            }
        }
        Ok(Self { dates })
    }

    /// Horizon with no periods
    pub fn single(start: NaiveDate) -> Self {
        Self { dates: vec![start] }
    }

    pub fn from_config(config: &HorizonConfig) -> Result<Self> {
        let start = config.start_date;
        let end_of_month = config.end_of_month.unwrap_or_else(|| is_end_of_month(start));
        let mut dates = vec![start];

        let base = start;
        for i in 1..=config.number_of_days as i64 {
            dates.push(add_days(base, i));
        }

        let base = *dates.last().unwrap_or(&start);
        for i in 1..=config.number_of_weeks as i64 {
            dates.push(add_days(base, 7 * i));
        }

        let base = *dates.last().unwrap_or(&start);
        for i in 1..=config.number_of_months as i32 {
            dates.push(add_months(base, i, end_of_month));
        }

        let base = *dates.last().unwrap_or(&start);
        for i in 1..=config.number_of_years as i32 {
            dates.push(add_months(base, 12 * i, end_of_month));
        }

        Self::new(dates)
    }

    /// Monthly horizon of `months` periods
    pub fn monthly(start: NaiveDate, months: u32) -> Result<Self> {
        Self::from_config(&HorizonConfig {
            start_date: start,
            number_of_months: months,
            ..HorizonConfig::default()
        })
    }

    /// Horizon stepping `months_per_period` months for `periods` periods
    pub fn every_months(start: NaiveDate, months_per_period: u32, periods: u32) -> Result<Self> {
        let end_of_month = is_end_of_month(start);
        let mut dates = vec![start];
        for i in 1..=periods as i32 {
            dates.push(add_months(start, i * months_per_period as i32, end_of_month));
        }
        Self::new(dates)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn start_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn end_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Number of periods
    pub fn len(&self) -> usize {
        self.dates.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        self.dates.windows(2).map(|pair| Period {
            start: pair[0],
            end: pair[1],
        })
    }
}
