//! Error types for projection runs

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while configuring or running a projection
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A classification key on an item (or a requested metric) has no bound handler
    #[error("{registry} registry has no handler for key '{key}'")]
    UnknownRegistryKey { registry: String, key: String },

    /// Time horizon contains non-monotonic or zero-length periods
    #[error("invalid period bounds {start} -> {end}: {reason}")]
    InvalidPeriodBounds {
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },

    /// Nominal is negative and cannot be floored by the redemption step
    #[error("item '{item}' has negative nominal {nominal} at {period_end}")]
    NegativeBalanceViolation {
        item: String,
        period_end: NaiveDate,
        nominal: f64,
    },

    /// Scenario has no curve for the key at or before the as-of date
    #[error("scenario '{scenario}' has no curve '{curve}' on or before {date}")]
    CurveResolutionError {
        scenario: String,
        curve: String,
        date: NaiveDate,
    },

    /// Coupon schedule of an item contradicts its maturity or the period start
    #[error("item '{item}' has an inconsistent coupon schedule: {reason}")]
    InconsistentSchedule { item: String, reason: String },

    /// Fair value accounting requested but the valuation handler yields no value
    #[error("item '{item}' uses '{method}' accounting but has no market value")]
    MissingMarketValue { item: String, method: String },

    /// A rate lies outside the range it is defined on
    #[error("item '{item}' has {parameter} {value} outside [0, 1]")]
    InvalidRate {
        item: String,
        parameter: String,
        value: f64,
    },

    /// An amount or rate is NaN or infinite
    #[error("item '{item}' has non-finite {field} {value}")]
    NonFiniteValue {
        item: String,
        field: &'static str,
        value: f64,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProjectionError {
    pub fn unknown_key(registry: &str, key: &str) -> Self {
        ProjectionError::UnknownRegistryKey {
            registry: registry.to_string(),
            key: key.to_string(),
        }
    }

    /// Identifier of the item the error refers to, when there is one
    pub fn item(&self) -> Option<&str> {
        match self {
            ProjectionError::NegativeBalanceViolation { item, .. }
            | ProjectionError::InconsistentSchedule { item, .. }
            | ProjectionError::MissingMarketValue { item, .. }
            | ProjectionError::InvalidRate { item, .. }
            | ProjectionError::NonFiniteValue { item, .. } => Some(item),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProjectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_tag() {
        let err = ProjectionError::NegativeBalanceViolation {
            item: "L1".to_string(),
            period_end: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            nominal: -5.0,
        };
        assert_eq!(err.item(), Some("L1"));
        assert_eq!(ProjectionError::unknown_key("redemption", "x").item(), None);

        let err = ProjectionError::InvalidRate {
            item: "M1".to_string(),
            parameter: "prepayment_rate.annuity".to_string(),
            value: 1.7,
        };
        assert_eq!(err.item(), Some("M1"));
        assert!(err.to_string().contains("prepayment_rate.annuity"));
    }
}
