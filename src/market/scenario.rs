//! Scenarios: named market data and parameter overrides

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::curve::ZeroCurve;
use crate::error::{ProjectionError, Result};
use crate::registry::clean_identifier;

/// A curve as published on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSnapshot {
    pub date: NaiveDate,
    pub curve: ZeroCurve,
}

/// Dated curve snapshots by curve key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(default)]
    curves: BTreeMap<String, Vec<CurveSnapshot>>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot; later dates supersede earlier ones
    pub fn insert(&mut self, key: &str, date: NaiveDate, curve: ZeroCurve) {
        let snapshots = self.curves.entry(clean_identifier(key)).or_default();
        match snapshots.binary_search_by(|s| s.date.cmp(&date)) {
            Ok(at) => snapshots[at].curve = curve,
            Err(at) => snapshots.insert(at, CurveSnapshot { date, curve }),
        }
    }

    pub fn with_curve(mut self, key: &str, date: NaiveDate, curve: ZeroCurve) -> Self {
        self.insert(key, date, curve);
        self
    }

    /// Latest snapshot of `key` published on or before `date`
    pub fn curve(&self, key: &str, date: NaiveDate) -> Option<&ZeroCurve> {
        let snapshots = self.curves.get(&clean_identifier(key))?;
        let published = snapshots.partition_point(|s| s.date <= date);
        published.checked_sub(1).map(|at| &snapshots[at].curve)
    }

    pub fn curve_keys(&self) -> impl Iterator<Item = &str> {
        self.curves.keys().map(String::as_str)
    }

    /// Re-key and sort after deserialisation
    fn normalise(self) -> Self {
        let mut normalised = MarketData::new();
        for (key, snapshots) in self.curves {
            for snapshot in snapshots {
                normalised.insert(&key, snapshot.date, snapshot.curve);
            }
        }
        normalised
    }
}

/// Independent set of market and parameter assumptions for one projection run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub market: MarketData,
    /// Free-form overrides, e.g. `prepayment_rate.linear`
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
}

impl Scenario {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_market(mut self, market: MarketData) -> Self {
        self.market = market;
        self
    }

    pub fn with_parameter(mut self, key: &str, value: f64) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    /// Curve for `key` as of `date`
    pub fn curve(&self, key: &str, date: NaiveDate) -> Result<&ZeroCurve> {
        self.market
            .curve(key, date)
            .ok_or_else(|| ProjectionError::CurveResolutionError {
                scenario: self.name.clone(),
                curve: key.to_string(),
                date,
            })
    }

    /// Parameter lookup, insensitive to case and separators
    pub fn parameter(&self, key: &str) -> Option<f64> {
        if let Some(value) = self.parameters.get(key) {
            return Some(*value);
        }
        let wanted = clean_identifier(key);
        self.parameters
            .iter()
            .find(|(name, _)| clean_identifier(name) == wanted)
            .map(|(_, value)| *value)
    }

    /// Annual prepayment rate override for a redemption kind
    pub fn prepayment_rate(&self, redemption: &str) -> Option<f64> {
        self.parameter(&format!("prepayment_rate.{}", clean_identifier(redemption)))
    }

    pub(crate) fn normalised(mut self) -> Self {
        self.market = self.market.normalise();
        self
    }
}
