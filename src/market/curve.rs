//! Zero rate curves used to discount contractual cash flows

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};

/// Convert a tenor label such as `3m`, `1y`, `2w` or `30d` to years
pub fn parse_tenor(tenor: &str) -> Result<f64> {
    let tenor = tenor.trim().to_lowercase();
    let digits: String = tenor.chars().filter(|c| c.is_ascii_digit()).collect();
    let unit: String = tenor.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    let count: f64 = digits
        .parse::<u32>()
        .map_err(|_| ProjectionError::InvalidInput(format!("tenor '{}' has no count", tenor)))?
        .into();
    let years_per_unit = match unit.as_str() {
        "d" => 1.0 / 365.25,
        "w" => 7.0 / 365.25,
        "m" => 1.0 / 12.0,
        "y" => 1.0,
        _ => return Err(ProjectionError::InvalidInput(format!("unknown tenor unit in '{}'", tenor))),
    };
    Ok(count * years_per_unit)
}

/// One curve node as written in scenario files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Tenor label (`6m`, `5y`)
    pub tenor: String,
    /// Continuously compounded zero rate
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCurve {
    points: Vec<CurvePoint>,
}

/// Zero curve: linear in rate between nodes, flat beyond the first and last node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurve", into = "RawCurve")]
pub struct ZeroCurve {
    tenors: Vec<f64>,
    rates: Vec<f64>,
}

impl TryFrom<RawCurve> for ZeroCurve {
    type Error = ProjectionError;

    fn try_from(raw: RawCurve) -> Result<Self> {
        let mut nodes = Vec::with_capacity(raw.points.len());
        for point in &raw.points {
            nodes.push((parse_tenor(&point.tenor)?, point.rate));
        }
        Self::from_nodes(nodes)
    }
}

impl From<ZeroCurve> for RawCurve {
    fn from(curve: ZeroCurve) -> Self {
        let points = curve
            .tenors
            .iter()
            .zip(&curve.rates)
            .map(|(t, r)| CurvePoint {
                tenor: format!("{}d", (t * 365.25).round() as u32),
                rate: *r,
            })
            .collect();
        RawCurve { points }
    }
}

impl ZeroCurve {
    /// Build from `(tenor in years, zero rate)` nodes in any order
    pub fn from_nodes(mut nodes: Vec<(f64, f64)>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(ProjectionError::InvalidInput("zero curve without nodes".to_string()));
        }
        if nodes.iter().any(|(t, r)| !t.is_finite() || !r.is_finite() || *t < 0.0) {
            return Err(ProjectionError::InvalidInput("zero curve node is not a finite, non-negative tenor".to_string()));
        }
        nodes.sort_by(|a, b| a.0.total_cmp(&b.0));
        if nodes.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(ProjectionError::InvalidInput("zero curve has duplicate tenors".to_string()));
        }
        let (tenors, rates) = nodes.into_iter().unzip();
        Ok(Self { tenors, rates })
    }

    /// Single rate at every tenor
    pub fn flat(rate: f64) -> Self {
        Self {
            tenors: vec![0.0],
            rates: vec![rate],
        }
    }

    /// Zero rate at `t` years
    pub fn zero_rate(&self, t: f64) -> f64 {
        let last = self.tenors.len() - 1;
        if t <= self.tenors[0] {
            return self.rates[0];
        }
        if t >= self.tenors[last] {
            return self.rates[last];
        }
        let upper = self.tenors.partition_point(|&node| node < t);
        let lower = upper - 1;
        let weight = (t - self.tenors[lower]) / (self.tenors[upper] - self.tenors[lower]);
        self.rates[lower] + weight * (self.rates[upper] - self.rates[lower])
    }

    /// Discount factor to `t` years
    pub fn discount_factor(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 1.0;
        }
        (-self.zero_rate(t) * t).exp()
    }
}
