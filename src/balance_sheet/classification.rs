//! Item classification: which side of the balance sheet a metric group sits on

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::registry::Registry;

/// Balance sheet side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Asset,
    Liability,
    Equity,
}

impl Side {
    /// Sign applied to income flows: interest on liabilities is an expense
    pub fn income_sign(&self) -> f64 {
        match self {
            Side::Asset => 1.0,
            Side::Liability | Side::Equity => -1.0,
        }
    }
}

/// Handler bound to a metric-group key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub side: Side,
    pub label: String,
}

impl Classification {
    pub fn new(side: Side, label: &str) -> Self {
        Self {
            side,
            label: label.to_string(),
        }
    }

    pub(crate) fn register_defaults(registry: &mut Registry<Classification>) {
        registry.register("loans", Arc::new(Self::new(Side::Asset, "Loans")));
        registry.register("bonds", Arc::new(Self::new(Side::Asset, "Bonds")));
        registry.register("cash", Arc::new(Self::new(Side::Asset, "Cash")));
        registry.register("deposits", Arc::new(Self::new(Side::Liability, "Deposits")));
        registry.register("funding", Arc::new(Self::new(Side::Liability, "Wholesale funding")));
        registry.register("equity", Arc::new(Self::new(Side::Equity, "Equity")));
    }
}
