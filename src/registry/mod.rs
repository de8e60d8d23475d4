//! Key-based handler registries
//!
//! Every classification column on a balance sheet row is a string key that is
//! resolved once per run against one of these registries. Registries are built
//! before a run starts and are only read afterwards, so they are shared across
//! scenario threads behind an `Arc` without locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::warn;

use crate::balance_sheet::{Classification, KeyColumn};
use crate::calendar::Frequency;
use crate::error::{ProjectionError, Result};
use crate::metrics::{self, Metric};
use crate::rules::accounting::{self, AccountingMethod};
use crate::rules::coupon::{self, CouponType};
use crate::rules::redemption::{self, RedemptionMethod};
use crate::rules::valuation::{self, ValuationMethod};

/// Normalise a registry key: trim, lowercase and drop separators
///
/// `"Straight-Line"`, `"straight_line"` and `"straightline"` all map to the same key.
pub fn clean_identifier(identifier: &str) -> String {
    identifier
        .trim()
        .chars()
        .filter(|c| !matches!(c, '_' | ' ' | '-' | '/' | '\\'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Mapping from normalised key to a shared handler
pub struct Registry<H: ?Sized> {
    name: &'static str,
    items: HashMap<String, Arc<H>>,
}

impl<H: ?Sized> Registry<H> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            items: HashMap::new(),
        }
    }

    /// Registry name used in error messages
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Insert a handler; an existing handler under the same key is replaced
    pub fn register(&mut self, key: &str, handler: Arc<H>) {
        let key = clean_identifier(key);
        if self.items.contains_key(&key) {
            warn!("{} '{}' was already registered, replacing it", self.name, key);
        }
        self.items.insert(key, handler);
    }

    /// Look up the handler bound to `key`
    pub fn resolve(&self, key: &str) -> Result<Arc<H>> {
        self.items
            .get(&clean_identifier(key))
            .cloned()
            .ok_or_else(|| ProjectionError::unknown_key(self.name, key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(&clean_identifier(key))
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.items.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<H: ?Sized> fmt::Debug for Registry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("keys", &self.keys())
            .finish()
    }
}

/// The full set of registries consulted during a run
#[derive(Debug)]
pub struct Registries {
    pub redemption: Registry<dyn RedemptionMethod>,
    pub valuation: Registry<dyn ValuationMethod>,
    pub accounting: Registry<dyn AccountingMethod>,
    pub metric: Registry<dyn Metric>,
    pub classification: Registry<Classification>,
    pub frequency: Registry<Frequency>,
    pub coupon_type: Registry<dyn CouponType>,
}

impl Registries {
    /// Registries without any handler bound
    pub fn empty() -> Self {
        Self {
            redemption: Registry::new("redemption"),
            valuation: Registry::new("valuation"),
            accounting: Registry::new("accounting method"),
            metric: Registry::new("metric"),
            classification: Registry::new("classification"),
            frequency: Registry::new("frequency"),
            coupon_type: Registry::new("coupon type"),
        }
    }

    /// Registries populated with the built-in handlers
    pub fn standard() -> Self {
        let mut registries = Self::empty();
        redemption::register_defaults(&mut registries.redemption);
        valuation::register_defaults(&mut registries.valuation);
        accounting::register_defaults(&mut registries.accounting);
        metrics::register_defaults(&mut registries.metric);
        Classification::register_defaults(&mut registries.classification);
        Frequency::register_defaults(&mut registries.frequency);
        coupon::register_defaults(&mut registries.coupon_type);
        registries
    }

    /// Whether the registry behind a classification column binds `key`
    pub fn contains(&self, column: KeyColumn, key: &str) -> bool {
        match column {
            KeyColumn::Redemption => self.redemption.contains(key),
            KeyColumn::Valuation => self.valuation.contains(key),
            KeyColumn::AccountingMethod => self.accounting.contains(key),
            KeyColumn::MetricGroup => self.classification.contains(key),
            KeyColumn::Frequency => self.frequency.contains(key),
            KeyColumn::CouponType => self.coupon_type.contains(key),
        }
    }

    /// Name of the registry behind a classification column
    pub fn registry_name(&self, column: KeyColumn) -> &'static str {
        match column {
            KeyColumn::Redemption => self.redemption.name(),
            KeyColumn::Valuation => self.valuation.name(),
            KeyColumn::AccountingMethod => self.accounting.name(),
            KeyColumn::MetricGroup => self.classification.name(),
            KeyColumn::Frequency => self.frequency.name(),
            KeyColumn::CouponType => self.coupon_type.name(),
        }
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_identifier() {
        assert_eq!(clean_identifier(" Straight-Line "), "straightline");
        assert_eq!(clean_identifier("semi_annual"), "semiannual");
        assert_eq!(clean_identifier("30E/360"), "30e360");
    }

    #[test]
    fn test_resolve_unknown_key() {
        let registry: Registry<Frequency> = Registry::new("frequency");
        match registry.resolve("monthly") {
            Err(ProjectionError::UnknownRegistryKey { registry, key }) => {
                assert_eq!(registry, "frequency");
                assert_eq!(key, "monthly");
            }
            other => panic!("expected UnknownRegistryKey, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_returns_same_instance() {
        let registries = Registries::standard();
        let first = registries.redemption.resolve("linear").unwrap();
        let second = registries.redemption.resolve("Linear").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry: Registry<Frequency> = Registry::new("frequency");
        registry.register("monthly", Arc::new(Frequency::monthly()));
        registry.register("Monthly", Arc::new(Frequency::quarterly()));
        assert_eq!(registry.len(), 1);
        assert_eq!(*registry.resolve("monthly").unwrap(), Frequency::quarterly());
    }

    #[test]
    fn test_standard_registries_populated() {
        let registries = Registries::standard();
        for key in ["bullet", "linear", "straight-line", "annuity", "perpetual", "notional"] {
            assert!(registries.redemption.contains(key), "missing redemption {}", key);
        }
        for key in ["none", "par", "discounted"] {
            assert!(registries.valuation.contains(key));
        }
        for key in ["amortized cost", "FVTPL", "fvoci"] {
            assert!(registries.accounting.contains(key));
        }
        assert!(registries.frequency.contains("semi-annual"));
        assert!(registries.classification.contains("loans"));
        assert!(registries.metric.contains("total_assets"));
        for key in ["fixed", "Floating", "zero", "none"] {
            assert!(registries.coupon_type.contains(key));
        }
        assert!(registries.contains(KeyColumn::CouponType, "floating"));
        assert_eq!(registries.registry_name(KeyColumn::MetricGroup), "classification");
    }
}
