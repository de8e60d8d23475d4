//! Coupon types: how the rate in force is set at the start of each period

use std::sync::Arc;

use crate::registry::Registry;

/// Rate-setting contract bound to a coupon type key
pub trait CouponType: Send + Sync {
    /// Whether the rate is fixed off the item's reference curve
    fn needs_reference(&self) -> bool {
        false
    }

    /// Annual rate in force for the coming period
    ///
    /// `reference` is the curve rate at the reset tenor, present only when
    /// [`CouponType::needs_reference`] holds.
    fn coupon_rate(&self, current_rate: f64, spread: f64, reference: Option<f64>) -> f64;
}

/// Contractual rate, unchanged over the life of the item
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed;

impl CouponType for Fixed {
    fn coupon_rate(&self, current_rate: f64, _spread: f64, _reference: Option<f64>) -> f64 {
        current_rate
    }
}

/// Reference rate plus a contractual spread, reset every period
#[derive(Debug, Clone, Copy, Default)]
pub struct Floating;

impl CouponType for Floating {
    fn needs_reference(&self) -> bool {
        true
    }

    fn coupon_rate(&self, current_rate: f64, spread: f64, reference: Option<f64>) -> f64 {
        reference.map_or(current_rate, |rate| rate + spread)
    }
}

/// No coupon; the return is in the price
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroCoupon;

impl CouponType for ZeroCoupon {
    fn coupon_rate(&self, _current_rate: f64, _spread: f64, _reference: Option<f64>) -> f64 {
        0.0
    }
}

pub(crate) fn register_defaults(registry: &mut Registry<dyn CouponType>) {
    let zero: Arc<dyn CouponType> = Arc::new(ZeroCoupon);
    registry.register("fixed", Arc::new(Fixed));
    registry.register("floating", Arc::new(Floating));
    registry.register("zero", Arc::clone(&zero));
    registry.register("none", zero);
}
