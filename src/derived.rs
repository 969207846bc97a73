//! Derived quantities built from interpolated base layers.
//!
//! Each derived quantity is a plain function of one or more interpolated
//! values. The sentinel is contagious: if any operand equals it, the result is
//! the sentinel, compared with `==` and never with a tolerance.

use std::sync::Arc;

use crate::boundary::BoundaryCurve;
use crate::error::{RedPlanetError, Result};
use crate::grid::GridModel;
use crate::interpolation::InterpolationMethod;

/// Exact-equality helper around a sentinel value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentinel(pub f64);

impl Sentinel {
    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is(&self, value: f64) -> bool {
        value == self.0
    }

    /// Return the sentinel if any operand equals it, otherwise `f()`
    pub fn guard(&self, operands: &[f64], f: impl FnOnce() -> f64) -> f64 {
        if operands.iter().any(|&v| self.is(v)) {
            self.0
        } else {
            f()
        }
    }
}

/// `top - bottom`, undefined if either side is
pub fn difference(top: f64, bottom: f64, sentinel: Sentinel) -> f64 {
    sentinel.guard(&[top, bottom], || top - bottom)
}

/// Pick one of two constants depending on the side of `curve` the point is on
pub fn hemisphere_constant(
    curve: &BoundaryCurve,
    lon: f64,
    lat: f64,
    above: f64,
    below: f64,
) -> Result<f64> {
    if curve.is_above(lon, lat)? {
        Ok(above)
    } else {
        Ok(below)
    }
}

/// Rescale a concentration `c` to exclude a volatile fraction `v`
///
/// Undefined when `c` is negative, either operand is the sentinel, `v` lies
/// outside `[0, 1)`, or the rescaled value comes out negative.
pub fn volatile_free(c: f64, v: f64, sentinel: Sentinel) -> f64 {
    if sentinel.is(c) || sentinel.is(v) || c < 0.0 || !(0.0..1.0).contains(&v) {
        return sentinel.value();
    }

    let value = c / (1.0 - v);
    if value < 0.0 {
        sentinel.value()
    } else {
        value
    }
}

/// Reject normalization of a quantity that is itself volatile
pub fn ensure_not_volatile(name: &str, volatiles: &[&str]) -> Result<()> {
    if volatiles.iter().any(|v| v.eq_ignore_ascii_case(name)) {
        return Err(RedPlanetError::InvalidOperation {
            message: format!(
                "Cannot normalize volatile quantity '{}' against the volatile sum ({})",
                name,
                volatiles.join(", ")
            ),
        });
    }
    Ok(())
}

/// Evaluates derived quantities over one grid model
#[derive(Debug, Clone)]
pub struct DerivedQuantityEngine {
    model: Arc<GridModel>,
    method: InterpolationMethod,
}

impl DerivedQuantityEngine {
    pub fn new(model: Arc<GridModel>, method: InterpolationMethod) -> Self {
        Self { model, method }
    }

    pub fn model(&self) -> &GridModel {
        &self.model
    }

    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    pub fn sentinel(&self) -> Sentinel {
        Sentinel(self.model.nan_sentinel())
    }

    /// Interpolated value of a single layer
    pub fn value(&self, layer: &str, lon: f64, lat: f64) -> Result<f64> {
        self.method.interpolate(&self.model, layer, lon, lat)
    }

    /// Difference of two layers at the same coordinate
    pub fn difference(&self, top: &str, bottom: &str, lon: f64, lat: f64) -> Result<f64> {
        let top = self.value(top, lon, lat)?;
        let bottom = self.value(bottom, lon, lat)?;
        Ok(difference(top, bottom, self.sentinel()))
    }

    /// Volatile-free value of `layer`, normalized against `volatile_sum_layer`
    pub fn volatile_free(
        &self,
        layer: &str,
        volatile_sum_layer: &str,
        volatiles: &[&str],
        lon: f64,
        lat: f64,
    ) -> Result<f64> {
        ensure_not_volatile(layer, volatiles)?;
        let c = self.value(layer, lon, lat)?;
        let v = self.value(volatile_sum_layer, lon, lat)?;
        Ok(volatile_free(c, v, self.sentinel()))
    }
}
