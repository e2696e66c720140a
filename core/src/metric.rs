//! Numeric outcomes that may be undefined without being errors.
//!
//! A p-value over a constant table, a lift over a zero baseline, or a cost
//! over non-positive incremental conversions never abort a request. They
//! travel through rounding and serialization as `Metric::Undefined`.

use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Defined(f64),
    Undefined(Undefined),
}

/// Which floating-point convention an undefined metric maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Undefined {
    /// The statistic has no value (e.g. chi-squared on a constant table).
    NotANumber,
    /// The ratio is unbounded (zero baseline or zero denominator).
    Infinity,
}

impl Metric {
    pub const NAN: Metric = Metric::Undefined(Undefined::NotANumber);
    pub const INFINITY: Metric = Metric::Undefined(Undefined::Infinity);

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Defined(v) => Some(*v),
            Metric::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Defined(_))
    }

    /// Round to `decimals` places; sentinels pass through untouched.
    pub fn round(self, decimals: u32) -> Self {
        match self {
            Metric::Defined(v) => Metric::Defined(round_to(v, decimals)),
            undefined => undefined,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Defined(v) => write!(f, "{v}"),
            Metric::Undefined(Undefined::NotANumber) => f.write_str("NaN"),
            Metric::Undefined(Undefined::Infinity) => f.write_str("Infinity"),
        }
    }
}

/// JSON has no NaN/Infinity literals, so sentinels go out as strings.
impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Defined(v) => serializer.serialize_f64(*v),
            Metric::Undefined(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
