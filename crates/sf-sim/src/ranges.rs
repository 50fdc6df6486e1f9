//! Range Discoverer.
//!
//! Observed min/max of each requested variable over every emitted timestep,
//! widened by a margin so samples reach slightly past the reference trajectory.

use serde::{Deserialize, Serialize};

use crate::error::{RangeError, RangeResult};
use crate::result::SimulationResult;

/// Margin applied to observed bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeMargin {
    /// Fraction of |bound| added outward.
    pub relative: f64,
    /// Additive widening for bounds observed at exactly zero, and for spans
    /// the relative margin cannot open.
    pub absolute: f64,
}

impl Default for RangeMargin {
    fn default() -> Self {
        Self {
            relative: 0.01,
            absolute: 0.01,
        }
    }
}

impl RangeMargin {
    pub fn validate(&self) -> RangeResult<()> {
        if !self.relative.is_finite() || self.relative <= 0.0 {
            return Err(RangeError::InvalidMargin {
                what: "relative margin must be finite and > 0",
            });
        }
        if !self.absolute.is_finite() || self.absolute <= 0.0 {
            return Err(RangeError::InvalidMargin {
                what: "absolute margin must be finite and > 0",
            });
        }
        Ok(())
    }

    /// Widen `[min, max]`. The result always satisfies `lo < hi`.
    pub fn apply(&self, min: f64, max: f64) -> (f64, f64) {
        let lo = if min == 0.0 {
            -self.absolute
        } else {
            min - self.relative * min.abs()
        };
        let hi = if max == 0.0 {
            self.absolute
        } else {
            max + self.relative * max.abs()
        };
        if lo < hi {
            (lo, hi)
        } else {
            // Relative margin vanished (subnormal bounds).
            (lo - self.absolute, hi + self.absolute)
        }
    }
}

/// Sampling bound for one variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableRange {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub observed_min: f64,
    pub observed_max: f64,
}

impl VariableRange {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Ranges for a variable set, in request order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeSet {
    ranges: Vec<VariableRange>,
}

impl RangeSet {
    pub fn new(ranges: Vec<VariableRange>) -> Self {
        Self { ranges }
    }

    pub fn get(&self, name: &str) -> Option<&VariableRange> {
        self.ranges.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableRange> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Ranges ordered like `names`, or the first missing name.
    pub fn aligned(&self, names: &[String]) -> Result<Vec<VariableRange>, String> {
        names
            .iter()
            .map(|name| self.get(name).cloned().ok_or_else(|| name.clone()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a RangeSet {
    type Item = &'a VariableRange;
    type IntoIter = std::slice::Iter<'a, VariableRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

/// Compute margin-adjusted ranges for `variables` from `result`.
///
/// Duplicate names are reported once. Pure over its inputs, so repeated calls
/// on the same result give identical bounds.
pub fn discover_ranges<S: AsRef<str>>(
    variables: &[S],
    result: &SimulationResult,
    margin: &RangeMargin,
) -> RangeResult<RangeSet> {
    margin.validate()?;
    if result.steps() == 0 {
        return Err(RangeError::EmptyResult);
    }

    let mut ranges: Vec<VariableRange> = Vec::with_capacity(variables.len());
    for name in variables.iter().map(AsRef::as_ref) {
        if ranges.iter().any(|r| r.name == name) {
            continue;
        }
        let column = result
            .column(name)
            .ok_or_else(|| RangeError::UnknownVariable {
                name: name.to_string(),
            })?;

        let mut observed_min = f64::INFINITY;
        let mut observed_max = f64::NEG_INFINITY;
        for &value in column {
            if !value.is_finite() {
                return Err(RangeError::NonFinite {
                    name: name.to_string(),
                    value,
                });
            }
            observed_min = observed_min.min(value);
            observed_max = observed_max.max(value);
        }

        let (min, max) = margin.apply(observed_min, observed_max);
        if !min.is_finite() || !max.is_finite() {
            return Err(RangeError::NonFinite {
                name: name.to_string(),
                value: if min.is_finite() { max } else { min },
            });
        }
        if !(max - min).is_finite() {
            return Err(RangeError::NonFiniteSpan {
                name: name.to_string(),
                min,
                max,
            });
        }
        ranges.push(VariableRange {
            name: name.to_string(),
            min,
            max,
            observed_min,
            observed_max,
        });
    }

    tracing::debug!(variables = ranges.len(), steps = result.steps(), "ranges discovered");
    Ok(RangeSet::new(ranges))
}
