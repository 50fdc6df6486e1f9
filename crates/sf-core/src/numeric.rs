use crate::SfError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, SfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SfError::NonFinite { what, value: v })
    }
}

/// Fraction in `[0, 1]` for a non-negative value over a strictly positive total.
///
/// Values slightly above the total (within `tol`) clamp to 1.0; anything
/// further out is rejected.
pub fn fraction_of(value: Real, total: Real, tol: Tolerances) -> Result<Real, SfError> {
    ensure_finite(value, "fraction numerator")?;
    ensure_finite(total, "fraction denominator")?;
    if total <= 0.0 {
        return Err(SfError::InvalidArg {
            what: "fraction denominator must be positive",
        });
    }
    if value < 0.0 {
        return Err(SfError::InvalidArg {
            what: "fraction numerator must be non-negative",
        });
    }
    if value > total && !nearly_equal(value, total, tol) {
        return Err(SfError::InvalidArg {
            what: "fraction numerator exceeds denominator",
        });
    }
    Ok((value / total).min(1.0))
}
