use crate::SlError;

/// Floating point type used throughout the workspace.
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, SlError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SlError::NonFinite { what, value: v })
    }
}

/// Clamp `v` into `[lo, hi]`, tolerating inverted or infinite bounds.
///
/// `f64::clamp` panics when `lo > hi`; bounds coming from user parameters
/// can be inverted, in which case the upper bound wins.
pub fn clamp_bounds(v: Real, lo: Real, hi: Real) -> Real {
    if v.is_nan() {
        return v;
    }
    v.max(lo).min(hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn clamp_bounds_handles_infinite_and_inverted() {
        assert_eq!(clamp_bounds(5.0, Real::NEG_INFINITY, Real::INFINITY), 5.0);
        assert_eq!(clamp_bounds(1.8, 0.0, 1.0), 1.0);
        assert_eq!(clamp_bounds(-0.5, 0.0, 1.0), 0.0);
        assert_eq!(clamp_bounds(0.5, 1.0, 0.0), 0.0);
    }
}
