//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Limit a value to the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Limit a value to the symmetric range `[-limit, limit]`.
///
/// `limit` is expected to be non-negative.
pub fn clamp_abs<T>(value: T, limit: T) -> T
where
    T: Float
{
    clamp(value, -limit, limit)
}

/// Number of whole steps of length `step` needed to span `extent`, rounding up.
///
/// A small tolerance is applied so that extents which are an exact multiple of the step (but not
/// exactly representable, e.g. `4.0 / 0.4`) do not gain an extra step.
pub fn ceil_steps<T>(extent: T, step: T) -> usize
where
    T: Float
{
    let ratio = extent / step;
    let tol = T::from(1e-9).unwrap_or_else(T::epsilon);

    let floor = ratio.floor();
    let steps = if ratio - floor < tol {
        floor
    } else {
        ratio.ceil()
    };

    steps.to_usize().unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1.5f64, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-0.5f64, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.25f64, 0.0, 1.0), 0.25);

        assert_eq!(clamp_abs(2.0f64, 0.8), 0.8);
        assert_eq!(clamp_abs(-2.0f64, 0.8), -0.8);
        assert_eq!(clamp_abs(0.1f64, 0.8), 0.1);
    }

    #[test]
    fn test_ceil_steps() {
        assert_eq!(ceil_steps(15.0f64, 0.4), 38);
        assert_eq!(ceil_steps(5.0f64, 0.4), 13);
        assert_eq!(ceil_steps(4.0f64, 0.4), 10);
        assert_eq!(ceil_steps(0.4f64, 0.4), 1);
        assert_eq!(ceil_steps(0.1f64, 0.4), 1);
        assert_eq!(ceil_steps(0.0f64, 0.4), 0);
    }
}
