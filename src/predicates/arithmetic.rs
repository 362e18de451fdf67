use crate::math::Real;
use core::ops::{Add, Mul, Neg, Sub};

/// The precision policy of geometric predicates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum ArithmeticMode {
    /// Plain double precision, no escalation.
    Double,
    /// Double precision, escalated to extended precision when the sign of the
    /// result is ambiguous.
    #[default]
    Adaptive,
    /// Extended precision for every predicate.
    Extended,
}

/// An unevaluated sum `hi + lo` of two doubles, giving roughly twice the
/// precision of a single `f64`.
///
/// Only the operations needed by the predicates are implemented. Sums and
/// differences of two plain doubles are exact.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct DoubleDouble {
    pub hi: Real,
    pub lo: Real,
}

#[inline]
fn two_sum(a: Real, b: Real) -> (Real, Real) {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    (s, err)
}

#[inline]
fn quick_two_sum(a: Real, b: Real) -> (Real, Real) {
    let s = a + b;
    let err = b - (s - a);
    (s, err)
}

#[inline]
fn two_prod(a: Real, b: Real) -> (Real, Real) {
    let p = a * b;
    let err = a.mul_add(b, -p);
    (p, err)
}

impl DoubleDouble {
    #[cfg(test)]
    pub fn new(value: Real) -> Self {
        Self { hi: value, lo: 0.0 }
    }

    /// The exact difference `a - b` of two doubles.
    #[inline]
    pub fn diff(a: Real, b: Real) -> Self {
        let (hi, lo) = two_sum(a, -b);
        Self { hi, lo }
    }

    #[inline]
    pub fn to_real(self) -> Real {
        self.hi + self.lo
    }
}

impl Add for DoubleDouble {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        let (s, e) = two_sum(self.hi, rhs.hi);
        let (t, f) = two_sum(self.lo, rhs.lo);
        let (s, e) = quick_two_sum(s, e + t);
        let (hi, lo) = quick_two_sum(s, e + f);
        Self { hi, lo }
    }
}

impl Neg for DoubleDouble {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            hi: -self.hi,
            lo: -self.lo,
        }
    }
}

impl Sub for DoubleDouble {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Mul for DoubleDouble {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let (p, e) = two_prod(self.hi, rhs.hi);
        let e = e + (self.hi * rhs.lo + self.lo * rhs.hi);
        let (hi, lo) = quick_two_sum(p, e);
        Self { hi, lo }
    }
}

#[cfg(test)]
mod tests {
    use super::DoubleDouble;

    #[test]
    fn exact_difference_keeps_the_rounding_error() {
        let a = 1.0e16;
        let b = 1.0;
        let d = DoubleDouble::new(a) + DoubleDouble::new(b) - DoubleDouble::new(a);
        assert_eq!(d.to_real(), 1.0);
        // Plain doubles lose it.
        assert_eq!((a + b) - a, 0.0);
    }

    #[test]
    fn product_error_is_captured() {
        let x = DoubleDouble::new(1.0 + f64::EPSILON);
        let sq = x * x;
        assert_eq!(sq.hi, 1.0 + 2.0 * f64::EPSILON);
        assert_eq!(sq.lo, f64::EPSILON * f64::EPSILON);
    }
}
