use super::{ArithmeticMode, DoubleDouble};
use crate::math::{Point, Point2d, Real};

/// Relative error bound of the double precision `orient2d` determinant.
const ORIENT2D_ERR_BOUND: Real = 4.0 * Real::EPSILON;
/// Relative error bound of the double precision `orient3d` determinant.
const ORIENT3D_ERR_BOUND: Real = 10.0 * Real::EPSILON;

/// The orientation or winding direction of a corner or polygon.
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub enum Orientation {
    /// Counter-clockwise.
    Ccw,
    /// Clockwise.
    Cw,
    /// Neither (a straight line).
    None,
}

/// Twice the signed area of the triangle `(a, b, c)`.
///
/// Positive if `(a, b, c)` is counter-clockwise.
pub fn orient2d(
    a: &Point2d<Real>,
    b: &Point2d<Real>,
    c: &Point2d<Real>,
    mode: ArithmeticMode,
) -> Real {
    match mode {
        ArithmeticMode::Double => orient2d_double(a, b, c).0,
        ArithmeticMode::Extended => orient2d_extended(a, b, c),
        ArithmeticMode::Adaptive => {
            let (det, permanent) = orient2d_double(a, b, c);
            if det.abs() > ORIENT2D_ERR_BOUND * permanent {
                det
            } else {
                log::trace!("orient2d escalated to extended precision: {:?} {:?} {:?}", a, b, c);
                orient2d_extended(a, b, c)
            }
        }
    }
}

/// Returns the winding direction of the corner `(p1, p2, p3)`.
pub fn orientation2d(
    p1: &Point2d<Real>,
    p2: &Point2d<Real>,
    p3: &Point2d<Real>,
    mode: ArithmeticMode,
) -> Orientation {
    let det = orient2d(p1, p2, p3, mode);
    if det > 0.0 {
        Orientation::Ccw
    } else if det < 0.0 {
        Orientation::Cw
    } else {
        Orientation::None
    }
}

/// Six times the signed volume of the tetrahedron `(a, b, c, d)`.
///
/// Positive if `d` lies on the side of the plane `(a, b, c)` pointed to by
/// `(b - a) x (c - a)`.
pub fn orient3d(
    a: &Point<Real>,
    b: &Point<Real>,
    c: &Point<Real>,
    d: &Point<Real>,
    mode: ArithmeticMode,
) -> Real {
    match mode {
        ArithmeticMode::Double => orient3d_double(a, b, c, d).0,
        ArithmeticMode::Extended => orient3d_extended(a, b, c, d),
        ArithmeticMode::Adaptive => {
            let (det, permanent) = orient3d_double(a, b, c, d);
            if det.abs() > ORIENT3D_ERR_BOUND * permanent {
                det
            } else {
                log::trace!(
                    "orient3d escalated to extended precision: {:?} {:?} {:?} {:?}",
                    a,
                    b,
                    c,
                    d
                );
                orient3d_extended(a, b, c, d)
            }
        }
    }
}

fn orient2d_double(a: &Point2d<Real>, b: &Point2d<Real>, c: &Point2d<Real>) -> (Real, Real) {
    let u = b - a;
    let v = c - a;
    let l = u.x * v.y;
    let r = u.y * v.x;
    (l - r, l.abs() + r.abs())
}

fn orient2d_extended(a: &Point2d<Real>, b: &Point2d<Real>, c: &Point2d<Real>) -> Real {
    let ux = DoubleDouble::diff(b.x, a.x);
    let uy = DoubleDouble::diff(b.y, a.y);
    let vx = DoubleDouble::diff(c.x, a.x);
    let vy = DoubleDouble::diff(c.y, a.y);
    (ux * vy - uy * vx).to_real()
}

fn orient3d_double(
    a: &Point<Real>,
    b: &Point<Real>,
    c: &Point<Real>,
    d: &Point<Real>,
) -> (Real, Real) {
    let u = b - a;
    let v = c - a;
    let w = d - a;

    let m0 = v.y * w.z - v.z * w.y;
    let m1 = v.z * w.x - v.x * w.z;
    let m2 = v.x * w.y - v.y * w.x;
    let det = u.x * m0 + u.y * m1 + u.z * m2;

    let permanent = u.x.abs() * ((v.y * w.z).abs() + (v.z * w.y).abs())
        + u.y.abs() * ((v.z * w.x).abs() + (v.x * w.z).abs())
        + u.z.abs() * ((v.x * w.y).abs() + (v.y * w.x).abs());

    (det, permanent)
}

fn orient3d_extended(a: &Point<Real>, b: &Point<Real>, c: &Point<Real>, d: &Point<Real>) -> Real {
    let u = [
        DoubleDouble::diff(b.x, a.x),
        DoubleDouble::diff(b.y, a.y),
        DoubleDouble::diff(b.z, a.z),
    ];
    let v = [
        DoubleDouble::diff(c.x, a.x),
        DoubleDouble::diff(c.y, a.y),
        DoubleDouble::diff(c.z, a.z),
    ];
    let w = [
        DoubleDouble::diff(d.x, a.x),
        DoubleDouble::diff(d.y, a.y),
        DoubleDouble::diff(d.z, a.z),
    ];

    let m0 = v[1] * w[2] - v[2] * w[1];
    let m1 = v[2] * w[0] - v[0] * w[2];
    let m2 = v[0] * w[1] - v[1] * w[0];
    (u[0] * m0 + u[1] * m1 + u[2] * m2).to_real()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [ArithmeticMode; 3] = [
        ArithmeticMode::Double,
        ArithmeticMode::Adaptive,
        ArithmeticMode::Extended,
    ];

    #[test]
    fn unit_tetrahedron_is_positive() {
        for mode in MODES {
            let det = orient3d(
                &Point::origin(),
                &Point::new(1.0, 0.0, 0.0),
                &Point::new(0.0, 1.0, 0.0),
                &Point::new(0.0, 0.0, 1.0),
                mode,
            );
            assert_relative_eq!(det, 1.0);
        }
    }

    #[test]
    fn corner_direction() {
        let a = Point2d::new(0.0, 0.0);
        let b = Point2d::new(1.0, 0.0);
        for mode in MODES {
            assert_eq!(orientation2d(&a, &b, &Point2d::new(1.0, 1.0), mode), Orientation::Ccw);
            assert_eq!(orientation2d(&a, &b, &Point2d::new(1.0, -1.0), mode), Orientation::Cw);
            assert_eq!(orientation2d(&a, &b, &Point2d::new(2.0, 0.0), mode), Orientation::None);
        }
    }

    #[test]
    fn adaptive_resolves_nearly_collinear_points() {
        // `c` lies slightly above the line through `a` and `b`, but the double
        // precision determinant is swamped by cancellation.
        let a = Point2d::new(0.5, 0.5);
        let b = Point2d::new(12.0, 12.0);
        let c = Point2d::new(24.0, 24.0 + 4.0 * f64::EPSILON * 24.0);

        let exact = orient2d(&a, &b, &c, ArithmeticMode::Extended);
        let adaptive = orient2d(&a, &b, &c, ArithmeticMode::Adaptive);
        assert!(exact > 0.0);
        assert_eq!(exact.signum(), adaptive.signum());
    }

    #[test]
    fn coplanar_points_are_degenerate() {
        let a = Point::new(0.1, 0.2, 0.0);
        let b = Point::new(0.7, 0.3, 0.0);
        let c = Point::new(0.4, 0.9, 0.0);
        let d = Point::new(0.33, 0.77, 0.0);
        assert_eq!(orient3d(&a, &b, &c, &d, ArithmeticMode::Extended), 0.0);
        assert_eq!(orient3d(&a, &b, &c, &d, ArithmeticMode::Adaptive), 0.0);
    }
}
