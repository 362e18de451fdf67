//! Strict point-in-triangle and point-in-polygon tests on projected facets.

use super::{orient2d, ArithmeticMode};
use crate::math::{Point2d, Real};

/// Distance below which a point is considered to lie on a polygon edge.
const ON_EDGE_TOLERANCE: Real = 1.0e-12;

/// Returns `true` if `p` lies strictly inside the triangle `(v1, v2, v3)`,
/// whatever its orientation.
///
/// Every corner determinant must exceed `eps` in magnitude, so points on the
/// boundary or within `eps` of it are outside.
pub fn is_point_strictly_in_triangle(
    p: &Point2d<Real>,
    v1: &Point2d<Real>,
    v2: &Point2d<Real>,
    v3: &Point2d<Real>,
    eps: Real,
    mode: ArithmeticMode,
) -> bool {
    let d1 = orient2d(v1, v2, p, mode);
    let d2 = orient2d(v2, v3, p, mode);
    let d3 = orient2d(v3, v1, p, mode);

    (d1 > eps && d2 > eps && d3 > eps) || (d1 < -eps && d2 < -eps && d3 < -eps)
}

/// Returns `true` if `p` lies strictly inside the closed polygon `poly`, which
/// may be concave and have any orientation.
///
/// Uses the winding number. Points on an edge are outside.
pub fn is_point_strictly_in_polygon(
    p: &Point2d<Real>,
    poly: &[Point2d<Real>],
    mode: ArithmeticMode,
) -> bool {
    let mut winding = 0i32;

    for (i, a) in poly.iter().enumerate() {
        let b = &poly[(i + 1) % poly.len()];
        let side = orient2d(a, b, p, mode);

        if side.abs() < ON_EDGE_TOLERANCE
            && p.x >= a.x.min(b.x) - ON_EDGE_TOLERANCE
            && p.x <= a.x.max(b.x) + ON_EDGE_TOLERANCE
            && p.y >= a.y.min(b.y) - ON_EDGE_TOLERANCE
            && p.y <= a.y.max(b.y) + ON_EDGE_TOLERANCE
        {
            return false;
        }

        if a.y <= p.y {
            if b.y > p.y && side > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && side < 0.0 {
            winding -= 1;
        }
    }

    winding != 0
}
