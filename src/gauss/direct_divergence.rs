//! Volume quadrature from boundary integrals.
//!
//! For an integrand `f`, let `F(x, y, z)` be the integral of `f` along `x`
//! from a reference plane `x = x0`. The divergence theorem turns the volume
//! integral of `f` into the integral of `F n_x` over the boundary of the
//! cell. Each quadrature point of a boundary triangle thus spawns a line
//! rule between the reference plane and that point.

use super::quadrature::{line_rule, map_triangle};
use crate::math::{Point, Real};
use crate::point::PointId;
use crate::utils::hashmap::HashMap;

/// Components of facet normals below this value do not contribute.
const NORMAL_TOLERANCE: Real = 1.0e-12;

/// A volume quadrature, exact up to `degree`, of the region bounded by the
/// given outward oriented triangles.
///
/// Weights may be negative when the region is not convex along `x`; their
/// sum is the volume of the region.
pub(crate) fn direct_divergence_rule(
    triangles: &[[PointId; 3]],
    points: &HashMap<PointId, Point<Real>>,
    degree: usize,
) -> Vec<(Point<Real>, Real)> {
    let corners: Vec<[Point<Real>; 3]> = triangles
        .iter()
        .filter_map(|[a, b, c]| Some([*points.get(a)?, *points.get(b)?, *points.get(c)?]))
        .collect();

    let x0 = corners
        .iter()
        .flatten()
        .map(|pt| pt.x)
        .fold(Real::INFINITY, Real::min);
    if !x0.is_finite() {
        return Vec::new();
    }

    let line = line_rule(degree);
    let mut rule = Vec::new();

    for [a, b, c] in &corners {
        let normal = (b - a).cross(&(c - a));
        let Some(normal) = normal.try_normalize(0.0) else {
            continue;
        };
        if normal.x.abs() <= NORMAL_TOLERANCE {
            continue;
        }

        for (facet_pt, facet_weight) in map_triangle(degree + 1, a, b, c) {
            let length = facet_pt.x - x0;
            if length <= 0.0 {
                continue;
            }
            for (xi, w) in &line {
                let pt = Point::new(x0 + xi * length, facet_pt.y, facet_pt.z);
                rule.push((pt, facet_weight * normal.x * length * w));
            }
        }
    }

    rule
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> (Vec<[PointId; 3]>, HashMap<PointId, Point<Real>>) {
        let coords = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 1.0),
            Point::new(1.0, 1.0, 1.0),
            Point::new(0.0, 1.0, 1.0),
        ];
        let quads = [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ];
        let triangles = quads
            .iter()
            .flat_map(|[a, b, c, d]| [[*a, *b, *c], [*a, *c, *d]])
            .map(|t: [u32; 3]| t.map(PointId))
            .collect();
        let points = coords
            .iter()
            .enumerate()
            .map(|(i, pt)| (PointId(i as u32), *pt))
            .collect();
        (triangles, points)
    }

    #[test]
    fn cube_moments() {
        let (triangles, points) = unit_cube();
        let rule = direct_divergence_rule(&triangles, &points, 3);

        let volume: Real = rule.iter().map(|(_, w)| w).sum();
        let moment: Real = rule.iter().map(|(pt, w)| w * pt.x * pt.x * pt.y).sum();
        assert_relative_eq!(volume, 1.0, epsilon = 1.0e-13);
        assert_relative_eq!(moment, 1.0 / 6.0, epsilon = 1.0e-13);
    }
}
