//! Quadrature of the interface facets of a volume cell.

use super::quadrature::{line_rule, map_triangle};
use crate::facet::{split_cells_into_triangles, Facet};
use crate::math::{Point, Point2d, Real, Vector};
use crate::options::BCellGaussPts;
use crate::point::PointId;
use crate::utils::hashmap::HashMap;
use crate::utils::{newell_normal, PlaneFrame};

/// Edges whose direction is closer than this to the integration direction
/// do not contribute.
const EDGE_TOLERANCE: Real = 1.0e-12;

/// The geometry and quadrature of one interface facet, seen from a cell.
pub(crate) struct FacetRule {
    pub normal: Vector<Real>,
    pub area: Real,
    pub points: Vec<(Point<Real>, Real)>,
}

/// A quadrature, exact up to `degree`, of a facet oriented outward of the
/// cell `cell`.
pub(crate) fn facet_rule(
    facet: &Facet,
    cell: usize,
    points: &HashMap<PointId, Point<Real>>,
    degree: usize,
    strategy: BCellGaussPts,
) -> Option<FacetRule> {
    let ids = facet.points_from(cell)?;
    let coords: Vec<_> = ids
        .iter()
        .map(|id| points.get(id).copied())
        .collect::<Option<_>>()?;

    let normal = newell_normal(&coords);
    let area = normal.norm() * 0.5;
    let normal = normal.try_normalize(0.0)?;

    let rule = match strategy {
        BCellGaussPts::Tessellation => {
            let flip = facet.cells().0 != cell;
            let n = coords.len();
            split_cells_into_triangles(facet.triangulation())
                .into_iter()
                .flat_map(|[a, b, c]| {
                    // `coords` is reversed w.r.t. the facet when flipped.
                    let idx = |i: usize| if flip { n - 1 - i } else { i };
                    let (a, b, c) = (coords[idx(a)], coords[idx(b)], coords[idx(c)]);
                    map_triangle(degree, &a, &b, &c)
                })
                .collect()
        }
        BCellGaussPts::DirectDivergence => planar_divergence_rule(&coords, &normal, degree),
    };

    Some(FacetRule {
        normal,
        area,
        points: rule,
    })
}

/// The 2D counterpart of the direct divergence rule: integrals along the
/// first in-plane axis, anchored on the edges of the polygon.
fn planar_divergence_rule(
    coords: &[Point<Real>],
    normal: &Vector<Real>,
    degree: usize,
) -> Vec<(Point<Real>, Real)> {
    let Some(origin) = coords.first() else {
        return Vec::new();
    };
    let frame = PlaneFrame::new(*origin, *normal);
    let local: Vec<_> = coords.iter().map(|pt| frame.to_local(pt)).collect();
    let u0 = local.iter().map(|pt| pt.x).fold(Real::INFINITY, Real::min);

    let edge_rule = line_rule(degree + 1);
    let inner_rule = line_rule(degree);
    let n = local.len();
    let mut rule = Vec::new();

    for i in 0..n {
        let (a, b) = (local[i], local[(i + 1) % n]);
        let edge = b - a;
        if edge.y.abs() <= EDGE_TOLERANCE * edge.norm() {
            continue;
        }

        for (t, wt) in &edge_rule {
            let q = a + edge * *t;
            let length = q.x - u0;
            if length <= 0.0 {
                continue;
            }
            for (xi, w) in &inner_rule {
                let pt = frame.to_global(&Point2d::new(u0 + xi * length, q.y));
                rule.push((pt, wt * edge.y * length * w));
            }
        }
    }

    rule
}
