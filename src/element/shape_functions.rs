//! Shape functions of the supported background elements.

use super::CellType;
use crate::math::{Point, Real, Vector};
use arrayvec::ArrayVec;

/// Smallest distance to the apex used when evaluating pyramid shape functions.
const PYRAMID_APEX_GUARD: Real = 1.0e-12;

/// The values of the shape functions of `cell_type` at the local point `xi`.
pub fn shape_functions(cell_type: CellType, xi: &Point<Real>) -> ArrayVec<Real, 8> {
    let (r, s, t) = (xi.x, xi.y, xi.z);

    match cell_type {
        CellType::Tet4 => [1.0 - r - s - t, r, s, t].into_iter().collect(),
        CellType::Hex8 => cell_type
            .reference_nodes()
            .iter()
            .map(|n| 0.125 * (1.0 + r * n[0]) * (1.0 + s * n[1]) * (1.0 + t * n[2]))
            .collect(),
        CellType::Wedge6 => {
            let tri = [1.0 - r - s, r, s];
            let (bottom, top) = (0.5 * (1.0 - t), 0.5 * (1.0 + t));
            tri.iter()
                .map(|l| l * bottom)
                .chain(tri.iter().map(|l| l * top))
                .collect()
        }
        CellType::Pyramid5 => {
            let q = r * s * t / apex_distance(t);
            [
                0.25 * ((1.0 - r) * (1.0 - s) - t + q),
                0.25 * ((1.0 + r) * (1.0 - s) - t - q),
                0.25 * ((1.0 + r) * (1.0 + s) - t + q),
                0.25 * ((1.0 - r) * (1.0 + s) - t - q),
                t,
            ]
            .into_iter()
            .collect()
        }
    }
}

/// The derivatives of the shape functions of `cell_type` w.r.t. the local
/// coordinates, at the local point `xi`.
pub fn shape_derivatives(cell_type: CellType, xi: &Point<Real>) -> ArrayVec<Vector<Real>, 8> {
    let (r, s, t) = (xi.x, xi.y, xi.z);

    match cell_type {
        CellType::Tet4 => [
            Vector::new(-1.0, -1.0, -1.0),
            Vector::x(),
            Vector::y(),
            Vector::z(),
        ]
        .into_iter()
        .collect(),
        CellType::Hex8 => cell_type
            .reference_nodes()
            .iter()
            .map(|n| {
                let (a, b, c) = (1.0 + r * n[0], 1.0 + s * n[1], 1.0 + t * n[2]);
                Vector::new(n[0] * b * c, a * n[1] * c, a * b * n[2]) * 0.125
            })
            .collect(),
        CellType::Wedge6 => {
            let tri = [1.0 - r - s, r, s];
            let dtri = [[-1.0, -1.0], [1.0, 0.0], [0.0, 1.0]];
            let mut result = ArrayVec::new();
            for (factor, dfactor) in [(0.5 * (1.0 - t), -0.5), (0.5 * (1.0 + t), 0.5)] {
                for k in 0..3 {
                    result.push(Vector::new(
                        dtri[k][0] * factor,
                        dtri[k][1] * factor,
                        tri[k] * dfactor,
                    ));
                }
            }
            result
        }
        CellType::Pyramid5 => {
            let d = apex_distance(t);
            let dq = Vector::new(s * t / d, r * t / d, r * s / (d * d));
            [
                Vector::new(-(1.0 - s), -(1.0 - r), -1.0) + dq,
                Vector::new(1.0 - s, -(1.0 + r), -1.0) - dq,
                Vector::new(1.0 + s, 1.0 + r, -1.0) + dq,
                Vector::new(-(1.0 + s), 1.0 - r, -1.0) - dq,
            ]
            .into_iter()
            .map(|v| v * 0.25)
            .chain(core::iter::once(Vector::z()))
            .collect()
        }
    }
}

fn apex_distance(t: Real) -> Real {
    let d = 1.0 - t;
    if d.abs() < PYRAMID_APEX_GUARD {
        PYRAMID_APEX_GUARD.copysign(d)
    } else {
        d
    }
}
