//! Intersections between element edges, element faces and cut sides.

use super::{Side, SidePatch};
use crate::math::{Point, Real};
use crate::predicates::ArithmeticMode;
use arrayvec::ArrayVec;

/// The intersection of a segment with a cut side.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SegmentSideIntersection {
    /// The intersection point.
    pub point: Point<Real>,
    /// The position of the point along the segment, in `[0, 1]`.
    pub edge_fraction: Real,
    /// The index of the side patch containing the point.
    pub patch: usize,
    /// The side corners of the patch triangle containing the point.
    pub triangle: [usize; 3],
    /// The barycentric coordinates of the point in `triangle`.
    pub barycentric: [Real; 3],
}

/// The intersection line of two cut sides.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SideSideIntersection {
    /// The endpoints of the cut line. Both endpoints are equal if the sides
    /// only touch at one point.
    pub segment: [Point<Real>; 2],
    /// The patches of the first and the second side producing this line.
    pub patches: [usize; 2],
}

/// Intersects the segment `[a, b]` with `side`.
///
/// An intersection within `tolerance` of a side edge or corner is reported
/// as lying inside the side. Segments lying in the plane of a patch are
/// ignored by that patch. If several patches are crossed, the first one wins.
pub fn intersect_segment_side(
    a: &Point<Real>,
    b: &Point<Real>,
    side: &Side,
    tolerance: Real,
    mode: ArithmeticMode,
) -> Option<SegmentSideIntersection> {
    side.patches()
        .iter()
        .enumerate()
        .find_map(|(patch_id, patch)| {
            let (point, edge_fraction) = patch.intersect_segment(a, b, tolerance, mode)?;
            let (local, barycentric) = patch.barycentric(&point, tolerance);
            Some(SegmentSideIntersection {
                point,
                edge_fraction,
                patch: patch_id,
                triangle: local.map(|k| patch.corner_ids[k]),
                barycentric,
            })
        })
}

/// Computes the cut lines between two sides.
///
/// Each pair of non-coplanar crossing patches yields one line, the segment
/// joining the two farthest intersections between the edges of one patch
/// and the other patch.
pub fn intersect_sides(
    side1: &Side,
    side2: &Side,
    tolerance: Real,
    mode: ArithmeticMode,
) -> Vec<SideSideIntersection> {
    let mut result = Vec::new();

    for (i1, patch1) in side1.patches().iter().enumerate() {
        for (i2, patch2) in side2.patches().iter().enumerate() {
            if let Some(segment) = intersect_patches(patch1, patch2, tolerance, mode) {
                result.push(SideSideIntersection {
                    segment,
                    patches: [i1, i2],
                });
            }
        }
    }

    result
}

fn intersect_patches(
    patch1: &SidePatch,
    patch2: &SidePatch,
    tolerance: Real,
    mode: ArithmeticMode,
) -> Option<[Point<Real>; 2]> {
    let mut points: ArrayVec<Point<Real>, 16> = ArrayVec::new();
    let mut push_unique = |pt: Point<Real>| {
        if !points.iter().any(|q| (q - pt).norm() <= tolerance) {
            let _ = points.try_push(pt);
        }
    };

    for (edges_of, other) in [(patch1, patch2), (patch2, patch1)] {
        let n = edges_of.corners.len();
        for i in 0..n {
            let a = edges_of.corners[i];
            let b = edges_of.corners[(i + 1) % n];
            if let Some((pt, _)) = other.intersect_segment(&a, &b, tolerance, mode) {
                push_unique(pt);
            }
        }
    }

    match points.len() {
        0 => None,
        1 => Some([points[0], points[0]]),
        _ => {
            let mut best = [points[0], points[1]];
            let mut best_dist = -1.0;
            for (i, a) in points.iter().enumerate() {
                for b in &points[i + 1..] {
                    let dist = (b - a).norm_squared();
                    if dist > best_dist {
                        best_dist = dist;
                        best = [*a, *b];
                    }
                }
            }
            Some(best)
        }
    }
}
