use super::Plane;
use crate::bounding_volume::Aabb;
use crate::element::NodeId;
use crate::error::CutError;
use crate::math::{Point, Real, Vector};
use crate::point::PointId;
use crate::predicates::ArithmeticMode;
use crate::utils::{newell_normal, polygon_area, PlaneFrame};
use arrayvec::ArrayVec;

/// Identifier of a cut side, chosen by the caller.
pub type SideId = i32;

/// The geometry type of a cut side.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum SideType {
    /// A linear triangle.
    Tri3,
    /// A bilinear quadrilateral.
    Quad4,
}

impl SideType {
    /// The number of corner nodes of this side type.
    #[inline]
    pub fn num_nodes(self) -> usize {
        match self {
            SideType::Tri3 => 3,
            SideType::Quad4 => 4,
        }
    }
}

/// A planar convex piece of a cut side.
///
/// Triangles and planar convex quadrilaterals are a single patch. Warped or
/// non-convex quadrilaterals are represented by two triangular patches.
#[derive(Clone, Debug, PartialEq)]
pub struct SidePatch {
    /// The side this patch belongs to.
    pub side: SideId,
    /// Indices of the patch corners among the side corners, counter-clockwise
    /// around the side normal.
    pub corner_ids: ArrayVec<usize, 4>,
    /// The patch corners.
    pub corners: ArrayVec<Point<Real>, 4>,
    /// The supporting plane, oriented like the side.
    pub plane: Plane,
}

impl SidePatch {
    fn new(side: SideId, coords: &[Point<Real>], corner_ids: &[usize]) -> Option<Self> {
        let corners: ArrayVec<_, 4> = corner_ids.iter().map(|i| coords[*i]).collect();
        let plane = if corners.len() == 3 {
            Plane::from_points(corners[0], corners[1], corners[2])?
        } else {
            let normal = newell_normal(&corners);
            let center = crate::utils::vertex_average(&corners);
            Plane::from_point_normal(center, &normal)?
        };

        Some(Self {
            side,
            corner_ids: corner_ids.iter().copied().collect(),
            corners,
            plane,
        })
    }

    /// The unit normal of this patch.
    #[inline]
    pub fn normal(&self) -> Vector<Real> {
        self.plane.normal()
    }

    /// The area of this patch.
    pub fn area(&self) -> Real {
        polygon_area(&self.corners)
    }

    /// An orthonormal frame of the patch plane, centered on its first corner.
    pub fn frame(&self) -> PlaneFrame {
        PlaneFrame::new(self.corners[0], self.normal())
    }

    /// The planes through each edge of this patch, orthogonal to the patch
    /// and oriented outward.
    ///
    /// The `i`-th plane contains the edge from corner `i` to corner `i + 1`.
    pub fn edge_planes(&self) -> ArrayVec<Plane, 4> {
        let normal = self.normal();
        let n = self.corners.len();
        (0..n)
            .filter_map(|i| {
                let a = self.corners[i];
                let b = self.corners[(i + 1) % n];
                let lift = normal * (b - a).norm();
                Plane::from_points(a, b, a + lift)
            })
            .collect()
    }

    /// Does `pt` lie inside this patch, once projected on its plane, up to
    /// `tolerance`?
    pub fn contains_projected_point(
        &self,
        pt: &Point<Real>,
        tolerance: Real,
        mode: ArithmeticMode,
    ) -> bool {
        self.edge_planes()
            .iter()
            .all(|plane| plane.signed_distance(pt, mode) <= tolerance)
    }

    /// Intersects the segment `[a, b]` with this patch.
    ///
    /// Returns the intersection point and its fraction along the segment.
    /// Segments lying in the patch plane do not intersect it.
    pub fn intersect_segment(
        &self,
        a: &Point<Real>,
        b: &Point<Real>,
        tolerance: Real,
        mode: ArithmeticMode,
    ) -> Option<(Point<Real>, Real)> {
        let da = self.plane.signed_distance(a, mode);
        let db = self.plane.signed_distance(b, mode);

        if da.abs() <= tolerance && db.abs() <= tolerance {
            return None;
        }
        if (da > tolerance && db > tolerance) || (da < -tolerance && db < -tolerance) {
            return None;
        }

        let t = if da.abs() <= tolerance {
            0.0
        } else if db.abs() <= tolerance {
            1.0
        } else {
            (da / (da - db)).clamp(0.0, 1.0)
        };
        let pt = a + (b - a) * t;

        if self.contains_projected_point(&pt, tolerance, mode) {
            Some((pt, t))
        } else {
            None
        }
    }

    /// The barycentric coordinates of `pt` in one of the triangles fanned
    /// from the first patch corner.
    ///
    /// Returns the local corner indices of that triangle and the coordinates.
    pub fn barycentric(&self, pt: &Point<Real>, tolerance: Real) -> ([usize; 3], [Real; 3]) {
        let normal = self.normal();
        let mut best = ([0, 1, 2], [1.0, 0.0, 0.0]);
        let mut best_min = -Real::MAX;

        for i in 1..self.corners.len() - 1 {
            let ids = [0, i, i + 1];
            let [a, b, c] = ids.map(|k| self.corners[k]);
            let total = (b - a).cross(&(c - a)).dot(&normal);
            if total.abs() <= Real::EPSILON {
                continue;
            }
            let la = (b - pt).cross(&(c - pt)).dot(&normal) / total;
            let lb = (c - pt).cross(&(a - pt)).dot(&normal) / total;
            let lc = 1.0 - la - lb;
            let lowest = la.min(lb).min(lc);

            if lowest >= -tolerance {
                return (ids, [la, lb, lc]);
            }
            if lowest > best_min {
                best_min = lowest;
                best = (ids, [la, lb, lc]);
            }
        }

        best
    }
}

/// A cut side: an explicit patch of the cutting surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Side {
    id: SideId,
    side_type: SideType,
    node_ids: ArrayVec<NodeId, 4>,
    coords: ArrayVec<Point<Real>, 4>,
    points: ArrayVec<PointId, 4>,
    patches: ArrayVec<SidePatch, 2>,
    aabb: Aabb,
}

impl Side {
    /// Builds a cut side from its corner nodes.
    ///
    /// `tolerance` is the absolute distance used by the planarity check of
    /// quadrilaterals. Corners closer than `tolerance` and collinear corners
    /// are rejected.
    pub fn new(
        id: SideId,
        node_ids: &[NodeId],
        coords: &[Point<Real>],
        side_type: SideType,
        tolerance: Real,
    ) -> Result<Self, CutError> {
        let num_nodes = side_type.num_nodes();
        if node_ids.len() != num_nodes {
            return Err(CutError::InvalidSide {
                side: id,
                reason: "wrong number of node ids",
            });
        }
        if coords.len() != num_nodes {
            return Err(CutError::InvalidSide {
                side: id,
                reason: "wrong number of coordinates",
            });
        }

        for i in 0..num_nodes {
            for j in i + 1..num_nodes {
                if (coords[i] - coords[j]).norm() <= tolerance {
                    log::error!("cut side {} has coincident corners: {:?}", id, coords);
                    return Err(CutError::InvalidSide {
                        side: id,
                        reason: "coincident corners",
                    });
                }
            }
        }

        let mut side = Side {
            id,
            side_type,
            node_ids: node_ids.iter().copied().collect(),
            coords: coords.iter().copied().collect(),
            points: ArrayVec::new(),
            patches: ArrayVec::new(),
            aabb: Aabb::from_points_ref(coords),
        };

        let split = match side_type {
            SideType::Tri3 => None,
            SideType::Quad4 => {
                if !side.is_planar(tolerance) {
                    log::warn!("quad side {} is not planar, split into two triangles", id);
                    Some(side.shorter_diagonal_split())
                } else if let Some(reflex) = side.reflex_corner() {
                    log::warn!("quad side {} is not convex, split into two triangles", id);
                    Some([
                        [reflex, (reflex + 1) % 4, (reflex + 2) % 4],
                        [reflex, (reflex + 2) % 4, (reflex + 3) % 4],
                    ])
                } else {
                    None
                }
            }
        };

        let patches: Option<ArrayVec<_, 2>> = match split {
            None => {
                let all: ArrayVec<usize, 4> = (0..num_nodes).collect();
                SidePatch::new(id, coords, &all).map(|patch| [patch].into_iter().collect())
            }
            Some(triangles) => triangles
                .iter()
                .map(|tri| SidePatch::new(id, coords, tri))
                .collect(),
        };

        match patches {
            Some(patches) => {
                side.patches = patches;
                Ok(side)
            }
            None => {
                log::error!("cut side {} is degenerate: {:?}", id, coords);
                Err(CutError::InvalidSide {
                    side: id,
                    reason: "collinear corners",
                })
            }
        }
    }

    /// The id of this side.
    #[inline]
    pub fn id(&self) -> SideId {
        self.id
    }

    /// The geometry type of this side.
    #[inline]
    pub fn side_type(&self) -> SideType {
        self.side_type
    }

    /// The corner node ids.
    #[inline]
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    /// The corner coordinates.
    #[inline]
    pub fn coords(&self) -> &[Point<Real>] {
        &self.coords
    }

    /// The registry points of the corners. Empty until the side is added to
    /// a cutting session.
    #[inline]
    pub fn points(&self) -> &[PointId] {
        &self.points
    }

    pub(crate) fn set_points(&mut self, points: impl IntoIterator<Item = PointId>) {
        self.points = points.into_iter().collect();
    }

    /// The planar patches covering this side.
    #[inline]
    pub fn patches(&self) -> &[SidePatch] {
        &self.patches
    }

    /// The bounding box of this side.
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// The length of the longest distance between two corners.
    pub fn diameter(&self) -> Real {
        let mut diameter: Real = 0.0;
        for (i, a) in self.coords.iter().enumerate() {
            for b in &self.coords[i + 1..] {
                diameter = diameter.max((b - a).norm());
            }
        }
        diameter
    }

    /// The unit normal of this side, following the corner ordering
    /// `(p1 - p0) x (p2 - p0)` for triangles and the Newell normal for quads.
    pub fn normal(&self) -> Vector<Real> {
        newell_normal(&self.coords)
            .try_normalize(0.0)
            .unwrap_or_else(Vector::zeros)
    }

    /// Are all corners within `tolerance` of the plane through their average
    /// orthogonal to the side normal?
    pub fn is_planar(&self, tolerance: Real) -> bool {
        let normal = self.normal();
        let center = crate::utils::vertex_average(&self.coords);
        self.coords
            .iter()
            .all(|pt| (pt - center).dot(&normal).abs() <= tolerance)
    }

    /// Does every corner turn in the direction of the side normal?
    pub fn is_convex(&self) -> bool {
        self.reflex_corner().is_none()
    }

    fn reflex_corner(&self) -> Option<usize> {
        let normal = newell_normal(&self.coords);
        let n = self.coords.len();
        (0..n).find(|i| {
            let prev = self.coords[(i + n - 1) % n];
            let curr = self.coords[*i];
            let next = self.coords[(i + 1) % n];
            (curr - prev).cross(&(next - curr)).dot(&normal) <= 0.0
        })
    }

    fn shorter_diagonal_split(&self) -> [[usize; 3]; 2] {
        let d02 = (self.coords[2] - self.coords[0]).norm_squared();
        let d13 = (self.coords[3] - self.coords[1]).norm_squared();
        if d02 <= d13 {
            [[0, 1, 2], [0, 2, 3]]
        } else {
            [[1, 2, 3], [1, 3, 0]]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square(z3: Real) -> [Point<Real>; 4] {
        [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, z3),
        ]
    }

    #[test]
    fn planar_quad_is_a_single_patch() {
        let side = Side::new(1, &[1, 2, 3, 4], &unit_square(0.0), SideType::Quad4, 1.0e-10).unwrap();
        assert!(side.is_planar(1.0e-10));
        assert!(side.is_convex());
        assert_eq!(side.patches().len(), 1);
        assert_relative_eq!(side.normal(), Vector::z());
        assert_relative_eq!(side.patches()[0].area(), 1.0, epsilon = 1.0e-14);
    }

    #[test]
    fn warped_quad_is_split_along_the_shorter_diagonal() {
        let mut coords = unit_square(0.3);
        coords[2] = Point::new(1.5, 1.5, 0.0);
        let side = Side::new(1, &[1, 2, 3, 4], &coords, SideType::Quad4, 1.0e-10).unwrap();
        assert!(!side.is_planar(1.0e-10));
        assert_eq!(side.patches().len(), 2);
        assert_eq!(side.patches()[0].corner_ids.as_slice(), &[1, 2, 3]);
        assert_eq!(side.patches()[1].corner_ids.as_slice(), &[1, 3, 0]);
    }

    #[test]
    fn degenerate_sides_are_rejected() {
        let collinear = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
        ];
        assert!(matches!(
            Side::new(3, &[1, 2, 3], &collinear, SideType::Tri3, 1.0e-10),
            Err(CutError::InvalidSide { side: 3, .. })
        ));
        assert!(matches!(
            Side::new(3, &[1, 2], &collinear[..2], SideType::Tri3, 1.0e-10),
            Err(CutError::InvalidSide { side: 3, .. })
        ));
    }

    #[test]
    fn patch_edge_planes_point_outward() {
        let side = Side::new(1, &[1, 2, 3, 4], &unit_square(0.0), SideType::Quad4, 1.0e-10).unwrap();
        let patch = &side.patches()[0];
        let mode = ArithmeticMode::Adaptive;

        for plane in patch.edge_planes() {
            assert!(plane.signed_distance(&Point::new(0.5, 0.5, 0.0), mode) < 0.0);
        }
        assert!(patch.contains_projected_point(&Point::new(0.5, 0.5, 3.0), 0.0, mode));
        assert!(!patch.contains_projected_point(&Point::new(1.5, 0.5, 0.0), 0.0, mode));
    }
}
