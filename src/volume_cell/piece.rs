//! Convex pieces of an element and their splitting along cutters.
//!
//! Every piece is a convex polyhedron lying inside one tetrahedron of the
//! element decomposition. Faces shared by two pieces are stored on both of
//! them, as exact reversed copies of each other, so that splitting one piece
//! keeps its neighbors conforming.

use super::cutter::{CutContext, Cutter};
use crate::element::CellType;
use crate::facet::FacetSource;
use crate::math::{Point, Real, Vector};
use crate::point::PointId;
use crate::utils::hashmap::HashMap;
use crate::utils::{newell_normal, vertex_average, PlaneFrame, SortedPair};
use ordered_float::OrderedFloat;
use slab::Slab;
use smallvec::SmallVec;

/// What a piece face lies on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum FaceKind {
    /// A face of the element, given by its index in [`CellType::faces`].
    ElementBoundary(usize),
    /// A face between two pieces that is not part of any interface.
    Internal,
    /// A face lying on a cutting interface.
    Interface(FacetSource),
}

/// A planar convex polygon bounding a piece, counter-clockwise seen from
/// outside of the piece.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PieceFace {
    pub points: Vec<PointId>,
    pub kind: FaceKind,
    pub neighbor: Option<usize>,
}

impl PieceFace {
    fn reversed(&self, neighbor: usize) -> Self {
        Self {
            points: self.points.iter().rev().copied().collect(),
            kind: self.kind,
            neighbor: Some(neighbor),
        }
    }

    fn same_vertices(&self, other: &[PointId]) -> bool {
        if self.points.len() != other.len() {
            return false;
        }
        let mut a: SmallVec<[PointId; 8]> = self.points.iter().copied().collect();
        let mut b: SmallVec<[PointId; 8]> = other.iter().copied().collect();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

/// A convex polyhedron inside one decomposition tetrahedron.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ConvexPiece {
    pub tet: usize,
    pub faces: Vec<PieceFace>,
}

impl ConvexPiece {
    /// The distinct vertices of this piece, sorted.
    pub fn vertices(&self) -> Vec<PointId> {
        let mut result: Vec<_> = self.faces.iter().flat_map(|f| f.points.iter().copied()).collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// The signed volume of this piece, positive if its faces are oriented
    /// outward.
    pub fn volume(&self, coords: &HashMap<PointId, Point<Real>>) -> Real {
        let vertices = self.vertices();
        let pts: Vec<_> = vertices.iter().filter_map(|id| coords.get(id).copied()).collect();
        let center = vertex_average(&pts);

        self.faces
            .iter()
            .map(|face| {
                let face_pts: Vec<_> = face.points.iter().filter_map(|id| coords.get(id)).collect();
                let normal = newell_normal(face_pts.iter().copied());
                let anchor = face_pts.first().map_or(center, |pt| **pt);
                normal.dot(&(anchor - center)) / 6.0
            })
            .sum()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Sign {
    Negative,
    Zero,
    Positive,
}

impl Sign {
    fn of(value: Real, tolerance: Real) -> Self {
        if value < -tolerance {
            Sign::Negative
        } else if value > tolerance {
            Sign::Positive
        } else {
            Sign::Zero
        }
    }

    fn is_opposite(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Sign::Negative, Sign::Positive) | (Sign::Positive, Sign::Negative)
        )
    }
}

/// The result of splitting a piece.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SplitOutcome {
    /// The cutter does not cross the piece.
    Unchanged,
    /// The piece was replaced by its parts on each side of the cutter.
    Split { negative: usize, positive: usize },
}

/// The pieces of one element.
#[derive(Clone, Debug, Default)]
pub(crate) struct PieceSet {
    pieces: Slab<ConvexPiece>,
}

impl PieceSet {
    /// One piece per decomposition tetrahedron of the element.
    ///
    /// Tetrahedron faces made of three nodes of the same element face are
    /// boundary faces; the others are shared with the adjacent tetrahedron.
    pub fn from_tets(cell_type: CellType, tets: &[[usize; 4]], node_points: &[PointId]) -> Self {
        const TET_FACES: [[usize; 3]; 4] = [[0, 1, 3], [1, 2, 3], [0, 3, 2], [0, 2, 1]];

        let mut pieces = Slab::with_capacity(tets.len());
        let mut open_faces: HashMap<[usize; 3], (usize, usize)> = HashMap::default();

        for (tet_id, tet) in tets.iter().enumerate() {
            let piece_id = pieces.vacant_key();
            let mut faces = Vec::with_capacity(4);

            for local in TET_FACES {
                let nodes = local.map(|i| tet[i]);
                let boundary = cell_type
                    .faces()
                    .iter()
                    .position(|face| nodes.iter().all(|n| face.contains(n)));
                let mut neighbor = None;

                if boundary.is_none() {
                    let mut key = nodes;
                    key.sort_unstable();
                    match open_faces.remove(&key) {
                        Some((other, other_face)) => {
                            neighbor = Some(other);
                            let other_piece: &mut ConvexPiece = &mut pieces[other];
                            other_piece.faces[other_face].neighbor = Some(piece_id);
                        }
                        None => {
                            let _ = open_faces.insert(key, (piece_id, faces.len()));
                        }
                    }
                }

                faces.push(PieceFace {
                    points: nodes.iter().map(|n| node_points[*n]).collect(),
                    kind: boundary.map_or(FaceKind::Internal, FaceKind::ElementBoundary),
                    neighbor,
                });
            }

            let _ = pieces.insert(ConvexPiece { tet: tet_id, faces });
        }

        Self { pieces }
    }

    #[inline]
    pub fn get(&self, id: usize) -> Option<&ConvexPiece> {
        self.pieces.get(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// The ids of the current pieces, in increasing order.
    pub fn keys(&self) -> Vec<usize> {
        let mut keys: Vec<_> = self.pieces.iter().map(|(id, _)| id).collect();
        keys.sort_unstable();
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ConvexPiece)> {
        self.pieces.iter()
    }

    /// The values of `cutter` at the vertices of a piece.
    pub fn values(&self, id: usize, cutter: &Cutter, ctx: &mut CutContext) -> Vec<(PointId, Real)> {
        self.pieces
            .get(id)
            .map(|piece| {
                piece
                    .vertices()
                    .into_iter()
                    .map(|v| (v, ctx.value(v, cutter)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Changes the kind of the faces of `id` shared with `neighbor`.
    pub fn set_face_kind(&mut self, id: usize, neighbor: usize, kind: FaceKind) {
        if let Some(piece) = self.pieces.get_mut(id) {
            for face in &mut piece.faces {
                if face.neighbor == Some(neighbor) {
                    face.kind = kind;
                }
            }
        }
    }

    /// Splits a piece along the zero set of `cutter`.
    ///
    /// A piece touching the zero set of an interface cutter with one of its
    /// internal faces, without being crossed, gets that face (and its mirror)
    /// tagged as interface.
    pub fn split(&mut self, id: usize, cutter: &Cutter, ctx: &mut CutContext) -> SplitOutcome {
        loop {
            let Some(piece) = self.pieces.get(id) else {
                return SplitOutcome::Unchanged;
            };

            let signs: HashMap<PointId, Sign> = piece
                .vertices()
                .into_iter()
                .map(|v| (v, Sign::of(ctx.value(v, cutter), cutter.tolerance)))
                .collect();
            let has_negative = signs.values().any(|s| *s == Sign::Negative);
            let has_positive = signs.values().any(|s| *s == Sign::Positive);

            if !has_negative || !has_positive {
                if cutter.is_interface() && (has_negative || has_positive) {
                    self.tag_interface_faces(id, cutter, &signs);
                }
                return SplitOutcome::Unchanged;
            }

            let mut crossings: HashMap<SortedPair<PointId>, PointId> = HashMap::default();
            let mut snapped = false;

            for face in &piece.faces {
                let n = face.points.len();
                for i in 0..n {
                    let (a, b) = (face.points[i], face.points[(i + 1) % n]);
                    if !signs[&a].is_opposite(signs[&b]) {
                        continue;
                    }
                    let pair = SortedPair::new(a, b);
                    if crossings.contains_key(&pair) {
                        continue;
                    }
                    let pt = ctx.edge_point(a, b, cutter);
                    if pt == a || pt == b {
                        ctx.snap_to_zero(pt, cutter);
                        snapped = true;
                    } else {
                        let _ = crossings.insert(pair, pt);
                    }
                }
            }

            if snapped {
                continue;
            }

            let mut section: Vec<PointId> = signs
                .iter()
                .filter(|(_, s)| **s == Sign::Zero)
                .map(|(p, _)| *p)
                .chain(crossings.values().copied())
                .collect();
            section.sort_unstable();
            section.dedup();

            if section.len() < 3 {
                // The crossings collapsed onto fewer than three points: the
                // cutter only grazes the piece, so the side lying closest to
                // the zero set is moved onto it.
                let extent = |side: Sign, ctx: &mut CutContext| {
                    signs
                        .iter()
                        .filter(|(_, s)| **s == side)
                        .map(|(p, _)| ctx.value(*p, cutter).abs())
                        .fold(0.0, Real::max)
                };
                let grazed = if extent(Sign::Negative, ctx) <= extent(Sign::Positive, ctx) {
                    Sign::Negative
                } else {
                    Sign::Positive
                };
                log::debug!(
                    "piece {} has a degenerate section with {:?}, its {:?} vertices are snapped",
                    id,
                    cutter.key,
                    grazed
                );
                for (p, _) in signs.iter().filter(|(_, s)| **s == grazed) {
                    ctx.snap_to_zero(*p, cutter);
                }
                continue;
            }

            return self.split_with(id, cutter, ctx, &signs, &crossings, section);
        }
    }

    fn split_with(
        &mut self,
        id: usize,
        cutter: &Cutter,
        ctx: &mut CutContext,
        signs: &HashMap<PointId, Sign>,
        crossings: &HashMap<SortedPair<PointId>, PointId>,
        section: Vec<PointId>,
    ) -> SplitOutcome {
        let Some(piece) = self.pieces.get(id) else {
            return SplitOutcome::Unchanged;
        };

        let sign_of = |p: &PointId| signs.get(p).copied().unwrap_or(Sign::Zero);
        let mut halves: Vec<(Option<Vec<PointId>>, Option<Vec<PointId>>)> =
            Vec::with_capacity(piece.faces.len());

        for face in &piece.faces {
            let n = face.points.len();
            let mut negative = Vec::with_capacity(n + 2);
            let mut positive = Vec::with_capacity(n + 2);

            for i in 0..n {
                let (a, b) = (face.points[i], face.points[(i + 1) % n]);
                match sign_of(&a) {
                    Sign::Negative => negative.push(a),
                    Sign::Positive => positive.push(a),
                    Sign::Zero => {
                        negative.push(a);
                        positive.push(a);
                    }
                }
                if sign_of(&a).is_opposite(sign_of(&b)) {
                    if let Some(pt) = crossings.get(&SortedPair::new(a, b)) {
                        negative.push(*pt);
                        positive.push(*pt);
                    }
                }
            }

            let keep = |mut loop_: Vec<PointId>, side: Sign| {
                dedup_cyclic(&mut loop_);
                (loop_.len() >= 3 && loop_.iter().any(|p| sign_of(p) == side)).then_some(loop_)
            };
            halves.push((keep(negative, Sign::Negative), keep(positive, Sign::Positive)));
        }

        for p in &section {
            ctx.register(*p);
        }
        let section = sort_around(section, &cutter.normal(), ctx);

        let tet = piece.tet;
        let parent = self.pieces.remove(id);

        let mut negative_faces = Vec::with_capacity(parent.faces.len() + 1);
        let mut positive_faces = Vec::with_capacity(parent.faces.len() + 1);
        for (face, (negative, positive)) in parent.faces.iter().zip(&halves) {
            if let Some(points) = negative {
                negative_faces.push(PieceFace {
                    points: points.clone(),
                    kind: face.kind,
                    neighbor: face.neighbor,
                });
            }
            if let Some(points) = positive {
                positive_faces.push(PieceFace {
                    points: points.clone(),
                    kind: face.kind,
                    neighbor: face.neighbor,
                });
            }
        }

        negative_faces.push(PieceFace {
            points: section.clone(),
            kind: cutter.section_kind,
            neighbor: None,
        });
        let negative = self.pieces.insert(ConvexPiece {
            tet,
            faces: negative_faces,
        });

        positive_faces.push(PieceFace {
            points: section.into_iter().rev().collect(),
            kind: cutter.section_kind,
            neighbor: Some(negative),
        });
        let positive = self.pieces.insert(ConvexPiece {
            tet,
            faces: positive_faces,
        });

        if let Some(face) = self.pieces[negative].faces.last_mut() {
            face.neighbor = Some(positive);
        }

        for (face, (neg_half, pos_half)) in parent.faces.iter().zip(&halves) {
            let Some(other) = face.neighbor else {
                continue;
            };
            let Some(other_piece) = self.pieces.get_mut(other) else {
                continue;
            };

            let slot = other_piece
                .faces
                .iter()
                .position(|f| f.neighbor == Some(id) && f.same_vertices(&face.points));
            let Some(slot) = slot else {
                log::warn!("piece {} lost the mirror of a face shared with piece {}", other, id);
                continue;
            };

            let _ = other_piece.faces.remove(slot);
            if let Some(points) = neg_half {
                let half = PieceFace {
                    points: points.clone(),
                    kind: face.kind,
                    neighbor: None,
                };
                other_piece.faces.push(half.reversed(negative));
            }
            if let Some(points) = pos_half {
                let half = PieceFace {
                    points: points.clone(),
                    kind: face.kind,
                    neighbor: None,
                };
                other_piece.faces.push(half.reversed(positive));
            }
        }

        SplitOutcome::Split { negative, positive }
    }

    fn tag_interface_faces(&mut self, id: usize, cutter: &Cutter, signs: &HashMap<PointId, Sign>) {
        let Some(piece) = self.pieces.get_mut(id) else {
            return;
        };

        let mut mirrors = Vec::new();
        for face in &mut piece.faces {
            let on_zero_set = face
                .points
                .iter()
                .all(|p| signs.get(p) == Some(&Sign::Zero));
            if on_zero_set && face.kind == FaceKind::Internal {
                face.kind = cutter.section_kind;
                if let Some(other) = face.neighbor {
                    mirrors.push((other, face.points.clone()));
                }
            }
        }

        for (other, points) in mirrors {
            if let Some(other_piece) = self.pieces.get_mut(other) {
                for face in &mut other_piece.faces {
                    if face.neighbor == Some(id) && face.same_vertices(&points) {
                        face.kind = cutter.section_kind;
                    }
                }
            }
        }
    }
}

fn dedup_cyclic(points: &mut Vec<PointId>) {
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        let _ = points.pop();
    }
}

/// Sorts coplanar points counter-clockwise around `normal`.
fn sort_around(points: Vec<PointId>, normal: &Vector<Real>, ctx: &CutContext) -> Vec<PointId> {
    let coords: Vec<_> = points.iter().map(|p| ctx.coords(*p)).collect();
    let normal = normal.try_normalize(0.0).unwrap_or_else(Vector::z);
    let frame = PlaneFrame::new(vertex_average(&coords), normal);

    let mut keyed: Vec<_> = points
        .into_iter()
        .zip(&coords)
        .map(|(p, pt)| {
            let local = frame.to_local(pt);
            (OrderedFloat(local.y.atan2(local.x)), p)
        })
        .collect();
    keyed.sort();
    keyed.into_iter().map(|(_, p)| p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::PointRegistry;
    use crate::predicates::ArithmeticMode;
    use crate::side::Plane;
    use crate::volume_cell::cutter::{CutterKey, CutterShape};

    fn unit_tet(registry: &PointRegistry) -> (PieceSet, HashMap<PointId, Point<Real>>) {
        let pts = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
        ];
        let ids: Vec<_> = pts
            .iter()
            .map(|pt| registry.new_point(pt, None, None, 0.0))
            .collect();
        let coords = ids.iter().zip(&pts).map(|(id, pt)| (*id, *pt)).collect();
        (PieceSet::from_tets(CellType::Tet4, &[[0, 1, 2, 3]], &ids), coords)
    }

    #[test]
    fn single_tet_faces_are_outward_boundary_faces() {
        let registry = PointRegistry::new(1.0e-12, 4);
        let (pieces, coords) = unit_tet(&registry);
        let piece = pieces.get(0).unwrap();

        assert_eq!(piece.faces.len(), 4);
        assert!(piece
            .faces
            .iter()
            .all(|f| matches!(f.kind, FaceKind::ElementBoundary(_)) && f.neighbor.is_none()));
        assert_relative_eq!(piece.volume(&coords), 1.0 / 6.0, epsilon = 1.0e-14);
    }

    #[test]
    fn plane_split_conserves_volume() {
        let registry = PointRegistry::new(1.0e-12, 4);
        let (mut pieces, mut coords) = unit_tet(&registry);
        let plane = Plane::from_point_normal(Point::new(0.3, 0.0, 0.0), &Vector::x()).unwrap();
        let cutter = Cutter {
            key: CutterKey::Patch { side: 7, patch: 0 },
            shape: CutterShape::Plane(&plane),
            section_kind: FaceKind::Interface(FacetSource::CutSide(7)),
            side: Some(7),
            tolerance: 1.0e-10,
        };

        let outcome = {
            let mut ctx = CutContext::new(&registry, &mut coords, ArithmeticMode::Adaptive);
            pieces.split(0, &cutter, &mut ctx)
        };
        let SplitOutcome::Split { negative, positive } = outcome else {
            panic!("the plane crosses the tetrahedron");
        };

        let v_neg = pieces.get(negative).unwrap().volume(&coords);
        let v_pos = pieces.get(positive).unwrap().volume(&coords);
        assert_relative_eq!(v_neg + v_pos, 1.0 / 6.0, epsilon = 1.0e-14);
        assert_relative_eq!(v_pos, 0.7f64.powi(3) / 6.0, epsilon = 1.0e-14);

        let section = pieces.get(negative).unwrap().faces.last().unwrap();
        assert_eq!(section.neighbor, Some(positive));
        assert_eq!(section.points.len(), 3);
        let pts: Vec<_> = section.points.iter().map(|p| coords[p]).collect();
        assert!(newell_normal(&pts).x > 0.0);
    }

    #[test]
    fn plane_through_vertices_only_touches() {
        let registry = PointRegistry::new(1.0e-12, 4);
        let (mut pieces, mut coords) = unit_tet(&registry);
        let plane = Plane::from_point_normal(Point::origin(), &Vector::x()).unwrap();
        let cutter = Cutter {
            key: CutterKey::Patch { side: 1, patch: 0 },
            shape: CutterShape::Plane(&plane),
            section_kind: FaceKind::Interface(FacetSource::CutSide(1)),
            side: Some(1),
            tolerance: 1.0e-10,
        };

        let mut ctx = CutContext::new(&registry, &mut coords, ArithmeticMode::Adaptive);
        assert_eq!(pieces.split(0, &cutter, &mut ctx), SplitOutcome::Unchanged);
        assert_eq!(pieces.len(), 1);
    }

    #[test]
    fn grazing_cutter_snaps_the_closest_vertices() {
        // A sliver whose three crossings with the plane merge into one point.
        let delta = 1.0e-6;
        let registry = PointRegistry::new(0.7 * delta, 4);
        let pts = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, delta, 0.0),
            Point::new(0.0, 0.0, delta),
        ];
        let ids: Vec<_> = pts
            .iter()
            .map(|pt| registry.new_point(pt, None, None, 0.0))
            .collect();
        let mut coords = ids.iter().zip(&pts).map(|(id, pt)| (*id, *pt)).collect();
        let mut pieces = PieceSet::from_tets(CellType::Tet4, &[[0, 1, 2, 3]], &ids);

        let plane = Plane::from_point_normal(Point::new(0.6, 0.0, 0.0), &Vector::x()).unwrap();
        let cutter = Cutter {
            key: CutterKey::Patch { side: 2, patch: 0 },
            shape: CutterShape::Plane(&plane),
            section_kind: FaceKind::Interface(FacetSource::CutSide(2)),
            side: Some(2),
            tolerance: 1.0e-12,
        };

        let mut ctx = CutContext::new(&registry, &mut coords, ArithmeticMode::Adaptive);
        assert_eq!(pieces.split(0, &cutter, &mut ctx), SplitOutcome::Unchanged);
        assert_eq!(pieces.len(), 1);
        assert_eq!(ctx.value(ids[1], &cutter), 0.0);
        assert!(ctx.value(ids[0], &cutter) < 0.0);
    }
}
