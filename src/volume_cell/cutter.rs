//! Signed functions cutting convex pieces: level-set interpolants and planes.

use super::piece::FaceKind;
use crate::math::{Matrix, Point, Real, Vector};
use crate::point::{PointId, PointRegistry};
use crate::predicates::{orient3d, ArithmeticMode};
use crate::side::{Plane, SideId};
use crate::utils::hashmap::{Entry, HashMap};
use crate::utils::SortedPair;

/// The linear interpolant of nodal level-set values on one tetrahedron of the
/// element decomposition.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct LinearField {
    nodes: [Point<Real>; 4],
    values: [Real; 4],
    det: Real,
    gradient: Vector<Real>,
}

impl LinearField {
    pub fn new(nodes: [Point<Real>; 4], values: [Real; 4], mode: ArithmeticMode) -> Option<Self> {
        let [a, b, c, d] = &nodes;
        let det = orient3d(a, b, c, d, mode);
        let edges = Matrix::from_rows(&[
            (b - a).transpose(),
            (c - a).transpose(),
            (d - a).transpose(),
        ]);
        let jumps = Vector::new(values[1] - values[0], values[2] - values[0], values[3] - values[0]);
        let gradient = edges.try_inverse()? * jumps;

        (det != 0.0).then_some(Self {
            nodes,
            values,
            det,
            gradient,
        })
    }

    /// The interpolated value at `pt`, from barycentric coordinates computed
    /// with [`orient3d`].
    pub fn value(&self, pt: &Point<Real>, mode: ArithmeticMode) -> Real {
        let [a, b, c, d] = &self.nodes;
        let l0 = orient3d(pt, b, c, d, mode);
        let l1 = orient3d(a, pt, c, d, mode);
        let l2 = orient3d(a, b, pt, d, mode);
        let l3 = orient3d(a, b, c, pt, mode);
        (l0 * self.values[0] + l1 * self.values[1] + l2 * self.values[2] + l3 * self.values[3])
            / self.det
    }

    #[inline]
    pub fn gradient(&self) -> Vector<Real> {
        self.gradient
    }
}

/// Identifies a cutting function independently of the piece it is applied
/// to. Values and edge intersections are cached under this key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum CutterKey {
    LevelSet,
    Patch {
        side: SideId,
        patch: usize,
    },
    PatchEdge {
        side: SideId,
        patch: usize,
        edge: usize,
    },
}

#[derive(Copy, Clone, Debug)]
pub(crate) enum CutterShape<'a> {
    Field(&'a LinearField),
    Plane(&'a Plane),
}

/// A signed function splitting pieces along its zero set.
///
/// Pieces are split into a negative and a positive part; the section faces
/// created between them get `section_kind`.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Cutter<'a> {
    pub key: CutterKey,
    pub shape: CutterShape<'a>,
    pub section_kind: FaceKind,
    pub side: Option<SideId>,
    pub tolerance: Real,
}

impl Cutter<'_> {
    pub fn evaluate(&self, pt: &Point<Real>, mode: ArithmeticMode) -> Real {
        match self.shape {
            CutterShape::Field(field) => field.value(pt, mode),
            CutterShape::Plane(plane) => plane.signed_distance(pt, mode),
        }
    }

    /// The direction of increasing values.
    pub fn normal(&self) -> Vector<Real> {
        match self.shape {
            CutterShape::Field(field) => field.gradient(),
            CutterShape::Plane(plane) => plane.normal(),
        }
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        matches!(self.section_kind, FaceKind::Interface(_))
    }
}

/// Caches shared by every split of one element.
pub(crate) struct CutContext<'a> {
    pub registry: &'a PointRegistry,
    pub points: &'a mut HashMap<PointId, Point<Real>>,
    pub mode: ArithmeticMode,
    values: HashMap<(PointId, CutterKey), Real>,
    edge_points: HashMap<(SortedPair<PointId>, CutterKey), PointId>,
}

impl<'a> CutContext<'a> {
    pub fn new(
        registry: &'a PointRegistry,
        points: &'a mut HashMap<PointId, Point<Real>>,
        mode: ArithmeticMode,
    ) -> Self {
        Self {
            registry,
            points,
            mode,
            values: HashMap::default(),
            edge_points: HashMap::default(),
        }
    }

    #[inline]
    pub fn coords(&self, id: PointId) -> Point<Real> {
        match self.points.get(&id) {
            Some(pt) => *pt,
            None => self.registry.coords(id),
        }
    }

    /// The value of `cutter` at a point. The first evaluation at a point is
    /// kept, so that every piece sharing the point classifies it the same way.
    pub fn value(&mut self, id: PointId, cutter: &Cutter) -> Real {
        if let Some(value) = self.values.get(&(id, cutter.key)) {
            return *value;
        }
        let pt = self.coords(id);
        let value = cutter.evaluate(&pt, self.mode);
        let _ = self.values.insert((id, cutter.key), value);
        value
    }

    /// Forces a point to lie on the zero set of a cutter.
    pub fn snap_to_zero(&mut self, id: PointId, cutter: &Cutter) {
        log::trace!("point {:?} reclassified on {:?}", id, cutter.key);
        let _ = self.values.insert((id, cutter.key), 0.0);
    }

    /// The point where `cutter` crosses the edge `(a, b)`, whose endpoints
    /// have values of opposite signs.
    pub fn edge_point(&mut self, a: PointId, b: PointId, cutter: &Cutter) -> PointId {
        let key = (SortedPair::new(a, b), cutter.key);
        if let Some(id) = self.edge_points.get(&key) {
            return *id;
        }

        let (lo, hi) = (key.0.lo(), key.0.hi());
        let (va, vb) = (self.value(lo, cutter), self.value(hi, cutter));
        let (pa, pb) = (self.coords(lo), self.coords(hi));
        let t = (va / (va - vb)).clamp(0.0, 1.0);
        let pt = pa + (pb - pa) * t;

        let id = self
            .registry
            .new_point(&pt, None, cutter.side, self.registry.merge_tolerance());
        self.register(id);

        match self.edge_points.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => *entry.insert(id),
        }
    }

    /// Copies the coordinates of a registry point into the element cache.
    pub fn register(&mut self, id: PointId) {
        if !self.points.contains_key(&id) {
            let pt = self.registry.coords(id);
            let _ = self.points.insert(id, pt);
        }
    }
}
