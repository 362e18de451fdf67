use super::{CutField, Position, Positions};
use crate::element::ElementId;
use crate::gauss::{BoundaryCell, GaussPoint, IntegrationCell};
use crate::math::{Point, Real};
use crate::options::VCellGaussPts;
use crate::point::PointId;
use crate::utils::hashmap::HashMap;
use crate::utils::newell_normal;

/// A connected region of an element lying on one side of every interface.
///
/// A volume cell is the union of convex pieces. Its boundary is described by
/// the [`Facet`](crate::facet::Facet)s of its element listed in
/// [`VolumeCell::facets`]. Quadrature data is available once the session is
/// finalized.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeCell {
    index: usize,
    element: ElementId,
    pub(crate) facets: Vec<usize>,
    pub(crate) pieces: Vec<Vec<Vec<PointId>>>,
    vertices: Vec<PointId>,
    geometric_volume: Real,
    pub(crate) positions: Positions,
    pub(crate) integration_cells: Vec<IntegrationCell>,
    pub(crate) gauss_points: Vec<GaussPoint>,
    pub(crate) boundary_cells: Vec<BoundaryCell>,
    pub(crate) volume: Option<Real>,
    pub(crate) strategy: Option<VCellGaussPts>,
    pub(crate) is_simple: bool,
}

impl VolumeCell {
    pub(crate) fn new(
        index: usize,
        element: ElementId,
        pieces: Vec<Vec<Vec<PointId>>>,
        geometric_volume: Real,
    ) -> Self {
        let mut vertices: Vec<_> = pieces.iter().flatten().flatten().copied().collect();
        vertices.sort_unstable();
        vertices.dedup();

        Self {
            index,
            element,
            facets: Vec::new(),
            pieces,
            vertices,
            geometric_volume,
            positions: Positions::new(),
            integration_cells: Vec::new(),
            gauss_points: Vec::new(),
            boundary_cells: Vec::new(),
            volume: None,
            strategy: None,
            is_simple: false,
        }
    }

    /// The index of this cell in its element.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The element this cell belongs to.
    #[inline]
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Indices of the facets bounding this cell, into
    /// [`Element::facets`](crate::element::Element::facets).
    #[inline]
    pub fn facets(&self) -> &[usize] {
        &self.facets
    }

    /// The corners of this cell, sorted.
    #[inline]
    pub fn vertices(&self) -> &[PointId] {
        &self.vertices
    }

    /// Is `id` a corner of this cell?
    #[inline]
    pub fn has_vertex(&self, id: PointId) -> bool {
        self.vertices.binary_search(&id).is_ok()
    }

    /// The convex pieces this cell is made of, as lists of outward oriented
    /// faces.
    #[inline]
    pub fn pieces(&self) -> &[Vec<Vec<PointId>>] {
        &self.pieces
    }

    /// The position of this cell w.r.t. the first field of the session.
    pub fn position(&self) -> Position {
        self.positions
            .first()
            .map_or(Position::Undecided, |(_, position)| *position)
    }

    /// The position of this cell w.r.t. `field`, if the session is cut by it.
    pub fn position_for(&self, field: CutField) -> Option<Position> {
        self.positions
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, position)| *position)
    }

    /// The position of this cell w.r.t. every field of the session.
    #[inline]
    pub fn positions(&self) -> &[(CutField, Position)] {
        &self.positions
    }

    pub(crate) fn set_position(&mut self, field: CutField, position: Position) {
        match self.positions.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = position,
            None => self.positions.push((field, position)),
        }
    }

    /// The volume quadrature of this cell.
    #[inline]
    pub fn gauss_points(&self) -> &[GaussPoint] {
        &self.gauss_points
    }

    /// The tetrahedra of the tessellation of this cell, if it was integrated
    /// by tessellation.
    #[inline]
    pub fn integration_cells(&self) -> &[IntegrationCell] {
        &self.integration_cells
    }

    /// The quadrature of the interface facets of this cell.
    #[inline]
    pub fn boundary_cells(&self) -> &[BoundaryCell] {
        &self.boundary_cells
    }

    /// The quadrature strategy used for this cell, once finalized.
    #[inline]
    pub fn strategy(&self) -> Option<VCellGaussPts> {
        self.strategy
    }

    /// Is this cell the whole element, integrated on the element
    /// decomposition directly?
    #[inline]
    pub fn is_simple(&self) -> bool {
        self.is_simple
    }

    /// The volume of this cell.
    ///
    /// Once finalized this is the sum of the quadrature weights, otherwise it
    /// is computed from the pieces.
    pub fn volume(&self) -> Real {
        self.volume.unwrap_or(self.geometric_volume)
    }

    /// Does `pt` lie inside this cell, up to `tolerance`?
    pub fn contains_point(
        &self,
        pt: &Point<Real>,
        coords: &HashMap<PointId, Point<Real>>,
        tolerance: Real,
    ) -> bool {
        self.pieces.iter().any(|faces| {
            faces.iter().all(|face| {
                let pts: Vec<_> = face.iter().filter_map(|id| coords.get(id).copied()).collect();
                let Some(anchor) = pts.first() else {
                    return true;
                };
                match newell_normal(&pts).try_normalize(0.0) {
                    Some(normal) => normal.dot(&(pt - anchor)) <= tolerance,
                    None => true,
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tet_cell() -> (VolumeCell, HashMap<PointId, Point<Real>>) {
        let coords = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, pt)| (PointId(i as u32), pt))
        .collect();
        let faces = [[0, 1, 3], [1, 2, 3], [0, 3, 2], [0, 2, 1]]
            .iter()
            .map(|f| f.iter().map(|i| PointId(*i)).collect())
            .collect();

        (VolumeCell::new(0, 3, vec![faces], 1.0 / 6.0), coords)
    }

    #[test]
    fn point_containment() {
        let (cell, coords) = unit_tet_cell();
        assert!(cell.contains_point(&Point::new(0.1, 0.1, 0.1), &coords, 1.0e-12));
        assert!(cell.contains_point(&Point::new(0.0, 0.5, 0.5), &coords, 1.0e-12));
        assert!(!cell.contains_point(&Point::new(0.5, 0.5, 0.5), &coords, 1.0e-12));
        assert!(cell.has_vertex(PointId(2)));
        assert!(!cell.has_vertex(PointId(4)));
    }

    #[test]
    fn positions_are_per_field() {
        let (mut cell, _) = unit_tet_cell();
        assert_eq!(cell.position(), Position::Undecided);

        cell.set_position(CutField::LevelSet, Position::Inside);
        cell.set_position(CutField::Sides, Position::Outside);
        cell.set_position(CutField::LevelSet, Position::OnCutSurface);

        assert_eq!(cell.position(), Position::OnCutSurface);
        assert_eq!(cell.position_for(CutField::Sides), Some(Position::Outside));
        assert_eq!(cell.positions().len(), 2);
        assert_relative_eq!(cell.volume(), 1.0 / 6.0);
    }
}
