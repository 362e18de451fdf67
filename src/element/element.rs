use super::{shape_derivatives, shape_functions, CellType};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::error::CutError;
use crate::facet::Facet;
use crate::math::{Matrix, Point, Real, Vector};
use crate::point::{PointId, PointRegistry};
use crate::predicates::{orient3d, ArithmeticMode};
use crate::side::SideId;
use crate::utils::hashmap::HashMap;
use crate::volume_cell::{CutField, Position, VolumeCell};

/// Identifier of a background mesh node, chosen by the caller.
pub type NodeId = i32;
/// Identifier of a background element, chosen by the caller.
pub type ElementId = i32;

/// Convergence threshold of the inverse element mapping, in local coordinates.
const LOCAL_COORDINATES_TOLERANCE: Real = 1.0e-12;
/// Maximum number of Newton iterations of the inverse element mapping.
const LOCAL_COORDINATES_MAX_ITERATIONS: usize = 50;

/// A background element and the result of its cut.
///
/// The element owns its facets and volume cells. Points are shared with the
/// rest of the session through the [`PointRegistry`]; the element keeps a
/// copy of the coordinates of every point it references.
#[derive(Clone, Debug)]
pub struct Element {
    id: ElementId,
    cell_type: CellType,
    node_ids: Vec<NodeId>,
    coords: Vec<Point<Real>>,
    node_points: Vec<PointId>,
    level_set: Option<Vec<Real>>,
    tets: Vec<[usize; 4]>,
    aabb: Aabb,
    pub(crate) cut_sides: Vec<SideId>,
    pub(crate) points: HashMap<PointId, Point<Real>>,
    pub(crate) facets: Vec<Facet>,
    pub(crate) volume_cells: Vec<VolumeCell>,
    pub(crate) is_cut: bool,
}

impl Element {
    /// Validates the element input and registers its nodes.
    ///
    /// Decomposition tetrahedra that are inverted on this element (distorted
    /// geometry) are reordered.
    pub fn new(
        id: ElementId,
        node_ids: &[NodeId],
        coords: &[Point<Real>],
        cell_type: CellType,
        level_set: Option<&[Real]>,
        registry: &PointRegistry,
        mode: ArithmeticMode,
    ) -> Result<Self, CutError> {
        let num_nodes = cell_type.num_nodes();
        let invalid = |reason: &'static str| {
            log::error!("invalid element {} ({:?}): {}", id, cell_type, reason);
            Err(CutError::InvalidElement {
                element: id,
                reason,
            })
        };

        if node_ids.len() != num_nodes {
            return invalid("wrong number of node ids");
        }
        if coords.len() != num_nodes {
            return invalid("wrong number of coordinates");
        }
        if coords.iter().any(|pt| pt.iter().any(|x| !x.is_finite())) {
            return invalid("non-finite coordinates");
        }
        if let Some(values) = level_set {
            if values.len() != num_nodes {
                return invalid("wrong number of level-set values");
            }
            if values.iter().any(|x| !x.is_finite()) {
                return invalid("non-finite level-set values");
            }
        }

        let aabb = Aabb::from_points_ref(coords);
        let scale = aabb.diameter().powi(3);
        let mut tets = Vec::with_capacity(cell_type.tets().len());

        for tet in cell_type.tets() {
            let [a, b, c, d] = tet.map(|i| coords[i]);
            let det = orient3d(&a, &b, &c, &d, mode);

            if det.abs() <= Real::EPSILON * scale {
                return invalid("degenerate decomposition tetrahedron");
            }

            if det < 0.0 {
                log::warn!(
                    "element {}: decomposition tetrahedron {:?} is inverted and was reordered",
                    id,
                    tet
                );
                tets.push([tet[0], tet[2], tet[1], tet[3]]);
            } else {
                tets.push(*tet);
            }
        }

        let merge_tolerance = registry.merge_tolerance();
        let node_points: Vec<_> = node_ids
            .iter()
            .zip(coords)
            .map(|(node, pt)| registry.new_point(pt, Some(*node), None, merge_tolerance))
            .collect();
        let points = node_points
            .iter()
            .map(|id| (*id, registry.coords(*id)))
            .collect();

        Ok(Self {
            id,
            cell_type,
            node_ids: node_ids.to_vec(),
            coords: coords.to_vec(),
            node_points,
            level_set: level_set.map(|values| values.to_vec()),
            tets,
            aabb,
            cut_sides: Vec::new(),
            points,
            facets: Vec::new(),
            volume_cells: Vec::new(),
            is_cut: false,
        })
    }

    /// The id of this element.
    #[inline]
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// The topology of this element.
    #[inline]
    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// The node ids of this element.
    #[inline]
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    /// The node coordinates of this element.
    #[inline]
    pub fn coords(&self) -> &[Point<Real>] {
        &self.coords
    }

    /// The registry points of the element nodes.
    #[inline]
    pub fn node_points(&self) -> &[PointId] {
        &self.node_points
    }

    /// The nodal level-set values, if this element is cut implicitly.
    #[inline]
    pub fn level_set_values(&self) -> Option<&[Real]> {
        self.level_set.as_deref()
    }

    /// The positively oriented tetrahedral decomposition of this element.
    #[inline]
    pub fn tets(&self) -> &[[usize; 4]] {
        &self.tets
    }

    /// The bounding box of this element.
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// The diagonal of the bounding box of this element.
    #[inline]
    pub fn diameter(&self) -> Real {
        self.aabb.diameter()
    }

    /// The volume of this element, i.e., the volume of its tetrahedral
    /// decomposition.
    pub fn volume(&self) -> Real {
        self.tets
            .iter()
            .map(|tet| {
                let [a, b, c, d] = tet.map(|i| self.coords[i]);
                (b - a).dot(&(c - a).cross(&(d - a))) / 6.0
            })
            .sum()
    }

    /// The global coordinates of the local point `xi`.
    pub fn global_coordinates(&self, xi: &Point<Real>) -> Point<Real> {
        let values = shape_functions(self.cell_type, xi);
        let sum = values
            .iter()
            .zip(&self.coords)
            .fold(Vector::zeros(), |acc, (n, pt)| acc + pt.coords * *n);
        Point::from(sum)
    }

    /// The local coordinates of the global point `pt`, computed by Newton
    /// iterations on the element mapping.
    ///
    /// The residual and the Jacobian are evaluated relative to the first node.
    pub fn local_coordinates(&self, pt: &Point<Real>) -> Result<Point<Real>, CutError> {
        let center = self.cell_type.reference_center();
        let mut xi = Point::new(center[0], center[1], center[2]);
        let origin = self.coords[0];
        let target = pt - origin;

        for _ in 0..LOCAL_COORDINATES_MAX_ITERATIONS {
            let mapped = shape_functions(self.cell_type, &xi)
                .iter()
                .zip(&self.coords)
                .fold(Vector::zeros(), |acc, (n, node)| acc + (node - origin) * *n);
            let residual = target - mapped;
            let mut jacobian = Matrix::zeros();
            for (deriv, node) in shape_derivatives(self.cell_type, &xi)
                .iter()
                .zip(&self.coords)
            {
                jacobian += (node - origin) * deriv.transpose();
            }

            let delta = match jacobian.try_inverse() {
                Some(inv) => inv * residual,
                None => break,
            };
            xi += delta;

            if delta.norm() <= LOCAL_COORDINATES_TOLERANCE {
                return Ok(xi);
            }
        }

        log::error!(
            "local coordinates of {:?} in element {} did not converge",
            pt,
            self.id
        );
        Err(CutError::LocalCoordinates {
            element: self.id,
            point: *pt,
        })
    }

    /// Interpolates the nodal level-set at the global point `pt`.
    ///
    /// Returns `None` if this element has no level-set values.
    pub fn level_set_at(&self, pt: &Point<Real>) -> Result<Option<Real>, CutError> {
        match &self.level_set {
            None => Ok(None),
            Some(values) => {
                let xi = self.local_coordinates(pt)?;
                let value = shape_functions(self.cell_type, &xi)
                    .iter()
                    .zip(values)
                    .map(|(n, v)| n * v)
                    .sum();
                Ok(Some(value))
            }
        }
    }

    /// Is this element crossed by at least one interface?
    #[inline]
    pub fn is_cut(&self) -> bool {
        self.is_cut
    }

    /// The cut sides found to cross this element.
    #[inline]
    pub fn cut_sides(&self) -> &[SideId] {
        &self.cut_sides
    }

    /// The facets bounding the volume cells of this element.
    #[inline]
    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    /// The volume cells of this element, in a deterministic order.
    #[inline]
    pub fn volume_cells(&self) -> &[VolumeCell] {
        &self.volume_cells
    }

    /// The coordinates of a point referenced by this element.
    #[inline]
    pub fn point_coords(&self, id: PointId) -> Option<Point<Real>> {
        self.points.get(&id).copied()
    }

    /// The positions of the element nodes w.r.t. `field`.
    ///
    /// A node lying on the interface is [`Position::OnCutSurface`].
    pub fn node_positions(&self, field: CutField) -> Vec<Position> {
        self.node_points
            .iter()
            .map(|id| {
                let on_interface = self.facets.iter().any(|facet| {
                    facet.interface_field() == Some(field) && facet.points().contains(id)
                });
                if on_interface {
                    return Position::OnCutSurface;
                }

                self.volume_cells
                    .iter()
                    .find(|cell| cell.has_vertex(*id))
                    .and_then(|cell| cell.position_for(field))
                    .unwrap_or(Position::Undecided)
            })
            .collect()
    }

    /// The position of an arbitrary point w.r.t. `field`.
    ///
    /// Returns `None` if the point lies outside of the element.
    pub fn point_position(&self, pt: &Point<Real>, field: CutField) -> Option<Position> {
        let tolerance = self.diameter() * 1.0e-10;
        if !self.aabb.loosened(tolerance).contains_point(pt) {
            return None;
        }
        self.volume_cells
            .iter()
            .find(|cell| cell.contains_point(pt, &self.points, tolerance))
            .and_then(|cell| cell.position_for(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distorted_hex() -> [Point<Real>; 8] {
        [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.2, 0.1, 0.0),
            Point::new(1.0, 1.1, 0.1),
            Point::new(-0.1, 0.9, 0.0),
            Point::new(0.1, 0.0, 1.0),
            Point::new(1.0, -0.1, 1.2),
            Point::new(1.1, 1.0, 0.9),
            Point::new(0.0, 1.0, 1.0),
        ]
    }

    #[test]
    fn local_coordinates_invert_the_mapping() {
        let registry = PointRegistry::new(1.0e-12, 1);
        let element = Element::new(
            1,
            &[1, 2, 3, 4, 5, 6, 7, 8],
            &distorted_hex(),
            CellType::Hex8,
            None,
            &registry,
            ArithmeticMode::Adaptive,
        )
        .unwrap();

        let xi = Point::new(0.3, -0.4, 0.8);
        let x = element.global_coordinates(&xi);
        assert_relative_eq!(element.local_coordinates(&x).unwrap(), xi, epsilon = 1.0e-10);
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn local_coordinates_far_from_the_origin() {
        let registry = PointRegistry::new(1.0e-6, 1);
        let shift = Vector::new(5.0e7, -3.0e7, 1.0e7);
        let coords: Vec<_> = distorted_hex().iter().map(|pt| pt * 10.0 + shift).collect();
        let element = Element::new(
            1,
            &[1, 2, 3, 4, 5, 6, 7, 8],
            &coords,
            CellType::Hex8,
            None,
            &registry,
            ArithmeticMode::Adaptive,
        )
        .unwrap();

        let xi = Point::new(-0.2, 0.6, 0.1);
        let x = element.global_coordinates(&xi);
        assert_relative_eq!(element.local_coordinates(&x).unwrap(), xi, epsilon = 1.0e-8);
    }

    #[test]
    fn unit_cube_volume() {
        let registry = PointRegistry::new(1.0e-12, 1);
        let coords = CellType::Hex8
            .reference_nodes()
            .iter()
            .map(|p| Point::new(p[0] * 0.5 + 0.5, p[1] * 0.5 + 0.5, p[2] * 0.5 + 0.5))
            .collect::<Vec<_>>();
        let element = Element::new(
            1,
            &[0, 1, 2, 3, 4, 5, 6, 7],
            &coords,
            CellType::Hex8,
            Some(&[1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0]),
            &registry,
            ArithmeticMode::Adaptive,
        )
        .unwrap();

        assert_relative_eq!(element.volume(), 1.0, epsilon = 1.0e-14);
        let value = element.level_set_at(&Point::new(0.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(value.unwrap(), 1.0, epsilon = 1.0e-12);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let registry = PointRegistry::new(1.0e-12, 1);
        let coords = distorted_hex();

        assert!(matches!(
            Element::new(7, &[1, 2, 3], &coords, CellType::Hex8, None, &registry, ArithmeticMode::Adaptive),
            Err(CutError::InvalidElement { element: 7, .. })
        ));
        assert!(matches!(
            Element::new(
                7,
                &[1, 2, 3, 4, 5, 6, 7, 8],
                &coords,
                CellType::Hex8,
                Some(&[1.0]),
                &registry,
                ArithmeticMode::Adaptive
            ),
            Err(CutError::InvalidElement { element: 7, .. })
        ));

        let flat = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
        ];
        assert!(matches!(
            Element::new(8, &[1, 2, 3, 4], &flat, CellType::Tet4, None, &registry, ArithmeticMode::Adaptive),
            Err(CutError::InvalidElement { element: 8, .. })
        ));
    }

    #[test]
    fn inverted_tets_are_reordered() {
        let registry = PointRegistry::new(1.0e-12, 1);
        let coords = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
        ];
        let element =
            Element::new(1, &[1, 2, 3, 4], &coords, CellType::Tet4, None, &registry, ArithmeticMode::Adaptive)
                .unwrap();

        assert_eq!(element.tets(), &[[0, 2, 1, 3]]);
        assert_relative_eq!(element.volume(), 1.0 / 6.0, epsilon = 1.0e-14);
    }
}
