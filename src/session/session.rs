use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::element::{CellType, Element, ElementId, NodeId};
use crate::error::CutError;
use crate::gauss::finalize_element;
use crate::math::{Point, Real};
use crate::options::{BCellGaussPts, Options, VCellGaussPts};
use crate::point::PointRegistry;
use crate::predicates::{orient3d, ArithmeticMode};
use crate::side::{intersect_segment_side, intersect_sides, Side, SideId, SideType};
use crate::utils::hashmap::HashMap;
use crate::volume_cell::{cut_element, CutField, Position};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// The interfaces a cutting session is cut by.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum IntersectionKind {
    /// Explicit cut sides only.
    Sides,
    /// The nodal level-set field only.
    LevelSet,
    /// The level-set field and the cut sides.
    Combined,
}

impl IntersectionKind {
    /// The fields of this kind, in the order volume cell positions are
    /// reported.
    pub fn fields(self) -> &'static [CutField] {
        match self {
            IntersectionKind::Sides => &[CutField::Sides],
            IntersectionKind::LevelSet => &[CutField::LevelSet],
            IntersectionKind::Combined => &[CutField::LevelSet, CutField::Sides],
        }
    }

    /// Does this kind cut by the level-set field?
    #[inline]
    pub fn has_level_set(self) -> bool {
        self != IntersectionKind::Sides
    }

    /// Does this kind cut by explicit sides?
    #[inline]
    pub fn has_sides(self) -> bool {
        self != IntersectionKind::LevelSet
    }
}

type SideEnvelope = GeomWithData<Rectangle<[Real; 3]>, usize>;

/// A set of background elements cut by a level-set field and/or a mesh of
/// cut sides.
///
/// Elements and sides are added first, then [`CutSession::cut`] computes the
/// facets and volume cells of every element, and
/// [`CutSession::cut_finalize`] generates their quadrature rules.
///
/// All the points created by the session are shared through its
/// [`PointRegistry`], so elements sharing a face also share the points
/// created on that face.
pub struct CutSession {
    kind: IntersectionKind,
    options: Options,
    registry: PointRegistry,
    elements: Vec<Element>,
    element_ids: HashMap<ElementId, usize>,
    sides: Vec<Side>,
    side_ids: HashMap<SideId, usize>,
    is_cut: bool,
}

impl CutSession {
    /// Creates an empty session.
    pub fn new(kind: IntersectionKind, options: Options) -> Self {
        Self {
            kind,
            options,
            registry: PointRegistry::new(options.merge_tolerance, options.registry_partitions),
            elements: Vec::new(),
            element_ids: HashMap::default(),
            sides: Vec::new(),
            side_ids: HashMap::default(),
            is_cut: false,
        }
    }

    /// The interfaces this session is cut by.
    #[inline]
    pub fn kind(&self) -> IntersectionKind {
        self.kind
    }

    /// The options of this session.
    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The points of this session.
    #[inline]
    pub fn registry(&self) -> &PointRegistry {
        &self.registry
    }

    /// Adds a background element.
    ///
    /// `level_set` holds one value per node and is required if the session is
    /// cut by the level-set field.
    pub fn add_element(
        &mut self,
        id: ElementId,
        node_ids: &[NodeId],
        coords: &[Point<Real>],
        cell_type: CellType,
        level_set: Option<&[Real]>,
    ) -> Result<(), CutError> {
        if self.element_ids.contains_key(&id) {
            return Err(CutError::DuplicateElement(id));
        }

        let level_set = match (self.kind.has_level_set(), level_set) {
            (true, None) => {
                return Err(CutError::InvalidElement {
                    element: id,
                    reason: "missing level-set values",
                })
            }
            (false, Some(_)) => {
                log::warn!(
                    "element {}: level-set values ignored by a session cut by sides only",
                    id
                );
                None
            }
            (_, values) => values,
        };

        let element = Element::new(
            id,
            node_ids,
            coords,
            cell_type,
            level_set,
            &self.registry,
            self.options.arithmetic,
        )?;

        let _ = self.element_ids.insert(id, self.elements.len());
        self.elements.push(element);
        self.is_cut = false;
        Ok(())
    }

    /// Adds a cut side.
    pub fn add_cut_side(
        &mut self,
        id: SideId,
        node_ids: &[NodeId],
        coords: &[Point<Real>],
        side_type: SideType,
    ) -> Result<(), CutError> {
        if self.side_ids.contains_key(&id) {
            return Err(CutError::DuplicateSide(id));
        }
        if !self.kind.has_sides() {
            log::warn!("cut side {} ignored by a session cut by the level-set only", id);
            return Ok(());
        }

        let diameter = Aabb::from_points_ref(coords).diameter();
        let tolerance = self.options.geometric_tolerance_for(diameter);
        let mut side = Side::new(id, node_ids, coords, side_type, tolerance)?;

        let merge_tolerance = self.registry.merge_tolerance();
        let points: Vec<_> = side
            .coords()
            .iter()
            .map(|pt| self.registry.new_point(pt, None, Some(id), merge_tolerance))
            .collect();
        side.set_points(points);

        let _ = self.side_ids.insert(id, self.sides.len());
        self.sides.push(side);
        self.is_cut = false;
        Ok(())
    }

    /// The element with the given id.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.element_ids.get(&id).map(|i| &self.elements[*i])
    }

    /// All the elements, in insertion order.
    #[inline]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// The cut side with the given id.
    pub fn side(&self, id: SideId) -> Option<&Side> {
        self.side_ids.get(&id).map(|i| &self.sides[*i])
    }

    /// All the cut sides, in insertion order.
    #[inline]
    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    /// Has [`CutSession::cut`] run since the last element or side was added?
    #[inline]
    pub fn is_cut(&self) -> bool {
        self.is_cut
    }

    /// Computes the facets and volume cells of every element.
    ///
    /// The first error encountered (in element order) is returned.
    pub fn cut(&mut self) -> Result<(), CutError> {
        let candidates = self.candidate_sides();
        let fields = self.kind.fields();
        let sides = &self.sides;
        let registry = &self.registry;
        let options = &self.options;

        let cut_one = |(element, candidates): (&mut Element, &Vec<usize>)| {
            let element_sides: Vec<&Side> = candidates.iter().map(|i| &sides[*i]).collect();
            cut_element(element, &element_sides, fields, registry, options)
        };

        #[cfg(feature = "parallel")]
        let results: Vec<Result<(), CutError>> = self
            .elements
            .par_iter_mut()
            .zip(candidates.par_iter())
            .map(cut_one)
            .collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<(), CutError>> = self
            .elements
            .iter_mut()
            .zip(candidates.iter())
            .map(cut_one)
            .collect();

        results.into_iter().collect::<Result<(), CutError>>()?;

        if self.kind.has_sides() {
            self.propagate_side_positions();
        }

        self.is_cut = true;
        Ok(())
    }

    /// Generates the quadrature rules of every volume cell and boundary cell.
    pub fn cut_finalize(
        &mut self,
        volume: VCellGaussPts,
        boundary: BCellGaussPts,
    ) -> Result<(), CutError> {
        if !self.is_cut {
            return Err(CutError::NotCut);
        }

        let registry = &self.registry;
        let options = &self.options;
        let finalize_one =
            |element: &mut Element| finalize_element(element, registry, options, volume, boundary);

        #[cfg(feature = "parallel")]
        let results: Vec<Result<(), CutError>> =
            self.elements.par_iter_mut().map(finalize_one).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<(), CutError>> =
            self.elements.iter_mut().map(finalize_one).collect();

        results.into_iter().collect()
    }

    /// [`CutSession::cut_finalize`] with the strategies of the session
    /// options.
    pub fn cut_finalize_default(&mut self) -> Result<(), CutError> {
        self.cut_finalize(
            self.options.volume_gauss_points,
            self.options.boundary_gauss_points,
        )
    }

    /// For each element, the indices of the sides actually touching it.
    fn candidate_sides(&self) -> Vec<Vec<usize>> {
        if !self.kind.has_sides() || self.sides.is_empty() {
            return vec![Vec::new(); self.elements.len()];
        }

        let entries: Vec<SideEnvelope> = self
            .sides
            .iter()
            .enumerate()
            .map(|(i, side)| {
                let tolerance = self.options.geometric_tolerance_for(side.diameter());
                let envelope = side.aabb().loosened(tolerance).to_envelope();
                GeomWithData::new(Rectangle::from_aabb(envelope), i)
            })
            .collect();
        let tree = RTree::bulk_load(entries);

        self.elements
            .iter()
            .map(|element| {
                let tolerance = self.options.geometric_tolerance_for(element.diameter());
                let envelope = element.aabb().loosened(tolerance).to_envelope();
                let mut found: Vec<usize> = tree
                    .locate_in_envelope_intersecting(&envelope)
                    .map(|entry| entry.data)
                    .filter(|i| {
                        side_touches_element(
                            element,
                            &self.sides[*i],
                            tolerance,
                            self.options.arithmetic,
                        )
                    })
                    .collect();
                found.sort_unstable();
                found
            })
            .collect()
    }

    /// Resolves the side positions left undecided by the element cuts from
    /// the positions of the nodes of the neighboring elements.
    fn propagate_side_positions(&mut self) {
        let mut node_positions: HashMap<NodeId, Position> = HashMap::default();
        let mut changed = true;

        while changed {
            changed = false;

            for element in &self.elements {
                for (node, position) in element
                    .node_ids()
                    .iter()
                    .zip(element.node_positions(CutField::Sides))
                {
                    if matches!(position, Position::Inside | Position::Outside) {
                        let _ = node_positions.entry(*node).or_insert(position);
                    }
                }
            }

            for element in &mut self.elements {
                let node_points = element.node_points().to_vec();
                let node_ids = element.node_ids().to_vec();

                for cell in &mut element.volume_cells {
                    if cell.position_for(CutField::Sides) != Some(Position::Undecided) {
                        continue;
                    }
                    let known = node_ids
                        .iter()
                        .zip(&node_points)
                        .filter(|(_, pt)| cell.has_vertex(**pt))
                        .find_map(|(node, _)| node_positions.get(node).copied());
                    if let Some(position) = known {
                        cell.set_position(CutField::Sides, position);
                        changed = true;
                    }
                }
            }
        }

        for element in &mut self.elements {
            for cell in &mut element.volume_cells {
                if cell.position_for(CutField::Sides) == Some(Position::Undecided) {
                    log::debug!(
                        "element {}: volume cell {} is not reached by any cut side, assumed outside",
                        cell.element(),
                        cell.index()
                    );
                    cell.set_position(CutField::Sides, Position::Outside);
                }
            }
        }
    }
}

/// Does the side cross an element edge, does an element face cross a side
/// edge, or does a side corner lie inside the element?
fn side_touches_element(
    element: &Element,
    side: &Side,
    tolerance: Real,
    mode: ArithmeticMode,
) -> bool {
    let coords = element.coords();

    let edge_hit = element.cell_type().edges().iter().any(|[i, j]| {
        intersect_segment_side(&coords[*i], &coords[*j], side, tolerance, mode).is_some()
    });
    if edge_hit {
        return true;
    }

    let face_hit = element.cell_type().faces().iter().any(|face| {
        (1..face.len() - 1).any(|k| {
            let corners = [face[0], face[k], face[k + 1]];
            let face_coords = corners.map(|i| coords[i]);
            let node_ids = corners.map(|i| element.node_ids()[i]);
            match Side::new(-1, &node_ids, &face_coords, SideType::Tri3, tolerance) {
                Ok(triangle) => !intersect_sides(&triangle, side, tolerance, mode).is_empty(),
                Err(_) => false,
            }
        })
    });
    if face_hit {
        return true;
    }

    // Barycentric signs of each corner w.r.t. the positively oriented
    // decomposition tetrahedra.
    side.coords().iter().any(|pt| {
        element.tets().iter().any(|tet| {
            let [a, b, c, d] = tet.map(|i| coords[i]);
            orient3d(pt, &b, &c, &d, mode) >= 0.0
                && orient3d(&a, pt, &c, &d, mode) >= 0.0
                && orient3d(&a, &b, pt, &d, mode) >= 0.0
                && orient3d(&a, &b, &c, pt, mode) >= 0.0
        })
    })
}
