//! Errors reported by the cutting pipeline.

use crate::element::ElementId;
use crate::facet::TriangulationError;
use crate::math::{Point, Real};
use crate::side::SideId;
use crate::volume_cell::CutField;

/// Error indicating that an element could not be cut.
///
/// Every variant describing a topological inconsistency carries the ids and
/// coordinates needed to reproduce the offending configuration in isolation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CutError {
    /// The element input is malformed.
    #[error("invalid element {element}: {reason}")]
    InvalidElement {
        /// The element id.
        element: ElementId,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The cut side input is malformed.
    #[error("invalid cut side {side}: {reason}")]
    InvalidSide {
        /// The side id.
        side: SideId,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// An element with this id was already added to the session.
    #[error("element {0} was already added to the cutting session")]
    DuplicateElement(ElementId),
    /// A cut side with this id was already added to the session.
    #[error("cut side {0} was already added to the cutting session")]
    DuplicateSide(SideId),
    /// The operation needs `cut` to run first.
    #[error("the cutting session has not been cut yet")]
    NotCut,
    /// A facet of a volume cell could not be split into triangles and quads.
    #[error("facet {facet} of element {element} cannot be triangulated: {source} (points: {points:?})")]
    UntriangulableFacet {
        /// The element owning the facet.
        element: ElementId,
        /// The facet index within the element.
        facet: usize,
        /// The corner coordinates of the facet.
        points: Vec<Point<Real>>,
        /// The triangulation failure.
        source: TriangulationError,
    },
    /// A finalized volume cell ended up without any integration cell.
    #[error("volume cell {cell} of element {element} contains 0 integration cells")]
    EmptyVolumeCell {
        /// The element owning the cell.
        element: ElementId,
        /// The cell index within the element.
        cell: usize,
    },
    /// A volume cell lies on both sides of an interface it was not split by.
    #[error("volume cell {cell} of element {element} changes sign w.r.t. {field:?} at {point:?}")]
    SignChangeInUnsplitCell {
        /// The element owning the cell.
        element: ElementId,
        /// The cell index within the element.
        cell: usize,
        /// The interface the cell straddles.
        field: CutField,
        /// A point of the cell lying on the wrong side.
        point: Point<Real>,
    },
    /// A side crossing the element produced no interface facet.
    #[error("cut side {side} crosses element {element} but no intersection was built")]
    MissingIntersection {
        /// The element.
        element: ElementId,
        /// The side.
        side: SideId,
    },
    /// A convex piece of a volume cell cannot be tessellated from its center.
    #[error("a convex piece of volume cell {cell} of element {element} is not star-shaped (points: {points:?})")]
    InvalidPiece {
        /// The element owning the cell.
        element: ElementId,
        /// The cell index within the element.
        cell: usize,
        /// The vertices of the piece.
        points: Vec<Point<Real>>,
    },
    /// Tessellation and direct divergence disagree on the volume of a cell.
    #[error("volume cell {cell} of element {element}: tessellation volume {tessellation} vs direct divergence volume {direct_divergence}")]
    VolumeMismatch {
        /// The element owning the cell.
        element: ElementId,
        /// The cell index within the element.
        cell: usize,
        /// Volume computed from the tessellation.
        tessellation: Real,
        /// Volume computed with the direct divergence method.
        direct_divergence: Real,
    },
    /// The volume cells of an element do not add up to the element volume.
    #[error("volume cells of element {element} add up to {cells} instead of {expected}")]
    PartitionViolation {
        /// The element.
        element: ElementId,
        /// The sum of the cell volumes.
        cells: Real,
        /// The element volume.
        expected: Real,
    },
    /// The inverse element mapping did not converge.
    #[error("local coordinates of {point:?} in element {element} did not converge")]
    LocalCoordinates {
        /// The element.
        element: ElementId,
        /// The global point.
        point: Point<Real>,
    },
}
