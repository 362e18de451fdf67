use crate::math::{Point, Real, Vector};
use crate::point::PointId;

/// A quadrature point of a volume or boundary cell.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct GaussPoint {
    /// Location in global coordinates.
    pub global: Point<Real>,
    /// Location in the local coordinates of the background element.
    pub local: Point<Real>,
    /// Weight in global coordinates (the Jacobian is already applied).
    pub weight: Real,
}

/// A tetrahedron of the tessellation of a volume cell.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct IntegrationCell {
    /// The corners, positively oriented.
    pub points: [PointId; 4],
    /// The volume.
    pub volume: Real,
}

/// The quadrature of an interface facet of a volume cell.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct BoundaryCell {
    /// The facet, as an index into
    /// [`Element::facets`](crate::element::Element::facets).
    pub facet: usize,
    /// The unit normal, pointing outside of the volume cell.
    pub normal: Vector<Real>,
    /// The area of the facet.
    pub area: Real,
    /// The quadrature points on the facet.
    pub gauss_points: Vec<GaussPoint>,
}
