use super::SplitCell;
use crate::math::{Point, Real, Vector};
use crate::point::PointId;
use crate::side::SideId;
use crate::utils::hashmap::HashMap;
use crate::utils::newell_normal;
use crate::volume_cell::CutField;

/// What a facet lies on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum FacetSource {
    /// A face of the background element, given by its index in
    /// [`CellType::faces`](crate::element::CellType::faces).
    ElementFace(usize),
    /// The zero iso-surface of the level-set field.
    LevelSet,
    /// An explicit cut side.
    CutSide(SideId),
}

impl FacetSource {
    /// The cutting field this facet is an interface of, if any.
    #[inline]
    pub fn interface_field(self) -> Option<CutField> {
        match self {
            FacetSource::ElementFace(_) => None,
            FacetSource::LevelSet => Some(CutField::LevelSet),
            FacetSource::CutSide(_) => Some(CutField::Sides),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
/// Properties of a facet.
pub struct FacetFlags(u8);

bitflags::bitflags! {
    impl FacetFlags: u8 {
        /// The facet lies on the boundary of the background element.
        const ELEMENT_BOUNDARY = 1;
        /// The facet lies on a cutting interface and separates two volume cells.
        const CUT_SURFACE = 1 << 1;
        /// The facet was merged from several coplanar pieces.
        const MERGED = 1 << 2;
        /// The facet has at least one concave corner.
        const CONCAVE = 1 << 3;
    }
}

/// A planar polygon bounding one volume cell, or separating two of them.
///
/// The corner loop is counter-clockwise seen from outside of the first cell
/// returned by [`Facet::cells`].
#[derive(Clone, Debug, PartialEq)]
pub struct Facet {
    points: Vec<PointId>,
    source: FacetSource,
    flags: FacetFlags,
    cells: (usize, Option<usize>),
    pub(crate) triangulation: Vec<SplitCell>,
}

impl Facet {
    pub(crate) fn new(
        points: Vec<PointId>,
        source: FacetSource,
        flags: FacetFlags,
        cells: (usize, Option<usize>),
    ) -> Self {
        Self {
            points,
            source,
            flags,
            cells,
            triangulation: Vec::new(),
        }
    }

    /// The corners of this facet.
    #[inline]
    pub fn points(&self) -> &[PointId] {
        &self.points
    }

    /// What this facet lies on.
    #[inline]
    pub fn source(&self) -> FacetSource {
        self.source
    }

    /// The properties of this facet.
    #[inline]
    pub fn flags(&self) -> FacetFlags {
        self.flags
    }

    /// The volume cell this facet is oriented for, and the cell on its other
    /// side (if any).
    #[inline]
    pub fn cells(&self) -> (usize, Option<usize>) {
        self.cells
    }

    /// Does this facet lie on a cutting interface?
    #[inline]
    pub fn is_cut_surface(&self) -> bool {
        self.flags.contains(FacetFlags::CUT_SURFACE)
    }

    /// The cutting field this facet is an interface of.
    #[inline]
    pub fn interface_field(&self) -> Option<CutField> {
        self.source.interface_field()
    }

    /// Does this facet bound the given volume cell?
    #[inline]
    pub fn bounds(&self, cell: usize) -> bool {
        self.cells.0 == cell || self.cells.1 == Some(cell)
    }

    /// The corners of this facet, counter-clockwise seen from outside of
    /// `cell`.
    pub fn points_from(&self, cell: usize) -> Option<Vec<PointId>> {
        if self.cells.0 == cell {
            Some(self.points.clone())
        } else if self.cells.1 == Some(cell) {
            Some(self.points.iter().rev().copied().collect())
        } else {
            None
        }
    }

    /// The split cells of this facet, available once the session is
    /// finalized. They index into [`Facet::points`].
    #[inline]
    pub fn triangulation(&self) -> &[SplitCell] {
        &self.triangulation
    }

    /// The non-normalized normal of this facet, pointing outside of its first
    /// cell.
    pub fn normal(&self, coords: &HashMap<PointId, Point<Real>>) -> Vector<Real> {
        let pts = self.coordinates(coords);
        newell_normal(&pts)
    }

    /// The coordinates of the corners of this facet.
    pub fn coordinates(&self, coords: &HashMap<PointId, Point<Real>>) -> Vec<Point<Real>> {
        self.points
            .iter()
            .filter_map(|id| coords.get(id).copied())
            .collect()
    }
}
