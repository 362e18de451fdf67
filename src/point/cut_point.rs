use crate::element::NodeId;
use crate::math::{Point, Real};
use crate::side::SideId;
use smallvec::SmallVec;

/// Index of a point in the [`PointRegistry`](super::PointRegistry) of a
/// cutting session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PointId(pub u32);

impl PointId {
    /// The index of this point in the registry arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A deduplicated point of a cutting session.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CutPoint {
    /// The id of this point.
    pub id: PointId,
    /// The coordinates of this point.
    pub coords: Point<Real>,
    /// The background mesh node coinciding with this point, if any.
    pub node: Option<NodeId>,
    /// The cut sides this point was located on.
    pub sides: SmallVec<[SideId; 2]>,
    /// The largest tolerance this point was matched with.
    ///
    /// A point merged under a coarse tolerance is located less precisely than
    /// one that was only ever matched exactly.
    pub tolerance: Real,
}

impl CutPoint {
    /// Is this point a background mesh node?
    #[inline]
    pub fn is_node(&self) -> bool {
        self.node.is_some()
    }

    /// Was this point located on the given cut side?
    #[inline]
    pub fn is_on_side(&self, side: SideId) -> bool {
        self.sides.contains(&side)
    }
}
