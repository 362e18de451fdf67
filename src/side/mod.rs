//! Explicit cut sides, their planes and their intersections with element
//! edges, element faces and other sides.

pub use self::intersection::{
    intersect_segment_side, intersect_sides, SegmentSideIntersection, SideSideIntersection,
};
pub use self::plane::Plane;
pub use self::side::{Side, SideId, SidePatch, SideType};

mod intersection;
mod plane;
mod side;
