//! Session-wide registry of cut points.
//!
//! Every geometric location produced while cutting (element nodes, cut side
//! corners, edge/plane intersections, tessellation centers) is inserted into
//! the [`PointRegistry`], which merges locations closer than the merge
//! tolerance. The rest of the crate only handles [`PointId`]s.

pub use self::cut_point::{CutPoint, PointId};
pub use self::registry::PointRegistry;

mod cut_point;
mod registry;
