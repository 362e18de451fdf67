//! Volume cells: the regions of an element lying on one side of every
//! interface.
//!
//! An element is first decomposed into tetrahedra, each of them becoming a
//! convex piece. Pieces are then split by the level-set field (linear on each
//! tetrahedron) and by the planar patches of the cut sides. Pieces connected
//! through faces that do not lie on an interface form a volume cell, and the
//! faces of its pieces lying on the element boundary or on an interface are
//! merged into its facets.

pub use self::position::{CutField, Position, Positions};
pub use self::volume_cell::VolumeCell;

pub(crate) use self::builder::cut_element;

mod builder;
mod cutter;
mod piece;
mod position;
mod volume_cell;
