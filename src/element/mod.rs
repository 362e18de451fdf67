//! Background elements: cell types, their fixed tetrahedral decomposition,
//! shape functions and the inverse element mapping.

pub use self::cell_type::CellType;
pub use self::element::{Element, ElementId, NodeId};
pub use self::shape_functions::{shape_derivatives, shape_functions};

mod cell_type;
mod element;
mod shape_functions;
