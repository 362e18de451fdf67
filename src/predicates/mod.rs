//! Geometric predicates with an explicit arithmetic precision policy.
//!
//! Every orientation test of the cutting pipeline goes through this module.
//! The [`ArithmeticMode`] is passed explicitly to each predicate: there is no
//! global precision switch. In [`ArithmeticMode::Adaptive`] mode a predicate
//! first runs in double precision and is recomputed in extended precision
//! only when the double result is too close to zero to be trusted.

pub use self::arithmetic::ArithmeticMode;
pub use self::orient::{orient2d, orient3d, orientation2d, Orientation};
pub use self::point_in_polygon::{is_point_strictly_in_polygon, is_point_strictly_in_triangle};

pub(crate) use self::arithmetic::DoubleDouble;

mod arithmetic;
mod orient;
mod point_in_polygon;
