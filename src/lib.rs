/*!
cutcell3d
========

**cutcell3d** computes cut-cell decompositions of 3-dimensional finite
elements intersected by interfaces, written with the rust programming
language.

A background element (tetrahedron, hexahedron, wedge or pyramid) is cut by
explicit cutting surfaces (triangles and quadrilaterals) and/or an implicit
level-set field. The result is a set of volume cells lying on one side of
every interface, each equipped with a quadrature rule generated either by
tessellation or by the direct divergence method, together with boundary
cells on the interface.

```
use cutcell3d::math::Point;
use cutcell3d::element::CellType;
use cutcell3d::options::Options;
use cutcell3d::session::{CutSession, IntersectionKind};

let coords = [
    Point::new(0.0, 0.0, 0.0),
    Point::new(1.0, 0.0, 0.0),
    Point::new(1.0, 1.0, 0.0),
    Point::new(0.0, 1.0, 0.0),
    Point::new(0.0, 0.0, 1.0),
    Point::new(1.0, 0.0, 1.0),
    Point::new(1.0, 1.0, 1.0),
    Point::new(0.0, 1.0, 1.0),
];
let level_set = [1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0];

let mut session = CutSession::new(IntersectionKind::LevelSet, Options::default());
session
    .add_element(1, &[0, 1, 2, 3, 4, 5, 6, 7], &coords, CellType::Hex8, Some(&level_set))
    .unwrap();
session.cut().unwrap();
session.cut_finalize_default().unwrap();

let element = session.element(1).unwrap();
assert_eq!(element.volume_cells().len(), 2);
```
*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_inception)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::type_complexity)]
#![deny(unused_qualifications)]

#[cfg(feature = "serde-serialize")]
#[macro_use]
extern crate serde;
#[cfg(test)]
#[macro_use]
extern crate approx;
extern crate num_traits as num;

pub extern crate nalgebra as na;

pub mod bounding_volume;
pub mod element;
pub mod error;
pub mod facet;
pub mod gauss;
pub mod options;
pub mod point;
pub mod predicates;
pub mod session;
pub mod side;
pub mod utils;
pub mod volume_cell;

mod real {
    /// The scalar type used throughout this crate.
    pub use f64 as Real;
}

/// Aliases for mathematical types.
pub mod math {
    pub use super::real::*;
    pub use na::{Matrix3, Point2, Point3, UnitVector3, Vector2, Vector3};

    /// The default tolerance used for geometric operations.
    pub const DEFAULT_EPSILON: Real = Real::EPSILON;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The point type.
    pub use Point3 as Point;

    /// The vector type.
    pub use Vector3 as Vector;

    /// The unit vector type.
    pub use UnitVector3 as UnitVector;

    /// The matrix type.
    pub use Matrix3 as Matrix;

    /// The point type of a facet projected onto its dominant plane.
    pub use Point2 as Point2d;

    /// The vector type of a facet projected onto its dominant plane.
    pub use Vector2 as Vector2d;
}
