//! Facets of volume cells: planar polygons on element faces and cutting
//! interfaces, their merging and their splitting into quads and triangles.

pub use self::facet::{Facet, FacetFlags, FacetSource};
pub use self::merge::merge_polygons;
pub use self::triangulate::{
    ear_clipping, split_cells_into_triangles, triangulate_facet, SplitCell, TriangulationError,
};

mod facet;
mod merge;
mod triangulate;
