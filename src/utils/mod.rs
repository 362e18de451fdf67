//! Various unsorted geometrical and logical operators.

pub use self::polygon::{
    newell_normal, polygon_area, polygon_centroid, signed_area2d, vertex_average,
    DominantProjection, PlaneFrame,
};
pub use self::sorted_pair::SortedPair;

pub mod hashmap;
mod polygon;
mod sorted_pair;
