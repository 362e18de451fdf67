//! Bounding volumes used by the broad phase between cut sides and elements.

#[doc(inline)]
pub use crate::bounding_volume::aabb::Aabb;
#[doc(inline)]
pub use crate::bounding_volume::bounding_volume::BoundingVolume;

#[doc(hidden)]
pub mod aabb;
#[doc(hidden)]
pub mod bounding_volume;
