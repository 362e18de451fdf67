use crate::math::Real;

/// Trait of bounding volumes.
///
/// Bounding volumes are coarse approximations of cut sides and background
/// elements. They have constant time intersection tests and can be enlarged by
/// a tolerance.
pub trait BoundingVolume {
    /// Checks if this bounding volume intersect with another one.
    fn intersects(&self, _: &Self) -> bool;

    /// Creates a new, enlarged version, of this bounding volume.
    fn loosened(&self, _: Real) -> Self;
}
