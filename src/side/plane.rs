use crate::math::{Point, Real, Vector};
use crate::predicates::{orient3d, ArithmeticMode};

/// An oriented plane defined by three points.
///
/// The orientation is the one of `(b - a) x (c - a)`. Signed distances are
/// evaluated with [`orient3d`] so they inherit its precision policy.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Plane {
    points: [Point<Real>; 3],
    normal: Vector<Real>,
    scale: Real,
}

impl Plane {
    /// The plane through `a`, `b` and `c`, or `None` if they are collinear.
    pub fn from_points(a: Point<Real>, b: Point<Real>, c: Point<Real>) -> Option<Self> {
        let cross = (b - a).cross(&(c - a));
        let scale = cross.norm();
        let reference = (b - a).norm() * (c - a).norm();

        if scale <= Real::EPSILON * reference || scale == 0.0 {
            return None;
        }

        Some(Self {
            points: [a, b, c],
            normal: cross / scale,
            scale,
        })
    }

    /// The plane through `origin`, orthogonal to `normal`.
    ///
    /// Returns `None` if `normal` is zero.
    pub fn from_point_normal(origin: Point<Real>, normal: &Vector<Real>) -> Option<Self> {
        let n = normal.try_normalize(0.0)?;
        let helper = if n.x.abs() < 0.9 {
            Vector::x()
        } else {
            Vector::y()
        };
        let u = helper.cross(&n).normalize();
        let v = n.cross(&u);
        Self::from_points(origin, origin + u, origin + v)
    }

    /// The unit normal of this plane.
    #[inline]
    pub fn normal(&self) -> Vector<Real> {
        self.normal
    }

    /// A point of this plane.
    #[inline]
    pub fn origin(&self) -> Point<Real> {
        self.points[0]
    }

    /// The signed distance from `pt` to this plane, positive on the side the
    /// normal points to.
    #[inline]
    pub fn signed_distance(&self, pt: &Point<Real>, mode: ArithmeticMode) -> Real {
        let [a, b, c] = &self.points;
        orient3d(a, b, c, pt, mode) / self.scale
    }

    /// The orthogonal projection of `pt` on this plane.
    pub fn project(&self, pt: &Point<Real>) -> Point<Real> {
        pt - self.normal * (pt - self.points[0]).dot(&self.normal)
    }

    /// The same plane with the opposite orientation.
    pub fn flipped(&self) -> Self {
        let [a, b, c] = self.points;
        Self {
            points: [a, c, b],
            normal: -self.normal,
            scale: self.scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_distance_follows_normal() {
        let plane = Plane::from_points(
            Point::new(0.0, 0.0, 1.0),
            Point::new(2.0, 0.0, 1.0),
            Point::new(0.0, 2.0, 1.0),
        )
        .unwrap();
        let mode = ArithmeticMode::Adaptive;

        assert_relative_eq!(plane.normal(), Vector::z());
        assert_relative_eq!(plane.signed_distance(&Point::new(0.3, 0.7, 3.0), mode), 2.0);
        assert_relative_eq!(plane.flipped().signed_distance(&Point::new(0.3, 0.7, 3.0), mode), -2.0);
        assert_eq!(plane.signed_distance(&Point::new(5.0, -4.0, 1.0), mode), 0.0);
    }

    #[test]
    fn point_normal_planes() {
        let normal = Vector::new(1.0, 1.0, 1.0);
        let plane = Plane::from_point_normal(Point::new(1.0, 0.0, 0.0), &normal).unwrap();
        let mode = ArithmeticMode::Extended;

        assert_relative_eq!(plane.normal(), normal.normalize(), epsilon = 1.0e-14);
        assert_relative_eq!(
            plane.signed_distance(&Point::new(1.0, 1.0, 1.0), mode),
            2.0 / 3.0f64.sqrt(),
            epsilon = 1.0e-14
        );
        assert!(Plane::from_points(Point::origin(), Point::new(1.0, 1.0, 1.0), Point::new(2.0, 2.0, 2.0)).is_none());
    }
}
