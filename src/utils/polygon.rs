//! Planar polygon helpers shared by facets, sides and the facet splitter.

use crate::math::{Point, Point2d, Real, Vector};

/// Computes the (non-normalized) Newell normal of a closed polygon.
///
/// Its norm is twice the area of the polygon when the polygon is planar, and
/// it stays well defined for slightly non-planar or concave polygons.
pub fn newell_normal<'a>(points: impl IntoIterator<Item = &'a Point<Real>>) -> Vector<Real> {
    let mut normal = Vector::zeros();
    let mut iter = points.into_iter();
    let first = match iter.next() {
        Some(first) => first,
        None => return normal,
    };
    let mut prev = first;

    for curr in iter.chain(core::iter::once(first)) {
        normal.x += (prev.y - curr.y) * (prev.z + curr.z);
        normal.y += (prev.z - curr.z) * (prev.x + curr.x);
        normal.z += (prev.x - curr.x) * (prev.y + curr.y);
        prev = curr;
    }

    normal
}

/// The area of a closed planar polygon.
pub fn polygon_area(points: &[Point<Real>]) -> Real {
    newell_normal(points).norm() * 0.5
}

/// The area-weighted centroid of a closed planar polygon.
///
/// Falls back to the vertex average for degenerate polygons.
pub fn polygon_centroid(points: &[Point<Real>]) -> Point<Real> {
    let average = vertex_average(points);
    let normal = newell_normal(points);
    let mut total = 0.0;
    let mut centroid = Vector::zeros();

    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let weight = (a - average).cross(&(b - average)).dot(&normal);
        total += weight;
        centroid += (a.coords + b.coords + average.coords) * weight;
    }

    if total.abs() <= Real::EPSILON * normal.norm_squared() {
        average
    } else {
        Point::from(centroid / (3.0 * total))
    }
}

/// The average of the given points.
pub fn vertex_average(points: &[Point<Real>]) -> Point<Real> {
    if points.is_empty() {
        return Point::origin();
    }

    let sum = points
        .iter()
        .fold(Vector::zeros(), |acc, pt| acc + pt.coords);
    Point::from(sum / points.len() as Real)
}

/// Twice the signed area of a 2D polygon (positive when counter-clockwise).
pub fn signed_area2d(points: &[Point2d<Real>]) -> Real {
    let mut area = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        area += a.x * b.y - b.x * a.y;
    }
    area
}

/// Projection of a 3D polygon onto the coordinate plane orthogonal to the
/// dominant component of its normal.
///
/// The second coordinate is mirrored when needed so that a polygon that is
/// counter-clockwise w.r.t. the normal stays counter-clockwise once projected.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DominantProjection {
    axes: [usize; 2],
    flip: Real,
}

impl DominantProjection {
    /// Builds the projection associated to `normal`.
    pub fn new(normal: &Vector<Real>) -> Self {
        let axis = normal.iamax();
        let axes = match axis {
            0 => [1, 2],
            1 => [2, 0],
            _ => [0, 1],
        };
        let flip = if normal[axis] >= 0.0 { 1.0 } else { -1.0 };
        Self { axes, flip }
    }

    /// Projects a point.
    #[inline]
    pub fn project(&self, pt: &Point<Real>) -> Point2d<Real> {
        Point2d::new(pt[self.axes[0]], pt[self.axes[1]] * self.flip)
    }
}

/// An orthonormal frame `(u, v, n)` attached to a plane, preserving lengths
/// once points are expressed in the `(u, v)` coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlaneFrame {
    /// Origin of the frame.
    pub origin: Point<Real>,
    /// First in-plane direction.
    pub u: Vector<Real>,
    /// Second in-plane direction.
    pub v: Vector<Real>,
    /// Unit normal of the plane.
    pub normal: Vector<Real>,
}

impl PlaneFrame {
    /// Builds a frame from a point and a unit normal.
    pub fn new(origin: Point<Real>, normal: Vector<Real>) -> Self {
        let helper = if normal.x.abs() < 0.9 {
            Vector::x()
        } else {
            Vector::y()
        };
        let u = helper.cross(&normal).normalize();
        let v = normal.cross(&u);
        Self {
            origin,
            u,
            v,
            normal,
        }
    }

    /// In-plane coordinates of a point.
    #[inline]
    pub fn to_local(&self, pt: &Point<Real>) -> Point2d<Real> {
        let d = pt - self.origin;
        Point2d::new(d.dot(&self.u), d.dot(&self.v))
    }

    /// The 3D point of the plane with the given in-plane coordinates.
    #[inline]
    pub fn to_global(&self, pt: &Point2d<Real>) -> Point<Real> {
        self.origin + self.u * pt.x + self.v * pt.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_square_normal_and_centroid() {
        let square = [
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 1.0),
            Point::new(1.0, 1.0, 1.0),
            Point::new(0.0, 1.0, 1.0),
        ];

        assert_relative_eq!(newell_normal(&square), Vector::new(0.0, 0.0, 2.0));
        assert_relative_eq!(polygon_area(&square), 1.0);
        assert_relative_eq!(polygon_centroid(&square), Point::new(0.5, 0.5, 1.0));
    }

    #[test]
    fn dominant_projection_keeps_orientation() {
        let tri = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            Point::new(0.0, 1.0, 0.0),
        ];
        let normal = newell_normal(&tri);
        assert!(normal.x < 0.0);

        let proj = DominantProjection::new(&normal);
        let projected: Vec<_> = tri.iter().map(|pt| proj.project(pt)).collect();
        assert!(signed_area2d(&projected) > 0.0);
    }

    #[test]
    fn plane_frame_round_trip() {
        let frame = PlaneFrame::new(
            Point::new(1.0, 2.0, 3.0),
            Vector::new(1.0, 1.0, 0.0).normalize(),
        );
        let pt = frame.to_global(&Point2d::new(0.3, -0.7));
        assert_relative_eq!(frame.to_local(&pt), Point2d::new(0.3, -0.7), epsilon = 1.0e-12);
    }
}
