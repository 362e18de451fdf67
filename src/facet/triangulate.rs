//! Splitting of facet polygons into quadrilaterals and triangles.

use crate::math::{Point, Point2d, Real};
use crate::predicates::{
    is_point_strictly_in_polygon, is_point_strictly_in_triangle, orient2d, ArithmeticMode,
};
use crate::utils::{newell_normal, signed_area2d, DominantProjection};
use arrayvec::ArrayVec;

/// Normalized turn below which a corner is considered straight.
const TURN_TOLERANCE: Real = 1.0e-8;
/// Determinant threshold of the ear containment test.
const EAR_TOLERANCE: Real = 1.0e-9;

/// A quadrilateral or a triangle produced by [`triangulate_facet`], as
/// indices into the input polygon.
pub type SplitCell = ArrayVec<usize, 4>;

/// Error indicating that a facet polygon could not be split.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TriangulationError {
    /// The polygon has less than three corners.
    #[error("a facet needs at least 3 points, got {0}")]
    TooFewPoints(usize),
    /// All the corners are collinear or coincident.
    #[error("the facet normal is degenerate")]
    DegenerateNormal,
    /// No ear could be clipped from the remaining polygon.
    #[error("no ear found in the remaining polygon {0:?}")]
    NoEar(Vec<usize>),
}

/// Splits a simple polygon into quadrilaterals and triangles covering it
/// exactly.
///
/// The polygon may be concave and slightly non-planar. Corners lying on the
/// straight line between their neighbors are dropped. Convex polygons are
/// fanned into quads from their first corner (with a final triangle if the
/// corner count is odd); polygons with a single concave corner are fanned
/// from that corner. Polygons with several concave corners are split by
/// cutting cells anchored at concave corners, falling back to clipping one
/// ear at a time. Polygons with less than six corners and several concave
/// corners are always split by clipping ears.
///
/// The returned cells index into `points` and share its orientation.
pub fn triangulate_facet(
    points: &[Point<Real>],
    mode: ArithmeticMode,
) -> Result<Vec<SplitCell>, TriangulationError> {
    let mut splitter = FacetSplitter::new(points, mode)?;
    splitter.split((0..points.len()).collect())?;
    Ok(splitter.cells)
}

/// Splits a simple polygon into triangles by clipping ears only.
///
/// Ears are searched from the first corner on: the first convex corner whose
/// triangle contains no concave corner is clipped, then the search restarts
/// on the remaining polygon.
pub fn ear_clipping(
    points: &[Point<Real>],
    mode: ArithmeticMode,
) -> Result<Vec<SplitCell>, TriangulationError> {
    let mut splitter = FacetSplitter::new(points, mode)?;
    let mut polygon: Vec<usize> = (0..points.len()).collect();

    loop {
        polygon = splitter.drop_inline(polygon);
        if polygon.len() <= 3 {
            break;
        }
        let concave = splitter.concave_corners(&polygon);
        polygon = splitter.clip_ear(&polygon, &concave)?;
    }

    if polygon.len() == 3 {
        splitter.cells.push(polygon.into_iter().collect());
    }
    Ok(splitter.cells)
}

/// Splits the cells returned by [`triangulate_facet`] into triangles.
///
/// A quad `[c0, c1, c2, c3]` yields `[c0, c1, c2]` and `[c0, c2, c3]`.
pub fn split_cells_into_triangles(cells: &[SplitCell]) -> Vec<[usize; 3]> {
    let mut result = Vec::with_capacity(cells.len() * 2);
    for cell in cells {
        result.push([cell[0], cell[1], cell[2]]);
        if cell.len() == 4 {
            result.push([cell[0], cell[2], cell[3]]);
        }
    }
    result
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CellShape {
    /// Every corner of the cell turns like the polygon.
    Convex,
    /// The first corner is reflex, the cell must be split from it.
    ReflexStart,
}

struct FacetSplitter {
    projected: Vec<Point2d<Real>>,
    mode: ArithmeticMode,
    cells: Vec<SplitCell>,
}

impl FacetSplitter {
    fn new(points: &[Point<Real>], mode: ArithmeticMode) -> Result<Self, TriangulationError> {
        if points.len() < 3 {
            return Err(TriangulationError::TooFewPoints(points.len()));
        }

        let normal = newell_normal(points);
        let diameter = points
            .iter()
            .map(|pt| (pt - points[0]).norm())
            .fold(0.0, Real::max);

        if normal.norm() <= Real::EPSILON * diameter * diameter || normal.norm() == 0.0 {
            return Err(TriangulationError::DegenerateNormal);
        }

        let projection = DominantProjection::new(&normal);
        Ok(FacetSplitter {
            projected: points.iter().map(|pt| projection.project(pt)).collect(),
            mode,
            cells: Vec::new(),
        })
    }

    fn turn(&self, polygon: &[usize], i: usize) -> Real {
        let n = polygon.len();
        let a = &self.projected[polygon[(i + n - 1) % n]];
        let b = &self.projected[polygon[i]];
        let c = &self.projected[polygon[(i + 1) % n]];
        let l1 = (b - a).norm();
        let l2 = (c - b).norm();

        if l1 == 0.0 || l2 == 0.0 {
            0.0
        } else {
            orient2d(a, b, c, self.mode) / (l1 * l2)
        }
    }

    fn orientation(&self, polygon: &[usize]) -> Real {
        let pts: Vec<_> = polygon.iter().map(|i| self.projected[*i]).collect();
        if signed_area2d(&pts) > 0.0 {
            1.0
        } else {
            -1.0
        }
    }

    fn concave_corners(&self, polygon: &[usize]) -> Vec<usize> {
        let sign = self.orientation(polygon);
        (0..polygon.len())
            .filter(|i| self.turn(polygon, *i) * sign < -TURN_TOLERANCE)
            .collect()
    }

    fn drop_inline(&self, mut polygon: Vec<usize>) -> Vec<usize> {
        while polygon.len() > 3 {
            match (0..polygon.len()).find(|i| self.turn(&polygon, *i).abs() < TURN_TOLERANCE) {
                Some(i) => {
                    let _ = polygon.remove(i);
                }
                None => break,
            }
        }
        polygon
    }

    fn split(&mut self, polygon: Vec<usize>) -> Result<(), TriangulationError> {
        let polygon = self.drop_inline(polygon);

        if polygon.len() < 3 {
            return Ok(());
        }
        if polygon.len() == 3 {
            self.cells.push(polygon.into_iter().collect());
            return Ok(());
        }

        let concave = self.concave_corners(&polygon);
        match concave.len() {
            0 => {
                self.fan(&polygon, 0);
                return Ok(());
            }
            1 => {
                self.fan(&polygon, concave[0]);
                return Ok(());
            }
            _ => {}
        }

        let n = polygon.len();
        let anchors: &[usize] = if n >= 6 { &concave } else { &[] };

        for &corner in anchors {
            let mut start = corner;

            loop {
                if concave.contains(&((start + 1) % n)) {
                    break;
                }

                let len = if concave.contains(&((start + 2) % n)) {
                    3
                } else {
                    4
                };
                let cell: SplitCell = (0..len).map(|k| polygon[(start + k) % n]).collect();

                let shape = match self.cell_shape(&polygon, &cell) {
                    Some(shape) => shape,
                    None => break,
                };

                if !self.is_cell_empty(&polygon, &cell) {
                    start = (start + 1) % n;
                    if start == corner {
                        break;
                    }
                    continue;
                }

                if shape == CellShape::ReflexStart && cell.len() == 4 {
                    self.cells.push([cell[0], cell[1], cell[2]].into_iter().collect());
                    self.cells.push([cell[0], cell[2], cell[3]].into_iter().collect());
                } else {
                    self.cells.push(cell.clone());
                }

                let inner = &cell[1..cell.len() - 1];
                let remaining = polygon
                    .iter()
                    .copied()
                    .filter(|id| !inner.contains(id))
                    .collect();
                return self.split(remaining);
            }
        }

        let remaining = self.clip_ear(&polygon, &concave)?;
        self.split(remaining)
    }

    fn fan(&mut self, polygon: &[usize], start: usize) {
        let n = polygon.len();
        let rotated: Vec<usize> = (0..n).map(|k| polygon[(start + k) % n]).collect();
        let mut i = 1;

        while i < n - 1 {
            if i + 2 < n {
                self.emit(vec![rotated[0], rotated[i], rotated[i + 1], rotated[i + 2]]);
                i += 2;
            } else {
                self.emit(vec![rotated[0], rotated[i], rotated[i + 1]]);
                i += 1;
            }
        }
    }

    fn emit(&mut self, cell: Vec<usize>) {
        let cell = self.drop_inline(cell);

        if cell.len() == 4 {
            let sign = self.orientation(&cell);
            if (0..4).any(|i| self.turn(&cell, i) * sign <= TURN_TOLERANCE) {
                self.cells.push([cell[0], cell[1], cell[2]].into_iter().collect());
                self.cells.push([cell[0], cell[2], cell[3]].into_iter().collect());
                return;
            }
        }

        self.cells.push(cell.into_iter().collect());
    }

    fn cell_shape(&self, polygon: &[usize], cell: &[usize]) -> Option<CellShape> {
        let sign = self.orientation(polygon);
        let turns: ArrayVec<Real, 4> = (0..cell.len())
            .map(|i| self.turn(cell, i) * sign)
            .collect();

        if turns[1..].iter().any(|t| *t <= TURN_TOLERANCE) {
            None
        } else if turns[0] > TURN_TOLERANCE {
            Some(CellShape::Convex)
        } else if turns[0] < -TURN_TOLERANCE {
            Some(CellShape::ReflexStart)
        } else {
            None
        }
    }

    /// Checks that no other corner of the polygon lies strictly inside the cell.
    fn is_cell_empty(&self, polygon: &[usize], cell: &[usize]) -> bool {
        let cell_pts: ArrayVec<Point2d<Real>, 4> =
            cell.iter().map(|i| self.projected[*i]).collect();

        polygon
            .iter()
            .filter(|id| !cell.contains(id))
            .all(|id| !is_point_strictly_in_polygon(&self.projected[*id], &cell_pts, self.mode))
    }

    fn clip_ear(
        &mut self,
        polygon: &[usize],
        concave: &[usize],
    ) -> Result<Vec<usize>, TriangulationError> {
        let n = polygon.len();

        for i in 0..n {
            if concave.contains(&i) {
                continue;
            }

            let prev = (i + n - 1) % n;
            let next = (i + 1) % n;
            let a = &self.projected[polygon[prev]];
            let b = &self.projected[polygon[i]];
            let c = &self.projected[polygon[next]];

            let is_ear = concave
                .iter()
                .filter(|j| **j != prev && **j != next)
                .all(|j| {
                    !is_point_strictly_in_triangle(
                        &self.projected[polygon[*j]],
                        a,
                        b,
                        c,
                        EAR_TOLERANCE,
                        self.mode,
                    )
                });

            if is_ear {
                self.emit(vec![polygon[prev], polygon[i], polygon[next]]);
                let mut remaining = polygon.to_vec();
                let _ = remaining.remove(i);
                return Ok(remaining);
            }
        }

        log::error!("facet splitting found no ear in {:?}", polygon);
        Err(TriangulationError::NoEar(polygon.to_vec()))
    }
}
