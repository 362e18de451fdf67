//! Tessellation of volume cells into tetrahedra.

use super::IntegrationCell;
use crate::error::CutError;
use crate::facet::{split_cells_into_triangles, Facet};
use crate::math::{Point, Real};
use crate::point::{PointId, PointRegistry};
use crate::predicates::{orient3d, ArithmeticMode};
use crate::utils::hashmap::HashMap;
use crate::utils::vertex_average;
use crate::volume_cell::VolumeCell;

/// The triangles of the facets bounding `cell`, counter-clockwise seen from
/// outside of the cell.
///
/// The facets must be triangulated already.
pub(crate) fn cell_triangles(facets: &[Facet], cell: &VolumeCell) -> Vec<[PointId; 3]> {
    let mut result = Vec::new();

    for facet in cell.facets().iter().map(|i| &facets[*i]) {
        let points = facet.points();
        let flip = facet.cells().0 != cell.index();

        for [a, b, c] in split_cells_into_triangles(facet.triangulation()) {
            let triangle = [points[a], points[b], points[c]];
            result.push(if flip {
                [triangle[0], triangle[2], triangle[1]]
            } else {
                triangle
            });
        }
    }

    result
}

/// Tessellates a volume cell into positively oriented tetrahedra.
///
/// The boundary triangles are connected to the center of the cell. If the
/// cell is not star-shaped w.r.t. its center, each convex piece of the cell
/// is tessellated from its own center instead. Tetrahedra with a volume
/// below `tolerance` are dropped.
///
/// Fails if a convex piece is not star-shaped w.r.t. its own center, which
/// only happens if its faces are inconsistently oriented.
pub(crate) fn tessellate(
    cell: &VolumeCell,
    triangles: &[[PointId; 3]],
    points: &mut HashMap<PointId, Point<Real>>,
    registry: &PointRegistry,
    tolerance: Real,
    mode: ArithmeticMode,
) -> Result<Vec<IntegrationCell>, CutError> {
    let vertices: Vec<_> = cell
        .vertices()
        .iter()
        .filter_map(|id| points.get(id).copied())
        .collect();

    if let Some(cells) = star(triangles, &vertices, points, registry, tolerance, mode) {
        return Ok(cells);
    }

    log::debug!(
        "volume cell {} of element {} is not star-shaped, tessellating piece by piece",
        cell.index(),
        cell.element()
    );

    let mut result = Vec::new();
    for faces in cell.pieces() {
        let mut piece_triangles = Vec::new();
        for face in faces {
            for i in 1..face.len().saturating_sub(1) {
                piece_triangles.push([face[0], face[i], face[i + 1]]);
            }
        }

        let mut piece_vertices: Vec<_> = faces.iter().flatten().copied().collect();
        piece_vertices.sort_unstable();
        piece_vertices.dedup();
        let piece_vertices: Vec<_> = piece_vertices
            .iter()
            .filter_map(|id| points.get(id).copied())
            .collect();

        match star(&piece_triangles, &piece_vertices, points, registry, tolerance, mode) {
            Some(cells) => result.extend(cells),
            None => {
                log::error!(
                    "element {}: a convex piece of volume cell {} is not star-shaped (vertices: {:?})",
                    cell.element(),
                    cell.index(),
                    piece_vertices
                );
                return Err(CutError::InvalidPiece {
                    element: cell.element(),
                    cell: cell.index(),
                    points: piece_vertices,
                });
            }
        }
    }

    Ok(result)
}

fn star(
    triangles: &[[PointId; 3]],
    vertices: &[Point<Real>],
    points: &mut HashMap<PointId, Point<Real>>,
    registry: &PointRegistry,
    tolerance: Real,
    mode: ArithmeticMode,
) -> Option<Vec<IntegrationCell>> {
    let center = vertex_average(vertices);
    let center_id = registry.new_point(&center, None, None, registry.merge_tolerance());
    let center = registry.coords(center_id);
    let _ = points.entry(center_id).or_insert(center);

    let mut result = Vec::with_capacity(triangles.len());
    for [a, b, c] in triangles {
        let (pa, pb, pc) = (points.get(a)?, points.get(b)?, points.get(c)?);
        let volume = orient3d(pa, pc, pb, &center, mode) / 6.0;

        if volume < -tolerance {
            return None;
        }
        if volume > tolerance {
            result.push(IntegrationCell {
                points: [*a, *c, *b, center_id],
                volume,
            });
        }
    }

    Some(result)
}
