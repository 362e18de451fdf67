//! Construction of the volume cells and facets of one element.

use super::cutter::{CutContext, Cutter, CutterKey, CutterShape, LinearField};
use super::piece::{ConvexPiece, FaceKind, PieceSet, SplitOutcome};
use super::{CutField, Position, VolumeCell};
use crate::element::Element;
use crate::error::CutError;
use crate::facet::{merge_polygons, Facet, FacetFlags, FacetSource};
use crate::math::{Point, Real, Vector};
use crate::options::Options;
use crate::point::{PointId, PointRegistry};
use crate::predicates::ArithmeticMode;
use crate::side::Side;
use crate::utils::hashmap::HashMap;
use crate::utils::{newell_normal, vertex_average};
use ena::unify::{InPlaceUnificationTable, UnifyKey};

/// Maximum distance between the unit normals of two faces merged into the
/// same facet.
const COPLANARITY_TOLERANCE: Real = 1.0e-8;

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
struct PieceKey(u32);

impl UnifyKey for PieceKey {
    type Value = ();
    fn index(&self) -> u32 {
        self.0
    }
    fn from_index(u: u32) -> PieceKey {
        PieceKey(u)
    }
    fn tag() -> &'static str {
        "PieceKey"
    }
}

/// Cuts an element by the level-set field and/or the given sides, and
/// replaces its facets and volume cells.
pub(crate) fn cut_element(
    element: &mut Element,
    sides: &[&Side],
    fields: &[CutField],
    registry: &PointRegistry,
    options: &Options,
) -> Result<(), CutError> {
    let tolerance = options.geometric_tolerance_for(element.diameter());
    let mode = options.arithmetic;

    let mut pieces = PieceSet::from_tets(element.cell_type(), element.tets(), element.node_points());
    let level_set = if fields.contains(&CutField::LevelSet) {
        level_set_fields(element, mode)
    } else {
        None
    };

    let mut sides = sides.to_vec();
    sides.sort_by_key(|side| side.id());

    {
        let mut ctx = CutContext::new(registry, &mut element.points, mode);

        if let Some(level_set) = &level_set {
            cut_by_level_set(&mut pieces, level_set, tolerance, &mut ctx);
            demote_touching_level_set_faces(&mut pieces, level_set, tolerance, &mut ctx);
        }

        if fields.contains(&CutField::Sides) {
            for side in &sides {
                for patch in 0..side.patches().len() {
                    cut_by_patch(&mut pieces, side, patch, tolerance, &mut ctx);
                }
            }
        }
    }

    if fields.contains(&CutField::Sides) {
        check_intersections(element, &pieces, &sides, tolerance, mode)?;
    }

    let components = connected_components(&pieces);
    let (mut cells, facets) = build_cells(element, &pieces, &components, tolerance);

    if let Some(level_set) = &level_set {
        level_set_positions(element, &pieces, &components, &mut cells, level_set, tolerance, mode)?;
    }

    if fields.contains(&CutField::Sides) {
        side_positions(element, &mut cells, &facets, &sides)?;
    }

    let is_cut = facets.iter().any(|facet| facet.is_cut_surface());
    if !is_cut && options.simple_shape_shortcut && cells.len() == 1 {
        cells[0].is_simple = true;
    }

    log::debug!(
        "element {}: {} pieces, {} volume cells, {} facets",
        element.id(),
        pieces.len(),
        cells.len(),
        facets.len()
    );

    element.cut_sides = sides.iter().map(|side| side.id()).collect();
    element.facets = facets;
    element.volume_cells = cells;
    element.is_cut = is_cut;
    Ok(())
}

fn level_set_fields(element: &Element, mode: ArithmeticMode) -> Option<Vec<Option<LinearField>>> {
    let values = element.level_set_values()?;
    let coords = element.coords();
    Some(
        element
            .tets()
            .iter()
            .map(|tet| LinearField::new(tet.map(|i| coords[i]), tet.map(|i| values[i]), mode))
            .collect(),
    )
}

fn level_set_cutter(field: &LinearField, tolerance: Real) -> Cutter<'_> {
    Cutter {
        key: CutterKey::LevelSet,
        shape: CutterShape::Field(field),
        section_kind: FaceKind::Interface(FacetSource::LevelSet),
        side: None,
        tolerance: tolerance * field.gradient().norm(),
    }
}

fn cut_by_level_set(
    pieces: &mut PieceSet,
    fields: &[Option<LinearField>],
    tolerance: Real,
    ctx: &mut CutContext,
) {
    for id in pieces.keys() {
        let Some(field) = pieces.get(id).and_then(|piece| fields[piece.tet].as_ref()) else {
            continue;
        };
        let _ = pieces.split(id, &level_set_cutter(field, tolerance), ctx);
    }
}

/// The sign of a piece w.r.t. the level-set field of its tetrahedron, or
/// `None` if the piece lies on the zero set.
fn level_set_sign(
    pieces: &PieceSet,
    id: usize,
    fields: &[Option<LinearField>],
    tolerance: Real,
    ctx: &mut CutContext,
) -> Option<bool> {
    let field = pieces.get(id).and_then(|piece| fields[piece.tet].as_ref())?;
    let cutter = level_set_cutter(field, tolerance);
    pieces
        .values(id, &cutter, ctx)
        .into_iter()
        .find(|(_, value)| value.abs() > cutter.tolerance)
        .map(|(_, value)| value < 0.0)
}

/// A decomposition face on the zero set, with the level-set of the same sign
/// on both sides, does not separate anything.
fn demote_touching_level_set_faces(
    pieces: &mut PieceSet,
    fields: &[Option<LinearField>],
    tolerance: Real,
    ctx: &mut CutContext,
) {
    let mut demoted = Vec::new();

    for id in pieces.keys() {
        let faces = match pieces.get(id) {
            Some(piece) => piece.faces.clone(),
            None => continue,
        };
        for face in faces {
            let Some(other) = face.neighbor else {
                continue;
            };
            if face.kind != FaceKind::Interface(FacetSource::LevelSet) || other < id {
                continue;
            }
            let sign = level_set_sign(pieces, id, fields, tolerance, ctx);
            let other_sign = level_set_sign(pieces, other, fields, tolerance, ctx);
            if sign.is_some() && sign == other_sign {
                demoted.push((id, other));
            }
        }
    }

    for (a, b) in demoted {
        log::trace!("level-set only touches the face between pieces {} and {}", a, b);
        pieces.set_face_kind(a, b, FaceKind::Internal);
        pieces.set_face_kind(b, a, FaceKind::Internal);
    }
}

fn cut_by_patch(
    pieces: &mut PieceSet,
    side: &Side,
    patch_id: usize,
    tolerance: Real,
    ctx: &mut CutContext,
) {
    let patch = &side.patches()[patch_id];
    let edge_planes = patch.edge_planes();
    let mode = ctx.mode;
    let plane_cutter = Cutter {
        key: CutterKey::Patch {
            side: side.id(),
            patch: patch_id,
        },
        shape: CutterShape::Plane(&patch.plane),
        section_kind: FaceKind::Interface(FacetSource::CutSide(side.id())),
        side: Some(side.id()),
        tolerance,
    };

    for id in pieces.keys() {
        let section = approximate_section(pieces, id, &plane_cutter, ctx);
        if section.is_empty() {
            continue;
        }

        let distances: Vec<Vec<Real>> = edge_planes
            .iter()
            .map(|plane| {
                section
                    .iter()
                    .map(|pt| plane.signed_distance(pt, mode))
                    .collect()
            })
            .collect();

        if distances
            .iter()
            .any(|d| d.iter().all(|value| *value >= -tolerance))
        {
            continue;
        }

        let mut current = id;
        let mut outside = false;

        for (edge, plane) in edge_planes.iter().enumerate() {
            let crossed = distances[edge].iter().any(|value| *value < -tolerance)
                && distances[edge].iter().any(|value| *value > tolerance);
            if !crossed {
                continue;
            }

            let edge_cutter = Cutter {
                key: CutterKey::PatchEdge {
                    side: side.id(),
                    patch: patch_id,
                    edge,
                },
                shape: CutterShape::Plane(plane),
                section_kind: FaceKind::Internal,
                side: None,
                tolerance,
            };

            match pieces.split(current, &edge_cutter, ctx) {
                SplitOutcome::Split { negative, .. } => current = negative,
                SplitOutcome::Unchanged => {
                    let inside = pieces
                        .values(current, &edge_cutter, ctx)
                        .iter()
                        .any(|(_, value)| *value < -tolerance);
                    if !inside {
                        outside = true;
                        break;
                    }
                }
            }
        }

        if !outside {
            let _ = pieces.split(current, &plane_cutter, ctx);
        }
    }
}

/// The points where the zero set of `cutter` meets the edges of a piece,
/// without registering them.
fn approximate_section(
    pieces: &PieceSet,
    id: usize,
    cutter: &Cutter,
    ctx: &mut CutContext,
) -> Vec<Point<Real>> {
    let values: HashMap<PointId, Real> = pieces.values(id, cutter, ctx).into_iter().collect();
    let Some(piece) = pieces.get(id) else {
        return Vec::new();
    };

    let mut result = Vec::new();
    for (vertex, value) in &values {
        if value.abs() <= cutter.tolerance {
            result.push(ctx.coords(*vertex));
        }
    }

    for face in &piece.faces {
        let n = face.points.len();
        for i in 0..n {
            let (a, b) = (face.points[i], face.points[(i + 1) % n]);
            let (va, vb) = (values[&a], values[&b]);
            if (va < -cutter.tolerance && vb > cutter.tolerance)
                || (va > cutter.tolerance && vb < -cutter.tolerance)
            {
                let (pa, pb) = (ctx.coords(a), ctx.coords(b));
                result.push(pa + (pb - pa) * (va / (va - vb)));
            }
        }
    }

    result
}

fn check_intersections(
    element: &Element,
    pieces: &PieceSet,
    sides: &[&Side],
    tolerance: Real,
    mode: ArithmeticMode,
) -> Result<(), CutError> {
    let coords = element.coords();

    for side in sides {
        let source = FacetSource::CutSide(side.id());
        let found = pieces.iter().any(|(_, piece)| {
            piece
                .faces
                .iter()
                .any(|face| face.kind == FaceKind::Interface(source))
        });
        if found {
            continue;
        }

        for patch in side.patches() {
            let edge_planes = patch.edge_planes();
            for [i, j] in element.cell_type().edges() {
                let (a, b) = (coords[*i], coords[*j]);
                let da = patch.plane.signed_distance(&a, mode);
                let db = patch.plane.signed_distance(&b, mode);
                if da.abs() <= tolerance || db.abs() <= tolerance || (da < 0.0) == (db < 0.0) {
                    continue;
                }

                let pt = a + (b - a) * (da / (da - db));
                let strictly_inside = edge_planes
                    .iter()
                    .all(|plane| plane.signed_distance(&pt, mode) < -tolerance);
                if strictly_inside {
                    log::error!(
                        "cut side {} {:?} crosses the edge {:?} of element {} at {:?} but no intersection was built",
                        side.id(),
                        side.coords(),
                        [a, b],
                        element.id(),
                        pt
                    );
                    return Err(CutError::MissingIntersection {
                        element: element.id(),
                        side: side.id(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Groups the pieces connected through internal faces. Components are sorted
/// by their smallest piece id.
fn connected_components(pieces: &PieceSet) -> Vec<Vec<usize>> {
    let ids = pieces.keys();
    let dense: HashMap<usize, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut ufind: InPlaceUnificationTable<PieceKey> = InPlaceUnificationTable::new();
    let keys: Vec<PieceKey> = ids.iter().map(|_| ufind.new_key(())).collect();

    for (i, id) in ids.iter().enumerate() {
        let Some(piece) = pieces.get(*id) else {
            continue;
        };
        for face in &piece.faces {
            if face.kind != FaceKind::Internal {
                continue;
            }
            if let Some(j) = face.neighbor.and_then(|n| dense.get(&n)) {
                ufind.union(keys[i], keys[*j]);
            }
        }
    }

    let mut component_of_root: HashMap<PieceKey, usize> = HashMap::default();
    let mut components: Vec<Vec<usize>> = Vec::new();

    for (i, id) in ids.iter().enumerate() {
        let root = ufind.find(keys[i]);
        let next = components.len();
        let component = *component_of_root.entry(root).or_insert(next);
        if component == next {
            components.push(Vec::new());
        }
        components[component].push(*id);
    }

    components
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct FacetGroup {
    source: FacetSource,
    cells: (usize, Option<usize>),
}

fn build_cells(
    element: &Element,
    pieces: &PieceSet,
    components: &[Vec<usize>],
    tolerance: Real,
) -> (Vec<VolumeCell>, Vec<Facet>) {
    let coords = &element.points;
    let mut cell_of: HashMap<usize, usize> = HashMap::default();
    for (cell, component) in components.iter().enumerate() {
        for id in component {
            let _ = cell_of.insert(*id, cell);
        }
    }

    let mut cells: Vec<VolumeCell> = components
        .iter()
        .enumerate()
        .map(|(index, component)| {
            let component_pieces: Vec<&ConvexPiece> =
                component.iter().filter_map(|id| pieces.get(*id)).collect();
            let volume = component_pieces.iter().map(|p| p.volume(coords)).sum();
            let faces = component_pieces
                .iter()
                .map(|p| p.faces.iter().map(|f| f.points.clone()).collect())
                .collect();
            VolumeCell::new(index, element.id(), faces, volume)
        })
        .collect();

    let mut groups: Vec<(FacetGroup, Vec<Vec<PointId>>)> = Vec::new();

    for (cell, component) in components.iter().enumerate() {
        for piece in component.iter().filter_map(|id| pieces.get(*id)) {
            for face in &piece.faces {
                let group = match face.kind {
                    FaceKind::Internal => continue,
                    FaceKind::ElementBoundary(f) => FacetGroup {
                        source: FacetSource::ElementFace(f),
                        cells: (cell, None),
                    },
                    FaceKind::Interface(source) => {
                        let other = face.neighbor.and_then(|n| cell_of.get(&n).copied());
                        match other {
                            Some(other) if other <= cell => continue,
                            _ => FacetGroup {
                                source,
                                cells: (cell, other),
                            },
                        }
                    }
                };

                match groups.iter_mut().find(|(g, _)| *g == group) {
                    Some((_, polygons)) => polygons.push(face.points.clone()),
                    None => groups.push((group, vec![face.points.clone()])),
                }
            }
        }
    }

    let mut facets = Vec::new();

    for (group, polygons) in groups {
        let flags = match (group.source, group.cells.1) {
            (FacetSource::ElementFace(_), _) => FacetFlags::ELEMENT_BOUNDARY,
            (_, Some(_)) => FacetFlags::CUT_SURFACE,
            (_, None) => FacetFlags::empty(),
        };

        for cluster in coplanar_clusters(&polygons, coords, tolerance) {
            let members: Vec<Vec<PointId>> =
                cluster.iter().map(|i| polygons[*i].clone()).collect();
            let merged = if members.len() > 1 {
                merge_polygons(&members, coords, tolerance)
            } else {
                None
            };

            let loops = match merged {
                Some(merged) => vec![(merged, flags | FacetFlags::MERGED)],
                None => members.into_iter().map(|m| (m, flags)).collect(),
            };

            for (points, mut flags) in loops {
                if is_concave(&points, coords) {
                    flags |= FacetFlags::CONCAVE;
                }
                let index = facets.len();
                facets.push(Facet::new(points, group.source, flags, group.cells));
                cells[group.cells.0].facets.push(index);
                if let Some(other) = group.cells.1 {
                    cells[other].facets.push(index);
                }
            }
        }
    }

    (cells, facets)
}

/// Greedy clustering of polygons by supporting plane.
fn coplanar_clusters(
    polygons: &[Vec<PointId>],
    coords: &HashMap<PointId, Point<Real>>,
    tolerance: Real,
) -> Vec<Vec<usize>> {
    let mut clusters: Vec<(Vector<Real>, Real, Vec<usize>)> = Vec::new();

    for (i, polygon) in polygons.iter().enumerate() {
        let pts: Vec<_> = polygon.iter().filter_map(|id| coords.get(id).copied()).collect();
        let normal = newell_normal(&pts).try_normalize(0.0).unwrap_or_else(Vector::zeros);
        let offset = normal.dot(&vertex_average(&pts).coords);

        let found = clusters.iter_mut().find(|(n, d, _)| {
            (n - normal).norm() <= COPLANARITY_TOLERANCE && (d - offset).abs() <= tolerance
        });
        match found {
            Some((_, _, members)) => members.push(i),
            None => clusters.push((normal, offset, vec![i])),
        }
    }

    clusters.into_iter().map(|(_, _, members)| members).collect()
}

fn is_concave(points: &[PointId], coords: &HashMap<PointId, Point<Real>>) -> bool {
    let pts: Vec<_> = points.iter().filter_map(|id| coords.get(id).copied()).collect();
    let normal = newell_normal(&pts);
    let n = pts.len();
    let scale = normal.norm();

    (0..n).any(|i| {
        let prev = pts[(i + n - 1) % n];
        let next = pts[(i + 1) % n];
        let turn = (pts[i] - prev).cross(&(next - pts[i])).dot(&normal);
        turn < -1.0e-8 * scale * scale
    })
}

/// Assigns the level-set position of every cell.
fn level_set_positions(
    element: &Element,
    pieces: &PieceSet,
    components: &[Vec<usize>],
    cells: &mut [VolumeCell],
    fields: &[Option<LinearField>],
    tolerance: Real,
    mode: ArithmeticMode,
) -> Result<(), CutError> {
    for (cell_id, cell) in cells.iter_mut().enumerate() {
        let position =
            level_set_position(element, pieces, &components[cell_id], fields, tolerance, mode)
                .map_err(|point| {
                    log::error!(
                        "element {}: volume cell {} changes sign w.r.t. the level-set at {:?}",
                        element.id(),
                        cell_id,
                        point
                    );
                    CutError::SignChangeInUnsplitCell {
                        element: element.id(),
                        cell: cell_id,
                        field: CutField::LevelSet,
                        point,
                    }
                })?;
        cell.set_position(CutField::LevelSet, position);
    }
    Ok(())
}

fn level_set_position(
    element: &Element,
    pieces: &PieceSet,
    component: &[usize],
    fields: &[Option<LinearField>],
    tolerance: Real,
    mode: ArithmeticMode,
) -> Result<Position, Point<Real>> {
    let mut inside = None;
    let mut outside = None;
    let mut centroid_value = None;

    for piece in component.iter().filter_map(|id| pieces.get(*id)) {
        let Some(field) = fields[piece.tet].as_ref() else {
            continue;
        };
        let field_tolerance = tolerance * field.gradient().norm();
        let pts: Vec<_> = piece
            .vertices()
            .iter()
            .filter_map(|id| element.points.get(id).copied())
            .collect();

        for pt in &pts {
            match Position::from_signed(field.value(pt, mode), field_tolerance) {
                Position::Inside => inside = Some(*pt),
                Position::Outside => outside = Some(*pt),
                _ => {}
            }
        }

        if centroid_value.is_none() {
            centroid_value = Some((field.value(&vertex_average(&pts), mode), field_tolerance));
        }
    }

    match (inside, outside) {
        (Some(_), Some(pt)) => Err(pt),
        (Some(_), None) => Ok(Position::Inside),
        (None, Some(_)) => Ok(Position::Outside),
        (None, None) => Ok(centroid_value
            .map_or(Position::OnCutSurface, |(value, tol)| Position::from_signed(value, tol))),
    }
}

/// Positions w.r.t. the cut sides, from the orientation of the side facets
/// bounding each cell.
///
/// Cells not bounded by any side facet inherit the position of the cells
/// they share a level-set facet with. Cells still undecided are resolved by
/// the session from neighboring elements.
fn side_positions(
    element: &Element,
    cells: &mut [VolumeCell],
    facets: &[Facet],
    sides: &[&Side],
) -> Result<(), CutError> {
    let mut positions = vec![Position::Undecided; cells.len()];

    for (cell_id, cell) in cells.iter().enumerate() {
        let mut position = Position::Undecided;

        for facet in cell.facets.iter().map(|i| &facets[*i]) {
            let FacetSource::CutSide(side_id) = facet.source() else {
                continue;
            };
            let Some(side) = sides.iter().find(|side| side.id() == side_id) else {
                continue;
            };

            let mut normal = facet.normal(&element.points);
            if facet.cells().0 != cell_id {
                normal = -normal;
            }
            let current = if normal.dot(&side.normal()) > 0.0 {
                Position::Inside
            } else {
                Position::Outside
            };

            if position != Position::Undecided && position != current {
                let point = vertex_average(&facet.coordinates(&element.points));
                log::error!(
                    "element {}: volume cell {} lies on both sides of the cut sides near {:?}",
                    element.id(),
                    cell_id,
                    point
                );
                return Err(CutError::SignChangeInUnsplitCell {
                    element: element.id(),
                    cell: cell_id,
                    field: CutField::Sides,
                    point,
                });
            }
            position = current;
        }

        positions[cell_id] = position;
    }

    let mut changed = true;
    while changed {
        changed = false;
        for facet in facets {
            if facet.source() != FacetSource::LevelSet {
                continue;
            }
            let (a, Some(b)) = facet.cells() else {
                continue;
            };
            match (positions[a], positions[b]) {
                (Position::Undecided, Position::Undecided) => {}
                (Position::Undecided, known) => {
                    positions[a] = known;
                    changed = true;
                }
                (known, Position::Undecided) => {
                    positions[b] = known;
                    changed = true;
                }
                _ => {}
            }
        }
    }

    for (cell, position) in cells.iter_mut().zip(positions) {
        cell.set_position(CutField::Sides, position);
    }

    Ok(())
}
