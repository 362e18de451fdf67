//! Merging of coplanar polygons into a single facet loop.

use crate::math::{Point, Real};
use crate::point::PointId;
use crate::utils::hashmap::{HashMap, HashSet};
use ordered_float::OrderedFloat;

/// Merges coplanar, consistently oriented polygons sharing edges into a
/// single loop.
///
/// Corners of one polygon lying on an edge of another (T-junctions) are
/// inserted first, then every edge traversed in both directions is removed.
/// Returns `None` if the remaining edges do not form exactly one simple loop
/// (disconnected polygons, holes, or pinched corners).
pub fn merge_polygons(
    polygons: &[Vec<PointId>],
    coords: &HashMap<PointId, Point<Real>>,
    tolerance: Real,
) -> Option<Vec<PointId>> {
    match polygons {
        [] => return None,
        [single] => return Some(single.clone()),
        _ => {}
    }

    let mut all_points: Vec<PointId> = polygons.iter().flatten().copied().collect();
    all_points.sort_unstable();
    all_points.dedup();

    let mut edge_balance: HashMap<(PointId, PointId), i32> = HashMap::default();
    let mut edge_order = Vec::new();

    for polygon in polygons {
        let refined = insert_t_junctions(polygon, &all_points, coords, tolerance)?;
        let n = refined.len();
        for i in 0..n {
            let (a, b) = (refined[i], refined[(i + 1) % n]);
            if a == b {
                continue;
            }
            *edge_balance.entry((a, b)).or_insert(0) += 1;
            *edge_balance.entry((b, a)).or_insert(0) -= 1;
            edge_order.push((a, b));
        }
    }

    let mut successor: HashMap<PointId, PointId> = HashMap::default();
    let mut boundary = Vec::new();
    let mut seen = HashSet::default();

    for edge in &edge_order {
        if edge_balance.get(edge).copied().unwrap_or(0) <= 0 || !seen.insert(*edge) {
            continue;
        }
        if edge_balance[edge] != 1 || successor.insert(edge.0, edge.1).is_some() {
            return None;
        }
        boundary.push(*edge);
    }

    let start = boundary.first()?.0;
    let mut result = vec![start];
    let mut current = successor.get(&start).copied()?;

    while current != start {
        if result.len() > boundary.len() {
            return None;
        }
        result.push(current);
        current = successor.get(&current).copied()?;
    }

    if result.len() != boundary.len() || result.len() < 3 {
        return None;
    }

    Some(result)
}

fn insert_t_junctions(
    polygon: &[PointId],
    candidates: &[PointId],
    coords: &HashMap<PointId, Point<Real>>,
    tolerance: Real,
) -> Option<Vec<PointId>> {
    let n = polygon.len();
    let mut result = Vec::with_capacity(n);

    for i in 0..n {
        let (a, b) = (polygon[i], polygon[(i + 1) % n]);
        result.push(a);

        let pa = coords.get(&a)?;
        let pb = coords.get(&b)?;
        let dir = pb - pa;
        let length2 = dir.norm_squared();
        if length2 == 0.0 {
            continue;
        }

        let mut on_edge: Vec<(Real, PointId)> = candidates
            .iter()
            .filter(|id| **id != a && **id != b)
            .filter_map(|id| {
                let pt = coords.get(id)?;
                let t = (pt - pa).dot(&dir) / length2;
                let dist = (pt - (pa + dir * t)).norm();
                (t > 0.0 && t < 1.0 && dist <= tolerance).then_some((t, *id))
            })
            .collect();
        on_edge.sort_by_key(|(t, _)| OrderedFloat(*t));
        result.extend(on_edge.into_iter().map(|(_, id)| id));
    }

    Some(result)
}
