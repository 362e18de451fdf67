use super::{CutPoint, PointId};
use crate::element::NodeId;
use crate::math::{Point, Real};
use crate::side::SideId;
use crate::utils::hashmap::HashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use smallvec::SmallVec;

/// Maximum number of grid cells searched in each direction around a point.
/// Larger search radii scan every registered point.
const MAX_REACH: i64 = 3;

/// Grid coordinates are clamped to this magnitude so that far away points
/// share boundary cells instead of overflowing the cell indices.
const GRID_LIMIT: Real = (1u64 << 60) as Real;

type GridCell = [i64; 3];
type Partition = HashMap<GridCell, SmallVec<[PointId; 2]>>;
type Guards<'a> = SmallVec<[MutexGuard<'a, Partition>; 32]>;

/// The grid cells and partitions visited by one lookup.
struct Search {
    radius: Real,
    center: GridCell,
    /// `None` if the radius spans too many cells: every point is scanned.
    cells: Option<SmallVec<[GridCell; 27]>>,
    /// Sorted, deduplicated.
    partition_ids: SmallVec<[usize; 32]>,
}

/// Append-only, tolerance-merging point registry, shared by all elements of a
/// cutting session.
///
/// Points are bucketed in a uniform grid whose cells are spread over several
/// partitions, each guarded by its own lock. A lookup locks every partition
/// covering the tolerance neighborhood of the queried point, in increasing
/// order and always before the point storage, so concurrent lookups and
/// insertions never deadlock. An insertion looks for an existing point within
/// the tolerance while holding these locks, and only creates a new point if
/// none is found. Two threads inserting nearly coincident points therefore
/// always end up with the same [`PointId`].
pub struct PointRegistry {
    merge_tolerance: Real,
    cell_size: Real,
    partitions: Box<[Mutex<Partition>]>,
    points: RwLock<Vec<CutPoint>>,
}

impl PointRegistry {
    /// Creates an empty registry merging points closer than `merge_tolerance`.
    pub fn new(merge_tolerance: Real, num_partitions: usize) -> Self {
        let merge_tolerance = merge_tolerance.max(Real::MIN_POSITIVE);
        let partitions = (0..num_partitions.max(1))
            .map(|_| Mutex::new(Partition::default()))
            .collect();

        Self {
            merge_tolerance,
            cell_size: merge_tolerance * 2.0,
            partitions,
            points: RwLock::new(Vec::new()),
        }
    }

    /// The default merge radius of this registry.
    #[inline]
    pub fn merge_tolerance(&self) -> Real {
        self.merge_tolerance
    }

    /// The number of registered points.
    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    /// Is this registry empty?
    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    /// Returns the point registered within `tolerance` of `coords`, or
    /// registers a new one.
    ///
    /// The search radius is at least the merge tolerance of the registry. If
    /// several points lie within the radius the closest one is returned. The
    /// node and side information are attached to the returned point whether
    /// it is new or not.
    pub fn new_point(
        &self,
        coords: &Point<Real>,
        node: Option<NodeId>,
        side: Option<SideId>,
        tolerance: Real,
    ) -> PointId {
        let search = self.search(coords, tolerance);
        let mut guards = self.lock(&search);

        let found = {
            let points = self.points.read();
            self.closest(&points, &search, &guards, coords)
        };

        let mut points = self.points.write();

        if let Some(id) = found {
            let point = &mut points[id.index()];
            merge_info(point, node, side, search.radius);
            return id;
        }

        let id = PointId(points.len() as u32);
        points.push(CutPoint {
            id,
            coords: *coords,
            node,
            sides: side.into_iter().collect(),
            tolerance: search.radius,
        });
        drop(points);

        let part = self.partition_of(&search.center);
        if let Ok(slot) = search.partition_ids.binary_search(&part) {
            guards[slot].entry(search.center).or_default().push(id);
        }

        id
    }

    /// Finds the registered point closest to `coords` within `tolerance`.
    pub fn find(&self, coords: &Point<Real>, tolerance: Real) -> Option<PointId> {
        let search = self.search(coords, tolerance);
        let guards = self.lock(&search);
        let points = self.points.read();
        self.closest(&points, &search, &guards, coords)
    }

    /// Records that an existing point lies on the given cut side.
    pub fn add_side(&self, id: PointId, side: SideId) {
        let mut points = self.points.write();
        if let Some(point) = points.get_mut(id.index()) {
            if !point.sides.contains(&side) {
                point.sides.push(side);
            }
        }
    }

    /// A copy of the point with the given id.
    pub fn point(&self, id: PointId) -> Option<CutPoint> {
        self.points.read().get(id.index()).cloned()
    }

    /// The coordinates of the point with the given id.
    ///
    /// # Panics
    /// If `id` was not issued by this registry.
    pub fn coords(&self, id: PointId) -> Point<Real> {
        self.points.read()[id.index()].coords
    }

    fn search(&self, coords: &Point<Real>, tolerance: Real) -> Search {
        let radius = tolerance.max(self.merge_tolerance);
        let center = self.grid_cell(coords);
        let reach = (radius / self.cell_size).ceil();

        if reach <= MAX_REACH as Real {
            let cells = neighborhood(&center, (reach as i64).max(1));
            let mut partition_ids: SmallVec<[usize; 32]> =
                cells.iter().map(|cell| self.partition_of(cell)).collect();
            partition_ids.sort_unstable();
            partition_ids.dedup();

            Search {
                radius,
                center,
                cells: Some(cells),
                partition_ids,
            }
        } else {
            Search {
                radius,
                center,
                cells: None,
                partition_ids: (0..self.partitions.len()).collect(),
            }
        }
    }

    fn lock(&self, search: &Search) -> Guards<'_> {
        search
            .partition_ids
            .iter()
            .map(|part| self.partitions[*part].lock())
            .collect()
    }

    /// The closest point within the search radius. Every partition of the
    /// search must be locked by `guards`.
    fn closest(
        &self,
        points: &[CutPoint],
        search: &Search,
        guards: &[MutexGuard<'_, Partition>],
        coords: &Point<Real>,
    ) -> Option<PointId> {
        let mut best: Option<(Real, PointId)> = None;
        let mut visit = |id: PointId| {
            let dist = (points[id.index()].coords - coords).norm();
            if dist <= search.radius && is_better(dist, id, best) {
                best = Some((dist, id));
            }
        };

        match &search.cells {
            Some(cells) => {
                for cell in cells {
                    let part = self.partition_of(cell);
                    let bucket = search
                        .partition_ids
                        .binary_search(&part)
                        .ok()
                        .and_then(|slot| guards[slot].get(cell));
                    for id in bucket.into_iter().flatten() {
                        visit(*id);
                    }
                }
            }
            None => points.iter().for_each(|point| visit(point.id)),
        }

        best.map(|(_, id)| id)
    }

    fn grid_cell(&self, pt: &Point<Real>) -> GridCell {
        let coord = |x: Real| (x / self.cell_size).floor().clamp(-GRID_LIMIT, GRID_LIMIT) as i64;
        [coord(pt.x), coord(pt.y), coord(pt.z)]
    }

    fn partition_of(&self, cell: &GridCell) -> usize {
        let hash = (cell[0].wrapping_mul(73_856_093))
            ^ (cell[1].wrapping_mul(19_349_663))
            ^ (cell[2].wrapping_mul(83_492_791));
        (hash as u64 % self.partitions.len() as u64) as usize
    }
}

fn neighborhood(center: &GridCell, reach: i64) -> SmallVec<[GridCell; 27]> {
    let mut cells = SmallVec::new();
    for dx in -reach..=reach {
        for dy in -reach..=reach {
            for dz in -reach..=reach {
                cells.push([
                    center[0].saturating_add(dx),
                    center[1].saturating_add(dy),
                    center[2].saturating_add(dz),
                ]);
            }
        }
    }
    cells
}

fn is_better(dist: Real, id: PointId, best: Option<(Real, PointId)>) -> bool {
    match best {
        None => true,
        Some((best_dist, best_id)) => dist < best_dist || (dist == best_dist && id < best_id),
    }
}

fn merge_info(point: &mut CutPoint, node: Option<NodeId>, side: Option<SideId>, radius: Real) {
    match (point.node, node) {
        (None, Some(node)) => point.node = Some(node),
        (Some(existing), Some(node)) if existing != node => {
            log::warn!(
                "nodes {} and {} are closer than the merge tolerance at {:?}",
                existing,
                node,
                point.coords
            );
        }
        _ => {}
    }

    if let Some(side) = side {
        if !point.sides.contains(&side) {
            point.sides.push(side);
        }
    }

    point.tolerance = point.tolerance.max(radius);
}
