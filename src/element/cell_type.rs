use crate::math::Real;

/// The topology of a background element.
///
/// Node numbering, edge and face tables follow the usual finite element
/// conventions: the bottom face first, then the top face (hexahedra,
/// wedges) or the apex (pyramids).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum CellType {
    /// Linear tetrahedron.
    Tet4,
    /// Trilinear hexahedron.
    Hex8,
    /// Linear wedge (triangular prism).
    Wedge6,
    /// Linear pyramid with a quadrilateral base.
    Pyramid5,
}

const TET4_EDGES: [[usize; 2]; 6] = [[0, 1], [1, 2], [2, 0], [0, 3], [1, 3], [2, 3]];
const HEX8_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
];
const WEDGE6_EDGES: [[usize; 2]; 9] = [
    [0, 1],
    [1, 2],
    [2, 0],
    [0, 3],
    [1, 4],
    [2, 5],
    [3, 4],
    [4, 5],
    [5, 3],
];
const PYRAMID5_EDGES: [[usize; 2]; 8] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [0, 4],
    [1, 4],
    [2, 4],
    [3, 4],
];

// Faces are counter-clockwise when seen from outside the element.
const TET4_FACES: [&[usize]; 4] = [&[0, 1, 3], &[1, 2, 3], &[0, 3, 2], &[0, 2, 1]];
const HEX8_FACES: [&[usize]; 6] = [
    &[0, 3, 2, 1],
    &[0, 1, 5, 4],
    &[1, 2, 6, 5],
    &[2, 3, 7, 6],
    &[0, 4, 7, 3],
    &[4, 5, 6, 7],
];
const WEDGE6_FACES: [&[usize]; 5] = [
    &[0, 1, 4, 3],
    &[1, 2, 5, 4],
    &[0, 3, 5, 2],
    &[0, 2, 1],
    &[3, 4, 5],
];
const PYRAMID5_FACES: [&[usize]; 5] = [
    &[0, 3, 2, 1],
    &[0, 1, 4],
    &[1, 2, 4],
    &[2, 3, 4],
    &[3, 0, 4],
];

// Positively oriented tetrahedra covering the reference element.
const TET4_TETS: [[usize; 4]; 1] = [[0, 1, 2, 3]];
const HEX8_TETS: [[usize; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
    [0, 5, 1, 6],
];
const WEDGE6_TETS: [[usize; 4]; 3] = [[0, 1, 2, 3], [1, 2, 3, 4], [2, 3, 4, 5]];
const PYRAMID5_TETS: [[usize; 4]; 2] = [[0, 1, 2, 4], [0, 2, 3, 4]];

const TET4_NODES: [[Real; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
];
const HEX8_NODES: [[Real; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];
const WEDGE6_NODES: [[Real; 3]; 6] = [
    [0.0, 0.0, -1.0],
    [1.0, 0.0, -1.0],
    [0.0, 1.0, -1.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
];
const PYRAMID5_NODES: [[Real; 3]; 5] = [
    [-1.0, -1.0, 0.0],
    [1.0, -1.0, 0.0],
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
];

impl CellType {
    /// The number of nodes of this cell type.
    #[inline]
    pub fn num_nodes(self) -> usize {
        match self {
            CellType::Tet4 => 4,
            CellType::Hex8 => 8,
            CellType::Wedge6 => 6,
            CellType::Pyramid5 => 5,
        }
    }

    /// The edges of this cell type, as pairs of local node indices.
    pub fn edges(self) -> &'static [[usize; 2]] {
        match self {
            CellType::Tet4 => &TET4_EDGES,
            CellType::Hex8 => &HEX8_EDGES,
            CellType::Wedge6 => &WEDGE6_EDGES,
            CellType::Pyramid5 => &PYRAMID5_EDGES,
        }
    }

    /// The faces of this cell type, counter-clockwise seen from outside.
    pub fn faces(self) -> &'static [&'static [usize]] {
        match self {
            CellType::Tet4 => &TET4_FACES,
            CellType::Hex8 => &HEX8_FACES,
            CellType::Wedge6 => &WEDGE6_FACES,
            CellType::Pyramid5 => &PYRAMID5_FACES,
        }
    }

    /// The fixed tetrahedral decomposition of this cell type.
    ///
    /// Every tetrahedron is positively oriented on the reference element.
    pub fn tets(self) -> &'static [[usize; 4]] {
        match self {
            CellType::Tet4 => &TET4_TETS,
            CellType::Hex8 => &HEX8_TETS,
            CellType::Wedge6 => &WEDGE6_TETS,
            CellType::Pyramid5 => &PYRAMID5_TETS,
        }
    }

    /// The node coordinates of the reference element.
    pub fn reference_nodes(self) -> &'static [[Real; 3]] {
        match self {
            CellType::Tet4 => &TET4_NODES,
            CellType::Hex8 => &HEX8_NODES,
            CellType::Wedge6 => &WEDGE6_NODES,
            CellType::Pyramid5 => &PYRAMID5_NODES,
        }
    }

    /// The centroid of the reference element, used as initial guess of the
    /// inverse mapping.
    pub fn reference_center(self) -> [Real; 3] {
        match self {
            CellType::Tet4 => [0.25, 0.25, 0.25],
            CellType::Hex8 => [0.0, 0.0, 0.0],
            CellType::Wedge6 => [1.0 / 3.0, 1.0 / 3.0, 0.0],
            CellType::Pyramid5 => [0.0, 0.0, 0.25],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Point, Vector};
    use crate::predicates::{orient3d, ArithmeticMode};
    use crate::utils::newell_normal;

    const ALL: [CellType; 4] = [
        CellType::Tet4,
        CellType::Hex8,
        CellType::Wedge6,
        CellType::Pyramid5,
    ];

    fn nodes(cell: CellType) -> Vec<Point<Real>> {
        cell.reference_nodes()
            .iter()
            .map(|p| Point::new(p[0], p[1], p[2]))
            .collect()
    }

    #[test]
    fn reference_tets_are_positive() {
        for cell in ALL {
            let pts = nodes(cell);
            for tet in cell.tets() {
                let det = orient3d(
                    &pts[tet[0]],
                    &pts[tet[1]],
                    &pts[tet[2]],
                    &pts[tet[3]],
                    ArithmeticMode::Extended,
                );
                assert!(det > 0.0, "{:?} {:?}", cell, tet);
            }
        }
    }

    #[test]
    fn reference_faces_point_outward() {
        for cell in ALL {
            let pts = nodes(cell);
            let center = cell.reference_center();
            let center = Point::new(center[0], center[1], center[2]);

            for face in cell.faces() {
                let face_pts: Vec<_> = face.iter().map(|i| pts[*i]).collect();
                let normal = newell_normal(&face_pts);
                let to_face: Vector<Real> = face_pts[0] - center;
                assert!(normal.dot(&to_face) > 0.0, "{:?} {:?}", cell, face);
            }
        }
    }

    #[test]
    fn every_edge_belongs_to_two_faces() {
        for cell in ALL {
            for [a, b] in cell.edges() {
                let count = cell
                    .faces()
                    .iter()
                    .filter(|face| face.contains(a) && face.contains(b))
                    .count();
                assert_eq!(count, 2, "{:?} edge {} {}", cell, a, b);
            }
        }
    }
}
