//! End-to-end cuts of single elements by level-sets and cut sides.

#[macro_use]
extern crate approx;

use cutcell3d::element::{CellType, NodeId};
use cutcell3d::error::CutError;
use cutcell3d::math::{Point, Real, Vector};
use cutcell3d::options::{BCellGaussPts, Options, VCellGaussPts};
use cutcell3d::session::{CutSession, IntersectionKind};
use cutcell3d::side::SideType;
use cutcell3d::volume_cell::{CutField, Position};
use rand::{Rng, SeedableRng};

fn unit_cube() -> Vec<Point<Real>> {
    vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(1.0, 1.0, 0.0),
        Point::new(0.0, 1.0, 0.0),
        Point::new(0.0, 0.0, 1.0),
        Point::new(1.0, 0.0, 1.0),
        Point::new(1.0, 1.0, 1.0),
        Point::new(0.0, 1.0, 1.0),
    ]
}

fn node_ids(n: usize) -> Vec<NodeId> {
    (0..n as NodeId).collect()
}

fn level_set_of(coords: &[Point<Real>], f: impl Fn(&Point<Real>) -> Real) -> Vec<Real> {
    coords.iter().map(f).collect()
}

fn cut_by_level_set(
    cell_type: CellType,
    coords: &[Point<Real>],
    values: &[Real],
    options: Options,
) -> CutSession {
    let mut session = CutSession::new(IntersectionKind::LevelSet, options);
    session
        .add_element(1, &node_ids(coords.len()), coords, cell_type, Some(values))
        .unwrap();
    session.cut().unwrap();
    session.cut_finalize_default().unwrap();
    session
}

fn horizontal_quad(z: Real) -> Vec<Point<Real>> {
    vec![
        Point::new(-0.5, -0.5, z),
        Point::new(1.5, -0.5, z),
        Point::new(1.5, 1.5, z),
        Point::new(-0.5, 1.5, z),
    ]
}

fn sorted_volumes(session: &CutSession, element: i32) -> Vec<Real> {
    let mut volumes: Vec<Real> = session
        .element(element)
        .unwrap()
        .volume_cells()
        .iter()
        .map(|cell| cell.volume())
        .collect();
    volumes.sort_by(|a, b| a.total_cmp(b));
    volumes
}

fn assert_partition(session: &CutSession) {
    for element in session.elements() {
        let total: Real = element.volume_cells().iter().map(|c| c.volume()).sum();
        assert_relative_eq!(total, element.volume(), epsilon = 1.0e-10);

        for cell in element.volume_cells() {
            let weights: Real = cell.gauss_points().iter().map(|pt| pt.weight).sum();
            assert_relative_eq!(weights, cell.volume(), epsilon = 1.0e-12);
        }
    }
}

#[test]
fn cube_cut_through_one_corner() {
    let coords = unit_cube();
    let mut values = vec![-1.0; 8];
    values[0] = 1.0;
    let session = cut_by_level_set(CellType::Hex8, &coords, &values, Options::default());

    let element = session.element(1).unwrap();
    assert!(element.is_cut());
    assert_eq!(element.volume_cells().len(), 2);
    for cell in element.volume_cells() {
        assert!(!cell.integration_cells().is_empty());
        assert!(!cell.is_simple());
    }

    let volumes = sorted_volumes(&session, 1);
    assert_relative_eq!(volumes[0], 0.125, epsilon = 1.0e-10);
    assert_relative_eq!(volumes[0] + volumes[1], 1.0, epsilon = 1.0e-10);

    let corner = element
        .volume_cells()
        .iter()
        .find(|cell| cell.volume() < 0.5)
        .unwrap();
    assert_eq!(corner.position(), Position::Outside);
    assert_eq!(element.node_positions(CutField::LevelSet)[0], Position::Outside);
    assert_eq!(element.node_positions(CutField::LevelSet)[6], Position::Inside);
    assert_eq!(
        element.point_position(&Point::new(0.05, 0.05, 0.05), CutField::LevelSet),
        Some(Position::Outside)
    );
    assert_eq!(
        element.point_position(&Point::new(0.9, 0.8, 0.7), CutField::LevelSet),
        Some(Position::Inside)
    );
    assert_eq!(
        element.point_position(&Point::new(2.0, 0.5, 0.5), CutField::LevelSet),
        None
    );
    assert_partition(&session);
}

#[test]
fn uncut_cube_is_a_single_simple_cell() {
    let coords = unit_cube();
    let session = cut_by_level_set(CellType::Hex8, &coords, &[2.0; 8], Options::default());

    let element = session.element(1).unwrap();
    assert!(!element.is_cut());
    assert_eq!(element.volume_cells().len(), 1);

    let cell = &element.volume_cells()[0];
    assert!(cell.is_simple());
    assert_eq!(cell.position(), Position::Outside);
    assert_eq!(cell.strategy(), Some(VCellGaussPts::Tessellation));
    assert_relative_eq!(cell.volume(), 1.0, epsilon = 1.0e-12);
    assert!(cell.boundary_cells().is_empty());
}

#[test]
fn tessellation_and_direct_divergence_agree() {
    let coords = unit_cube();
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);

    for _ in 0..10 {
        let normal = [
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(0.2..1.0),
        ];
        let offset: Real = rng.gen_range(0.3..0.7);
        let values = level_set_of(&coords, |pt| {
            normal[0] * (pt.x - 0.5) + normal[1] * (pt.y - 0.5) + normal[2] * (pt.z - offset)
        });

        let tessellated = cut_by_level_set(
            CellType::Hex8,
            &coords,
            &values,
            Options::for_cut_tests().with_integration_degree(3),
        );
        let divergence = cut_by_level_set(
            CellType::Hex8,
            &coords,
            &values,
            Options::for_cut_tests().with_gauss_points(
                VCellGaussPts::DirectDivergence,
                BCellGaussPts::DirectDivergence,
            ),
        );

        let a = sorted_volumes(&tessellated, 1);
        let b = sorted_volumes(&divergence, 1);
        assert_eq!(a.len(), b.len());
        for (va, vb) in a.iter().zip(b.iter()) {
            assert_relative_eq!(*va, *vb, epsilon = 1.0e-9);
        }
        assert_partition(&tessellated);
        assert_partition(&divergence);
    }
}

#[test]
fn finalize_requires_a_cut() {
    let coords = unit_cube();
    let mut session = CutSession::new(IntersectionKind::LevelSet, Options::default());
    session
        .add_element(1, &node_ids(8), &coords, CellType::Hex8, Some(&[1.0; 8]))
        .unwrap();

    assert_eq!(session.cut_finalize_default(), Err(CutError::NotCut));
}

#[test]
fn invalid_inputs_are_rejected() {
    let coords = unit_cube();
    let mut session = CutSession::new(IntersectionKind::Combined, Options::default());
    session
        .add_element(7, &node_ids(8), &coords, CellType::Hex8, Some(&[1.0; 8]))
        .unwrap();

    assert_eq!(
        session.add_element(7, &node_ids(8), &coords, CellType::Hex8, Some(&[1.0; 8])),
        Err(CutError::DuplicateElement(7))
    );
    assert!(matches!(
        session.add_element(8, &node_ids(8), &coords, CellType::Hex8, None),
        Err(CutError::InvalidElement { element: 8, .. })
    ));

    session
        .add_cut_side(3, &[0, 1, 2, 3], &horizontal_quad(0.5), SideType::Quad4)
        .unwrap();
    assert_eq!(
        session.add_cut_side(3, &[0, 1, 2, 3], &horizontal_quad(0.5), SideType::Quad4),
        Err(CutError::DuplicateSide(3))
    );
}

#[test]
fn cube_cut_by_a_quad_side() {
    let coords = unit_cube();
    let mut session = CutSession::new(IntersectionKind::Sides, Options::for_cut_tests());
    session
        .add_element(1, &node_ids(8), &coords, CellType::Hex8, None)
        .unwrap();
    session
        .add_cut_side(10, &[100, 101, 102, 103], &horizontal_quad(0.5), SideType::Quad4)
        .unwrap();
    session.cut().unwrap();
    session.cut_finalize_default().unwrap();

    let element = session.element(1).unwrap();
    assert_eq!(element.cut_sides(), &[10]);
    assert_eq!(element.volume_cells().len(), 2);

    for cell in element.volume_cells() {
        assert_relative_eq!(cell.volume(), 0.5, epsilon = 1.0e-10);

        let below = cell
            .vertices()
            .iter()
            .filter_map(|id| element.point_coords(*id))
            .all(|pt| pt.z <= 0.5 + 1.0e-12);
        let expected = if below {
            Position::Inside
        } else {
            Position::Outside
        };
        assert_eq!(cell.position(), expected);

        let area: Real = cell.boundary_cells().iter().map(|b| b.area).sum();
        assert_relative_eq!(area, 1.0, epsilon = 1.0e-10);
    }
    assert_partition(&session);
}

#[test]
fn cube_cut_by_a_triangle_side() {
    let coords = unit_cube();
    let triangle = [
        Point::new(-1.0, -1.0, 0.25),
        Point::new(4.0, -1.0, 0.25),
        Point::new(-1.0, 4.0, 0.25),
    ];
    let mut session = CutSession::new(IntersectionKind::Sides, Options::for_cut_tests());
    session
        .add_element(1, &node_ids(8), &coords, CellType::Hex8, None)
        .unwrap();
    session
        .add_cut_side(4, &[20, 21, 22], &triangle, SideType::Tri3)
        .unwrap();
    session.cut().unwrap();
    session.cut_finalize_default().unwrap();

    let volumes = sorted_volumes(&session, 1);
    assert_eq!(volumes.len(), 2);
    assert_relative_eq!(volumes[0], 0.25, epsilon = 1.0e-10);
    assert_relative_eq!(volumes[1], 0.75, epsilon = 1.0e-10);
    assert_partition(&session);
}

#[test]
fn side_away_from_the_element_does_not_cut_it() {
    let coords = unit_cube();
    let mut session = CutSession::new(IntersectionKind::Sides, Options::default());
    session
        .add_element(1, &node_ids(8), &coords, CellType::Hex8, None)
        .unwrap();
    session
        .add_cut_side(1, &[0, 1, 2, 3], &horizontal_quad(3.0), SideType::Quad4)
        .unwrap();
    session.cut().unwrap();
    session.cut_finalize_default().unwrap();

    let element = session.element(1).unwrap();
    assert!(!element.is_cut());
    assert!(element.cut_sides().is_empty());
    assert_eq!(element.volume_cells().len(), 1);
    assert_relative_eq!(element.volume_cells()[0].volume(), 1.0, epsilon = 1.0e-12);
}

#[test]
fn tetrahedron_cut_near_a_node() {
    let coords = vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(0.0, 1.0, 0.0),
        Point::new(0.0, 0.0, 1.0),
    ];
    let session = cut_by_level_set(
        CellType::Tet4,
        &coords,
        &[1.0, -1.0, -1.0, -1.0],
        Options::for_cut_tests(),
    );

    let volumes = sorted_volumes(&session, 1);
    assert_eq!(volumes.len(), 2);
    assert_relative_eq!(volumes[0], 1.0 / 48.0, epsilon = 1.0e-12);
    assert_relative_eq!(volumes[1], 7.0 / 48.0, epsilon = 1.0e-12);
    assert_partition(&session);
}

#[test]
fn wedge_cut_in_half() {
    let coords = vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(0.0, 1.0, 0.0),
        Point::new(0.0, 0.0, 1.0),
        Point::new(1.0, 0.0, 1.0),
        Point::new(0.0, 1.0, 1.0),
    ];
    let values = level_set_of(&coords, |pt| pt.z - 0.5);
    let session = cut_by_level_set(CellType::Wedge6, &coords, &values, Options::for_cut_tests());

    let volumes = sorted_volumes(&session, 1);
    assert_eq!(volumes.len(), 2);
    assert_relative_eq!(volumes[0], 0.25, epsilon = 1.0e-10);
    assert_relative_eq!(volumes[1], 0.25, epsilon = 1.0e-10);
    assert_partition(&session);
}

#[test]
fn pyramid_apex_cut_off() {
    let coords = vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(1.0, 1.0, 0.0),
        Point::new(0.0, 1.0, 0.0),
        Point::new(0.5, 0.5, 1.0),
    ];
    let values = level_set_of(&coords, |pt| pt.z - 0.5);
    let session = cut_by_level_set(
        CellType::Pyramid5,
        &coords,
        &values,
        Options::for_cut_tests(),
    );

    let element = session.element(1).unwrap();
    let apex = element
        .volume_cells()
        .iter()
        .find(|cell| cell.position() == Position::Outside)
        .unwrap();
    assert_relative_eq!(apex.volume(), 1.0 / 24.0, epsilon = 1.0e-10);
    assert_relative_eq!(element.volume(), 1.0 / 3.0, epsilon = 1.0e-12);
    assert_partition(&session);
}

#[test]
fn combined_cut_yields_four_quarters() {
    let coords = unit_cube();
    let values = level_set_of(&coords, |pt| pt.x - 0.5);
    let mut session = CutSession::new(IntersectionKind::Combined, Options::for_cut_tests());
    session
        .add_element(1, &node_ids(8), &coords, CellType::Hex8, Some(&values))
        .unwrap();
    session
        .add_cut_side(2, &[0, 1, 2, 3], &horizontal_quad(0.5), SideType::Quad4)
        .unwrap();
    session.cut().unwrap();
    session.cut_finalize_default().unwrap();

    let element = session.element(1).unwrap();
    assert_eq!(element.volume_cells().len(), 4);

    let mut combinations = Vec::new();
    for cell in element.volume_cells() {
        assert_relative_eq!(cell.volume(), 0.25, epsilon = 1.0e-10);
        let level_set = cell.position_for(CutField::LevelSet).unwrap();
        let sides = cell.position_for(CutField::Sides).unwrap();
        assert!(matches!(level_set, Position::Inside | Position::Outside));
        assert!(matches!(sides, Position::Inside | Position::Outside));
        combinations.push((level_set == Position::Inside, sides == Position::Inside));
    }
    combinations.sort();
    combinations.dedup();
    assert_eq!(combinations.len(), 4);
    assert_partition(&session);
}

#[test]
fn neighbor_elements_share_interface_points() {
    let left = unit_cube();
    let right: Vec<_> = left.iter().map(|pt| pt + Vector::x()).collect();
    let values_left = level_set_of(&left, |pt| pt.z - 0.4);
    let values_right = level_set_of(&right, |pt| pt.z - 0.4);
    let right_nodes: Vec<NodeId> = vec![1, 8, 9, 2, 5, 10, 11, 6];

    let mut session = CutSession::new(IntersectionKind::LevelSet, Options::default());
    session
        .add_element(1, &node_ids(8), &left, CellType::Hex8, Some(&values_left))
        .unwrap();
    session
        .add_element(2, &right_nodes, &right, CellType::Hex8, Some(&values_right))
        .unwrap();
    session.cut().unwrap();

    let shared = Point::new(1.0, 0.0, 0.4);
    let tolerance = session.options().merge_tolerance;
    let id = session.registry().find(&shared, tolerance).unwrap();
    for element in session.elements() {
        assert!(element.volume_cells().iter().any(|cell| cell.has_vertex(id)));
    }

    session.cut_finalize_default().unwrap();
    assert_partition(&session);
}

#[test]
fn registry_merges_nearby_points() {
    let session = CutSession::new(IntersectionKind::LevelSet, Options::default());
    let registry = session.registry();
    let tolerance = 1.0e-8;
    let mut rng = rand::rngs::StdRng::seed_from_u64(3);

    for _ in 0..200 {
        let pt = Point::new(
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
        );
        let id = registry.new_point(&pt, None, None, tolerance);
        let nudged = pt + Vector::repeat(tolerance * 0.1);

        assert_eq!(registry.new_point(&pt, None, None, tolerance), id);
        assert_eq!(registry.new_point(&nudged, None, None, tolerance), id);
        assert_eq!(registry.find(&pt, tolerance), Some(id));
    }
    assert_eq!(registry.len(), 200);
}

fn hex8(coords: &[[Real; 3]; 8]) -> Vec<Point<Real>> {
    coords.iter().map(|c| Point::new(c[0], c[1], c[2])).collect()
}

/// Cuts a hex8 by a level-set with both volume integration strategies and
/// checks that they agree cell by cell.
fn check_level_set_regression(coords: &[Point<Real>], values: &[Real]) {
    let tessellated = cut_by_level_set(CellType::Hex8, coords, values, Options::for_cut_tests());
    let divergence = cut_by_level_set(
        CellType::Hex8,
        coords,
        values,
        Options::for_cut_tests()
            .with_gauss_points(VCellGaussPts::DirectDivergence, BCellGaussPts::Tessellation),
    );

    let element = tessellated.element(1).unwrap();
    assert!(element.is_cut());
    for cell in element.volume_cells() {
        assert!(cell.is_simple() || !cell.integration_cells().is_empty());
    }

    let a = sorted_volumes(&tessellated, 1);
    let b = sorted_volumes(&divergence, 1);
    assert_eq!(a.len(), b.len());
    let total: Real = a.iter().sum();
    for (va, vb) in a.iter().zip(b.iter()) {
        assert_relative_eq!(*va, *vb, epsilon = 1.0e-9 * total);
    }
    assert_partition(&tessellated);
    assert_partition(&divergence);
}

#[test]
fn hex8_corner_cut_both_strategies() {
    let mut values = vec![-1.0; 8];
    values[0] = 1.0;
    check_level_set_regression(&unit_cube(), &values);
}

#[test]
fn hex8_level_set_regression_1() {
    let coords = hex8(&[
        [0.44999999999999996, -0.25000000000000006, 0.09999999999999995],
        [0.44999999999999996, -0.25, 0.049999999999999864],
        [0.45000000000000007, -0.20000000000000007, 0.04999999999999988],
        [0.44999999999999996, -0.20000000000000007, 0.09999999999999992],
        [0.5, -0.25, 0.1],
        [0.5, -0.25, 0.04999999999999992],
        [0.5000000000000001, -0.19999999999999998, 0.04999999999999993],
        [0.5, -0.20000000000000007, 0.09999999999999998],
    ]);
    let values = [
        0.024404424085075815,
        0.017204021639430023,
        -0.005025253169416655,
        0.002493781056044475,
        0.06789083458002731,
        0.06124860801609122,
        0.040832691319598435,
        0.047722557505166185,
    ];
    check_level_set_regression(&coords, &values);
}

#[test]
fn hex8_level_set_regression_2() {
    let coords = hex8(&[
        [0.3500000000000001, -0.04999999999999995, -0.25],
        [0.3500000000000001, -0.04999999999999993, -0.30000000000000004],
        [0.3500000000000001, 0.0, -0.3000000000000001],
        [0.3500000000000001, 0.0, -0.25],
        [0.40000000000000013, -0.04999999999999996, -0.25],
        [0.4, -0.04999999999999995, -0.30000000000000004],
        [0.40000000000000013, -4.163336342344338e-18, -0.30000000000000016],
        [0.40000000000000013, -3.469446951953614e-18, -0.25],
    ]);
    let values = [
        -0.06698729810778059,
        -0.036319075225214714,
        -0.03902277713535551,
        -0.06988373664786862,
        -0.025658350974743005,
        0.002493781056044586,
        2.220446049250313e-16,
        -0.02830094339716971,
    ];
    check_level_set_regression(&coords, &values);
}

#[test]
fn hex8_level_set_regression_3() {
    let coords = hex8(&[
        [0.4, -0.20000000000000007, 0.09999999999999998],
        [0.4, -0.19999999999999996, 0.04999999999999993],
        [0.3999999999999999, -0.14999999999999997, 0.049999999999999906],
        [0.4, -0.15, 0.09999999999999998],
        [0.44999999999999996, -0.20000000000000007, 0.09999999999999992],
        [0.45000000000000007, -0.20000000000000007, 0.04999999999999988],
        [0.44999999999999996, -0.15, 0.049999999999999864],
        [0.44999999999999996, -0.15000000000000005, 0.09999999999999998],
    ]);
    let values = [
        -0.041742430504415895,
        -0.04999999999999999,
        -0.06988373664786879,
        -0.06125178063039388,
        0.002493781056044475,
        -0.005025253169416655,
        -0.02303039929152728,
        -0.015232014258367121,
    ];
    check_level_set_regression(&coords, &values);
}

#[test]
fn hex8_level_set_regression_4() {
    let coords = hex8(&[
        [0.15000000000000002, 0.3999999999999999, -0.050000000000000044],
        [0.15000000000000002, 0.3999999999999999, -0.10000000000000012],
        [0.15000000000000005, 0.4500000000000002, -0.10000000000000012],
        [0.15000000000000002, 0.4500000000000002, -0.05000000000000007],
        [0.20000000000000007, 0.3999999999999999, -0.050000000000000044],
        [0.20000000000000012, 0.3999999999999999, -0.10000000000000009],
        [0.20000000000000007, 0.45000000000000007, -0.10000000000000009],
        [0.20000000000000007, 0.44999999999999996, -0.05000000000000007],
    ]);
    let values = [
        -0.06988373664786873,
        -0.06125178063039394,
        -0.0152320142583669,
        -0.023030399291527004,
        -0.050000000000000044,
        -0.04174243050441606,
        0.002493781056044586,
        -0.00502525316941671,
    ];
    check_level_set_regression(&coords, &values);
}

#[test]
fn hex8_level_set_regression_5() {
    let coords = hex8(&[
        [-0.29999999999999993, -0.30000000000000004, 0.30000000000000004],
        [-0.30000000000000004, -0.3, 0.25],
        [-0.30000000000000004, -0.25, 0.25],
        [-0.30000000000000004, -0.25, 0.3],
        [-0.25, -0.29999999999999993, 0.3],
        [-0.25, -0.29999999999999993, 0.25],
        [-0.25, -0.25, 0.25],
        [-0.25000000000000006, -0.24999999999999997, 0.30000000000000004],
    ]);
    let values = [
        0.019615242270663247,
        -0.007557109910194759,
        -0.03631907522521477,
        -0.007557109910194759,
        -0.007557109910194815,
        -0.036319075225214825,
        -0.0669872981077807,
        -0.03631907522521477,
    ];
    check_level_set_regression(&coords, &values);
}

#[test]
fn hex8_level_set_regression_6() {
    let coords = hex8(&[
        [0.0012910344827586208, -0.0006951724137931035, 5e-05],
        [0.0012910344827586208, -0.0006951724137931035, -5e-05],
        [0.0012910344827586208, -0.0005958620689655172, -5e-05],
        [0.001291034482758621, -0.0005958620689655171, 5e-05],
        [0.0013903448275862072, -0.0006951724137931033, 5e-05],
        [0.0013903448275862072, -0.0006951724137931034, -5e-05],
        [0.0013903448275862074, -0.0005958620689655175, -5e-05],
        [0.001390344827586207, -0.0005958620689655172, 5e-05],
    ]);
    let values = [
        2.6830028258798353e-05,
        2.6830028258798332e-05,
        -1.778625433254512e-05,
        -1.7786254332545044e-05,
        0.00011521340054095383,
        0.00011521340054095402,
        7.35608797896676e-05,
        7.356087978966703e-05,
    ];
    check_level_set_regression(&coords, &values);
}

#[test]
fn cube_cut_by_a_coplanar_triangle_strip() {
    // A side mesh lying in the plane y = 0.3799, with inner edges crossing
    // the element.
    let strip = [
        [
            [0.8567666666666667, 0.03199999999999997],
            [0.8835333333333333, 0.03199999999999997],
            [0.87015, 0.015949999999999985],
        ],
        [
            [0.8835333333333333, 0.03199999999999997],
            [0.8835333333333333, -0.0001],
            [0.87015, 0.015949999999999985],
        ],
        [
            [0.8835333333333333, -0.0001],
            [0.8567666666666667, -0.0001],
            [0.87015, 0.015949999999999985],
        ],
        [
            [0.8835333333333333, -0.0001],
            [0.8835333333333333, 0.03199999999999997],
            [0.8969166666666666, 0.015949999999999985],
        ],
        [
            [0.8835333333333333, 0.03199999999999997],
            [0.9103, 0.03199999999999997],
            [0.8969166666666666, 0.015949999999999985],
        ],
        [
            [0.9103, -0.0001],
            [0.8835333333333333, -0.0001],
            [0.8969166666666666, 0.015949999999999985],
        ],
    ];
    let (x0, x1) = (0.8805970149253729, 0.8880597014925371);
    let (y0, y1) = (0.37777777777777777, 0.3851851851851852);
    let z1 = 0.029411764705882273;
    let coords = hex8(&[
        [x0, y1, 0.0],
        [x0, y0, 0.0],
        [x1, y0, 0.0],
        [x1, y1, 0.0],
        [x0, y1, z1],
        [x0, y0, z1],
        [x1, y0, z1],
        [x1, y1, z1],
    ]);

    let mut session = CutSession::new(
        IntersectionKind::Sides,
        Options::for_cut_tests()
            .with_gauss_points(VCellGaussPts::DirectDivergence, BCellGaussPts::Tessellation),
    );
    for (i, tri) in strip.iter().enumerate() {
        let corners: Vec<_> = tri.iter().map(|c| Point::new(c[0], 0.3799, c[1])).collect();
        let nodes: Vec<NodeId> = (0..3).map(|k| 100 + 3 * i as NodeId + k).collect();
        session
            .add_cut_side(i as i32 + 1, &nodes, &corners, SideType::Tri3)
            .unwrap();
    }
    session
        .add_element(1, &node_ids(8), &coords, CellType::Hex8, None)
        .unwrap();
    session.cut().unwrap();
    session.cut_finalize_default().unwrap();

    let area = (x1 - x0) * z1;
    let volumes = sorted_volumes(&session, 1);
    assert_eq!(volumes.len(), 2);
    assert_relative_eq!(volumes[0], area * (0.3799 - y0), max_relative = 1.0e-8);
    assert_relative_eq!(volumes[1], area * (y1 - 0.3799), max_relative = 1.0e-8);

    let element = session.element(1).unwrap();
    let positions: Vec<_> = element.volume_cells().iter().map(|c| c.position()).collect();
    assert!(positions.contains(&Position::Inside));
    assert!(positions.contains(&Position::Outside));
    assert_partition(&session);
}

#[test]
fn element_far_from_the_origin_is_cut() {
    let shift = Vector::new(5.0e7, 0.0, 0.0);
    let coords: Vec<_> = unit_cube().iter().map(|pt| pt * 10.0 + shift).collect();
    let values = level_set_of(&coords, |pt| (pt.z - 5.0) / 5.0);
    let session = cut_by_level_set(
        CellType::Hex8,
        &coords,
        &values,
        Options::default().with_merge_tolerance(1.0e-6),
    );

    let volumes = sorted_volumes(&session, 1);
    assert_eq!(volumes.len(), 2);
    assert_relative_eq!(volumes[0], 500.0, max_relative = 1.0e-9);
    assert_relative_eq!(volumes[1], 500.0, max_relative = 1.0e-9);
    assert_partition(&session);
}

#[test]
fn cut_side_corners_share_registry_points() {
    let coords = unit_cube();
    let mut session = CutSession::new(IntersectionKind::Sides, Options::default());
    session
        .add_element(1, &node_ids(8), &coords, CellType::Hex8, None)
        .unwrap();
    // The first corner is the element node 5.
    let triangle = [
        Point::new(1.0, 0.0, 1.0),
        Point::new(-1.0, 2.0, 0.5),
        Point::new(-1.0, -1.0, 0.2),
    ];
    session
        .add_cut_side(6, &[50, 51, 52], &triangle, SideType::Tri3)
        .unwrap();

    let side = session.side(6).unwrap();
    assert_eq!(side.points().len(), 3);
    assert_eq!(side.points()[0], session.element(1).unwrap().node_points()[5]);

    for (id, pt) in side.points().iter().zip(triangle.iter()) {
        let point = session.registry().point(*id).unwrap();
        assert!(point.is_on_side(6));
        assert_eq!(point.coords, *pt);
    }
    assert_eq!(session.registry().point(side.points()[0]).unwrap().node, Some(5));
}

#[test]
fn concurrent_lookups_see_concurrent_insertions() {
    let session = CutSession::new(IntersectionKind::LevelSet, Options::default());
    let registry = session.registry();
    let tolerance = 1.0e-9;

    std::thread::scope(|scope| {
        for t in 0..4u64 {
            let _ = scope.spawn(move || {
                let mut rng = rand::rngs::StdRng::seed_from_u64(t);
                for i in 0..200 {
                    let pt = Point::new(i as Real * 0.01, t as Real, 0.5);
                    let id = registry.new_point(&pt, None, None, tolerance);
                    assert_eq!(registry.find(&pt, tolerance), Some(id));

                    let other = Point::new(
                        rng.gen_range(0.0..2.0),
                        rng.gen_range(0.0..4.0),
                        0.5,
                    );
                    let _ = registry.find(&other, rng.gen_range(1.0e-12..1.0e-3));
                }
            });
        }
    });

    assert_eq!(registry.len(), 800);
}

#[test]
fn gmsh_dump_lists_every_view() {
    let coords = unit_cube();
    let mut values = vec![-1.0; 8];
    values[0] = 1.0;
    let session = cut_by_level_set(CellType::Hex8, &coords, &values, Options::default());

    let mut out = Vec::new();
    session.dump_gmsh(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("View \"facets\""));
    assert!(text.contains("View \"volume cells\""));
    assert!(text.contains("View \"gauss points\""));
    assert!(text.contains("SS("));
    assert!(text.contains("SP("));
}
