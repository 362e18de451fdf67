//! Quadrature rules of volume cells and of their interface facets.
//!
//! Volume cells are integrated either by tessellation into tetrahedra, each
//! carrying a mapped reference rule, or by the direct divergence method that
//! only needs the triangulated boundary of the cell. Interface facets yield
//! boundary cells integrated by triangle rules or by the 2D divergence
//! theorem.

pub use self::cells::{BoundaryCell, GaussPoint, IntegrationCell};
pub use self::quadrature::{
    gauss_legendre, line_rule, map_tetrahedron, map_triangle, tetrahedron_rule, triangle_rule,
};

use self::boundary::{facet_rule, FacetRule};
use self::direct_divergence::direct_divergence_rule;
use self::tessellation::{cell_triangles, tessellate};
use crate::element::{Element, ElementId};
use crate::error::CutError;
use crate::facet::triangulate_facet;
use crate::math::{Point, Real};
use crate::options::{BCellGaussPts, Options, VCellGaussPts};
use crate::point::{PointId, PointRegistry};
use crate::predicates::orient3d;
use crate::utils::hashmap::HashMap;

mod boundary;
mod cells;
mod direct_divergence;
mod quadrature;
mod tessellation;

struct CellQuadrature {
    integration_cells: Vec<IntegrationCell>,
    points: Vec<(Point<Real>, Real)>,
    boundary: Vec<(usize, FacetRule)>,
}

/// Triangulates the facets of a cut element and generates the quadrature of
/// its volume cells and boundary cells.
pub(crate) fn finalize_element(
    element: &mut Element,
    registry: &PointRegistry,
    options: &Options,
    volume_strategy: VCellGaussPts,
    boundary_strategy: BCellGaussPts,
) -> Result<(), CutError> {
    let mode = options.arithmetic;
    let element_id = element.id();

    for (index, facet) in element.facets.iter_mut().enumerate() {
        let coords = facet.coordinates(&element.points);
        facet.triangulation = triangulate_facet(&coords, mode).map_err(|source| {
            log::error!(
                "element {}: facet {} cannot be triangulated ({}): {:?}",
                element_id,
                index,
                source,
                coords
            );
            CutError::UntriangulableFacet {
                element: element_id,
                facet: index,
                points: coords.clone(),
                source,
            }
        })?;
    }

    let degree = options.integration_degree;
    let tolerance = options.merge_tolerance * element.diameter().powi(2);
    let node_points = element.node_points().to_vec();
    let tets = element.tets().to_vec();
    let mut quadratures = Vec::with_capacity(element.volume_cells.len());

    {
        let facets = &element.facets;
        let points = &mut element.points;

        for cell in &element.volume_cells {
            let (integration_cells, rule) = if cell.is_simple {
                let cells: Vec<_> = tets
                    .iter()
                    .filter_map(|tet| {
                        let ids = tet.map(|i| node_points[i]);
                        let pts = [
                            points.get(&ids[0])?,
                            points.get(&ids[1])?,
                            points.get(&ids[2])?,
                            points.get(&ids[3])?,
                        ];
                        let volume = orient3d(pts[0], pts[1], pts[2], pts[3], mode) / 6.0;
                        Some(IntegrationCell { points: ids, volume })
                    })
                    .collect();
                let rule = tetrahedra_rule(&cells, points, degree);
                (cells, rule)
            } else {
                let triangles = cell_triangles(facets, cell);
                let tessellation = |points: &mut HashMap<PointId, Point<Real>>| {
                    tessellate(cell, &triangles, points, registry, tolerance, mode)
                };

                let (integration_cells, rule) = match volume_strategy {
                    VCellGaussPts::Tessellation => {
                        let cells = tessellation(points)?;
                        let rule = tetrahedra_rule(&cells, points, degree);
                        (cells, rule)
                    }
                    VCellGaussPts::DirectDivergence => {
                        (Vec::new(), direct_divergence_rule(&triangles, points, degree))
                    }
                };

                if options.cross_check {
                    let (tessellation_volume, divergence_volume) = match volume_strategy {
                        VCellGaussPts::Tessellation => (
                            integration_cells.iter().map(|c| c.volume).sum::<Real>(),
                            direct_divergence_rule(&triangles, points, degree)
                                .iter()
                                .map(|(_, w)| w)
                                .sum::<Real>(),
                        ),
                        VCellGaussPts::DirectDivergence => (
                            tessellation(points)?.iter().map(|c| c.volume).sum::<Real>(),
                            rule.iter().map(|(_, w)| w).sum::<Real>(),
                        ),
                    };
                    check_volumes(
                        element_id,
                        cell.index(),
                        tessellation_volume,
                        divergence_volume,
                        options,
                    )?;
                }

                (integration_cells, rule)
            };

            let empty = match (cell.is_simple, volume_strategy) {
                (false, VCellGaussPts::DirectDivergence) => rule.is_empty(),
                _ => integration_cells.is_empty(),
            };
            if empty {
                log::error!(
                    "element {}: volume cell {} contains 0 integration cells (vertices: {:?})",
                    element_id,
                    cell.index(),
                    cell.vertices()
                );
                return Err(CutError::EmptyVolumeCell {
                    element: element_id,
                    cell: cell.index(),
                });
            }

            let boundary = cell
                .facets()
                .iter()
                .filter(|i| facets[**i].is_cut_surface())
                .filter_map(|i| {
                    facet_rule(&facets[*i], cell.index(), points, degree, boundary_strategy)
                        .map(|rule| (*i, rule))
                })
                .collect();

            quadratures.push(CellQuadrature {
                integration_cells,
                points: rule,
                boundary,
            });
        }
    }

    let mut results = Vec::with_capacity(quadratures.len());
    for quadrature in quadratures {
        let gauss_points = to_gauss_points(element, &quadrature.points)?;
        let mut boundary_cells = Vec::with_capacity(quadrature.boundary.len());
        for (facet, rule) in quadrature.boundary {
            boundary_cells.push(BoundaryCell {
                facet,
                normal: rule.normal,
                area: rule.area,
                gauss_points: to_gauss_points(element, &rule.points)?,
            });
        }
        results.push((quadrature.integration_cells, gauss_points, boundary_cells));
    }

    let mut total = 0.0;
    for (cell, (integration_cells, gauss_points, boundary_cells)) in
        element.volume_cells.iter_mut().zip(results)
    {
        let volume = gauss_points.iter().map(|pt| pt.weight).sum::<Real>();
        total += volume;
        cell.volume = Some(volume);
        cell.strategy = Some(if cell.is_simple {
            VCellGaussPts::Tessellation
        } else {
            volume_strategy
        });
        cell.integration_cells = integration_cells;
        cell.gauss_points = gauss_points;
        cell.boundary_cells = boundary_cells;
    }

    let expected = element.volume();
    if (total - expected).abs() > options.volume_tolerance * expected.abs() {
        log::error!(
            "element {}: volume cells add up to {} instead of {}",
            element_id,
            total,
            expected
        );
        return Err(CutError::PartitionViolation {
            element: element_id,
            cells: total,
            expected,
        });
    }

    log::debug!(
        "element {}: finalized {} volume cells",
        element_id,
        element.volume_cells.len()
    );
    Ok(())
}

fn tetrahedra_rule(
    cells: &[IntegrationCell],
    points: &HashMap<PointId, Point<Real>>,
    degree: usize,
) -> Vec<(Point<Real>, Real)> {
    cells
        .iter()
        .filter_map(|cell| {
            let [a, b, c, d] = cell.points;
            Some([*points.get(&a)?, *points.get(&b)?, *points.get(&c)?, *points.get(&d)?])
        })
        .flat_map(|pts| map_tetrahedron(degree, &pts))
        .collect()
}

fn to_gauss_points(
    element: &Element,
    rule: &[(Point<Real>, Real)],
) -> Result<Vec<GaussPoint>, CutError> {
    rule.iter()
        .map(|(global, weight)| {
            Ok(GaussPoint {
                global: *global,
                local: element.local_coordinates(global)?,
                weight: *weight,
            })
        })
        .collect()
}

fn check_volumes(
    element: ElementId,
    cell: usize,
    tessellation: Real,
    direct_divergence: Real,
    options: &Options,
) -> Result<(), CutError> {
    let difference = (tessellation - direct_divergence).abs();
    if difference <= options.volume_tolerance * tessellation.abs() {
        return Ok(());
    }

    if options.strict_volume_check {
        log::error!(
            "element {}: volume cell {} has a tessellation volume of {} and a direct divergence volume of {}",
            element,
            cell,
            tessellation,
            direct_divergence
        );
        Err(CutError::VolumeMismatch {
            element,
            cell,
            tessellation,
            direct_divergence,
        })
    } else {
        log::warn!(
            "element {}: volume cell {} volumes differ by {:e} (tessellation {}, direct divergence {})",
            element,
            cell,
            difference,
            tessellation,
            direct_divergence
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::CellType;
    use crate::volume_cell::{cut_element, CutField};

    fn cut_corner(registry: &PointRegistry, options: &Options) -> Element {
        let coords = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 1.0),
            Point::new(1.0, 1.0, 1.0),
            Point::new(0.0, 1.0, 1.0),
        ];
        let mut values = [-1.0; 8];
        values[0] = 1.0;
        let mut element = Element::new(
            2,
            &[0, 1, 2, 3, 4, 5, 6, 7],
            &coords,
            CellType::Hex8,
            Some(&values),
            registry,
            options.arithmetic,
        )
        .unwrap();
        cut_element(&mut element, &[], &[CutField::LevelSet], registry, options).unwrap();
        element
    }

    fn finalize(
        element: &mut Element,
        registry: &PointRegistry,
        options: &Options,
    ) -> Result<(), CutError> {
        finalize_element(
            element,
            registry,
            options,
            VCellGaussPts::Tessellation,
            BCellGaussPts::Tessellation,
        )
    }

    #[test]
    fn cut_corner_is_finalized() {
        let registry = PointRegistry::new(1.0e-12, 4);
        let options = Options::for_cut_tests();
        let mut element = cut_corner(&registry, &options);
        assert_eq!(finalize(&mut element, &registry, &options), Ok(()));
    }

    #[test]
    fn cell_without_facets_has_no_integration_cell() {
        let registry = PointRegistry::new(1.0e-12, 4);
        let options = Options::default();
        let mut element = cut_corner(&registry, &options);
        element.volume_cells[1].facets.clear();

        assert_eq!(
            finalize(&mut element, &registry, &options),
            Err(CutError::EmptyVolumeCell { element: 2, cell: 1 })
        );
    }

    #[test]
    fn overlapping_cells_violate_the_partition() {
        let registry = PointRegistry::new(1.0e-12, 4);
        let options = Options::default();
        let mut element = cut_corner(&registry, &options);
        let extra = element.volume_cells[0].clone();
        element.volume_cells.push(extra);

        match finalize(&mut element, &registry, &options) {
            Err(CutError::PartitionViolation {
                element: 2,
                cells,
                expected,
            }) => {
                assert_relative_eq!(expected, 1.0, epsilon = 1.0e-12);
                assert!(cells > 1.1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn volume_mismatch_is_fatal_only_when_strict() {
        let lenient = Options::default().with_cross_check(false);
        let strict = Options::default().with_cross_check(true);

        assert_eq!(check_volumes(3, 1, 0.5, 0.5 + 1.0e-12, &strict), Ok(()));
        assert_eq!(check_volumes(3, 1, 0.5, 0.6, &lenient), Ok(()));
        assert_eq!(
            check_volumes(3, 1, 0.5, 0.6, &strict),
            Err(CutError::VolumeMismatch {
                element: 3,
                cell: 1,
                tessellation: 0.5,
                direct_divergence: 0.6,
            })
        );
    }
}
