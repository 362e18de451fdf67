//! Gmsh `.pos` export of the cut, for inspection and reproduction of
//! failures.

use super::CutSession;
use crate::element::Element;
use crate::facet::split_cells_into_triangles;
use crate::math::{Point, Real};
use crate::volume_cell::Position;
use std::io::{self, Write};

fn position_code(position: Position) -> Real {
    match position {
        Position::Inside => -1.0,
        Position::Outside => 1.0,
        Position::OnCutSurface => 0.0,
        Position::Undecided => 2.0,
    }
}

fn write_triangle<W: Write>(writer: &mut W, pts: [Point<Real>; 3], value: Real) -> io::Result<()> {
    let [a, b, c] = pts;
    writeln!(
        writer,
        "ST({},{},{},{},{},{},{},{},{}){{{},{},{}}};",
        a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z, value, value, value
    )
}

fn facet_triangles(element: &Element, writer: &mut impl Write) -> io::Result<()> {
    for facet in element.facets() {
        let pts = facet.coordinates(&element.points);
        if pts.len() != facet.points().len() {
            continue;
        }

        let triangles: Vec<[usize; 3]> = if facet.triangulation().is_empty() {
            (1..pts.len().saturating_sub(1))
                .map(|i| [0, i, i + 1])
                .collect()
        } else {
            split_cells_into_triangles(facet.triangulation())
        };

        let value = Real::from(facet.flags().bits());
        for [a, b, c] in triangles {
            write_triangle(writer, [pts[a], pts[b], pts[c]], value)?;
        }
    }
    Ok(())
}

impl CutSession {
    /// Writes the facets, volume cells and Gauss points of every element in
    /// the Gmsh post-processing format.
    ///
    /// Facets are colored by their flags, volume cells by their position
    /// (`-1` inside, `1` outside) and Gauss points by their weight.
    pub fn dump_gmsh<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "View \"facets\" {{")?;
        for element in self.elements() {
            facet_triangles(element, writer)?;
        }
        writeln!(writer, "}};")?;

        writeln!(writer, "View \"volume cells\" {{")?;
        for element in self.elements() {
            for cell in element.volume_cells() {
                let value = position_code(cell.position());

                if cell.integration_cells().is_empty() {
                    for face in cell.pieces().iter().flatten() {
                        let pts: Vec<_> = face
                            .iter()
                            .filter_map(|id| element.point_coords(*id))
                            .collect();
                        for i in 1..pts.len().saturating_sub(1) {
                            write_triangle(writer, [pts[0], pts[i], pts[i + 1]], value)?;
                        }
                    }
                    continue;
                }

                for integration_cell in cell.integration_cells() {
                    let pts: Vec<_> = integration_cell
                        .points
                        .iter()
                        .filter_map(|id| element.point_coords(*id))
                        .collect();
                    let [a, b, c, d] = match pts.as_slice() {
                        [a, b, c, d] => [a, b, c, d],
                        _ => continue,
                    };
                    writeln!(
                        writer,
                        "SS({},{},{},{},{},{},{},{},{},{},{},{}){{{},{},{},{}}};",
                        a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z, d.x, d.y, d.z, value,
                        value, value, value
                    )?;
                }
            }
        }
        writeln!(writer, "}};")?;

        writeln!(writer, "View \"gauss points\" {{")?;
        for element in self.elements() {
            for cell in element.volume_cells() {
                let boundary = cell.boundary_cells().iter().flat_map(|b| &b.gauss_points);
                for pt in cell.gauss_points().iter().chain(boundary) {
                    writeln!(
                        writer,
                        "SP({},{},{}){{{}}};",
                        pt.global.x, pt.global.y, pt.global.z, pt.weight
                    )?;
                }
            }
        }
        writeln!(writer, "}};")
    }
}
