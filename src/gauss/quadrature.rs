//! Reference quadrature rules on the unit interval, triangle and
//! tetrahedron.
//!
//! Triangle and tetrahedron rules are collapsed tensor products of
//! Gauss-Legendre rules, which are exact for any degree at the cost of a few
//! more points than the optimal symmetric rules.

use crate::math::{Point, Real, Vector};
use core::f64::consts::PI;

const NEWTON_TOLERANCE: Real = 1.0e-15;
const NEWTON_MAX_ITERATIONS: usize = 100;

/// The number of Gauss-Legendre points per direction used for a collapsed
/// rule exact up to `degree`.
#[inline]
fn points_per_direction(degree: usize) -> usize {
    degree / 2 + 2
}

/// The `n`-point Gauss-Legendre rule on `[0, 1]`, as `(abscissa, weight)`
/// pairs. Exact for polynomials of degree `2n - 1`.
pub fn gauss_legendre(n: usize) -> Vec<(Real, Real)> {
    let n = n.max(1);
    let mut rule = Vec::with_capacity(n);

    for i in 0..n {
        // Initial guess from the asymptotic root distribution.
        let mut x = (PI * (i as Real + 0.75) / (n as Real + 0.5)).cos();

        for _ in 0..NEWTON_MAX_ITERATIONS {
            let (value, derivative) = legendre(n, x);
            let dx = value / derivative;
            x -= dx;
            if dx.abs() <= NEWTON_TOLERANCE {
                break;
            }
        }

        let (_, derivative) = legendre(n, x);
        let weight = 2.0 / ((1.0 - x * x) * derivative * derivative);
        rule.push(((1.0 - x) * 0.5, weight * 0.5));
    }

    rule
}

/// The Legendre polynomial of degree `n` and its derivative at `x`.
fn legendre(n: usize, x: Real) -> (Real, Real) {
    let mut p0 = 1.0;
    let mut p1 = x;
    for k in 2..=n {
        let k = k as Real;
        let p2 = ((2.0 * k - 1.0) * x * p1 - (k - 1.0) * p0) / k;
        p0 = p1;
        p1 = p2;
    }
    if n == 0 {
        return (1.0, 0.0);
    }
    let n = n as Real;
    (p1, n * (x * p1 - p0) / (x * x - 1.0))
}

/// A Gauss-Legendre rule on `[0, 1]` exact up to `degree`.
pub fn line_rule(degree: usize) -> Vec<(Real, Real)> {
    gauss_legendre(degree / 2 + 1)
}

/// A rule on the reference triangle `(0, 0), (1, 0), (0, 1)` exact up to
/// `degree`. The weights add up to `1 / 2`.
pub fn triangle_rule(degree: usize) -> Vec<([Real; 2], Real)> {
    let line = gauss_legendre(points_per_direction(degree));
    let mut rule = Vec::with_capacity(line.len() * line.len());

    for (xi, wi) in &line {
        for (eta, wj) in &line {
            let u = *xi;
            let v = eta * (1.0 - xi);
            rule.push(([u, v], wi * wj * (1.0 - xi)));
        }
    }

    rule
}

/// A rule on the reference tetrahedron `(0, 0, 0), (1, 0, 0), (0, 1, 0),
/// (0, 0, 1)` exact up to `degree`. The weights add up to `1 / 6`.
pub fn tetrahedron_rule(degree: usize) -> Vec<([Real; 3], Real)> {
    let line = gauss_legendre(points_per_direction(degree));
    let mut rule = Vec::with_capacity(line.len().pow(3));

    for (xi, wi) in &line {
        for (eta, wj) in &line {
            for (zeta, wk) in &line {
                let u = *xi;
                let v = eta * (1.0 - xi);
                let w = zeta * (1.0 - xi) * (1.0 - eta);
                let jacobian = (1.0 - xi) * (1.0 - xi) * (1.0 - eta);
                rule.push(([u, v, w], wi * wj * wk * jacobian));
            }
        }
    }

    rule
}

/// Maps the triangle rule exact up to `degree` onto the triangle `(a, b, c)`.
pub fn map_triangle(
    degree: usize,
    a: &Point<Real>,
    b: &Point<Real>,
    c: &Point<Real>,
) -> Vec<(Point<Real>, Real)> {
    let (ab, ac) = (b - a, c - a);
    let scale = ab.cross(&ac).norm();

    triangle_rule(degree)
        .into_iter()
        .map(|([u, v], w)| (a + ab * u + ac * v, w * scale))
        .collect()
}

/// Maps the tetrahedron rule exact up to `degree` onto the tetrahedron
/// `(a, b, c, d)`, weighted by its absolute volume.
pub fn map_tetrahedron(degree: usize, pts: &[Point<Real>; 4]) -> Vec<(Point<Real>, Real)> {
    let [a, b, c, d] = pts;
    let edges: [Vector<Real>; 3] = [b - a, c - a, d - a];
    let scale = edges[0].cross(&edges[1]).dot(&edges[2]).abs();

    tetrahedron_rule(degree)
        .into_iter()
        .map(|([u, v, w], weight)| {
            (
                a + edges[0] * u + edges[1] * v + edges[2] * w,
                weight * scale,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauss_legendre_integrates_monomials() {
        for n in 1..8 {
            let rule = gauss_legendre(n);
            assert_eq!(rule.len(), n);
            for k in 0..2 * n {
                let integral: Real = rule.iter().map(|(x, w)| w * x.powi(k as i32)).sum();
                assert_relative_eq!(integral, 1.0 / (k as Real + 1.0), epsilon = 1.0e-13);
            }
        }
    }

    #[test]
    fn triangle_rule_integrates_monomials() {
        // Integral of x^i y^j on the reference triangle: i! j! / (i + j + 2)!
        let factorial = |n: usize| (1..=n).product::<usize>() as Real;
        let degree = 5;
        let rule = triangle_rule(degree);

        for i in 0..=degree {
            for j in 0..=degree - i {
                let integral: Real = rule
                    .iter()
                    .map(|([u, v], w)| w * u.powi(i as i32) * v.powi(j as i32))
                    .sum();
                let expected = factorial(i) * factorial(j) / factorial(i + j + 2);
                assert_relative_eq!(integral, expected, epsilon = 1.0e-13);
            }
        }
    }

    #[test]
    fn tetrahedron_rule_integrates_monomials() {
        let factorial = |n: usize| (1..=n).product::<usize>() as Real;
        let degree = 4;
        let rule = tetrahedron_rule(degree);

        for i in 0..=degree {
            for j in 0..=degree - i {
                for k in 0..=degree - i - j {
                    let integral: Real = rule
                        .iter()
                        .map(|([u, v, w], weight)| {
                            weight * u.powi(i as i32) * v.powi(j as i32) * w.powi(k as i32)
                        })
                        .sum();
                    let expected =
                        factorial(i) * factorial(j) * factorial(k) / factorial(i + j + k + 3);
                    assert_relative_eq!(integral, expected, epsilon = 1.0e-13);
                }
            }
        }
    }

    #[test]
    fn mapped_rules_measure_their_simplex() {
        let a = Point::new(1.0, 0.0, 0.0);
        let b = Point::new(3.0, 0.0, 0.0);
        let c = Point::new(1.0, 2.0, 0.0);
        let d = Point::new(1.0, 0.0, 3.0);

        let area: Real = map_triangle(2, &a, &b, &c).iter().map(|(_, w)| w).sum();
        assert_relative_eq!(area, 2.0, epsilon = 1.0e-13);

        let volume: Real = map_tetrahedron(2, &[a, b, c, d]).iter().map(|(_, w)| w).sum();
        assert_relative_eq!(volume, 2.0, epsilon = 1.0e-13);
    }
}
