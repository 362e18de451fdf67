//! Configuration of a cutting session.

use crate::math::Real;
use crate::predicates::ArithmeticMode;

/// Strategy generating the quadrature rule of volume cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum VCellGaussPts {
    /// Tetrahedra obtained from the triangulated boundary facets.
    #[default]
    Tessellation,
    /// Line integrals anchored on the boundary facets (divergence theorem).
    DirectDivergence,
}

/// Strategy generating the quadrature rule of boundary (interface) cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum BCellGaussPts {
    /// Triangle rules on the triangulated facet.
    #[default]
    Tessellation,
    /// Line integrals anchored on the facet edges (divergence theorem in 2D).
    DirectDivergence,
}

/// Tolerances, precision policy and quadrature strategies of a cutting
/// session.
///
/// Options are built once before the session and are read-only afterwards.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Options {
    /// Absolute distance below which the point registry merges two points.
    pub merge_tolerance: Real,
    /// Distance, relative to the element diameter, below which a point is
    /// considered to lie on a cutting surface.
    pub geometric_tolerance: Real,
    /// Precision policy of the orientation predicates.
    pub arithmetic: ArithmeticMode,
    /// Quadrature strategy of volume cells.
    pub volume_gauss_points: VCellGaussPts,
    /// Quadrature strategy of boundary cells.
    pub boundary_gauss_points: BCellGaussPts,
    /// Polynomial degree integrated exactly by the generated rules.
    pub integration_degree: usize,
    /// Computes the volume of every cell with both strategies and compares them.
    pub cross_check: bool,
    /// Relative tolerance of the tessellation / direct divergence comparison.
    pub volume_tolerance: Real,
    /// Makes a cross-method volume mismatch fatal instead of a warning.
    pub strict_volume_check: bool,
    /// Elements crossed by no interface get a single cell integrated on the
    /// element decomposition directly.
    pub simple_shape_shortcut: bool,
    /// Number of lock partitions of the point registry.
    pub registry_partitions: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            merge_tolerance: 1.0e-12,
            geometric_tolerance: 1.0e-10,
            arithmetic: ArithmeticMode::Adaptive,
            volume_gauss_points: VCellGaussPts::Tessellation,
            boundary_gauss_points: BCellGaussPts::Tessellation,
            integration_degree: 2,
            cross_check: false,
            volume_tolerance: 1.0e-9,
            strict_volume_check: false,
            simple_shape_shortcut: true,
            registry_partitions: 16,
        }
    }
}

impl Options {
    /// The validation profile used by the regression tests: extended
    /// arithmetic and fatal cross-method volume checks.
    pub fn for_cut_tests() -> Self {
        Self {
            arithmetic: ArithmeticMode::Extended,
            cross_check: true,
            strict_volume_check: true,
            ..Self::default()
        }
    }

    /// Sets the merge tolerance of the point registry.
    pub fn with_merge_tolerance(mut self, tolerance: Real) -> Self {
        self.merge_tolerance = tolerance;
        self
    }

    /// Sets the relative geometric tolerance.
    pub fn with_geometric_tolerance(mut self, tolerance: Real) -> Self {
        self.geometric_tolerance = tolerance;
        self
    }

    /// Sets the arithmetic precision policy.
    pub fn with_arithmetic(mut self, mode: ArithmeticMode) -> Self {
        self.arithmetic = mode;
        self
    }

    /// Sets the quadrature strategies of volume and boundary cells.
    pub fn with_gauss_points(mut self, volume: VCellGaussPts, boundary: BCellGaussPts) -> Self {
        self.volume_gauss_points = volume;
        self.boundary_gauss_points = boundary;
        self
    }

    /// Sets the integration degree.
    pub fn with_integration_degree(mut self, degree: usize) -> Self {
        self.integration_degree = degree;
        self
    }

    /// Enables the cross-method volume check, fatal if `strict`.
    pub fn with_cross_check(mut self, strict: bool) -> Self {
        self.cross_check = true;
        self.strict_volume_check = strict;
        self
    }

    /// The absolute geometric tolerance for an element of the given diameter.
    #[inline]
    pub fn geometric_tolerance_for(&self, diameter: Real) -> Real {
        (self.geometric_tolerance * diameter).max(self.merge_tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_test_profile_is_strict() {
        let options = Options::for_cut_tests();
        assert!(options.cross_check);
        assert!(options.strict_volume_check);
        assert_eq!(options.arithmetic, ArithmeticMode::Extended);
        assert_eq!(options.merge_tolerance, Options::default().merge_tolerance);
    }

    #[test]
    fn builders_override_defaults() {
        let options = Options::default()
            .with_merge_tolerance(1.0e-10)
            .with_geometric_tolerance(1.0e-8)
            .with_arithmetic(ArithmeticMode::Double)
            .with_gauss_points(VCellGaussPts::DirectDivergence, BCellGaussPts::Tessellation)
            .with_integration_degree(4)
            .with_cross_check(false);

        assert_eq!(options.merge_tolerance, 1.0e-10);
        assert_eq!(options.geometric_tolerance, 1.0e-8);
        assert_eq!(options.arithmetic, ArithmeticMode::Double);
        assert_eq!(options.volume_gauss_points, VCellGaussPts::DirectDivergence);
        assert_eq!(options.integration_degree, 4);
        assert!(options.cross_check);
        assert!(!options.strict_volume_check);
    }

    #[test]
    fn geometric_tolerance_never_drops_below_merge_tolerance() {
        let options = Options::default();
        assert_eq!(options.geometric_tolerance_for(1.0e-6), options.merge_tolerance);
        assert_relative_eq!(options.geometric_tolerance_for(2.0), 2.0e-10);
    }
}
