//! Quadrature rules for simplicial reference domains.
//!
//! The reference triangle is the convex hull of `(0, 0)`, `(1, 0)` and `(0, 1)`, and the
//! reference tetrahedron is the convex hull of the origin and the three unit vectors.
//! Weights are scaled so that they sum to the volume of the reference domain.
//!
//! Rules are indexed by their *strength*, the maximum total polynomial degree that they
//! integrate exactly.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod simplex;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable { requested_strength: usize, max_strength: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable {
                requested_strength,
                max_strength,
            } => {
                write!(
                    f,
                    "No quadrature rule of strength {} available (maximum strength is {})",
                    requested_strength, max_strength
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A three-dimensional point.
pub type Point3 = Point<3>;

/// A D-dimensional rule.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// A three-dimensional rule.
pub type Rule3d = Rule<3>;

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights.iter().zip(points).map(|(w, p)| w * f(p)).sum()
}
