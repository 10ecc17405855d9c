//! Quadrature rules on the reference simplex, expressed in terms of nalgebra points.
use nalgebra::Point;

pub use fluxrec_quadrature::Error as QuadratureError;

/// A quadrature rule on the `D`-dimensional reference simplex.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureRule<const D: usize> {
    weights: Vec<f64>,
    points: Vec<Point<f64, D>>,
}

impl<const D: usize> QuadratureRule<D> {
    /// The rule of lowest cost that integrates polynomials of total degree `strength` exactly.
    pub fn reference_simplex(strength: usize) -> Result<Self, QuadratureError> {
        // Strength 0 rules do not exist separately, the midpoint rule covers them
        let strength = strength.max(1);
        match D {
            2 => {
                let (weights, points) = fluxrec_quadrature::simplex::triangle(strength)?;
                Ok(Self::from_raw(weights, points.iter().map(|p| &p[..])))
            }
            3 => {
                let (weights, points) = fluxrec_quadrature::simplex::tetrahedron(strength)?;
                Ok(Self::from_raw(weights, points.iter().map(|p| &p[..])))
            }
            _ => Err(QuadratureError::NoRuleAvailable {
                requested_strength: strength,
                max_strength: 0,
            }),
        }
    }

    fn from_raw<'a>(weights: Vec<f64>, points: impl Iterator<Item = &'a [f64]>) -> Self {
        let points = points.map(Point::from_slice).collect();
        Self { weights, points }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn points(&self) -> &[Point<f64, D>] {
        &self.points
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &Point<f64, D>)> {
        self.weights.iter().copied().zip(&self.points)
    }
}
