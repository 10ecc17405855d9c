//! Affine simplex geometry and reference basis functions.
//!
//! The reference simplex in `D` dimensions is the convex hull of the origin and the `D`
//! unit vectors. Its barycentric coordinates are `λ_0 = 1 - Σ ξ_i` and `λ_i = ξ_{i-1}`.
use crate::SmallDim;
use eyre::eyre;
use nalgebra::{Const, Point, SMatrix, SVector};

pub mod nedelec;

/// Affine map `x = x_0 + J ξ` from the reference simplex to a physical simplex.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexGeometry<const D: usize> {
    origin: Point<f64, D>,
    jacobian: SMatrix<f64, D, D>,
    determinant: f64,
    inverse_transpose: SMatrix<f64, D, D>,
}

impl<const D: usize> SimplexGeometry<D>
where
    Const<D>: SmallDim,
{
    /// Computes the geometry of the simplex with the given `D + 1` vertices.
    ///
    /// Returns an error for degenerate simplices.
    pub fn from_vertices(vertices: &[Point<f64, D>]) -> eyre::Result<Self> {
        if vertices.len() != D + 1 {
            return Err(eyre!(
                "A {}-simplex requires {} vertices, got {}",
                D,
                D + 1,
                vertices.len()
            ));
        }
        let origin = vertices[0];
        let jacobian = SMatrix::<f64, D, D>::from_fn(|i, j| vertices[j + 1][i] - origin[i]);
        let determinant = jacobian.determinant();
        // Scale-invariant degeneracy check relative to the edge lengths spanning J
        let scale: f64 = jacobian.column_iter().map(|c| c.norm()).product();
        if !determinant.is_finite() || determinant.abs() <= 1e-14 * scale || scale == 0.0 {
            return Err(eyre!("Degenerate simplex with vertices {:?}", vertices));
        }
        let inverse = jacobian
            .try_inverse()
            .ok_or_else(|| eyre!("Jacobian of simplex with vertices {:?} is not invertible", vertices))?;

        Ok(Self {
            origin,
            jacobian,
            determinant,
            inverse_transpose: inverse.transpose(),
        })
    }
}

impl<const D: usize> SimplexGeometry<D> {
    pub fn jacobian(&self) -> &SMatrix<f64, D, D> {
        &self.jacobian
    }

    /// Signed Jacobian determinant. Negative for inverted vertex orderings.
    pub fn determinant(&self) -> f64 {
        self.determinant
    }

    pub fn inverse_transpose(&self) -> &SMatrix<f64, D, D> {
        &self.inverse_transpose
    }

    pub fn map_reference_coords(&self, xi: &Point<f64, D>) -> Point<f64, D> {
        self.origin + self.jacobian * xi.coords
    }

    /// Maps a gradient with respect to reference coordinates to physical coordinates.
    pub fn map_gradient(&self, reference_gradient: &SVector<f64, D>) -> SVector<f64, D> {
        self.inverse_transpose * reference_gradient
    }

    pub fn volume(&self) -> f64 {
        let factorial: usize = (1..=D).product();
        self.determinant.abs() / factorial as f64
    }
}

/// Values of the linear Lagrange basis functions, i.e. the barycentric coordinates, at `xi`.
pub fn p1_basis<const D: usize>(xi: &Point<f64, D>, output: &mut [f64]) {
    assert_eq!(output.len(), D + 1, "Output must hold one value per vertex");
    output[0] = 1.0 - xi.coords.sum();
    output[1..].copy_from_slice(xi.coords.as_slice());
}

/// Gradients of the linear Lagrange basis functions on the reference simplex.
pub fn p1_reference_gradients<const D: usize>() -> Vec<SVector<f64, D>> {
    let mut gradients = Vec::with_capacity(D + 1);
    gradients.push(SVector::repeat(-1.0));
    for i in 0..D {
        let mut gradient = SVector::zeros();
        gradient[i] = 1.0;
        gradients.push(gradient);
    }
    gradients
}
