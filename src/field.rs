//! Real- and complex-valued field values.
//!
//! The estimators evaluate discontinuous and recovered fluxes pointwise. Depending on the
//! problem these are real or complex scalars or vectors, and the traits in this module
//! capture the handful of operations the error integrals need.
use nalgebra::{SMatrix, SVector, Scalar};
use num::complex::Complex64;
use num::Zero;
use std::ops::AddAssign;

/// The vector-space operations needed to integrate a flux difference.
pub trait FieldValue: Clone {
    fn plus(&self, other: &Self) -> Self;

    fn minus(&self, other: &Self) -> Self;

    fn scaled(&self, factor: f64) -> Self;

    /// For complex values, the sum of the squared real and imaginary parts.
    fn squared_norm(&self) -> f64;
}

/// Scalar type of a field's degrees of freedom, either `f64` or [`Complex64`].
pub trait FieldScalar: FieldValue + Scalar + Copy + Zero + AddAssign + Send + Sync {
    const IS_COMPLEX: bool;

    fn re(self) -> f64;

    fn im(self) -> f64;

    /// Constructs a value from its real and imaginary parts. Real scalars drop `im`.
    fn from_parts(re: f64, im: f64) -> Self;

    /// Reinterprets a slice of real values, returning `None` for complex scalars.
    fn as_real_slice(values: &[Self]) -> Option<&[f64]>;

    fn as_real_slice_mut(values: &mut [Self]) -> Option<&mut [f64]>;
}

impl FieldValue for f64 {
    fn plus(&self, other: &Self) -> Self {
        self + other
    }

    fn minus(&self, other: &Self) -> Self {
        self - other
    }

    fn scaled(&self, factor: f64) -> Self {
        self * factor
    }

    fn squared_norm(&self) -> f64 {
        self * self
    }
}

impl FieldScalar for f64 {
    const IS_COMPLEX: bool = false;

    fn re(self) -> f64 {
        self
    }

    fn im(self) -> f64 {
        0.0
    }

    fn from_parts(re: f64, _im: f64) -> Self {
        re
    }

    fn as_real_slice(values: &[Self]) -> Option<&[f64]> {
        Some(values)
    }

    fn as_real_slice_mut(values: &mut [Self]) -> Option<&mut [f64]> {
        Some(values)
    }
}

impl FieldValue for Complex64 {
    fn plus(&self, other: &Self) -> Self {
        *self + *other
    }

    fn minus(&self, other: &Self) -> Self {
        *self - *other
    }

    fn scaled(&self, factor: f64) -> Self {
        *self * factor
    }

    fn squared_norm(&self) -> f64 {
        self.norm_sqr()
    }
}

impl FieldScalar for Complex64 {
    const IS_COMPLEX: bool = true;

    fn re(self) -> f64 {
        self.re
    }

    fn im(self) -> f64 {
        self.im
    }

    fn from_parts(re: f64, im: f64) -> Self {
        Complex64::new(re, im)
    }

    fn as_real_slice(_values: &[Self]) -> Option<&[f64]> {
        None
    }

    fn as_real_slice_mut(_values: &mut [Self]) -> Option<&mut [f64]> {
        None
    }
}

impl<S: FieldScalar, const N: usize> FieldValue for SVector<S, N> {
    fn plus(&self, other: &Self) -> Self {
        self.zip_map(other, |a, b| a.plus(&b))
    }

    fn minus(&self, other: &Self) -> Self {
        self.zip_map(other, |a, b| a.minus(&b))
    }

    fn scaled(&self, factor: f64) -> Self {
        self.map(|a| a.scaled(factor))
    }

    fn squared_norm(&self) -> f64 {
        self.iter().map(|a| a.squared_norm()).sum()
    }
}

/// Computes `Σ_i c_i v_i` for field coefficients `c_i` and real basis vectors `v_i`.
pub fn linear_combination<S: FieldScalar, const N: usize>(
    coefficients: &[S],
    vectors: &[SVector<f64, N>],
) -> SVector<S, N> {
    assert_eq!(coefficients.len(), vectors.len());
    let mut result = SVector::<S, N>::from_element(S::zero());
    for (c, v) in coefficients.iter().zip(vectors) {
        for i in 0..N {
            result[i] += c.scaled(v[i]);
        }
    }
    result
}

/// Computes `A v` for a real matrix `A` and a field vector `v`.
pub fn real_matrix_mul<S: FieldScalar, const N: usize>(matrix: &SMatrix<f64, N, N>, v: &SVector<S, N>) -> SVector<S, N> {
    SVector::from_fn(|i, _| (0..N).fold(S::zero(), |acc, j| acc.plus(&v[j].scaled(matrix[(i, j)]))))
}

/// Adds the quadrature contribution of one point to an element's flux error and to the
/// reference norm of the discontinuous flux.
///
/// `weight` is the quadrature weight times the absolute Jacobian determinant.
pub fn accumulate_flux_error<V: FieldValue>(
    weight: f64,
    discontinuous_flux: &V,
    smooth_flux: &V,
    element_error_squared: &mut f64,
    reference_norm_squared: &mut f64,
) {
    *reference_norm_squared += weight * discontinuous_flux.squared_norm();
    *element_error_squared += weight * smooth_flux.minus(discontinuous_flux).squared_norm();
}
