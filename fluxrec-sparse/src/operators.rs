use nalgebra::base::constraint::AreMultipliable;
use nalgebra::constraint::{DimEq, ShapeConstraint};
use nalgebra::storage::Storage;
use nalgebra::{ClosedAdd, ClosedMul, DVector, DVectorView, DVectorViewMut, Dim, Dyn, Matrix, RealField, Scalar, U1};
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::CsrMatrix;
use num::{One, Zero};
use std::error::Error;

/// Error type returned by linear operators.
pub type OperatorError = Box<dyn Error + Send + Sync>;

/// An operator computing `y = A x`.
pub trait LinearOperator<T: Scalar> {
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError>;
}

impl<'a, T, A> LinearOperator<T> for &'a A
where
    T: Scalar,
    A: ?Sized + LinearOperator<T>,
{
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        <A as LinearOperator<T>>::apply(self, y, x)
    }
}

impl<T, R, C, S> LinearOperator<T> for Matrix<T, R, C, S>
where
    T: Scalar + One + Zero + ClosedMul + ClosedAdd,
    R: Dim,
    C: Dim,
    S: Storage<T, R, C>,
    ShapeConstraint: DimEq<Dyn, R> + DimEq<C, Dyn> + AreMultipliable<R, C, Dyn, U1>,
{
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        y.gemv(T::one(), self, &x, T::zero());
        Ok(())
    }
}

impl<T> LinearOperator<T> for CsrMatrix<T>
where
    T: Scalar + Zero + One + ClosedMul + ClosedAdd,
{
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        if y.len() != self.nrows() || x.len() != self.ncols() {
            return Err(format!(
                "CSR operator of size {}x{} applied with input of length {} and output of length {}",
                self.nrows(),
                self.ncols(),
                x.len(),
                y.len()
            )
            .into());
        }
        spmm_csr_dense(T::zero(), &mut y, T::one(), Op::NoOp(self), Op::NoOp(&x));
        Ok(())
    }
}

pub struct IdentityOperator;

impl<T: Scalar> LinearOperator<T> for IdentityOperator {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        y.copy_from(&x);
        Ok(())
    }
}

/// Diagonal scaling `y = D x`.
///
/// Used to construct Jacobi preconditioners through [`DiagonalOperator::jacobi`].
#[derive(Debug, Clone)]
pub struct DiagonalOperator<T: Scalar> {
    diagonal: DVector<T>,
}

impl<T: Scalar> DiagonalOperator<T> {
    pub fn from_diagonal(diagonal: DVector<T>) -> Self {
        Self { diagonal }
    }

    pub fn diagonal(&self) -> &DVector<T> {
        &self.diagonal
    }
}

impl<T: RealField + Copy> DiagonalOperator<T> {
    /// The inverse of the given matrix diagonal.
    ///
    /// Zero entries are left unscaled to keep the preconditioner positive definite.
    pub fn jacobi(matrix_diagonal: &DVector<T>) -> Self {
        let diagonal = matrix_diagonal.map(|d| if d == T::zero() { T::one() } else { T::one() / d });
        Self { diagonal }
    }
}

impl<T> LinearOperator<T> for DiagonalOperator<T>
where
    T: Scalar + Copy + ClosedMul,
{
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        if x.len() != self.diagonal.len() || y.len() != self.diagonal.len() {
            return Err(format!(
                "Diagonal operator of size {} applied with input of length {} and output of length {}",
                self.diagonal.len(),
                x.len(),
                y.len()
            )
            .into());
        }
        for ((y_i, &x_i), &d_i) in y.iter_mut().zip(x.iter()).zip(self.diagonal.iter()) {
            *y_i = d_i * x_i;
        }
        Ok(())
    }
}
