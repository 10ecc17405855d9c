//! Preconditioned conjugate gradient for symmetric positive definite operators.
//!
//! Solves always start from a zero initial guess, so the previous contents of the solution
//! vector never influence the result.
use crate::operators::{IdentityOperator, LinearOperator, OperatorError};
use core::fmt;
use nalgebra::{DVector, DVectorView, DVectorViewMut, RealField, Scalar};
use num::Zero;

pub trait CgStoppingCriterion<T: Scalar> {
    fn has_converged(
        &self,
        a: &dyn LinearOperator<T>,
        x: DVectorView<T>,
        b: DVectorView<T>,
        b_norm: T,
        iteration: usize,
        approx_residual: DVectorView<T>,
    ) -> Result<bool, SolveErrorKind>;
}

/// Relative residual tolerance ||r|| <= max(tol * ||b||, abs_tol).
///
/// The residual is the recursively updated residual of CG, not `b - Ax`.
#[derive(Debug, Clone)]
pub struct RelativeResidualCriterion<T: Scalar> {
    tol: T,
    abs_tol: T,
}

impl<T: Scalar + Zero> RelativeResidualCriterion<T> {
    pub fn new(tol: T) -> Self {
        Self { tol, abs_tol: T::zero() }
    }

    /// Lower bound on the residual norm below which the iteration always stops.
    pub fn with_absolute_tol(self, abs_tol: T) -> Self {
        Self { abs_tol, ..self }
    }
}

impl Default for RelativeResidualCriterion<f64> {
    fn default() -> Self {
        Self::new(1e-8)
    }
}

impl<T> CgStoppingCriterion<T> for RelativeResidualCriterion<T>
where
    T: RealField + Copy,
{
    fn has_converged(
        &self,
        _a: &dyn LinearOperator<T>,
        _x: DVectorView<T>,
        _b: DVectorView<T>,
        b_norm: T,
        _iteration: usize,
        approx_residual: DVectorView<T>,
    ) -> Result<bool, SolveErrorKind> {
        Ok(approx_residual.norm() <= (self.tol * b_norm).max(self.abs_tol))
    }
}

/// Vectors used by CG, kept between solves to avoid reallocation.
#[derive(Debug, Clone)]
pub struct CgWorkspace<T: Scalar> {
    residual: DVector<T>,
    preconditioned: DVector<T>,
    direction: DVector<T>,
    a_direction: DVector<T>,
}

impl<T: Scalar + Zero> Default for CgWorkspace<T> {
    fn default() -> Self {
        Self {
            residual: DVector::zeros(0),
            preconditioned: DVector::zeros(0),
            direction: DVector::zeros(0),
            a_direction: DVector::zeros(0),
        }
    }
}

impl<T: Scalar + Zero> CgWorkspace<T> {
    fn resize(&mut self, dim: usize) {
        for v in [
            &mut self.residual,
            &mut self.preconditioned,
            &mut self.direction,
            &mut self.a_direction,
        ] {
            v.resize_vertically_mut(dim, T::zero());
        }
    }
}

/// Builder for a conjugate gradient solve.
///
/// Without [`with_workspace`](Self::with_workspace), each solve allocates its own vectors.
#[derive(Debug)]
pub struct ConjugateGradient<'a, T: Scalar, A, P, Criterion> {
    workspace: Option<&'a mut CgWorkspace<T>>,
    operator: A,
    preconditioner: P,
    stopping_criterion: Criterion,
    max_iter: Option<usize>,
}

impl<'a, T: Scalar> ConjugateGradient<'a, T, (), IdentityOperator, ()> {
    pub fn new() -> Self {
        Self {
            workspace: None,
            operator: (),
            preconditioner: IdentityOperator,
            stopping_criterion: (),
            max_iter: None,
        }
    }

    pub fn with_workspace(workspace: &'a mut CgWorkspace<T>) -> Self {
        Self {
            workspace: Some(workspace),
            ..Self::new()
        }
    }
}

impl<'a, T: Scalar, A, P, Criterion> ConjugateGradient<'a, T, A, P, Criterion> {
    pub fn with_operator<A2>(self, operator: A2) -> ConjugateGradient<'a, T, A2, P, Criterion> {
        ConjugateGradient {
            workspace: self.workspace,
            operator,
            preconditioner: self.preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_preconditioner<P2>(self, preconditioner: P2) -> ConjugateGradient<'a, T, A, P2, Criterion> {
        ConjugateGradient {
            workspace: self.workspace,
            operator: self.operator,
            preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_stopping_criterion<C2>(self, stopping_criterion: C2) -> ConjugateGradient<'a, T, A, P, C2> {
        ConjugateGradient {
            workspace: self.workspace,
            operator: self.operator,
            preconditioner: self.preconditioner,
            stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self {
            max_iter: Some(max_iter),
            ..self
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum SolveErrorKind {
    OperatorError(OperatorError),
    PreconditionerError(OperatorError),
    IndefiniteOperator,
    IndefinitePreconditioner,
    MaxIterationsReached { max_iter: usize },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatorError(err) => write!(f, "Error applying operator: {}", err),
            Self::PreconditionerError(err) => write!(f, "Error applying preconditioner: {}", err),
            Self::IndefiniteOperator => write!(f, "Operator appears to be indefinite"),
            Self::IndefinitePreconditioner => write!(f, "Preconditioner appears to be indefinite"),
            Self::MaxIterationsReached { max_iter } => write!(f, "Max iterations ({}) reached", max_iter),
        }
    }
}

/// A failed solve, together with the state of the last iterate.
#[non_exhaustive]
#[derive(Debug)]
pub struct SolveError<T> {
    pub output: CgOutput<T>,
    pub kind: SolveErrorKind,
}

impl<T> SolveError<T> {
    fn new(output: CgOutput<T>, kind: SolveErrorKind) -> Self {
        Self { output, kind }
    }
}

impl<T> fmt::Display for SolveError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CG solve failed after {} iterations: {}",
            self.output.num_iterations, self.kind
        )
    }
}

impl<T: fmt::Debug> std::error::Error for SolveError<T> {}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct CgOutput<T> {
    /// Number of updates made to the solution vector.
    pub num_iterations: usize,
    /// Norm of the approximate residual of the final iterate.
    pub residual_norm: T,
    pub rhs_norm: T,
}

/// y = Ax
fn apply<T: Scalar>(a: &dyn LinearOperator<T>, y: &mut DVector<T>, x: &DVector<T>) -> Result<(), OperatorError> {
    a.apply(y.into(), x.into())
}

impl<'a, T, A, P, Criterion> ConjugateGradient<'a, T, A, P, Criterion>
where
    T: RealField + Copy,
    A: LinearOperator<T>,
    P: LinearOperator<T>,
    Criterion: CgStoppingCriterion<T>,
{
    /// Solves `A x = b`, overwriting `x`.
    pub fn solve<'b>(
        &mut self,
        b: impl Into<DVectorView<'b, T>>,
        x: impl Into<DVectorViewMut<'b, T>>,
    ) -> Result<CgOutput<T>, SolveError<T>> {
        use SolveErrorKind::*;
        let b: DVectorView<T> = b.into();
        let mut x: DVectorViewMut<T> = x.into();
        assert_eq!(b.len(), x.len(), "Right-hand side and solution must have the same length");
        x.fill(T::zero());

        let b_norm = b.norm();
        let mut output = CgOutput {
            num_iterations: 0,
            residual_norm: b_norm,
            rhs_norm: b_norm,
        };
        if b_norm == T::zero() {
            return Ok(output);
        }

        let mut owned_workspace = None;
        let workspace = match self.workspace.as_deref_mut() {
            Some(workspace) => workspace,
            None => owned_workspace.insert(CgWorkspace::default()),
        };
        workspace.resize(x.len());
        let CgWorkspace {
            residual: r,
            preconditioned: z,
            direction: p,
            a_direction: ap,
        } = workspace;

        // With x = 0 the initial residual is b
        r.copy_from(&b);
        apply(&self.preconditioner, &mut *z, &*r).map_err(|err| SolveError::new(output.clone(), PreconditionerError(err)))?;
        p.copy_from(z);
        let mut rz = r.dot(z);
        if rz <= T::zero() {
            return Err(SolveError::new(output, IndefinitePreconditioner));
        }

        loop {
            output.residual_norm = r.norm();
            let converged = self
                .stopping_criterion
                .has_converged(
                    &self.operator,
                    (&x).into(),
                    (&b).into(),
                    b_norm,
                    output.num_iterations,
                    (&*r).into(),
                )
                .map_err(|kind| SolveError::new(output.clone(), kind))?;
            if converged {
                return Ok(output);
            }
            if let Some(max_iter) = self.max_iter.filter(|&max_iter| output.num_iterations >= max_iter) {
                return Err(SolveError::new(output, MaxIterationsReached { max_iter }));
            }

            apply(&self.operator, &mut *ap, &*p).map_err(|err| SolveError::new(output.clone(), OperatorError(err)))?;
            let p_ap = p.dot(ap);
            if p_ap <= T::zero() {
                return Err(SolveError::new(output, IndefiniteOperator));
            }

            let alpha = rz / p_ap;
            x.axpy(alpha, &*p, T::one());
            r.axpy(-alpha, &*ap, T::one());
            output.num_iterations += 1;

            apply(&self.preconditioner, &mut *z, &*r).map_err(|err| SolveError::new(output.clone(), PreconditionerError(err)))?;
            let rz_next = r.dot(z);
            if rz_next < T::zero() {
                return Err(SolveError::new(output, IndefinitePreconditioner));
            }
            // p <- z + beta p
            p.axpy(T::one(), &*z, rz_next / rz);
            rz = rz_next;
        }
    }
}
