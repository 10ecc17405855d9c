use crate::assembly::operators::{DistributedOperator, MatrixDiagonal};
use crate::config::SolverSettings;
use crate::error::EstimatorError;
use crate::field::FieldScalar;
use fluxrec_sparse::cg::{
    CgStoppingCriterion, CgWorkspace, ConjugateGradient, RelativeResidualCriterion, SolveErrorKind,
};
use fluxrec_sparse::{CsrMatrix, DiagonalOperator, LinearOperator};
use log::{debug, info, warn};
use nalgebra::{DVector, DVectorView, DVectorViewMut};
use std::cell::RefCell;

/// Outcome of a single linear solve.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SolveStatus {
    pub converged: bool,
    pub iterations: usize,
    pub residual_norm: f64,
    pub rhs_norm: f64,
}

impl SolveStatus {
    pub fn relative_residual(&self) -> f64 {
        if self.rhs_norm > 0.0 {
            self.residual_norm / self.rhs_norm
        } else {
            0.0
        }
    }
}

/// Relative residual criterion that reports the residual history on the root rank.
#[derive(Debug)]
struct MonitoredCriterion {
    inner: RelativeResidualCriterion<f64>,
    log_iterations: bool,
}

impl CgStoppingCriterion<f64> for MonitoredCriterion {
    fn has_converged(
        &self,
        a: &dyn LinearOperator<f64>,
        x: DVectorView<f64>,
        b: DVectorView<f64>,
        b_norm: f64,
        iteration: usize,
        approx_residual: DVectorView<f64>,
    ) -> Result<bool, SolveErrorKind> {
        if self.log_iterations {
            debug!(
                "  CG iteration {:4}: residual = {:.6e} (rel = {:.6e})",
                iteration,
                approx_residual.norm(),
                approx_residual.norm() / b_norm
            );
        }
        self.inner
            .has_converged(a, x, b, b_norm, iteration, approx_residual)
    }
}

/// Preconditioned conjugate gradient solver for the global mass matrix of the smooth space.
///
/// Complex right-hand sides are solved as two independent real systems.
#[derive(Debug)]
pub(crate) struct MassSolver {
    mass: DistributedOperator<CsrMatrix<f64>>,
    preconditioner: DiagonalOperator<f64>,
    settings: SolverSettings,
    is_root: bool,
    workspace: RefCell<CgWorkspace<f64>>,
    rhs_part: RefCell<DVector<f64>>,
    solution_part: RefCell<DVector<f64>>,
}

impl MassSolver {
    pub fn new(mass: DistributedOperator<CsrMatrix<f64>>, settings: &SolverSettings) -> Self {
        let preconditioner = DiagonalOperator::jacobi(&mass.diagonal());
        let is_root = mass.comm().is_root();
        Self {
            mass,
            preconditioner,
            settings: settings.clone(),
            is_root,
            workspace: RefCell::new(CgWorkspace::default()),
            rhs_part: RefCell::new(DVector::zeros(0)),
            solution_part: RefCell::new(DVector::zeros(0)),
        }
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn dim(&self) -> usize {
        self.mass.local().nrows()
    }

    /// Solves `M x = b`, overwriting `x`.
    pub fn solve<T: FieldScalar>(&self, b: &[T], x: &mut [T]) -> Result<Vec<SolveStatus>, EstimatorError> {
        let n = b.len();
        if let (Some(b), Some(x)) = (T::as_real_slice(b), T::as_real_slice_mut(x)) {
            let status = self.solve_real(DVectorView::from_slice(b, n), DVectorViewMut::from_slice(x, n))?;
            return Ok(vec![status]);
        }

        let rhs = &mut *self.rhs_part.borrow_mut();
        let solution = &mut *self.solution_part.borrow_mut();
        rhs.resize_vertically_mut(n, 0.0);
        solution.resize_vertically_mut(n, 0.0);

        rhs.iter_mut().zip(b).for_each(|(r, b_i)| *r = b_i.re());
        let re_status = self.solve_real((&*rhs).into(), (&mut *solution).into())?;
        x.iter_mut()
            .zip(solution.iter())
            .for_each(|(x_i, &re)| *x_i = T::from_parts(re, 0.0));

        rhs.iter_mut().zip(b).for_each(|(r, b_i)| *r = b_i.im());
        let im_status = self.solve_real((&*rhs).into(), (&mut *solution).into())?;
        x.iter_mut()
            .zip(solution.iter())
            .for_each(|(x_i, &im)| *x_i = T::from_parts(x_i.re(), im));

        Ok(vec![re_status, im_status])
    }

    fn solve_real(&self, b: DVectorView<f64>, x: DVectorViewMut<f64>) -> Result<SolveStatus, EstimatorError> {
        let workspace = &mut *self.workspace.borrow_mut();
        let criterion = MonitoredCriterion {
            inner: RelativeResidualCriterion::new(self.settings.tol).with_absolute_tol(f64::EPSILON),
            log_iterations: self.is_root && self.settings.verbosity > 1,
        };
        let result = ConjugateGradient::with_workspace(workspace)
            .with_operator(&self.mass)
            .with_preconditioner(&self.preconditioner)
            .with_stopping_criterion(criterion)
            .with_max_iter(self.settings.max_it)
            .solve(b, x);

        let status = match result {
            Ok(output) => SolveStatus {
                converged: true,
                iterations: output.num_iterations,
                residual_norm: output.residual_norm,
                rhs_norm: output.rhs_norm,
            },
            Err(err) => {
                let reached_max_iter = matches!(err.kind, SolveErrorKind::MaxIterationsReached { .. });
                if !reached_max_iter {
                    return Err(EstimatorError::Solver(err));
                }
                let status = SolveStatus {
                    converged: false,
                    iterations: err.output.num_iterations,
                    residual_norm: err.output.residual_norm,
                    rhs_norm: err.output.rhs_norm,
                };
                warn!(
                    "Flux projection did not converge in {} iterations (relative residual {:.3e})",
                    status.iterations,
                    status.relative_residual()
                );
                status
            }
        };

        if self.is_root && self.settings.verbosity > 0 && status.converged {
            info!(
                "Flux projection converged in {} iterations (relative residual {:.3e})",
                status.iterations,
                status.relative_residual()
            );
        }
        Ok(status)
    }
}
