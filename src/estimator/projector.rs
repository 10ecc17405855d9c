use crate::assembly::global::assemble_csr;
use crate::assembly::local::{MixedCurlAssembler, MixedGradientAssembler};
use crate::assembly::operators::{DistributedOperator, PartialAssembledOperator};
use crate::assembly::ElementMatrixAssembler;
use crate::comm::Communicator;
use crate::config::SolverSettings;
use crate::error::EstimatorError;
use crate::estimator::solver::{MassSolver, SolveStatus};
use crate::field::FieldScalar;
use crate::material::{ElementCoefficients, MaterialProperty, MaterialProvider};
use crate::operator::FieldOperator;
use crate::space::{FiniteElementSpace, LagrangeSpace, NedelecSpace};
use log::debug;
use nalgebra::DVector;
use std::cell::RefCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Summary of a single flux projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionReport {
    /// One entry per linear solve, in the order the solves were performed.
    pub solves: Vec<SolveStatus>,
    pub elapsed: Duration,
}

impl ProjectionReport {
    pub fn converged(&self) -> bool {
        self.solves.iter().all(|s| s.converged)
    }
}

/// Projects the flux of a finite element field onto a smooth finite element space.
///
/// Given a discrete field `x`, the projector computes the right-hand side `b = F x` of the
/// weighted flux operator `F` and solves `M y = b` with the mass matrix `M` of the smooth
/// space. When the smooth space has several components and `y` is a whole multiple of the
/// size of `x`, each component block of `y` is solved for separately with the scalar mass
/// matrix.
#[derive(Debug)]
pub struct FluxProjector<T: FieldScalar> {
    flux: FieldOperator<DistributedOperator<PartialAssembledOperator>>,
    solver: MassSolver,
    rhs: RefCell<DVector<T>>,
    input_dim: usize,
    construction_time: Duration,
}

impl<T: FieldScalar> FluxProjector<T> {
    /// Projector of `μ⁻¹ curl u` onto the Nédélec space of `u`.
    pub fn curl<M>(material: &M, nd_space: &NedelecSpace, settings: &SolverSettings) -> Result<Self, EstimatorError>
    where
        M: ?Sized + MaterialProvider<3>,
    {
        let start = Instant::now();
        settings.validate()?;
        let inv_permeability =
            ElementCoefficients::from_material(material, nd_space.par_mesh(), MaterialProperty::InvPermeability)?;
        let flux = MixedCurlAssembler::new(nd_space, &inv_permeability)?;
        Self::from_assemblers(
            &flux,
            nd_space.mass_assembler()?.as_ref(),
            nd_space.par_mesh().shared_comm(),
            nd_space.num_dofs(),
            settings,
            start,
        )
    }

    /// Projector of `ε ∇u` for a scalar field `u` onto a vector Lagrange space.
    ///
    /// `h1d_space` must be `h1_space` with `D` components.
    pub fn gradient<M, const D: usize>(
        material: &M,
        h1_space: &LagrangeSpace<D>,
        h1d_space: &LagrangeSpace<D>,
        settings: &SolverSettings,
    ) -> Result<Self, EstimatorError>
    where
        M: ?Sized + MaterialProvider<D>,
    {
        let start = Instant::now();
        settings.validate()?;
        let permittivity =
            ElementCoefficients::from_material(material, h1_space.par_mesh(), MaterialProperty::Permittivity)?;
        let flux = MixedGradientAssembler::new(h1_space, h1d_space, &permittivity)?;
        Self::from_assemblers(
            &flux,
            h1_space.mass_assembler()?.as_ref(),
            h1_space.par_mesh().shared_comm(),
            h1_space.num_dofs(),
            settings,
            start,
        )
    }

    fn from_assemblers(
        flux_assembler: &dyn ElementMatrixAssembler,
        mass_assembler: &dyn ElementMatrixAssembler,
        comm: Arc<dyn Communicator>,
        input_dim: usize,
        settings: &SolverSettings,
        start: Instant,
    ) -> Result<Self, EstimatorError> {
        let flux = PartialAssembledOperator::assemble(flux_assembler)?;
        let mass = assemble_csr(mass_assembler)?;

        let mass_dim = mass.nrows();
        if flux.num_cols() != input_dim {
            return Err(EstimatorError::SpaceMismatch(format!(
                "flux operator acts on {} dofs, but the field has {}",
                flux.num_cols(),
                input_dim
            )));
        }
        if mass_dim == 0 || flux.num_rows() % mass_dim != 0 {
            return Err(EstimatorError::SpaceMismatch(format!(
                "flux operator output dimension {} is not a multiple of mass matrix dimension {}",
                flux.num_rows(),
                mass_dim
            )));
        }

        let rhs = DVector::from_element(flux.num_rows(), T::zero());
        let solver = MassSolver::new(DistributedOperator::new(mass, Arc::clone(&comm)), settings);
        let projector = Self {
            flux: FieldOperator::for_scalar::<T>(DistributedOperator::new(flux, comm)),
            solver,
            rhs: RefCell::new(rhs),
            input_dim,
            construction_time: start.elapsed(),
        };
        Ok(projector)
    }

    /// Number of true dofs of the projected field.
    pub fn output_dim(&self) -> usize {
        self.flux.inner().local().num_rows()
    }

    /// Number of true dofs of the input field.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn construction_time(&self) -> Duration {
        self.construction_time
    }

    /// Computes the smooth flux `y` of the field `x`.
    ///
    /// Solver non-convergence is reported in the returned [`ProjectionReport`] and the last
    /// iterate is kept. This is a collective operation.
    pub fn apply(&self, x: &DVector<T>, y: &mut DVector<T>) -> Result<ProjectionReport, EstimatorError> {
        let start = Instant::now();
        let output_dim = self.output_dim();
        if y.len() != output_dim {
            return Err(EstimatorError::OutputSizeMismatch {
                expected: output_dim,
                actual: y.len(),
            });
        }
        if x.len() == 0 || y.len() % x.len() != 0 {
            return Err(EstimatorError::UnevenBlocking {
                input: x.len(),
                output: y.len(),
            });
        }
        let num_blocks = y.len() / x.len();
        if num_blocks > 1 && T::IS_COMPLEX {
            return Err(EstimatorError::UnsupportedComplexBlocks { vdim: num_blocks });
        }
        if x.len() != self.input_dim {
            return Err(EstimatorError::InputSizeMismatch {
                expected: self.input_dim,
                actual: x.len(),
            });
        }

        let block_size = self.solver.dim();
        if block_size * num_blocks != y.len() {
            return Err(EstimatorError::UnevenBlocking {
                input: block_size,
                output: y.len(),
            });
        }

        let rhs = &mut *self.rhs.borrow_mut();
        self.flux
            .apply(rhs.as_mut_slice(), x.as_slice())
            .map_err(EstimatorError::Operator)?;

        let mut solves = Vec::with_capacity(num_blocks);
        if num_blocks == 1 {
            solves.extend(self.solver.solve(rhs.as_slice(), y.as_mut_slice())?);
        } else {
            let log_blocks = self.solver.is_root();
            if log_blocks {
                debug!("Projecting flux component-wise in {} blocks of size {}", num_blocks, block_size);
            }
            let blocks = rhs
                .as_slice()
                .chunks_exact(block_size)
                .zip(y.as_mut_slice().chunks_exact_mut(block_size));
            for (k, (b, y_block)) in blocks.enumerate() {
                let block_solves = self.solver.solve(b, y_block)?;
                if log_blocks {
                    let iterations: usize = block_solves.iter().map(|s| s.iterations).sum();
                    debug!("Block {}: {} CG iterations", k, iterations);
                }
                solves.extend(block_solves);
            }
        }

        Ok(ProjectionReport {
            solves,
            elapsed: start.elapsed(),
        })
    }
}
