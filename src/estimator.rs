//! Flux recovery error estimators.
//!
//! An estimator projects the flux of a discrete field onto a smooth finite element space and
//! measures, element by element, how far the discontinuous flux is from its smooth
//! recovery. The element errors are normalized by the global norm of the discontinuous
//! flux and merged into an [`ErrorIndicator`].
use crate::comm::Communicator;
use nalgebra::DVector;
use rayon::prelude::*;
use std::time::Duration;

mod curl;
mod gradient;
mod indicator;
mod projector;
mod solver;

pub use curl::CurlFluxErrorEstimator;
pub use gradient::GradFluxErrorEstimator;
pub use indicator::{CombinationRule, ErrorIndicator};
pub use projector::{FluxProjector, ProjectionReport};
pub use solver::SolveStatus;

/// Wall-clock time spent in the phases of a single estimate.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PhaseTimings {
    pub projection: Duration,
    pub estimation: Duration,
}

impl PhaseTimings {
    pub fn total(&self) -> Duration {
        self.projection + self.estimation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstimateReport {
    pub timings: PhaseTimings,
    /// Status of the projection solves.
    pub solves: Vec<SolveStatus>,
    /// Squared norm of the discontinuous flux over the whole domain.
    pub reference_norm_squared: f64,
}

impl EstimateReport {
    pub fn converged(&self) -> bool {
        self.solves.iter().all(|s| s.converged)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub(crate) struct ElementError {
    pub error_squared: f64,
    pub reference_norm_squared: f64,
}

/// Number of worker workspaces to allocate for the element loop.
pub(crate) fn num_workers() -> usize {
    rayon::current_num_threads().max(1)
}

/// Evaluates `kernel` for every element in parallel and stores the element errors.
///
/// Elements are split into contiguous chunks, one per workspace. Returns the local sum of
/// the reference norm contributions, accumulated in chunk order.
pub(crate) fn estimate_elements<W, F>(estimates: &mut [f64], workspaces: &mut [W], kernel: F) -> f64
where
    W: Send,
    F: Fn(usize, &mut W) -> ElementError + Sync,
{
    assert!(!workspaces.is_empty(), "At least one workspace is required");
    if estimates.is_empty() {
        return 0.0;
    }

    let chunk_size = (estimates.len() + workspaces.len() - 1) / workspaces.len();
    let chunk_norms: Vec<f64> = estimates
        .par_chunks_mut(chunk_size)
        .zip(workspaces.par_iter_mut())
        .enumerate()
        .map(|(chunk_index, (chunk, workspace))| {
            let offset = chunk_index * chunk_size;
            let mut reference_norm_squared = 0.0;
            for (i, estimate) in chunk.iter_mut().enumerate() {
                let element_error = kernel(offset + i, workspace);
                *estimate = element_error.error_squared.sqrt();
                reference_norm_squared += element_error.reference_norm_squared;
            }
            reference_norm_squared
        })
        .collect();
    chunk_norms.iter().sum()
}

/// Reduces the reference norm across all ranks and normalizes the estimates by it.
///
/// Estimates are left untouched when the global norm vanishes. Returns the global
/// squared norm.
pub(crate) fn normalize_estimates(estimates: &mut DVector<f64>, local_norm_squared: f64, comm: &dyn Communicator) -> f64 {
    let norm_squared = comm.global_sum(local_norm_squared);
    if norm_squared > 0.0 {
        *estimates *= 1.0 / norm_squared.sqrt();
    }
    norm_squared
}
