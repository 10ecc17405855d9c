use crate::config::SolverSettings;
use crate::element::nedelec::{self, NUM_EDGE_DOFS};
use crate::error::EstimatorError;
use crate::estimator::{
    estimate_elements, normalize_estimates, num_workers, ElementError, ErrorIndicator, EstimateReport, FluxProjector,
    PhaseTimings,
};
use crate::field::{accumulate_flux_error, linear_combination, real_matrix_mul, FieldScalar};
use crate::material::{ElementCoefficients, MaterialProperty, MaterialProvider};
use crate::quadrature::QuadratureRule;
use crate::space::{FiniteElementSpace, NedelecSpace};
use nalgebra::{DVector, Vector3};
use std::cell::RefCell;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CurlWorkspace<T> {
    field_dofs: [T; NUM_EDGE_DOFS],
    flux_dofs: [T; NUM_EDGE_DOFS],
    basis: [Vector3<f64>; NUM_EDGE_DOFS],
    curls: [Vector3<f64>; NUM_EDGE_DOFS],
}

impl<T: FieldScalar> CurlWorkspace<T> {
    fn new() -> Self {
        Self {
            field_dofs: [T::zero(); NUM_EDGE_DOFS],
            flux_dofs: [T::zero(); NUM_EDGE_DOFS],
            basis: [Vector3::zeros(); NUM_EDGE_DOFS],
            curls: [Vector3::zeros(); NUM_EDGE_DOFS],
        }
    }
}

/// The data needed by the element loop, shared between worker threads.
struct CurlKernel<'a> {
    space: &'a NedelecSpace,
    inv_permeability: &'a ElementCoefficients<3>,
    rule: &'a QuadratureRule<3>,
}

impl<'a> CurlKernel<'a> {
    fn element_error<T: FieldScalar>(
        &self,
        element_index: usize,
        field: &DVector<T>,
        flux: &DVector<T>,
        ws: &mut CurlWorkspace<T>,
    ) -> ElementError {
        let geometry = self.space.geometry(element_index);
        let signs = self.space.element_signs(element_index);
        for (k, &dof) in self.space.element_dofs(element_index).iter().enumerate() {
            ws.field_dofs[k] = field[dof];
            ws.flux_dofs[k] = flux[dof];
        }

        // Curls of lowest-order edge elements are constant on each element
        nedelec::reference_curls(signs, &mut ws.curls);
        nedelec::map_curls(geometry, &mut ws.curls);
        let curl = linear_combination(&ws.field_dofs, &ws.curls);
        let discontinuous_flux = real_matrix_mul(self.inv_permeability.element_coefficient(element_index), &curl);

        let det = geometry.determinant().abs();
        let mut result = ElementError::default();
        for (w, xi) in self.rule.iter() {
            nedelec::reference_basis(xi, signs, &mut ws.basis);
            nedelec::map_basis(geometry, &mut ws.basis);
            let smooth_flux = linear_combination(&ws.flux_dofs, &ws.basis);
            accumulate_flux_error(
                w * det,
                &discontinuous_flux,
                &smooth_flux,
                &mut result.error_squared,
                &mut result.reference_norm_squared,
            );
        }
        result
    }
}

/// Error estimator for fields in `H(curl)` based on the recovered flux `μ⁻¹ curl u`.
///
/// The flux is recovered in the same Nédélec space as the field. Real and complex fields
/// are supported, the squared errors of the real and imaginary parts are summed.
///
/// An estimator holds scratch buffers that are reused across calls, so it must not be
/// used from several threads at once.
#[derive(Debug)]
pub struct CurlFluxErrorEstimator<'a, T: FieldScalar, M: ?Sized> {
    material: &'a M,
    nd_space: &'a NedelecSpace,
    projector: FluxProjector<T>,
    inv_permeability: ElementCoefficients<3>,
    rule: QuadratureRule<3>,
    flux: RefCell<DVector<T>>,
    workspaces: RefCell<Vec<CurlWorkspace<T>>>,
    construction_time: Duration,
}

impl<'a, T, M> CurlFluxErrorEstimator<'a, T, M>
where
    T: FieldScalar,
    M: ?Sized + MaterialProvider<3>,
{
    pub fn new(material: &'a M, nd_space: &'a NedelecSpace, settings: &SolverSettings) -> Result<Self, EstimatorError> {
        let start = Instant::now();
        let projector = FluxProjector::curl(material, nd_space, settings)?;
        let inv_permeability =
            ElementCoefficients::from_material(material, nd_space.par_mesh(), MaterialProperty::InvPermeability)?;
        let rule = QuadratureRule::reference_simplex(nd_space.quadrature_strength())?;
        let flux = DVector::from_element(nd_space.num_dofs(), T::zero());

        Ok(Self {
            material,
            nd_space,
            projector,
            inv_permeability,
            rule,
            flux: RefCell::new(flux),
            workspaces: RefCell::new(vec![CurlWorkspace::new(); num_workers()]),
            construction_time: start.elapsed(),
        })
    }

    pub fn material(&self) -> &'a M {
        self.material
    }

    pub fn space(&self) -> &'a NedelecSpace {
        self.nd_space
    }

    pub fn projector(&self) -> &FluxProjector<T> {
        &self.projector
    }

    pub fn construction_time(&self) -> Duration {
        self.construction_time
    }

    /// Computes the normalized error estimate of every local element.
    ///
    /// This is a collective operation.
    pub fn estimate(&self, field: &DVector<T>) -> Result<(DVector<f64>, EstimateReport), EstimatorError> {
        let expected = self.nd_space.num_dofs();
        if field.len() != expected {
            return Err(EstimatorError::InputSizeMismatch {
                expected,
                actual: field.len(),
            });
        }

        let flux = &mut *self.flux.borrow_mut();
        let projection = self.projector.apply(field, flux)?;

        let estimation_start = Instant::now();
        let kernel = CurlKernel {
            space: self.nd_space,
            inv_permeability: &self.inv_permeability,
            rule: &self.rule,
        };
        let flux: &DVector<T> = flux;
        let mut estimates = DVector::zeros(self.nd_space.num_elements());
        let local_norm_squared = estimate_elements(
            estimates.as_mut_slice(),
            &mut self.workspaces.borrow_mut(),
            |e, ws| kernel.element_error(e, field, flux, ws),
        );
        let reference_norm_squared = normalize_estimates(&mut estimates, local_norm_squared, self.nd_space.comm());

        let report = EstimateReport {
            timings: PhaseTimings {
                projection: projection.elapsed,
                estimation: estimation_start.elapsed(),
            },
            solves: projection.solves,
            reference_norm_squared,
        };
        Ok((estimates, report))
    }

    /// Estimates the error of `field` and merges it into `indicator`.
    pub fn add_error_indicator(
        &self,
        field: &DVector<T>,
        indicator: &mut ErrorIndicator,
    ) -> Result<EstimateReport, EstimatorError> {
        let (estimates, report) = self.estimate(field)?;
        indicator.add_indicator(&estimates)?;
        Ok(report)
    }
}
