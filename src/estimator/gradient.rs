use crate::config::SolverSettings;
use crate::element::p1_basis;
use crate::error::EstimatorError;
use crate::estimator::{
    estimate_elements, normalize_estimates, num_workers, ElementError, ErrorIndicator, EstimateReport, FluxProjector,
    PhaseTimings,
};
use crate::field::{accumulate_flux_error, linear_combination};
use crate::material::{ElementCoefficients, MaterialProperty, MaterialProvider};
use crate::quadrature::QuadratureRule;
use crate::space::{FiniteElementSpace, LagrangeSpace};
use nalgebra::{DVector, SVector};
use std::cell::RefCell;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct GradWorkspace<const D: usize> {
    field_dofs: Vec<f64>,
    flux_dof_indices: Vec<usize>,
    flux_dofs: Vec<f64>,
    gradients: Vec<SVector<f64, D>>,
}

impl<const D: usize> GradWorkspace<D> {
    fn new() -> Self {
        let num_nodes = D + 1;
        Self {
            field_dofs: vec![0.0; num_nodes],
            flux_dof_indices: vec![0; D * num_nodes],
            flux_dofs: vec![0.0; D * num_nodes],
            gradients: vec![SVector::zeros(); num_nodes],
        }
    }
}

struct GradKernel<'a, const D: usize> {
    h1_space: &'a LagrangeSpace<D>,
    h1d_space: &'a LagrangeSpace<D>,
    permittivity: &'a ElementCoefficients<D>,
    rule: &'a QuadratureRule<D>,
    basis_values: &'a [Vec<f64>],
}

impl<'a, const D: usize> GradKernel<'a, D> {
    fn element_error(
        &self,
        element_index: usize,
        field: &DVector<f64>,
        flux: &DVector<f64>,
        ws: &mut GradWorkspace<D>,
    ) -> ElementError {
        let geometry = self.h1_space.geometry(element_index);
        for (u_i, &node) in ws
            .field_dofs
            .iter_mut()
            .zip(self.h1_space.element_nodes(element_index))
        {
            *u_i = field[node];
        }
        self.h1d_space
            .populate_element_dofs(&mut ws.flux_dof_indices, element_index);
        for (f_i, &dof) in ws.flux_dofs.iter_mut().zip(&ws.flux_dof_indices) {
            *f_i = flux[dof];
        }

        for (grad, ref_grad) in ws
            .gradients
            .iter_mut()
            .zip(self.h1_space.reference_gradients())
        {
            *grad = geometry.map_gradient(ref_grad);
        }
        let gradient = linear_combination(&ws.field_dofs, &ws.gradients);
        let discontinuous_flux = self.permittivity.element_coefficient(element_index) * gradient;

        let num_nodes = D + 1;
        let det = geometry.determinant().abs();
        let mut result = ElementError::default();
        for (&w, phi) in self.rule.weights().iter().zip(self.basis_values) {
            let smooth_flux = SVector::<f64, D>::from_fn(|k, _| {
                let component_dofs = &ws.flux_dofs[k * num_nodes..(k + 1) * num_nodes];
                component_dofs.iter().zip(phi).map(|(f, p)| f * p).sum()
            });
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

/// Error estimator for continuous scalar fields based on the recovered flux `ε ∇u`.
///
/// The flux is recovered in the vector Lagrange space with `D` components built from the
/// scalar space of the field. Only real-valued fields are supported.
///
/// An estimator holds scratch buffers that are reused across calls, so it must not be
/// used from several threads at once.
#[derive(Debug)]
pub struct GradFluxErrorEstimator<'a, M: ?Sized, const D: usize> {
    material: &'a M,
    h1_space: &'a LagrangeSpace<D>,
    h1d_space: LagrangeSpace<D>,
    projector: FluxProjector<f64>,
    permittivity: ElementCoefficients<D>,
    rule: QuadratureRule<D>,
    basis_values: Vec<Vec<f64>>,
    flux: RefCell<DVector<f64>>,
    workspaces: RefCell<Vec<GradWorkspace<D>>>,
    construction_time: Duration,
}

impl<'a, M, const D: usize> GradFluxErrorEstimator<'a, M, D>
where
    M: ?Sized + MaterialProvider<D>,
{
    pub fn new(material: &'a M, h1_space: &'a LagrangeSpace<D>, settings: &SolverSettings) -> Result<Self, EstimatorError> {
        let start = Instant::now();
        if h1_space.vdim() != 1 {
            return Err(EstimatorError::SpaceMismatch(format!(
                "gradient recovery requires a scalar field space, but the space has {} components",
                h1_space.vdim()
            )));
        }
        let h1d_space = h1_space.with_vdim(D)?;
        let projector = FluxProjector::gradient(material, h1_space, &h1d_space, settings)?;
        let permittivity =
            ElementCoefficients::from_material(material, h1_space.par_mesh(), MaterialProperty::Permittivity)?;
        let rule = QuadratureRule::reference_simplex(h1_space.quadrature_strength())?;
        let basis_values = rule
            .points()
            .iter()
            .map(|xi| {
                let mut phi = vec![0.0; D + 1];
                p1_basis(xi, &mut phi);
                phi
            })
            .collect();
        let flux = DVector::zeros(h1d_space.num_dofs());

        Ok(Self {
            material,
            h1_space,
            h1d_space,
            projector,
            permittivity,
            rule,
            basis_values,
            flux: RefCell::new(flux),
            workspaces: RefCell::new(vec![GradWorkspace::new(); num_workers()]),
            construction_time: start.elapsed(),
        })
    }

    pub fn material(&self) -> &'a M {
        self.material
    }

    pub fn space(&self) -> &'a LagrangeSpace<D> {
        self.h1_space
    }

    /// The vector space the flux is recovered in.
    pub fn flux_space(&self) -> &LagrangeSpace<D> {
        &self.h1d_space
    }

    pub fn projector(&self) -> &FluxProjector<f64> {
        &self.projector
    }

    pub fn construction_time(&self) -> Duration {
        self.construction_time
    }

    /// Computes the normalized error estimate of every local element.
    ///
    /// This is a collective operation.
    pub fn estimate(&self, field: &DVector<f64>) -> Result<(DVector<f64>, EstimateReport), EstimatorError> {
        let expected = self.h1_space.num_dofs();
        if field.len() != expected {
            return Err(EstimatorError::InputSizeMismatch {
                expected,
                actual: field.len(),
            });
        }

        let flux = &mut *self.flux.borrow_mut();
        let projection = self.projector.apply(field, flux)?;

        let estimation_start = Instant::now();
        let kernel = GradKernel {
            h1_space: self.h1_space,
            h1d_space: &self.h1d_space,
            permittivity: &self.permittivity,
            rule: &self.rule,
            basis_values: &self.basis_values,
        };
        let flux: &DVector<f64> = flux;
        let mut estimates = DVector::zeros(self.h1_space.num_elements());
        let local_norm_squared = estimate_elements(
            estimates.as_mut_slice(),
            &mut self.workspaces.borrow_mut(),
            |e, ws| kernel.element_error(e, field, flux, ws),
        );
        let reference_norm_squared = normalize_estimates(&mut estimates, local_norm_squared, self.h1_space.comm());

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
        field: &DVector<f64>,
        indicator: &mut ErrorIndicator,
    ) -> Result<EstimateReport, EstimatorError> {
        let (estimates, report) = self.estimate(field)?;
        indicator.add_indicator(&estimates)?;
        Ok(report)
    }
}
