use crate::assembly::{ElementConnectivityAssembler, ElementMatrixAssembler};
use crate::element::p1_basis;
use crate::error::EstimatorError;
use crate::material::ElementCoefficients;
use crate::quadrature::QuadratureRule;
use crate::space::{FiniteElementSpace, LagrangeSpace};
use nalgebra::DMatrixViewMut;

/// Assembles the mixed form mapping a scalar P1 field to its weighted gradient in the
/// vector P1 space with `D` components,
///
/// $$
/// B_{(k, i), j} = \int_\Omega (\varepsilon \nabla \phi_j)_k \\, \phi_i \\, \mathrm{d}x.
/// $$
///
/// Rows follow the component-wise dof ordering of the vector space.
#[derive(Debug, Clone)]
pub struct MixedGradientAssembler<'a, const D: usize> {
    trial_space: &'a LagrangeSpace<D>,
    test_space: &'a LagrangeSpace<D>,
    permittivity: &'a ElementCoefficients<D>,
    rule: QuadratureRule<D>,
}

impl<'a, const D: usize> MixedGradientAssembler<'a, D> {
    pub fn new(
        trial_space: &'a LagrangeSpace<D>,
        test_space: &'a LagrangeSpace<D>,
        permittivity: &'a ElementCoefficients<D>,
    ) -> Result<Self, EstimatorError> {
        if trial_space.vdim() != 1 || test_space.vdim() != D {
            return Err(EstimatorError::SpaceMismatch(format!(
                "gradient form requires a scalar trial space and a test space with {} components, got {} and {}",
                D,
                trial_space.vdim(),
                test_space.vdim()
            )));
        }
        if !trial_space.par_mesh().shares_mesh_with(test_space.par_mesh()) {
            return Err(EstimatorError::SpaceMismatch(
                "trial and test spaces are defined on different meshes".to_string(),
            ));
        }
        if permittivity.len() != trial_space.num_elements() {
            return Err(EstimatorError::SpaceMismatch(format!(
                "got {} element coefficients for {} elements",
                permittivity.len(),
                trial_space.num_elements()
            )));
        }
        let rule = QuadratureRule::reference_simplex(test_space.order())?;
        Ok(Self {
            trial_space,
            test_space,
            permittivity,
            rule,
        })
    }
}

impl<'a, const D: usize> ElementConnectivityAssembler for MixedGradientAssembler<'a, D> {
    fn num_elements(&self) -> usize {
        self.trial_space.num_elements()
    }

    fn num_rows(&self) -> usize {
        self.test_space.num_dofs()
    }

    fn num_cols(&self) -> usize {
        self.trial_space.num_dofs()
    }

    fn element_row_count(&self, _element_index: usize) -> usize {
        self.test_space.element_dof_count()
    }

    fn element_col_count(&self, _element_index: usize) -> usize {
        self.trial_space.element_dof_count()
    }

    fn populate_element_rows(&self, output: &mut [usize], element_index: usize) {
        self.test_space.populate_element_dofs(output, element_index);
    }

    fn populate_element_cols(&self, output: &mut [usize], element_index: usize) {
        self.trial_space.populate_element_dofs(output, element_index);
    }
}

impl<'a, const D: usize> ElementMatrixAssembler for MixedGradientAssembler<'a, D> {
    fn assemble_element_matrix_into(&self, element_index: usize, mut output: DMatrixViewMut<f64>) -> eyre::Result<()> {
        let geometry = self.trial_space.geometry(element_index);
        let eps = self.permittivity.element_coefficient(element_index);
        let det = geometry.determinant().abs();
        let weighted_gradients: Vec<_> = self
            .trial_space
            .reference_gradients()
            .iter()
            .map(|g| eps * geometry.map_gradient(g))
            .collect();

        let num_nodes = D + 1;
        let mut phi = vec![0.0; num_nodes];
        output.fill(0.0);
        for (w, xi) in self.rule.iter() {
            p1_basis(xi, &mut phi);
            for (j, grad_j) in weighted_gradients.iter().enumerate() {
                for k in 0..D {
                    for (i, &phi_i) in phi.iter().enumerate() {
                        output[(k * num_nodes + i, j)] += w * det * grad_j[k] * phi_i;
                    }
                }
            }
        }
        Ok(())
    }
}
