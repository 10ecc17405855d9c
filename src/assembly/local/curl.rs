use crate::assembly::{ElementConnectivityAssembler, ElementMatrixAssembler};
use crate::element::nedelec::{self, NUM_EDGE_DOFS};
use crate::error::EstimatorError;
use crate::material::ElementCoefficients;
use crate::quadrature::QuadratureRule;
use crate::space::{FiniteElementSpace, NedelecSpace};
use nalgebra::{DMatrixViewMut, Vector3};

/// Assembles the mixed form mapping a Nédélec field to its weighted curl in the same space,
///
/// $$
/// B_{ij} = \int_\Omega (\mu^{-1} \nabla \times W_j) \cdot W_i \\, \mathrm{d}x.
/// $$
#[derive(Debug, Clone)]
pub struct MixedCurlAssembler<'a> {
    space: &'a NedelecSpace,
    inv_permeability: &'a ElementCoefficients<3>,
    rule: QuadratureRule<3>,
}

impl<'a> MixedCurlAssembler<'a> {
    pub fn new(space: &'a NedelecSpace, inv_permeability: &'a ElementCoefficients<3>) -> Result<Self, EstimatorError> {
        if inv_permeability.len() != space.num_elements() {
            return Err(EstimatorError::SpaceMismatch(format!(
                "got {} element coefficients for {} elements",
                inv_permeability.len(),
                space.num_elements()
            )));
        }
        // The curls are constant, so the integrand has the degree of the basis
        let rule = QuadratureRule::reference_simplex(space.order())?;
        Ok(Self {
            space,
            inv_permeability,
            rule,
        })
    }
}

impl<'a> ElementConnectivityAssembler for MixedCurlAssembler<'a> {
    fn num_elements(&self) -> usize {
        self.space.num_elements()
    }

    fn num_rows(&self) -> usize {
        self.space.num_dofs()
    }

    fn num_cols(&self) -> usize {
        self.space.num_dofs()
    }

    fn element_row_count(&self, _element_index: usize) -> usize {
        NUM_EDGE_DOFS
    }

    fn element_col_count(&self, _element_index: usize) -> usize {
        NUM_EDGE_DOFS
    }

    fn populate_element_rows(&self, output: &mut [usize], element_index: usize) {
        output.copy_from_slice(self.space.element_dofs(element_index));
    }

    fn populate_element_cols(&self, output: &mut [usize], element_index: usize) {
        output.copy_from_slice(self.space.element_dofs(element_index));
    }
}

impl<'a> ElementMatrixAssembler for MixedCurlAssembler<'a> {
    fn assemble_element_matrix_into(&self, element_index: usize, mut output: DMatrixViewMut<f64>) -> eyre::Result<()> {
        let geometry = self.space.geometry(element_index);
        let signs = self.space.element_signs(element_index);
        let mu_inv = self.inv_permeability.element_coefficient(element_index);
        let det = geometry.determinant().abs();

        let mut curls = [Vector3::zeros(); NUM_EDGE_DOFS];
        nedelec::reference_curls(signs, &mut curls);
        nedelec::map_curls(geometry, &mut curls);
        let weighted_curls = curls.map(|c| mu_inv * c);

        let mut basis = [Vector3::zeros(); NUM_EDGE_DOFS];
        output.fill(0.0);
        for (w, xi) in self.rule.iter() {
            nedelec::reference_basis(xi, signs, &mut basis);
            nedelec::map_basis(geometry, &mut basis);
            for (j, curl_j) in weighted_curls.iter().enumerate() {
                for (i, w_i) in basis.iter().enumerate() {
                    output[(i, j)] += w * det * curl_j.dot(w_i);
                }
            }
        }
        Ok(())
    }
}
