use crate::assembly::{ElementConnectivityAssembler, ElementMatrixAssembler};
use crate::element::nedelec::{self, NUM_EDGE_DOFS};
use crate::element::{p1_basis, SimplexGeometry};
use crate::error::EstimatorError;
use crate::quadrature::QuadratureRule;
use crate::space::{FiniteElementSpace, LagrangeSpace, NedelecSpace};
use itertools::izip;
use nalgebra::{DMatrixViewMut, Vector3};

/// Mass matrix of a scalar P1 Lagrange space.
#[derive(Debug, Clone)]
pub struct LagrangeMassAssembler<'a, const D: usize> {
    space: &'a LagrangeSpace<D>,
    rule: QuadratureRule<D>,
    basis_values: Vec<Vec<f64>>,
}

impl<'a, const D: usize> LagrangeMassAssembler<'a, D> {
    pub fn new(space: &'a LagrangeSpace<D>) -> Result<Self, EstimatorError> {
        if space.vdim() != 1 {
            return Err(EstimatorError::SpaceMismatch(format!(
                "mass matrix requires a scalar space, but the space has {} components",
                space.vdim()
            )));
        }
        let rule = QuadratureRule::reference_simplex(space.quadrature_strength())?;
        let basis_values = rule
            .points()
            .iter()
            .map(|xi| {
                let mut phi = vec![0.0; D + 1];
                p1_basis(xi, &mut phi);
                phi
            })
            .collect();
        Ok(Self {
            space,
            rule,
            basis_values,
        })
    }
}

impl<'a, const D: usize> ElementConnectivityAssembler for LagrangeMassAssembler<'a, D> {
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
        D + 1
    }

    fn element_col_count(&self, _element_index: usize) -> usize {
        D + 1
    }

    fn populate_element_rows(&self, output: &mut [usize], element_index: usize) {
        output.copy_from_slice(self.space.element_nodes(element_index));
    }

    fn populate_element_cols(&self, output: &mut [usize], element_index: usize) {
        output.copy_from_slice(self.space.element_nodes(element_index));
    }
}

impl<'a, const D: usize> ElementMatrixAssembler for LagrangeMassAssembler<'a, D> {
    fn assemble_element_matrix_into(&self, element_index: usize, output: DMatrixViewMut<f64>) -> eyre::Result<()> {
        assemble_element_lagrange_mass_matrix(
            output,
            self.space.geometry(element_index),
            self.rule.weights(),
            &self.basis_values,
        );
        Ok(())
    }
}

/// Assembles the mass matrix $M^K_{ij} = \int_K \phi_i \phi_j \\, \mathrm{d}x$ of a P1 element.
///
/// `basis_values` holds the reference basis values at each quadrature point.
pub fn assemble_element_lagrange_mass_matrix<const D: usize>(
    mut output: DMatrixViewMut<f64>,
    geometry: &SimplexGeometry<D>,
    weights: &[f64],
    basis_values: &[Vec<f64>],
) {
    assert_eq!(weights.len(), basis_values.len());
    output.fill(0.0);
    let det = geometry.determinant().abs();
    for (&w, phi) in izip!(weights, basis_values) {
        for (j, &phi_j) in phi.iter().enumerate() {
            for (i, &phi_i) in phi.iter().enumerate() {
                output[(i, j)] += w * det * phi_i * phi_j;
            }
        }
    }
}

/// Mass matrix of the lowest-order Nédélec space.
#[derive(Debug, Clone)]
pub struct NedelecMassAssembler<'a> {
    space: &'a NedelecSpace,
    rule: QuadratureRule<3>,
}

impl<'a> NedelecMassAssembler<'a> {
    pub fn new(space: &'a NedelecSpace) -> Result<Self, EstimatorError> {
        let rule = QuadratureRule::reference_simplex(space.quadrature_strength())?;
        Ok(Self { space, rule })
    }
}

impl<'a> ElementConnectivityAssembler for NedelecMassAssembler<'a> {
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

impl<'a> ElementMatrixAssembler for NedelecMassAssembler<'a> {
    fn assemble_element_matrix_into(&self, element_index: usize, mut output: DMatrixViewMut<f64>) -> eyre::Result<()> {
        let geometry = self.space.geometry(element_index);
        let signs = self.space.element_signs(element_index);
        let det = geometry.determinant().abs();
        let mut basis = [Vector3::zeros(); NUM_EDGE_DOFS];

        output.fill(0.0);
        for (w, xi) in self.rule.iter() {
            nedelec::reference_basis(xi, signs, &mut basis);
            nedelec::map_basis(geometry, &mut basis);
            for (j, w_j) in basis.iter().enumerate() {
                for (i, w_i) in basis.iter().enumerate() {
                    output[(i, j)] += w * det * w_i.dot(w_j);
                }
            }
        }
        Ok(())
    }
}
