use crate::assembly::local::LagrangeMassAssembler;
use crate::assembly::ElementMatrixAssembler;
use crate::element::{p1_reference_gradients, SimplexGeometry};
use crate::error::EstimatorError;
use crate::field::FieldScalar;
use crate::mesh::ParMesh;
use crate::space::{FiniteElementSpace, RangeType};
use crate::SmallDim;
use eyre::ensure;
use nalgebra::{Const, DVector, Point, SVector};
use rayon::prelude::*;

/// Continuous piecewise linear Lagrange space with one dof per mesh vertex and component.
///
/// Dofs are ordered by component: dof `k * num_nodes + v` is component `k` at vertex `v`.
#[derive(Debug, Clone)]
pub struct LagrangeSpace<const D: usize> {
    mesh: ParMesh<D>,
    geometries: Vec<SimplexGeometry<D>>,
    reference_gradients: Vec<SVector<f64, D>>,
    vdim: usize,
}

impl<const D: usize> LagrangeSpace<D>
where
    Const<D>: SmallDim,
{
    pub fn new(mesh: ParMesh<D>) -> eyre::Result<Self> {
        let geometries = (0..mesh.num_elements())
            .into_par_iter()
            .map(|e| {
                let vertices: Vec<_> = mesh
                    .element_vertices(e)
                    .iter()
                    .map(|&v| mesh.global_mesh().vertices()[v])
                    .collect();
                SimplexGeometry::from_vertices(&vertices)
            })
            .collect::<eyre::Result<Vec<_>>>()?;

        Ok(Self {
            mesh,
            geometries,
            reference_gradients: p1_reference_gradients(),
            vdim: 1,
        })
    }
}

impl<const D: usize> LagrangeSpace<D> {
    /// The same space with `vdim` components.
    pub fn with_vdim(&self, vdim: usize) -> eyre::Result<Self> {
        ensure!(vdim > 0, "Number of components must be positive");
        Ok(Self { vdim, ..self.clone() })
    }

    /// Number of mesh vertices, i.e. the number of dofs per component.
    pub fn num_nodes(&self) -> usize {
        self.mesh.global_mesh().vertices().len()
    }

    pub fn element_nodes(&self, element_index: usize) -> &[usize] {
        self.mesh.element_vertices(element_index)
    }

    pub fn element_dof_count(&self) -> usize {
        self.vdim * (D + 1)
    }

    /// Populates the element's dofs, grouped by component.
    pub fn populate_element_dofs(&self, output: &mut [usize], element_index: usize) {
        assert_eq!(output.len(), self.element_dof_count());
        let nodes = self.element_nodes(element_index);
        let num_nodes = self.num_nodes();
        for (k, component_dofs) in output.chunks_exact_mut(D + 1).enumerate() {
            for (dof, &node) in component_dofs.iter_mut().zip(nodes) {
                *dof = k * num_nodes + node;
            }
        }
    }

    pub fn geometry(&self, element_index: usize) -> &SimplexGeometry<D> {
        &self.geometries[element_index]
    }

    /// Constant gradients of the basis functions on the reference simplex.
    pub fn reference_gradients(&self) -> &[SVector<f64, D>] {
        &self.reference_gradients
    }

    /// Nodal interpolation of `f(x, component)`.
    pub fn interpolate<T: FieldScalar>(&self, f: impl Fn(&Point<f64, D>, usize) -> T) -> DVector<T> {
        let vertices = self.mesh.global_mesh().vertices();
        let num_nodes = vertices.len();
        DVector::from_fn(self.num_dofs(), |dof, _| f(&vertices[dof % num_nodes], dof / num_nodes))
    }
}

impl<const D: usize> FiniteElementSpace<D> for LagrangeSpace<D> {
    fn par_mesh(&self) -> &ParMesh<D> {
        &self.mesh
    }

    fn num_dofs(&self) -> usize {
        self.vdim * self.num_nodes()
    }

    fn vdim(&self) -> usize {
        self.vdim
    }

    fn range_type(&self) -> RangeType {
        RangeType::Scalar
    }

    fn order(&self) -> usize {
        1
    }

    fn mass_assembler(&self) -> Result<Box<dyn ElementMatrixAssembler + '_>, EstimatorError> {
        Ok(Box::new(LagrangeMassAssembler::new(self)?))
    }
}
