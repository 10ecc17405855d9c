//! Finite element spaces on distributed simplex meshes.
//!
//! Degrees of freedom are numbered globally and vectors of true dofs are replicated on every
//! rank. Element-local quantities are only available for the local elements of the
//! distributed mesh.
use crate::assembly::ElementMatrixAssembler;
use crate::comm::Communicator;
use crate::error::EstimatorError;
use crate::mesh::ParMesh;

mod lagrange;
mod nedelec;

pub use lagrange::LagrangeSpace;
pub use nedelec::NedelecSpace;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RangeType {
    /// Basis functions take scalar values. Spaces with several components are repeated
    /// scalar spaces.
    Scalar,
    /// Basis functions take vector values.
    Vector,
}

pub trait FiniteElementSpace<const D: usize>: Sync {
    fn par_mesh(&self) -> &ParMesh<D>;

    /// Number of global true dofs.
    fn num_dofs(&self) -> usize;

    /// Number of repeated components of the space.
    fn vdim(&self) -> usize;

    fn range_type(&self) -> RangeType;

    /// Polynomial order of the basis functions.
    fn order(&self) -> usize;

    /// Assembler for the mass matrix of a single component of the space.
    fn mass_assembler(&self) -> Result<Box<dyn ElementMatrixAssembler + '_>, EstimatorError>;

    /// Number of local elements.
    fn num_elements(&self) -> usize {
        self.par_mesh().num_elements()
    }

    /// Quadrature strength sufficient for products of two basis functions.
    fn quadrature_strength(&self) -> usize {
        2 * self.order()
    }

    fn comm(&self) -> &dyn Communicator {
        self.par_mesh().comm()
    }
}
