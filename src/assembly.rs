//! Element-wise assembly of the operators used for flux recovery.
//!
//! Element assemblers describe each local element's contribution through its row and column
//! dof indices and a dense element matrix. The global assemblers in [`global`] collect these
//! contributions into sparse matrices, and [`operators`] provides operators applied directly
//! from stored element matrices.
//!
//! All assembly is restricted to the local elements of a distributed mesh. The resulting
//! matrices hold only the local contribution, and become global operators once wrapped in
//! [`DistributedOperator`](operators::DistributedOperator).
use nalgebra::DMatrixViewMut;

pub mod global;
pub mod local;
pub mod operators;

pub trait ElementConnectivityAssembler {
    fn num_elements(&self) -> usize;

    /// Number of rows of the assembled global matrix.
    fn num_rows(&self) -> usize;

    /// Number of columns of the assembled global matrix.
    fn num_cols(&self) -> usize;

    fn element_row_count(&self, element_index: usize) -> usize;

    fn element_col_count(&self, element_index: usize) -> usize;

    fn populate_element_rows(&self, output: &mut [usize], element_index: usize);

    fn populate_element_cols(&self, output: &mut [usize], element_index: usize);
}

pub trait ElementMatrixAssembler: ElementConnectivityAssembler + Sync {
    /// Computes the dense matrix of the given element.
    ///
    /// `output` has dimensions `element_row_count x element_col_count` and its previous
    /// contents are overwritten.
    fn assemble_element_matrix_into(&self, element_index: usize, output: DMatrixViewMut<f64>) -> eyre::Result<()>;
}
