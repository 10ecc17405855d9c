use crate::assembly::ElementMatrixAssembler;
use fluxrec_sparse::{CooMatrix, CsrMatrix};
use nalgebra::{DMatrix, DVector};

/// Assembles the local contribution of all elements into a CSR matrix.
///
/// Duplicate entries are summed.
pub fn assemble_csr(element_assembler: &dyn ElementMatrixAssembler) -> eyre::Result<CsrMatrix<f64>> {
    let mut coo = CooMatrix::new(element_assembler.num_rows(), element_assembler.num_cols());
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut element_matrix = DMatrix::zeros(0, 0);

    for i in 0..element_assembler.num_elements() {
        let num_rows = element_assembler.element_row_count(i);
        let num_cols = element_assembler.element_col_count(i);
        rows.resize(num_rows, usize::MAX);
        cols.resize(num_cols, usize::MAX);
        element_assembler.populate_element_rows(&mut rows, i);
        element_assembler.populate_element_cols(&mut cols, i);

        element_matrix.resize_mut(num_rows, num_cols, 0.0);
        element_assembler.assemble_element_matrix_into(i, (&mut element_matrix).into())?;

        for (local_j, &global_j) in cols.iter().enumerate() {
            for (local_i, &global_i) in rows.iter().enumerate() {
                coo.push(global_i, global_j, element_matrix[(local_i, local_j)]);
            }
        }
    }

    Ok(CsrMatrix::from(&coo))
}

/// The diagonal of a square CSR matrix.
pub fn csr_diagonal(matrix: &CsrMatrix<f64>) -> DVector<f64> {
    let mut diagonal = DVector::zeros(matrix.nrows());
    for (i, row) in matrix.row_iter().enumerate() {
        diagonal[i] = row
            .col_indices()
            .iter()
            .zip(row.values())
            .filter(|(&j, _)| j == i)
            .map(|(_, &v)| v)
            .sum();
    }
    diagonal
}
