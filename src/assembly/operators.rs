//! Operators applied from element contributions and their distributed counterparts.
use crate::assembly::global::csr_diagonal;
use crate::assembly::ElementMatrixAssembler;
use crate::comm::Communicator;
use fluxrec_sparse::{CsrMatrix, LinearOperator, OperatorError};
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use rayon::prelude::*;
use std::sync::Arc;

/// Operators with an explicitly available diagonal.
pub trait MatrixDiagonal {
    fn diagonal(&self) -> DVector<f64>;
}

impl MatrixDiagonal for CsrMatrix<f64> {
    fn diagonal(&self) -> DVector<f64> {
        csr_diagonal(self)
    }
}

#[derive(Debug, Clone)]
struct ElementBlock {
    rows: Vec<usize>,
    cols: Vec<usize>,
    matrix: DMatrix<f64>,
}

/// An operator that stores one dense matrix per element instead of a global sparse matrix.
///
/// Application gathers the element's input values, multiplies with the element matrix and
/// scatters the result. Elements are processed in parallel in contiguous chunks, and the
/// chunk results are summed in a fixed order.
#[derive(Debug, Clone)]
pub struct PartialAssembledOperator {
    num_rows: usize,
    num_cols: usize,
    blocks: Vec<ElementBlock>,
}

impl PartialAssembledOperator {
    pub fn assemble(element_assembler: &dyn ElementMatrixAssembler) -> eyre::Result<Self> {
        let blocks = (0..element_assembler.num_elements())
            .into_par_iter()
            .map(|i| {
                let mut rows = vec![usize::MAX; element_assembler.element_row_count(i)];
                let mut cols = vec![usize::MAX; element_assembler.element_col_count(i)];
                element_assembler.populate_element_rows(&mut rows, i);
                element_assembler.populate_element_cols(&mut cols, i);
                let mut matrix = DMatrix::zeros(rows.len(), cols.len());
                element_assembler.assemble_element_matrix_into(i, (&mut matrix).into())?;
                Ok(ElementBlock { rows, cols, matrix })
            })
            .collect::<eyre::Result<Vec<_>>>()?;

        Ok(Self {
            num_rows: element_assembler.num_rows(),
            num_cols: element_assembler.num_cols(),
            blocks,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn num_elements(&self) -> usize {
        self.blocks.len()
    }

    fn apply_chunk(&self, blocks: &[ElementBlock], x: &DVectorView<f64>) -> DVector<f64> {
        let mut y = DVector::zeros(self.num_rows);
        let mut x_local = DVector::zeros(0);
        let mut y_local = DVector::zeros(0);
        for block in blocks {
            x_local.resize_vertically_mut(block.cols.len(), 0.0);
            y_local.resize_vertically_mut(block.rows.len(), 0.0);
            for (x_j, &j) in x_local.iter_mut().zip(&block.cols) {
                *x_j = x[j];
            }
            y_local.gemv(1.0, &block.matrix, &x_local, 0.0);
            for (&y_i, &i) in y_local.iter().zip(&block.rows) {
                y[i] += y_i;
            }
        }
        y
    }
}

impl LinearOperator<f64> for PartialAssembledOperator {
    fn apply(&self, mut y: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), OperatorError> {
        if y.len() != self.num_rows || x.len() != self.num_cols {
            return Err(format!(
                "Operator of size {}x{} applied with input of length {} and output of length {}",
                self.num_rows,
                self.num_cols,
                x.len(),
                y.len()
            )
            .into());
        }

        let num_chunks = rayon::current_num_threads().max(1);
        let chunk_size = ((self.blocks.len() + num_chunks - 1) / num_chunks).max(1);
        let partial_results: Vec<_> = self
            .blocks
            .par_chunks(chunk_size)
            .map(|chunk| self.apply_chunk(chunk, &x))
            .collect();

        y.fill(0.0);
        for partial in &partial_results {
            y += partial;
        }
        Ok(())
    }
}

impl MatrixDiagonal for PartialAssembledOperator {
    fn diagonal(&self) -> DVector<f64> {
        let mut diagonal = DVector::zeros(self.num_rows.min(self.num_cols));
        for block in &self.blocks {
            for (local_i, &i) in block.rows.iter().enumerate() {
                for (local_j, &j) in block.cols.iter().enumerate() {
                    if i == j {
                        diagonal[i] += block.matrix[(local_i, local_j)];
                    }
                }
            }
        }
        diagonal
    }
}

/// Turns an operator holding the contribution of the local elements into the global operator.
///
/// Input vectors are replicated on every rank. After applying the local operator, the
/// output is summed across all ranks, so `apply` is a collective operation.
#[derive(Debug)]
pub struct DistributedOperator<Op> {
    local: Op,
    comm: Arc<dyn Communicator>,
}

impl<Op> DistributedOperator<Op> {
    pub fn new(local: Op, comm: Arc<dyn Communicator>) -> Self {
        Self { local, comm }
    }

    pub fn local(&self) -> &Op {
        &self.local
    }

    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }
}

impl<Op: LinearOperator<f64>> LinearOperator<f64> for DistributedOperator<Op> {
    fn apply(&self, mut y: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), OperatorError> {
        self.local.apply((&mut y).into(), x)?;
        self.comm.all_reduce_sum(y.as_mut_slice());
        Ok(())
    }
}

impl<Op: MatrixDiagonal> MatrixDiagonal for DistributedOperator<Op> {
    fn diagonal(&self) -> DVector<f64> {
        let mut diagonal = self.local.diagonal();
        self.comm.all_reduce_sum(diagonal.as_mut_slice());
        diagonal
    }
}
