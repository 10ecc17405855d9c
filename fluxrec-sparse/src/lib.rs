//! Linear operators and Krylov solvers used by `fluxrec`.
pub use nalgebra_sparse::{CooMatrix, CsrMatrix};

pub mod cg;
pub mod operators;

pub use operators::{DiagonalOperator, IdentityOperator, LinearOperator, OperatorError};
