use nalgebra::{DimMin, DimName};

pub mod assembly;
pub mod comm;
pub mod config;
pub mod element;
pub mod error;
pub mod estimator;
pub mod field;
pub mod material;
pub mod mesh;
pub mod operator;
pub mod quadrature;
pub mod space;

pub extern crate nalgebra;
pub extern crate num;

pub use error::EstimatorError;

/// A small, fixed-size dimension.
///
/// Used as a trait alias for the bounds needed to compute determinants and inverses of
/// `D x D` matrices in generic `fluxrec` routines.
pub trait SmallDim: DimName + DimMin<Self, Output = Self> {}

impl<D> SmallDim for D where D: DimName + DimMin<Self, Output = Self> {}
