//! Deserializable configuration of the estimators.
use crate::error::EstimatorError;
use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// Settings of the iterative solver used for flux projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverSettings {
    /// Relative residual tolerance.
    pub tol: f64,
    pub max_it: usize,
    /// `0` is silent, `1` logs a summary of every solve and `2` logs every iteration.
    pub verbosity: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tol: 1.0e-6,
            max_it: 10000,
            verbosity: 0,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<(), EstimatorError> {
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(EstimatorError::InvalidSettings(format!(
                "tolerance must be positive and finite, got {}",
                self.tol
            )));
        }
        if self.max_it == 0 {
            return Err(EstimatorError::InvalidSettings(
                "maximum number of iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A material coefficient, either a scalar or the diagonal of a tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coefficient {
    Isotropic(f64),
    Diagonal(Vec<f64>),
}

impl Default for Coefficient {
    fn default() -> Self {
        Self::Isotropic(1.0)
    }
}

impl Coefficient {
    pub fn to_diagonal<const D: usize>(&self, name: &str) -> Result<SVector<f64, D>, EstimatorError> {
        let diagonal: SVector<f64, D> = match self {
            Self::Isotropic(value) => SVector::repeat(*value),
            Self::Diagonal(values) if values.len() == D => SVector::from_column_slice(values),
            Self::Diagonal(values) => {
                return Err(EstimatorError::InvalidMaterial(format!(
                    "{} has {} entries in {} dimensions",
                    name,
                    values.len(),
                    D
                )))
            }
        };
        if diagonal.iter().any(|&v| !(v.is_finite() && v > 0.0)) {
            return Err(EstimatorError::InvalidMaterial(format!(
                "{} must be positive, got {:?}",
                name,
                diagonal.as_slice()
            )));
        }
        Ok(diagonal)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaterialConfig {
    /// Element attributes the material applies to.
    pub attributes: Vec<usize>,
    pub permeability: Coefficient,
    pub permittivity: Coefficient,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    pub solver: SolverSettings,
    pub materials: Vec<MaterialConfig>,
}
