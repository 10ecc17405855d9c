use crate::comm::{Communicator, ReduceOp};
use crate::error::EstimatorError;
use nalgebra::DVector;

/// How contributions from several estimators are merged per element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CombinationRule {
    /// `η = sqrt(Σ_k η_k²)`
    #[default]
    RootSumSquares,
    /// `η = sqrt(1/n Σ_k η_k²)`, updated as a running average.
    RootMeanSquare,
}

/// Per-element error indicator on the local elements of a distributed mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorIndicator {
    local: DVector<f64>,
    num_contributions: usize,
    rule: CombinationRule,
}

impl Default for ErrorIndicator {
    fn default() -> Self {
        Self::new(CombinationRule::default())
    }
}

impl ErrorIndicator {
    /// An empty indicator. Its size is fixed by the first contribution.
    pub fn new(rule: CombinationRule) -> Self {
        Self {
            local: DVector::zeros(0),
            num_contributions: 0,
            rule,
        }
    }

    pub fn rule(&self) -> CombinationRule {
        self.rule
    }

    pub fn num_contributions(&self) -> usize {
        self.num_contributions
    }

    /// Indicator values of the local elements.
    pub fn local(&self) -> &DVector<f64> {
        &self.local
    }

    pub fn add_indicator(&mut self, indicator: &DVector<f64>) -> Result<(), EstimatorError> {
        if self.num_contributions == 0 {
            self.local = indicator.clone();
            self.num_contributions = 1;
            return Ok(());
        }
        if indicator.len() != self.local.len() {
            return Err(EstimatorError::IndicatorSizeMismatch {
                expected: self.local.len(),
                actual: indicator.len(),
            });
        }

        let n = self.num_contributions as f64;
        match self.rule {
            CombinationRule::RootSumSquares => {
                self.local
                    .zip_apply(indicator, |eta, new| *eta = eta.hypot(new));
            }
            CombinationRule::RootMeanSquare => {
                self.local
                    .zip_apply(indicator, |eta, new| *eta = ((n * *eta * *eta + new * new) / (n + 1.0)).sqrt());
            }
        }
        self.num_contributions += 1;
        Ok(())
    }

    /// The global l2 norm of the indicator. Collective.
    pub fn norm(&self, comm: &dyn Communicator) -> f64 {
        comm.global_sum(self.local.norm_squared()).sqrt()
    }

    /// The global minimum, or infinity if no rank has elements. Collective.
    pub fn min(&self, comm: &dyn Communicator) -> f64 {
        let mut value = [self.local.iter().copied().fold(f64::INFINITY, f64::min)];
        comm.all_reduce(&mut value, ReduceOp::Min);
        value[0]
    }

    /// The global maximum, or negative infinity if no rank has elements. Collective.
    pub fn max(&self, comm: &dyn Communicator) -> f64 {
        let mut value = [self.local.iter().copied().fold(f64::NEG_INFINITY, f64::max)];
        comm.all_reduce(&mut value, ReduceOp::Max);
        value[0]
    }

    /// The global mean over all elements. Collective.
    pub fn mean(&self, comm: &dyn Communicator) -> f64 {
        let mut values = [self.local.sum(), self.local.len() as f64];
        comm.all_reduce(&mut values, ReduceOp::Sum);
        if values[1] > 0.0 {
            values[0] / values[1]
        } else {
            0.0
        }
    }
}
