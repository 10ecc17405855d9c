//! Application of real operators to real- or complex-valued vectors.
use crate::field::FieldScalar;
use fluxrec_sparse::{LinearOperator, OperatorError};
use nalgebra::{DVector, DVectorView, DVectorViewMut};
use std::cell::RefCell;

/// Applies a real operator to complex vectors by acting on the real and imaginary parts
/// separately.
#[derive(Debug)]
pub struct ComplexWrapperOperator<Op> {
    operator: Op,
    input: RefCell<DVector<f64>>,
    output: RefCell<DVector<f64>>,
}

impl<Op: LinearOperator<f64>> ComplexWrapperOperator<Op> {
    pub fn new(operator: Op) -> Self {
        Self {
            operator,
            input: RefCell::new(DVector::zeros(0)),
            output: RefCell::new(DVector::zeros(0)),
        }
    }

    pub fn inner(&self) -> &Op {
        &self.operator
    }

    pub fn apply<T: FieldScalar>(&self, y: &mut [T], x: &[T]) -> Result<(), OperatorError> {
        let input = &mut *self.input.borrow_mut();
        let output = &mut *self.output.borrow_mut();
        input.resize_vertically_mut(x.len(), 0.0);
        output.resize_vertically_mut(y.len(), 0.0);

        for (x_re, x_i) in input.iter_mut().zip(x) {
            *x_re = x_i.re();
        }
        self.operator.apply((&mut *output).into(), (&*input).into())?;
        for (y_i, &y_re) in y.iter_mut().zip(output.iter()) {
            *y_i = T::from_parts(y_re, 0.0);
        }

        if T::IS_COMPLEX {
            for (x_im, x_i) in input.iter_mut().zip(x) {
                *x_im = x_i.im();
            }
            self.operator.apply((&mut *output).into(), (&*input).into())?;
            for (y_i, &y_im) in y.iter_mut().zip(output.iter()) {
                *y_i = T::from_parts(y_i.re(), y_im);
            }
        }
        Ok(())
    }
}

/// A real operator prepared for the scalar type of the fields it acts on.
#[derive(Debug)]
pub enum FieldOperator<Op> {
    Real(Op),
    ComplexWrapped(ComplexWrapperOperator<Op>),
}

impl<Op: LinearOperator<f64>> FieldOperator<Op> {
    /// Wraps the operator when `T` is complex.
    pub fn for_scalar<T: FieldScalar>(operator: Op) -> Self {
        if T::IS_COMPLEX {
            Self::ComplexWrapped(ComplexWrapperOperator::new(operator))
        } else {
            Self::Real(operator)
        }
    }

    pub fn inner(&self) -> &Op {
        match self {
            Self::Real(operator) => operator,
            Self::ComplexWrapped(wrapper) => wrapper.inner(),
        }
    }

    pub fn apply<T: FieldScalar>(&self, y: &mut [T], x: &[T]) -> Result<(), OperatorError> {
        match self {
            Self::Real(operator) => {
                let (m, n) = (y.len(), x.len());
                match (T::as_real_slice_mut(y), T::as_real_slice(x)) {
                    (Some(y), Some(x)) => {
                        operator.apply(DVectorViewMut::from_slice(y, m), DVectorView::from_slice(x, n))
                    }
                    _ => Err("Real operator cannot be applied to complex-valued vectors".into()),
                }
            }
            Self::ComplexWrapped(wrapper) => wrapper.apply(y, x),
        }
    }
}
