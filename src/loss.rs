//! Loss functions. Each one is composed from differentiable tensor
//! operations, so the result can be back-propagated directly.

use crate::error::Error;
use crate::ops;
use crate::tensor::Tensor;

pub trait Loss {
    /// Returns a single-element tensor measuring how far `predicted` is
    /// from `target`.
    fn compute(&self, predicted: &Tensor, target: &Tensor) -> Result<Tensor, Error>;
}

/// Sum of squared errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mse;

impl Loss for Mse {
    fn compute(&self, predicted: &Tensor, target: &Tensor) -> Result<Tensor, Error> {
        let errors = ops::sub(predicted, target)?;
        ops::mul(&errors, &errors)?.sum(None, false)
    }
}

/// `-1/N * sum(y * ln(p) + (1 - y) * ln(1 - p))` with `N` the number of rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCrossEntropy;

impl Loss for BinaryCrossEntropy {
    fn compute(&self, predicted: &Tensor, target: &Tensor) -> Result<Tensor, Error> {
        let rows = predicted.shape().first().copied().unwrap_or(1).max(1);
        let factor = -1.0 / rows as f32;

        let positive = ops::mul(target, &ops::log(predicted))?;
        let negative = ops::mul(
            &ops::rsub_scalar(1.0, target)?,
            &ops::log(&ops::rsub_scalar(1.0, predicted)?),
        )?;
        let total = ops::add(&positive, &negative)?.sum(None, false)?;
        ops::mul_scalar(&total, factor)
    }
}
