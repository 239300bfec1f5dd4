// src/optim.rs
use crate::nn::{Module, Parameter};
use crate::Error;

/// Updates a fixed set of parameters from their accumulated gradients.
pub trait Optimizer {
    /// Performs a single optimization step.
    fn step(&mut self) -> Result<(), Error>;

    /// Resets the gradient of every parameter to zeros.
    fn zero_grad(&mut self);
}

/// Stochastic Gradient Descent optimizer.
#[derive(Debug)]
pub struct Sgd {
    parameters: Vec<Parameter>,
    learning_rate: f32,
}

impl Sgd {
    /// Creates a new SGD optimizer.
    ///
    /// # Arguments
    ///
    /// * `parameters` - The parameters updated on every step.
    /// * `learning_rate` - The step size for gradient updates.
    pub fn new(parameters: Vec<Parameter>, learning_rate: f32) -> Self {
        Sgd {
            parameters,
            learning_rate,
        }
    }

    /// Optimizes every parameter of `module`.
    pub fn for_module(module: &dyn Module, learning_rate: f32) -> Self {
        Self::new(module.parameters(), learning_rate)
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

impl Optimizer for Sgd {
    /// `param = param - lr * grad`.
    ///
    /// Writing the new value discards the parameter's gradient, so
    /// `zero_grad` must run before the next backward pass. Parameters without
    /// a gradient are left untouched.
    fn step(&mut self) -> Result<(), Error> {
        for param in &self.parameters {
            let Some(grad) = param.grad() else {
                crate::debug_println!("sgd skipping parameter {} without gradient", param.id());
                continue;
            };
            let update = &grad * self.learning_rate;
            let new_value = param.value().sub(&update)?;
            crate::debug_println!(
                "sgd update parameter {} shape {:?}",
                param.id(),
                new_value.shape()
            );
            param.set_value(new_value);
        }
        Ok(())
    }

    fn zero_grad(&mut self) {
        for param in &self.parameters {
            param.zero_grad();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NdArray;
    use approx::assert_abs_diff_eq;

    fn param_with_grad(value: Vec<f32>, grad: Vec<f32>) -> Parameter {
        let shape = [value.len()];
        let param = Parameter::from_array(NdArray::from_vec(value, &shape).unwrap());
        param
            .backward(Some(NdArray::from_vec(grad, &shape).unwrap()))
            .unwrap();
        param
    }

    #[test]
    fn test_sgd_step() {
        let param = param_with_grad(vec![1.0, 2.0, 3.0], vec![0.1, 0.2, 0.3]);
        let mut optimizer = Sgd::new(vec![param.clone()], 0.1);
        optimizer.step().unwrap();

        let value = param.value().to_vec();
        assert_abs_diff_eq!(value[0], 1.0 - 0.1 * 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(value[1], 2.0 - 0.1 * 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(value[2], 3.0 - 0.1 * 0.3, epsilon = 1e-6);
        // The overwrite invalidates the gradient.
        assert!(param.grad().is_none());
    }

    #[test]
    fn test_zero_grad_restores_slot() {
        let param = param_with_grad(vec![1.0, 2.0], vec![0.1, 0.2]);
        let mut optimizer = Sgd::new(vec![param.clone()], 0.1);
        optimizer.step().unwrap();
        assert!(param.grad().is_none());

        optimizer.zero_grad();
        assert_eq!(param.grad().unwrap().to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_sgd_step_skips_parameter_without_grad() {
        let updated = param_with_grad(vec![1.0, 2.0], vec![0.1, 0.2]);
        let stale = Parameter::from_array(NdArray::from_vec(vec![10.0, 20.0], &[2]).unwrap());
        stale.set_value(NdArray::from_vec(vec![10.0, 20.0], &[2]).unwrap());

        let mut optimizer = Sgd::new(vec![updated.clone(), stale.clone()], 0.1);
        optimizer.step().unwrap();

        assert_abs_diff_eq!(updated.value().to_vec()[0], 0.99, epsilon = 1e-6);
        assert_eq!(stale.value().to_vec(), vec![10.0, 20.0]);
    }
}
