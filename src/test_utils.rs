use crate::{Error, NdArray, Tensor};

/// Checks the gradient of a function with respect to one of its inputs.
///
/// The analytical gradient comes from `backward` on the function's output;
/// the numerical one from central differences, perturbing one element of the
/// checked input at a time.
///
/// # Arguments
/// * `func`: Maps the inputs to a single-element loss tensor.
/// * `inputs`: Input tensors. The checked one must track gradient.
/// * `input_idx`: Index in `inputs` of the tensor to check.
/// * `epsilon`: Finite-difference step (e.g. `1e-2` for `f32`).
/// * `tolerance`: Largest allowed relative (or, near zero, absolute) error.
///
/// # Errors
/// `GradientCheckError` describing the worst element when the two disagree.
pub fn check_gradient<F>(
    func: F,
    inputs: &[Tensor],
    input_idx: usize,
    epsilon: f32,
    tolerance: f32,
) -> Result<(), Error>
where
    F: Fn(&[Tensor]) -> Result<Tensor, Error>,
{
    let target = inputs.get(input_idx).ok_or_else(|| {
        Error::InvalidOperation(format!(
            "input_idx ({}) is out of bounds for inputs slice (len {})",
            input_idx,
            inputs.len()
        ))
    })?;
    if !target.requires_grad() {
        return Err(Error::RequiresGradError);
    }

    let analytical = analytical_gradient(&func, inputs, input_idx)?;
    let numerical = numerical_gradient(&func, inputs, input_idx, epsilon)?;
    compare_gradients(&analytical, &numerical, tolerance)
}

fn scalar_output(loss: &Tensor) -> Result<f32, Error> {
    if loss.size() != 1 {
        return Err(Error::ShapeMismatch {
            expected: vec![1],
            actual: loss.shape(),
        });
    }
    Ok(loss.value().as_slice()[0])
}

fn analytical_gradient<F>(func: &F, inputs: &[Tensor], input_idx: usize) -> Result<Vec<f32>, Error>
where
    F: Fn(&[Tensor]) -> Result<Tensor, Error>,
{
    for input in inputs {
        input.zero_grad();
    }
    let loss = func(inputs)?;
    scalar_output(&loss)?;
    loss.backward(None)?;
    inputs[input_idx]
        .grad()
        .map(|grad| grad.to_vec())
        .ok_or(Error::NoGradientError)
}

fn numerical_gradient<F>(
    func: &F,
    inputs: &[Tensor],
    input_idx: usize,
    epsilon: f32,
) -> Result<Vec<f32>, Error>
where
    F: Fn(&[Tensor]) -> Result<Tensor, Error>,
{
    let original = inputs[input_idx].value();
    let mut perturbed_inputs = inputs.to_vec();
    let mut evaluate = |value: NdArray| -> Result<f32, Error> {
        perturbed_inputs[input_idx] = Tensor::new(value, false);
        scalar_output(&func(&perturbed_inputs)?)
    };

    let mut numerical = Vec::with_capacity(original.size());
    for i in 0..original.size() {
        let mut plus = original.to_vec();
        plus[i] += epsilon;
        let mut minus = original.to_vec();
        minus[i] -= epsilon;

        let loss_plus = evaluate(NdArray::from_vec(plus, original.shape())?)?;
        let loss_minus = evaluate(NdArray::from_vec(minus, original.shape())?)?;
        numerical.push((loss_plus - loss_minus) / (2.0 * epsilon));
    }
    Ok(numerical)
}

fn compare_gradients(analytical: &[f32], numerical: &[f32], tolerance: f32) -> Result<(), Error> {
    if analytical.len() != numerical.len() {
        return Err(Error::ShapeMismatch {
            expected: vec![numerical.len()],
            actual: vec![analytical.len()],
        });
    }

    let mut max_rel_err = 0.0;
    let mut max_abs_err = 0.0;
    let mut max_err_idx = 0;

    for (i, (a, n)) in analytical.iter().zip(numerical.iter()).enumerate() {
        let abs_err = (a - n).abs();
        let rel_err = if a.abs() > 1e-3 && n.abs() > 1e-3 {
            abs_err / a.abs().max(n.abs())
        } else {
            abs_err
        };

        if rel_err > max_rel_err {
            max_rel_err = rel_err;
            max_abs_err = abs_err;
            max_err_idx = i;
        }
    }

    if max_rel_err <= tolerance {
        Ok(())
    } else {
        Err(Error::GradientCheckError {
            analytical: analytical.to_vec(),
            numerical: numerical.to_vec(),
            max_rel_error: max_rel_err,
            max_abs_error: max_abs_err,
            at_index: max_err_idx,
        })
    }
}

/// Asserts two arrays share a shape and agree element-wise within `tol`.
pub fn assert_array_close(actual: &NdArray, expected: &NdArray, tol: f32) {
    assert_eq!(actual.shape(), expected.shape(), "Shapes don't match");
    for (i, (a_val, b_val)) in actual.as_slice().iter().zip(expected.as_slice()).enumerate() {
        assert!(
            (a_val - b_val).abs() < tol,
            "Values at index {i} aren't close enough: a={a_val}, b={b_val}, diff={}, tol={tol}",
            (a_val - b_val).abs()
        );
    }
}

/// Asserts a tensor's gradient exists and matches `expected` within `tol`.
pub fn assert_grad_close(tensor: &Tensor, expected: &[f32], tol: f32) {
    let grad = tensor
        .grad()
        .unwrap_or_else(|| panic!("Tensor {} has no gradient", tensor.id()));
    assert_eq!(grad.size(), expected.len(), "Gradient lengths don't match");
    for (i, (a_val, b_val)) in grad.as_slice().iter().zip(expected).enumerate() {
        assert!(
            (a_val - b_val).abs() < tol,
            "Gradient at index {i} isn't close enough: got {a_val}, expected {b_val}"
        );
    }
}
