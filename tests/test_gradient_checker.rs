use ndgrad::test_utils::check_gradient;
use ndgrad::{ops, Error, Tensor};

const EPSILON: f32 = 1e-2;
const TOLERANCE: f32 = 2e-2;

fn tracked(data: Vec<f32>, shape: &[usize]) -> Tensor {
    Tensor::from_vec(data, shape, true).unwrap()
}

#[test]
fn test_add_broadcast_gradient() -> Result<(), Error> {
    let a = tracked(vec![0.5, -1.0, 2.0, 1.5, 0.3, -0.7], &[2, 3]);
    let b = tracked(vec![0.1, 0.2, 0.3], &[3]);
    let func = |inputs: &[Tensor]| {
        let sum = ops::add(&inputs[0], &inputs[1])?;
        ops::mul(&sum, &sum)?.sum(None, false)
    };
    check_gradient(func, &[a.clone(), b.clone()], 0, EPSILON, TOLERANCE)?;
    check_gradient(func, &[a, b], 1, EPSILON, TOLERANCE)
}

#[test]
fn test_sub_column_broadcast_gradient() -> Result<(), Error> {
    let a = tracked(vec![0.5, -1.0, 2.0, 1.5, 0.3, -0.7], &[2, 3]);
    let b = tracked(vec![0.4, -0.6], &[2, 1]);
    let func = |inputs: &[Tensor]| {
        let diff = ops::sub(&inputs[0], &inputs[1])?;
        ops::mul(&diff, &diff)?.sum(None, false)
    };
    check_gradient(func, &[a.clone(), b.clone()], 0, EPSILON, TOLERANCE)?;
    check_gradient(func, &[a, b], 1, EPSILON, TOLERANCE)
}

#[test]
fn test_mul_gradient() -> Result<(), Error> {
    let a = tracked(vec![1.0, 2.0, -3.0, 0.5], &[2, 2]);
    let b = tracked(vec![-0.5, 1.5], &[1, 2]);
    let func = |inputs: &[Tensor]| ops::mul(&inputs[0], &inputs[1])?.sum(None, false);
    check_gradient(func, &[a.clone(), b.clone()], 0, EPSILON, TOLERANCE)?;
    check_gradient(func, &[a, b], 1, EPSILON, TOLERANCE)
}

#[test]
fn test_div_gradient() -> Result<(), Error> {
    let a = tracked(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]);
    let b = tracked(vec![2.0, 4.0], &[2]);
    let func = |inputs: &[Tensor]| ops::div(&inputs[0], &inputs[1])?.sum(None, false);
    check_gradient(func, &[a.clone(), b.clone()], 0, EPSILON, TOLERANCE)?;
    check_gradient(func, &[a, b], 1, EPSILON, TOLERANCE)
}

#[test]
fn test_matmul_gradient() -> Result<(), Error> {
    let a = tracked(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], &[2, 3]);
    let b = tracked(vec![1.0, -1.0, 0.5, 2.0, -0.5, 0.3], &[3, 2]);
    let func = |inputs: &[Tensor]| {
        let product = ops::matmul(&inputs[0], &inputs[1])?;
        ops::mul(&product, &product)?.sum(None, false)
    };
    check_gradient(func, &[a.clone(), b.clone()], 0, EPSILON, TOLERANCE)?;
    check_gradient(func, &[a, b], 1, EPSILON, TOLERANCE)
}

#[test]
fn test_sum_axis_gradient() -> Result<(), Error> {
    let a = tracked(vec![0.5, -1.0, 2.0, 1.5, 0.3, -0.7], &[2, 3]);
    let weights = Tensor::from_vec(vec![1.0, -2.0, 3.0], &[3], false)?;
    let func = |inputs: &[Tensor]| {
        let columns = inputs[0].sum(Some(0), false)?;
        ops::mul(&columns, &weights)?.sum(None, false)
    };
    check_gradient(func, &[a], 0, EPSILON, TOLERANCE)
}

#[test]
fn test_unary_gradients() -> Result<(), Error> {
    let x = tracked(vec![0.5, 1.2, 2.0, 0.8], &[2, 2]);
    check_gradient(
        |inputs| inputs[0].log().sum(None, false),
        &[x.clone()],
        0,
        1e-3,
        TOLERANCE,
    )?;
    check_gradient(
        |inputs| inputs[0].exp().sum(None, false),
        &[x.clone()],
        0,
        EPSILON,
        TOLERANCE,
    )?;
    check_gradient(
        |inputs| inputs[0].tanh().sum(None, false),
        &[x.clone()],
        0,
        EPSILON,
        TOLERANCE,
    )?;
    check_gradient(
        |inputs| inputs[0].sigmoid().sum(None, false),
        &[x],
        0,
        EPSILON,
        TOLERANCE,
    )
}

#[test]
fn test_leaky_relu_gradient() -> Result<(), Error> {
    let x = tracked(vec![-1.0, 0.5, -0.3, 2.0], &[4]);
    check_gradient(
        |inputs| {
            let activated = inputs[0].leaky_relu(0.1);
            ops::mul(&activated, &activated)?.sum(None, false)
        },
        &[x],
        0,
        EPSILON,
        TOLERANCE,
    )
}

#[test]
fn test_slice_gradient() -> Result<(), Error> {
    let x = tracked((0..8).map(|v| v as f32 * 0.25).collect(), &[4, 2]);
    check_gradient(
        |inputs| {
            let rows = inputs[0].slice(1, 3)?;
            ops::mul(&rows, &rows)?.sum(None, false)
        },
        &[x],
        0,
        EPSILON,
        TOLERANCE,
    )
}

#[test]
fn test_check_gradient_rejects_bad_inputs() {
    let x = Tensor::from_vec(vec![1.0, 2.0], &[2], false).unwrap();
    let func = |inputs: &[Tensor]| inputs[0].sum(None, false);
    assert!(matches!(
        check_gradient(func, &[x.clone()], 0, EPSILON, TOLERANCE),
        Err(Error::RequiresGradError)
    ));
    assert!(matches!(
        check_gradient(func, &[x], 3, EPSILON, TOLERANCE),
        Err(Error::InvalidOperation(_))
    ));

    let y = tracked(vec![1.0, 2.0], &[2]);
    assert!(matches!(
        check_gradient(|inputs| Ok(inputs[0].exp()), &[y], 0, EPSILON, TOLERANCE),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_check_gradient_reports_wrong_gradient() {
    let x = tracked(vec![1.0, 2.0, 3.0], &[3]);
    // The forward value of x * x with a gradient of only x.
    let func = |inputs: &[Tensor]| {
        let frozen = Tensor::new(inputs[0].value(), false);
        ops::mul(&inputs[0], &frozen)?.sum(None, false)
    };
    let result = check_gradient(func, &[x], 0, EPSILON, TOLERANCE);
    assert!(matches!(result, Err(Error::GradientCheckError { .. })));
}
