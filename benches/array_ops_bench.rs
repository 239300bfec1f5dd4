use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndgrad::{ops, Block, Linear, Loss, Mse, NdArray, Tensor};

fn bench_matrix_multiply(c: &mut Criterion) {
    let shapes = [([64, 64], "64"), ([256, 256], "256"), ([512, 512], "512")];

    let mut group = c.benchmark_group("matrix_multiply");
    for (shape, size) in shapes.iter() {
        let a = NdArray::random(shape);
        let b = NdArray::random(shape);
        group.bench_function(format!("array_matmul_{}", size), |bencher| {
            bencher.iter(|| black_box(black_box(&a).matmul(black_box(&b))).unwrap());
        });

        let ta = Tensor::new(a.clone(), true);
        let tb = Tensor::new(b.clone(), true);
        group.bench_function(format!("tensor_matmul_{}", size), |bencher| {
            bencher.iter(|| black_box(ops::matmul(black_box(&ta), black_box(&tb))).unwrap());
        });
    }
    group.finish();
}

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");
    for rows in [128usize, 1024] {
        let matrix = NdArray::random(&[rows, 256]);
        let row = NdArray::random(&[256]);
        let column = NdArray::random(&[rows, 1]);

        group.bench_function(format!("add_row_{}", rows), |bencher| {
            bencher.iter(|| black_box(black_box(&matrix).add(black_box(&row))).unwrap());
        });
        group.bench_function(format!("mul_column_{}", rows), |bencher| {
            bencher.iter(|| black_box(black_box(&matrix).mul(black_box(&column))).unwrap());
        });
        group.bench_function(format!("sum_axis0_{}", rows), |bencher| {
            bencher.iter(|| black_box(black_box(&matrix).sum(Some(0), false)).unwrap());
        });
    }
    group.finish();
}

fn bench_backward(c: &mut Criterion) {
    let layer = Linear::new(64, 16);
    let input = Tensor::random(&[128, 64], false);
    let target = Tensor::random(&[128, 16], false);

    c.bench_function("linear_mse_forward_backward", |bencher| {
        bencher.iter(|| {
            layer.weights().zero_grad();
            layer.biases().zero_grad();
            let output = layer.forward(black_box(&input)).unwrap();
            let loss = Mse.compute(&output, black_box(&target)).unwrap();
            loss.backward(None).unwrap();
            black_box(loss)
        });
    });
}

criterion_group!(benches, bench_matrix_multiply, bench_broadcast, bench_backward);
criterion_main!(benches);
