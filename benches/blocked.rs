use criterion::black_box;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::{criterion_group, criterion_main};
use partgp::dist::BlockedMvGaussian;
use partgp::partition::{PartitionedPsdMatrix, PartitionedVector};
use partgp::process::gaussian::kernel::{Kernel, RBFKernel, WhiteKernel};
use partgp::process::gaussian::{GaussianProcess, GaussianProcessParams};

const N: usize = 256;

fn inputs(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64 * 0.05).collect()
}

fn gram(block_size: usize) -> PartitionedPsdMatrix {
    RBFKernel::default()
        .covariance(&inputs(N), block_size)
        .unwrap()
        .add_diagonal(1.0)
}

fn bench_cholesky(c: &mut Criterion) {
    let mut group = c.benchmark_group("256×256 blocked cholesky");
    for block_size in [16, 64, 256] {
        let k = gram(block_size);
        group.bench_function(format!("block size {}", block_size), |b| {
            b.iter(|| black_box(k.cholesky()))
        });
    }
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("256×256 blocked forward/back solve");
    for block_size in [16, 64, 256] {
        let factor = gram(block_size).cholesky().unwrap();
        let y = PartitionedVector::from_fn(N, block_size, |i| (i as f64).sin())
            .unwrap();
        group.bench_function(format!("block size {}", block_size), |b| {
            b.iter(|| {
                let z = factor.solve_vector(&y).unwrap();
                black_box(factor.tr_solve_vector(&z))
            })
        });
    }
}

// Every iteration starts from an untrained clone so the fit is not cached
fn bench_gp_ln_m(c: &mut Criterion) {
    let mut group = c.benchmark_group("GaussianProcess ln_m, n = 256");
    for block_size in [16, 64, 256] {
        let xs = inputs(N);
        let ys = xs.iter().map(|x| x.sin()).collect();
        let gp = GaussianProcess::new(
            RBFKernel::default(),
            WhiteKernel::new(0.1).unwrap(),
            xs,
            ys,
            GaussianProcessParams::default().with_block_size(block_size),
        )
        .unwrap();
        group.bench_function(format!("block size {}", block_size), |b| {
            b.iter_batched(
                || gp.clone(),
                |mut gp| black_box(gp.ln_m()),
                BatchSize::SmallInput,
            )
        });
    }
}

fn bench_mvg_draw(c: &mut Criterion) {
    let mut group = c.benchmark_group("BlockedMvGaussian, draw 1");
    for dims in [10, 100] {
        let mvg = BlockedMvGaussian::standard(dims, 32).unwrap();
        // factor once up front
        let _ = mvg.factor();
        group.bench_function(format!("{} dims", dims), |b| {
            b.iter_batched_ref(
                rand::thread_rng,
                |mut rng| black_box(mvg.draw(&mut rng)),
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(
    blocked_benches,
    bench_cholesky,
    bench_solve,
    bench_gp_ln_m,
    bench_mvg_draw
);
criterion_main!(blocked_benches);
