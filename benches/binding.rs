//! Benchmarks for the equilibrium solver and a full fit.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stonefit_rs::{BindingFitter, BindingModel, Dataset, ModelParams, Observation};

const TRUTH: ModelParams = ModelParams {
    kd: 1.7e-6,
    kx: 3.15e-4,
    scale: 1e-3,
};

fn synthetic_dataset() -> Dataset {
    let model = BindingModel::default();
    let mut observations = Vec::new();
    for valency in 2..=4 {
        for exponent in -9..=-6 {
            let concentration = 10f64.powi(exponent);
            let state = model
                .equilibrium(TRUTH.kd, valency, TRUTH.kx, concentration)
                .unwrap();
            observations.push(Observation {
                concentration,
                response: TRUTH.scale * state.receptor_multimerized,
                valency,
            });
        }
    }
    Dataset::new(&observations).unwrap()
}

fn bench_equilibrium(c: &mut Criterion) {
    let mut group = c.benchmark_group("equilibrium");
    let model = BindingModel::default();

    for valency in [1u32, 3, 10] {
        group.bench_with_input(BenchmarkId::from_parameter(valency), &valency, |b, &v| {
            b.iter(|| model.equilibrium(black_box(TRUTH.kd), v, black_box(TRUTH.kx), black_box(1e-7)))
        });
    }

    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(20);

    let data = synthetic_dataset();
    let fitter = BindingFitter::new(&data, BindingModel::default());
    let start = ModelParams::new(2e-6, 4e-4, 1.2e-3);

    group.bench_function("noiseless_12_points", |b| {
        b.iter(|| fitter.fit(black_box(start)))
    });

    group.finish();
}

criterion_group!(benches, bench_equilibrium, bench_fit);
criterion_main!(benches);
