//! Shared helpers for the integration tests.

#![allow(dead_code)]

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use stonefit_rs::{BindingModel, Dataset, ModelParams, Observation};

/// Parameters the synthetic datasets are generated from.
pub const TRUTH: ModelParams = ModelParams {
    kd: 1.7e-6,
    kx: 3.15e-4,
    scale: 1e-3,
};

pub const CONCENTRATIONS: [f64; 7] = [1e-9, 3e-9, 1e-8, 3e-8, 1e-7, 3e-7, 1e-6];

pub const VALENCIES: [u32; 3] = [2, 3, 4];

/// Route `log` output through the test harness; enable with `RUST_LOG`.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Every concentration at every valency, responses from `params` without noise.
pub fn noiseless(params: ModelParams) -> Dataset {
    synthetic(params, None)
}

/// As [`noiseless`] plus Gaussian noise with standard deviation `sigma`.
pub fn noisy(params: ModelParams, sigma: f64, seed: u64) -> Dataset {
    synthetic(params, Some((sigma, seed)))
}

fn synthetic(params: ModelParams, noise: Option<(f64, u64)>) -> Dataset {
    let model = BindingModel::default();
    let mut rng = ChaCha8Rng::seed_from_u64(noise.map_or(0, |(_, seed)| seed));
    let normal = noise.map(|(sigma, _)| Normal::new(0.0, sigma).unwrap());

    let mut observations = Vec::new();
    for &valency in &VALENCIES {
        for &concentration in &CONCENTRATIONS {
            let state = model
                .equilibrium(params.kd, valency, params.kx, concentration)
                .unwrap();
            let mut response = params.scale * state.receptor_multimerized;
            if let Some(normal) = &normal {
                response += normal.sample(&mut rng);
            }
            observations.push(Observation {
                concentration,
                response,
                valency,
            });
        }
    }
    Dataset::new(&observations).unwrap()
}
