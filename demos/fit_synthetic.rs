//! Fit synthetic cross-linking data and explore parameter identifiability.
//!
//! Run with `RUST_LOG=info cargo run --example fit_synthetic`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use stonefit_rs::resampling::{bootstrap, leave_one_out, BootstrapConfig};
use stonefit_rs::uncertainty::fit_uncertainty;
use stonefit_rs::{
    BindingFitter, BindingModel, Dataset, LocalScan, ModelParams, Observation, ParamIndex,
    ProfileScan, ScanConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Multivalent Binding Fit Example");
    println!("===============================\n");

    let truth = ModelParams::new(1.7e-6, 3.15e-4, 1e-3);
    let model = BindingModel::default();

    // Responses at three valencies over four decades of ligand, with noise
    let mut rng = StdRng::seed_from_u64(2024);
    let noise = Normal::new(0.0, 0.2)?;
    let mut observations = Vec::new();
    for valency in [2u32, 3, 4] {
        for exponent in [-9.0, -8.5, -8.0, -7.5, -7.0, -6.5, -6.0] {
            let concentration = 10f64.powf(exponent);
            let state = model.equilibrium(truth.kd, valency, truth.kx, concentration)?;
            observations.push(Observation {
                concentration,
                response: truth.scale * state.receptor_multimerized + noise.sample(&mut rng),
                valency,
            });
        }
    }
    let data = Dataset::new(&observations)?;
    println!("Generated {} observations from {}", data.len(), truth);

    let fitter = BindingFitter::new(&data, model);
    let fit = fitter.fit(ModelParams::new(5e-6, 1e-4, 2e-3))?;
    println!("\n{}", fit);

    let uncertainty = fit_uncertainty(fitter.problem(), &fit)?;
    println!("\nLinearized standard errors:");
    for p in ParamIndex::ALL {
        println!(
            "  {:>5} = {:.4e} ± {:.2e}",
            p,
            fit.params.get(p),
            uncertainty.standard_error(p)
        );
    }

    let scan = ScanConfig::default().with_points(21);
    let local = LocalScan::run(fitter.problem(), fit.params, &scan)?;
    let profile = ProfileScan::run(&fitter, &fit, &scan)?;
    println!("\nSum of squares relative to the best fit (local / profile):");
    println!("  {:>10} {:>16} {:>16} {:>16}", "multiplier", "Kd", "Kx", "scale");
    let local_norm = local.normalized()?;
    let profile_norm = profile.normalized()?;
    for (j, m) in local.multipliers.iter().enumerate().step_by(4) {
        println!(
            "  {:>10.3} {:>7.2} / {:>6.2} {:>7.2} / {:>6.2} {:>7.2} / {:>6.2}",
            m,
            local_norm[[0, j]],
            profile_norm[[0, j]],
            local_norm[[1, j]],
            profile_norm[[1, j]],
            local_norm[[2, j]],
            profile_norm[[2, j]],
        );
    }

    let boot = bootstrap(&fitter, &fit, &BootstrapConfig::default().with_replicates(50))?;
    println!(
        "\nPairs bootstrap, {} of {} replicates converged:",
        boot.converged_count(),
        boot.replicates.len()
    );
    for p in ParamIndex::ALL {
        let s = boot.summary(p);
        println!(
            "  {:>5}: median {:.4e}, 95% interval [{:.4e}, {:.4e}]",
            p, s.median, s.lower, s.upper
        );
    }

    let cv = leave_one_out(&fitter, &fit, true)?;
    println!("\nLeave-one-out RMSE: {:.4}", cv.rmse());

    Ok(())
}
