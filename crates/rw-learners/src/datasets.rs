//! Seeded synthetic datasets.

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rw_types::{RwResult, Sample};

const BLOB_FEATURES: usize = 4;
const BLOB_SEPARATION: f64 = 4.0;

/// Standard normal draw (Box-Muller).
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Gaussian blobs with unit variance, one per class, centred on scaled unit
/// vectors so that every class is linearly separable from the rest. Classes
/// are assigned round-robin so the dataset is balanced.
pub fn blob_features(n_samples: usize, n_classes: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n_classes = n_classes.max(1);
    let features = Array2::from_shape_fn((n_samples, BLOB_FEATURES), |(i, d)| {
        let centre = if d == (i % n_classes) % BLOB_FEATURES {
            BLOB_SEPARATION
        } else {
            0.0
        };
        centre + standard_normal(&mut rng)
    });
    let target = Array1::from_shape_fn(n_samples, |i| (i % n_classes) as f64);
    (features, target)
}

pub fn make_blobs(n_samples: usize, n_classes: usize, seed: u64) -> RwResult<Sample> {
    let (features, target) = blob_features(n_samples, n_classes, seed);
    let names = (0..BLOB_FEATURES).map(|d| format!("x{d}")).collect();
    Sample::new(names, features, "target", target)
}

/// Linear target `y = sum((d + 1) * x_d / 2) + noise` over uniform features in
/// [-2, 2].
pub fn make_regression(
    n_samples: usize,
    n_features: usize,
    noise: f64,
    seed: u64,
) -> RwResult<Sample> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let features = Array2::from_shape_fn((n_samples, n_features), |_| rng.gen_range(-2.0..2.0));
    let weights = Array1::from_shape_fn(n_features, |d| (d as f64 + 1.0) * 0.5);
    let target = features.dot(&weights) + Array1::from_shape_fn(n_samples, |_| noise * standard_normal(&mut rng));
    let names = (0..n_features).map(|d| format!("x{d}")).collect();
    Sample::new(names, features, "target", target)
}
