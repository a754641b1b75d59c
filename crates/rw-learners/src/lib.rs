//! # rw-learners
//!
//! Small reference learners and transformers implementing the rankwise
//! [`Learner`](rw_types::Learner) and [`Transformer`](rw_types::Transformer)
//! traits, plus seeded synthetic datasets. They exist so pipelines can be
//! ranked end to end; they make no claim to be production estimators.

mod classifiers;
pub mod datasets;
mod linalg;
mod preprocessing;
mod regressors;

pub use classifiers::{Gamma, Kernel, KernelRidgeClassifier, NearestCentroidClassifier};
pub use preprocessing::StandardScaler;
pub use regressors::{KNeighborsRegressor, RidgeRegressor};

use ndarray::{Array1, Array2};
use rw_types::{validation_error, RwResult};

pub(crate) fn check_training_data(features: &Array2<f64>, target: &Array1<f64>) -> RwResult<()> {
    if features.nrows() == 0 {
        return Err(validation_error!("cannot fit on an empty sample"));
    }
    if features.nrows() != target.len() {
        return Err(validation_error!(
            "{} feature rows but {} target values",
            features.nrows(),
            target.len()
        ));
    }
    Ok(())
}
