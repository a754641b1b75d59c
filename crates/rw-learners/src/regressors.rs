//! Regressors.

use ndarray::{Array1, Array2, Axis};
use rw_types::{
    config_error, unknown_parameter, FitError, Learner, ParamMap,
    ParameterSchema, ParameterValue, PipelineType, RwError, RwResult, ValueKind,
};

use crate::check_training_data;
use crate::linalg::{squared_distance, Cholesky};

// ---------------------------------------------------------------------------
// Ridge
// ---------------------------------------------------------------------------

/// L2-regularized least squares solved through the normal equations.
#[derive(Debug, Clone)]
pub struct RidgeRegressor {
    alpha: f64,
    fit_intercept: bool,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl Default for RidgeRegressor {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fit_intercept: true,
            coefficients: None,
            intercept: 0.0,
        }
    }
}

impl RidgeRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }
}

impl Learner for RidgeRegressor {
    fn name(&self) -> &str {
        "RidgeRegressor"
    }

    fn pipeline_type(&self) -> PipelineType {
        PipelineType::Regressor
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new(self.name())
            .param("alpha", ValueKind::Float)
            .param("fit_intercept", ValueKind::Bool)
    }

    fn get_params(&self) -> ParamMap {
        ParamMap::from([
            ("alpha".to_string(), ParameterValue::Float(self.alpha)),
            ("fit_intercept".to_string(), ParameterValue::Bool(self.fit_intercept)),
        ])
    }

    fn set_param(&mut self, name: &str, value: &ParameterValue) -> RwResult<()> {
        match name {
            "alpha" => {
                let alpha = value.expect_f64(name)?;
                if alpha < 0.0 {
                    return Err(config_error!("alpha must be non-negative but got: {}", value));
                }
                self.alpha = alpha;
            }
            "fit_intercept" => self.fit_intercept = value.expect_bool(name)?,
            _ => return Err(unknown_parameter(self.name(), name)),
        }
        self.coefficients = None;
        Ok(())
    }

    fn fit(&mut self, features: &Array2<f64>, target: &Array1<f64>) -> RwResult<()> {
        check_training_data(features, target)?;
        let n_cols = features.ncols();

        let (x_mean, y_mean) = if self.fit_intercept {
            (
                features.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_cols)),
                target.mean().unwrap_or(0.0),
            )
        } else {
            (Array1::zeros(n_cols), 0.0)
        };

        let x_centered = features - &x_mean.clone().insert_axis(Axis(0));
        let y_centered = target - y_mean;

        let mut xtx = x_centered.t().dot(&x_centered);
        xtx.diag_mut().mapv_inplace(|v| v + self.alpha);
        let xty = x_centered.t().dot(&y_centered);

        let chol = Cholesky::decompose(&xtx)
            .ok_or_else(|| RwError::Fit(FitError::new("normal equations are singular")))?;
        let coefficients = chol.solve(&xty);
        self.intercept = y_mean - coefficients.dot(&x_mean);
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> RwResult<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| RwError::NotFitted(format!("{} is not fitted", self.name())))?;
        Ok(features.dot(coefficients) + self.intercept)
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    fn clone_learner(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }
}

// ---------------------------------------------------------------------------
// k nearest neighbours
// ---------------------------------------------------------------------------

/// Averages the targets of the `n_neighbors` closest training rows,
/// optionally weighted by inverse distance.
#[derive(Debug, Clone)]
pub struct KNeighborsRegressor {
    n_neighbors: usize,
    distance_weighted: bool,
    memory: Option<(Array2<f64>, Array1<f64>)>,
}

impl Default for KNeighborsRegressor {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            distance_weighted: false,
            memory: None,
        }
    }
}

impl KNeighborsRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.n_neighbors = n_neighbors;
        self
    }
}

impl Learner for KNeighborsRegressor {
    fn name(&self) -> &str {
        "KNeighborsRegressor"
    }

    fn pipeline_type(&self) -> PipelineType {
        PipelineType::Regressor
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new(self.name())
            .param("n_neighbors", ValueKind::Int)
            .param("weights", ValueKind::Str)
    }

    fn get_params(&self) -> ParamMap {
        let weights = if self.distance_weighted {
            "distance"
        } else {
            "uniform"
        };
        ParamMap::from([
            ("n_neighbors".to_string(), ParameterValue::from(self.n_neighbors)),
            ("weights".to_string(), ParameterValue::from(weights)),
        ])
    }

    fn set_param(&mut self, name: &str, value: &ParameterValue) -> RwResult<()> {
        match name {
            "n_neighbors" => {
                let k = value.expect_i64(name)?;
                if k < 1 {
                    return Err(config_error!("n_neighbors must be at least 1 but got: {}", value));
                }
                self.n_neighbors = k as usize;
            }
            "weights" => {
                self.distance_weighted = match value.expect_str(name)? {
                    "uniform" => false,
                    "distance" => true,
                    other => return Err(config_error!("unsupported weights: {}", other)),
                }
            }
            _ => return Err(unknown_parameter(self.name(), name)),
        }
        self.memory = None;
        Ok(())
    }

    fn fit(&mut self, features: &Array2<f64>, target: &Array1<f64>) -> RwResult<()> {
        check_training_data(features, target)?;
        self.memory = Some((features.clone(), target.clone()));
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> RwResult<Array1<f64>> {
        let (train_x, train_y) = self
            .memory
            .as_ref()
            .ok_or_else(|| RwError::NotFitted(format!("{} is not fitted", self.name())))?;
        let k = self.n_neighbors.min(train_x.nrows());

        Ok(features
            .outer_iter()
            .map(|x| {
                let mut distances: Vec<(f64, f64)> = train_x
                    .outer_iter()
                    .zip(train_y)
                    .map(|(row, y)| (squared_distance(x, row).sqrt(), *y))
                    .collect();
                distances.sort_by(|a, b| a.0.total_cmp(&b.0));
                let nearest = &distances[..k];

                if self.distance_weighted {
                    if let Some((_, y)) = nearest.iter().find(|(d, _)| *d == 0.0) {
                        return *y;
                    }
                    let (num, den) = nearest
                        .iter()
                        .fold((0.0, 0.0), |(num, den), (d, y)| (num + y / d, den + 1.0 / d));
                    num / den
                } else {
                    nearest.iter().map(|(_, y)| y).sum::<f64>() / k as f64
                }
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.memory.is_some()
    }

    fn clone_learner(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }
}
