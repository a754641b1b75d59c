//! Classifiers.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rw_types::{
    config_error, unknown_parameter, validation_error, FitError, Learner, ParamMap,
    ParameterSchema, ParameterValue, PipelineType, RwError, RwResult, ValueKind,
};
use tracing::debug;

use crate::check_training_data;
use crate::linalg::{manhattan_distance, squared_distance, Cholesky};

/// Sorted distinct class labels.
fn class_labels(target: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = target.to_vec();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup();
    classes
}

// ---------------------------------------------------------------------------
// Kernel ridge classifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Linear,
    Rbf,
}

impl Kernel {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Rbf => "rbf",
        }
    }
}

/// RBF bandwidth: either a fixed value or `1 / (n_features * var(X))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gamma {
    Scale,
    Value(f64),
}

/// One-vs-rest kernel ridge classifier.
///
/// Solves `(K + 1 + I / C) a_c = y_c` per class with `y_c` in {-1, +1}; the
/// constant added to the kernel acts as an intercept. Predicts the class with
/// the largest decision value.
#[derive(Debug, Clone)]
pub struct KernelRidgeClassifier {
    kernel: Kernel,
    c: f64,
    gamma: Gamma,
    model: Option<KernelModel>,
}

#[derive(Debug, Clone)]
struct KernelModel {
    support: Array2<f64>,
    /// One coefficient column per class.
    coefficients: Array2<f64>,
    classes: Vec<f64>,
    gamma: f64,
}

impl Default for KernelRidgeClassifier {
    fn default() -> Self {
        Self {
            kernel: Kernel::Rbf,
            c: 1.0,
            gamma: Gamma::Scale,
            model: None,
        }
    }
}

impl KernelRidgeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_gamma(mut self, gamma: Gamma) -> Self {
        self.gamma = gamma;
        self
    }

    fn kernel_value(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>, gamma: f64) -> f64 {
        match self.kernel {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf => (-gamma * squared_distance(a, b)).exp(),
        }
    }

    /// Kernel between every row of `a` and every row of `b`, plus the
    /// intercept constant.
    fn kernel_matrix(&self, a: &Array2<f64>, b: &Array2<f64>, gamma: f64) -> Array2<f64> {
        Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
            self.kernel_value(a.row(i), b.row(j), gamma) + 1.0
        })
    }

    fn effective_gamma(&self, features: &Array2<f64>) -> f64 {
        match self.gamma {
            Gamma::Value(g) => g,
            Gamma::Scale => {
                let mean = features.mean().unwrap_or(0.0);
                let var = features.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.0);
                let n_features = features.ncols().max(1) as f64;
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
        }
    }
}

impl Learner for KernelRidgeClassifier {
    fn name(&self) -> &str {
        "KernelRidgeClassifier"
    }

    fn pipeline_type(&self) -> PipelineType {
        PipelineType::Classifier
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new(self.name())
            .param("C", ValueKind::Float)
            .param("kernel", ValueKind::Str)
            .param("gamma", ValueKind::Any)
    }

    fn get_params(&self) -> ParamMap {
        let gamma = match self.gamma {
            Gamma::Scale => ParameterValue::from("scale"),
            Gamma::Value(g) => ParameterValue::Float(g),
        };
        ParamMap::from([
            ("C".to_string(), ParameterValue::Float(self.c)),
            ("gamma".to_string(), gamma),
            ("kernel".to_string(), ParameterValue::from(self.kernel.as_str())),
        ])
    }

    fn set_param(&mut self, name: &str, value: &ParameterValue) -> RwResult<()> {
        match name {
            "C" => {
                let c = value.expect_f64(name)?;
                if c <= 0.0 {
                    return Err(config_error!("C must be positive but got: {}", value));
                }
                self.c = c;
            }
            "kernel" => {
                self.kernel = match value.expect_str(name)? {
                    "linear" => Kernel::Linear,
                    "rbf" => Kernel::Rbf,
                    other => return Err(config_error!("unsupported kernel: {}", other)),
                }
            }
            "gamma" => {
                self.gamma = match value {
                    ParameterValue::Str(s) if s == "scale" => Gamma::Scale,
                    other => Gamma::Value(other.expect_f64(name)?),
                }
            }
            _ => return Err(unknown_parameter(self.name(), name)),
        }
        self.model = None;
        Ok(())
    }

    fn fit(&mut self, features: &Array2<f64>, target: &Array1<f64>) -> RwResult<()> {
        check_training_data(features, target)?;
        let classes = class_labels(target);
        let gamma = self.effective_gamma(features);
        let n = features.nrows();

        let mut gram = self.kernel_matrix(features, features, gamma);
        gram.diag_mut().mapv_inplace(|v| v + 1.0 / self.c);

        let chol = Cholesky::decompose(&gram)
            .ok_or_else(|| RwError::Fit(FitError::new("kernel matrix is not positive definite")))?;

        let mut coefficients = Array2::<f64>::zeros((n, classes.len()));
        for (c, class) in classes.iter().enumerate() {
            let y = target.mapv(|t| if t == *class { 1.0 } else { -1.0 });
            coefficients.column_mut(c).assign(&chol.solve(&y));
        }

        debug!(n_samples = n, n_classes = classes.len(), "fitted kernel ridge classifier");

        self.model = Some(KernelModel {
            support: features.clone(),
            coefficients,
            classes,
            gamma,
        });
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> RwResult<Array1<f64>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| RwError::NotFitted(format!("{} is not fitted", self.name())))?;

        let decisions = self
            .kernel_matrix(features, &model.support, model.gamma)
            .dot(&model.coefficients);
        Ok(decisions
            .outer_iter()
            .map(|row| {
                row.iter()
                    .zip(&model.classes)
                    .max_by(|(a, _), (b, _)| a.total_cmp(b))
                    .map(|(_, class)| *class)
                    .unwrap_or(f64::NAN)
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    fn clone_learner(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Nearest centroid
// ---------------------------------------------------------------------------

/// Assigns each observation to the class with the closest mean.
#[derive(Debug, Clone)]
pub struct NearestCentroidClassifier {
    metric: String,
    centroids: Option<Vec<(f64, Array1<f64>)>>,
}

impl Default for NearestCentroidClassifier {
    fn default() -> Self {
        Self {
            metric: "euclidean".to_string(),
            centroids: None,
        }
    }
}

impl NearestCentroidClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match self.metric.as_str() {
            "manhattan" => manhattan_distance(a, b),
            _ => squared_distance(a, b),
        }
    }
}

impl Learner for NearestCentroidClassifier {
    fn name(&self) -> &str {
        "NearestCentroidClassifier"
    }

    fn pipeline_type(&self) -> PipelineType {
        PipelineType::Classifier
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new(self.name()).param("metric", ValueKind::Str)
    }

    fn get_params(&self) -> ParamMap {
        ParamMap::from([("metric".to_string(), ParameterValue::from(self.metric.as_str()))])
    }

    fn set_param(&mut self, name: &str, value: &ParameterValue) -> RwResult<()> {
        match name {
            "metric" => match value.expect_str(name)? {
                m @ ("euclidean" | "manhattan") => self.metric = m.to_string(),
                other => return Err(config_error!("unsupported metric: {}", other)),
            },
            _ => return Err(unknown_parameter(self.name(), name)),
        }
        self.centroids = None;
        Ok(())
    }

    fn fit(&mut self, features: &Array2<f64>, target: &Array1<f64>) -> RwResult<()> {
        check_training_data(features, target)?;
        let centroids = class_labels(target)
            .into_iter()
            .map(|class| {
                let members: Vec<usize> = target
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| **t == class)
                    .map(|(i, _)| i)
                    .collect();
                features
                    .select(Axis(0), &members)
                    .mean_axis(Axis(0))
                    .map(|centroid| (class, centroid))
                    .ok_or_else(|| validation_error!("class {} has no members", class))
            })
            .collect::<RwResult<Vec<_>>>()?;
        self.centroids = Some(centroids);
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> RwResult<Array1<f64>> {
        let centroids = self
            .centroids
            .as_ref()
            .ok_or_else(|| RwError::NotFitted(format!("{} is not fitted", self.name())))?;
        Ok(features
            .outer_iter()
            .map(|x| {
                centroids
                    .iter()
                    .min_by(|(_, a), (_, b)| {
                        self.distance(x, a.view()).total_cmp(&self.distance(x, b.view()))
                    })
                    .map(|(class, _)| *class)
                    .unwrap_or(f64::NAN)
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.centroids.is_some()
    }

    fn clone_learner(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::blob_features as blobs;
    use ndarray::array;

    fn accuracy(pred: &Array1<f64>, truth: &Array1<f64>) -> f64 {
        pred.iter().zip(truth).filter(|(p, t)| p == t).count() as f64 / truth.len() as f64
    }

    #[test]
    fn kernel_ridge_separates_blobs() {
        let (x, y) = blobs(90, 3, 7);
        for kernel in [Kernel::Linear, Kernel::Rbf] {
            let mut clf = KernelRidgeClassifier::new().with_kernel(kernel).with_c(10.0);
            clf.fit(&x, &y).unwrap();
            let acc = accuracy(&clf.predict(&x).unwrap(), &y);
            assert!(acc > 0.9, "{kernel:?} accuracy {acc}");
        }
    }

    #[test]
    fn kernel_ridge_parameters() {
        let mut clf = KernelRidgeClassifier::new();
        clf.set_param("kernel", &ParameterValue::from("linear")).unwrap();
        clf.set_param("C", &ParameterValue::Int(10)).unwrap();
        let params = clf.get_params();
        assert_eq!(params["kernel"], ParameterValue::from("linear"));
        assert_eq!(params["C"], ParameterValue::Float(10.0));

        assert!(clf.set_param("C", &ParameterValue::Float(0.0)).is_err());
        assert!(clf.set_param("kernel", &ParameterValue::from("poly")).is_err());
        let err = clf.set_param("degree", &ParameterValue::Int(3)).unwrap_err();
        assert_eq!(err.to_string(), "unknown parameter name for KernelRidgeClassifier: degree");
    }

    #[test]
    fn kernel_ridge_requires_fit() {
        let clf = KernelRidgeClassifier::new();
        assert!(matches!(clf.predict(&array![[0.0]]), Err(RwError::NotFitted(_))));
    }

    #[test]
    fn nearest_centroid_separates_blobs() {
        let (x, y) = blobs(60, 2, 3);
        let mut clf = NearestCentroidClassifier::new();
        clf.fit(&x, &y).unwrap();
        assert!(accuracy(&clf.predict(&x).unwrap(), &y) > 0.9);
        assert!(clf.set_param("metric", &ParameterValue::from("cosine")).is_err());
    }
}
