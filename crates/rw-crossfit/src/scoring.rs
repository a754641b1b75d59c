//! Scoring functions. Higher is always better, so error metrics are negated.

use ndarray::Array1;
use rw_types::{config_error, validation_error, PipelineType, RwError, RwResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Built-in scorers, named the way sklearn names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    Accuracy,
    R2,
    NegMeanSquaredError,
    NegMeanAbsoluteError,
}

impl Scorer {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::R2 => "r2",
            Self::NegMeanSquaredError => "neg_mean_squared_error",
            Self::NegMeanAbsoluteError => "neg_mean_absolute_error",
        }
    }

    /// Accuracy for classifiers, r2 for everything else.
    pub fn default_for(pipeline_type: PipelineType) -> Self {
        match pipeline_type {
            PipelineType::Classifier => Self::Accuracy,
            _ => Self::R2,
        }
    }

    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> RwResult<f64> {
        check_lengths(y_true, y_pred)?;
        let n = y_true.len() as f64;
        let pairs = y_true.iter().zip(y_pred);
        Ok(match self {
            Self::Accuracy => pairs.filter(|(t, p)| t == p).count() as f64 / n,
            Self::NegMeanSquaredError => -pairs.map(|(t, p)| (t - p).powi(2)).sum::<f64>() / n,
            Self::NegMeanAbsoluteError => -pairs.map(|(t, p)| (t - p).abs()).sum::<f64>() / n,
            Self::R2 => {
                let mean = y_true.sum() / n;
                let ss_res: f64 = pairs.map(|(t, p)| (t - p).powi(2)).sum();
                let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
                if ss_tot == 0.0 {
                    // constant target: perfect predictions score 1, anything else 0
                    if ss_res == 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    1.0 - ss_res / ss_tot
                }
            }
        })
    }
}

impl FromStr for Scorer {
    type Err = RwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accuracy" => Ok(Self::Accuracy),
            "r2" => Ok(Self::R2),
            "neg_mean_squared_error" => Ok(Self::NegMeanSquaredError),
            "neg_mean_absolute_error" => Ok(Self::NegMeanAbsoluteError),
            other => Err(config_error!("unknown scoring: {}", other)),
        }
    }
}

impl fmt::Display for Scorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> RwResult<()> {
    if y_true.is_empty() {
        return Err(validation_error!("cannot score an empty prediction"));
    }
    if y_true.len() != y_pred.len() {
        return Err(validation_error!(
            "{} true values but {} predictions",
            y_true.len(),
            y_pred.len()
        ));
    }
    Ok(())
}

type ScoreFn = dyn Fn(&Array1<f64>, &Array1<f64>) -> f64 + Send + Sync;

/// A user supplied scoring callable `(y_true, y_pred) -> score`.
#[derive(Clone)]
pub struct CustomScorer {
    name: String,
    func: Arc<ScoreFn>,
}

impl CustomScorer {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&Array1<f64>, &Array1<f64>) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> RwResult<f64> {
        check_lengths(y_true, y_pred)?;
        Ok((self.func)(y_true, y_pred))
    }
}

impl fmt::Debug for CustomScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomScorer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// How a ranker scores predictions.
#[derive(Debug, Clone, Default)]
pub enum Scoring {
    /// [`Scorer::default_for`] the pipeline's final capability.
    #[default]
    Default,
    Named(Scorer),
    Custom(CustomScorer),
}

impl Scoring {
    /// Parse an optional scorer name; `None` selects the default scorer.
    pub fn from_name(name: Option<&str>) -> RwResult<Self> {
        match name {
            Some(name) => Ok(Self::Named(name.parse()?)),
            None => Ok(Self::Default),
        }
    }

    pub fn name(&self, pipeline_type: PipelineType) -> String {
        match self {
            Self::Default => Scorer::default_for(pipeline_type).name().to_string(),
            Self::Named(scorer) => scorer.name().to_string(),
            Self::Custom(custom) => custom.name().to_string(),
        }
    }

    pub fn score(
        &self,
        pipeline_type: PipelineType,
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
    ) -> RwResult<f64> {
        match self {
            Self::Default => Scorer::default_for(pipeline_type).score(y_true, y_pred),
            Self::Named(scorer) => scorer.score(y_true, y_pred),
            Self::Custom(custom) => custom.score(y_true, y_pred),
        }
    }
}

impl From<Scorer> for Scoring {
    fn from(scorer: Scorer) -> Self {
        Self::Named(scorer)
    }
}

impl From<CustomScorer> for Scoring {
    fn from(scorer: CustomScorer) -> Self {
        Self::Custom(scorer)
    }
}
