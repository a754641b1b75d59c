//! Learner, transformer and pipeline traits, plus the two pipeline shapes the
//! selection layer works with: [`LearnerPipeline`] (optional preprocessing
//! followed by one learner) and [`NamedStepPipeline`] (a single named step
//! wrapping another pipeline, used to switch between candidates).

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::errors::{RwError, RwResult};
use crate::expression::Expression;
use crate::params::{
    join_param_path, split_param_path, unknown_parameter, kind_mismatch, ParamMap,
    ParameterSchema, ParameterValue, ValueKind,
};
use crate::sample::Sample;

/// Shared, immutable handle to a pipeline template.
pub type PipelineRef = Arc<dyn Pipeline>;

/// Capability tag of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineType {
    /// Any pipeline.
    Pipeline,
    Classifier,
    Regressor,
}

impl PipelineType {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Pipeline => "PipelineDF",
            Self::Classifier => "ClassifierPipelineDF",
            Self::Regressor => "RegressorPipelineDF",
        }
    }

    /// Every type is a subtype of itself and of [`PipelineType::Pipeline`].
    pub fn is_subtype_of(&self, other: PipelineType) -> bool {
        other == Self::Pipeline || *self == other
    }

    /// Name of the final step holding the learner.
    pub fn final_step(&self) -> Option<&'static str> {
        match self {
            Self::Pipeline => None,
            Self::Classifier => Some("classifier"),
            Self::Regressor => Some("regressor"),
        }
    }
}

impl fmt::Display for PipelineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// A supervised learner: the final step of a pipeline.
pub trait Learner: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Classifier or regressor.
    fn pipeline_type(&self) -> PipelineType;

    fn schema(&self) -> ParameterSchema;

    fn get_params(&self) -> ParamMap;

    fn set_param(&mut self, name: &str, value: &ParameterValue) -> RwResult<()>;

    fn fit(&mut self, features: &Array2<f64>, target: &Array1<f64>) -> RwResult<()>;

    fn predict(&self, features: &Array2<f64>) -> RwResult<Array1<f64>>;

    fn is_fitted(&self) -> bool;

    fn clone_learner(&self) -> Box<dyn Learner>;

    fn to_expression(&self) -> Expression {
        self.get_params()
            .iter()
            .fold(Expression::call(self.name()), |expr, (name, value)| {
                expr.kwarg(name.clone(), value.to_expression())
            })
    }
}

impl Clone for Box<dyn Learner> {
    fn clone(&self) -> Self {
        self.clone_learner()
    }
}

/// A feature transformer used as a preprocessing step.
pub trait Transformer: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> ParameterSchema;

    fn get_params(&self) -> ParamMap;

    fn set_param(&mut self, name: &str, value: &ParameterValue) -> RwResult<()>;

    fn fit(&mut self, features: &Array2<f64>) -> RwResult<()>;

    fn transform(&self, features: &Array2<f64>) -> RwResult<Array2<f64>>;

    fn clone_transformer(&self) -> Box<dyn Transformer>;

    fn to_expression(&self) -> Expression {
        self.get_params()
            .iter()
            .fold(Expression::call(self.name()), |expr, (name, value)| {
                expr.kwarg(name.clone(), value.to_expression())
            })
    }
}

impl Clone for Box<dyn Transformer> {
    fn clone(&self) -> Self {
        self.clone_transformer()
    }
}

/// A fittable pipeline with a declared parameter schema.
///
/// Parameter keys follow the nested `step__param` convention; the schema
/// describes the same parameters as a tree of named groups.
pub trait Pipeline: fmt::Debug + Send + Sync {
    fn pipeline_type(&self) -> PipelineType;

    /// Capability of the innermost learner, looking through wrapper steps.
    fn final_pipeline_type(&self) -> PipelineType {
        self.pipeline_type()
    }

    /// Type name of the final estimator, e.g. `RidgeRegressor`.
    fn final_estimator_name(&self) -> String;

    /// Step name prefixing the final estimator's parameters, e.g. `regressor`.
    fn final_estimator_param(&self) -> Option<&str>;

    fn parameter_schema(&self) -> ParameterSchema;

    fn get_params(&self) -> ParamMap;

    fn set_params(&mut self, params: &ParamMap) -> RwResult<()>;

    fn fit(&mut self, sample: &Sample) -> RwResult<()>;

    fn predict(&self, features: &Array2<f64>) -> RwResult<Array1<f64>>;

    fn is_fitted(&self) -> bool;

    fn clone_pipeline(&self) -> Box<dyn Pipeline>;

    fn to_expression(&self) -> Expression;
}

impl Clone for Box<dyn Pipeline> {
    fn clone(&self) -> Self {
        self.clone_pipeline()
    }
}

// ---------------------------------------------------------------------------
// Learner pipeline
// ---------------------------------------------------------------------------

/// Optional preprocessing followed by a single learner.
///
/// The learner sits under the step `classifier` or `regressor` depending on
/// its capability; preprocessing parameters live under `preprocessing`.
#[derive(Debug, Clone)]
pub struct LearnerPipeline {
    pipeline_type: PipelineType,
    preprocessing: Option<Box<dyn Transformer>>,
    learner: Box<dyn Learner>,
}

impl LearnerPipeline {
    pub const PREPROCESSING: &'static str = "preprocessing";

    pub fn new(learner: impl Learner + 'static) -> Self {
        Self::from_boxed(Box::new(learner))
    }

    pub fn from_boxed(learner: Box<dyn Learner>) -> Self {
        Self {
            pipeline_type: learner.pipeline_type(),
            preprocessing: None,
            learner,
        }
    }

    pub fn with_preprocessing(mut self, transformer: impl Transformer + 'static) -> Self {
        self.preprocessing = Some(Box::new(transformer));
        self
    }

    pub fn into_ref(self) -> PipelineRef {
        Arc::new(self)
    }

    pub fn learner(&self) -> &dyn Learner {
        self.learner.as_ref()
    }

    pub fn preprocessing(&self) -> Option<&dyn Transformer> {
        self.preprocessing.as_deref()
    }

    fn step(&self) -> &'static str {
        self.pipeline_type.final_step().unwrap_or("estimator")
    }
}

impl Pipeline for LearnerPipeline {
    fn pipeline_type(&self) -> PipelineType {
        self.pipeline_type
    }

    fn final_estimator_name(&self) -> String {
        self.learner.name().to_string()
    }

    fn final_estimator_param(&self) -> Option<&str> {
        Some(self.step())
    }

    fn parameter_schema(&self) -> ParameterSchema {
        let schema = ParameterSchema::new(self.pipeline_type.type_name())
            .group(self.step(), self.learner.schema());
        match &self.preprocessing {
            Some(t) => schema.group(Self::PREPROCESSING, t.schema()),
            None => schema,
        }
    }

    fn get_params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        for (name, value) in self.learner.get_params() {
            params.insert(join_param_path(&[self.step(), name.as_str()]), value);
        }
        if let Some(t) = &self.preprocessing {
            for (name, value) in t.get_params() {
                params.insert(join_param_path(&[Self::PREPROCESSING, name.as_str()]), value);
            }
        }
        params
    }

    fn set_params(&mut self, params: &ParamMap) -> RwResult<()> {
        let step = self.step();
        for (key, value) in params {
            match split_param_path(key) {
                Some((head, rest)) if head == step => self.learner.set_param(rest, value)?,
                Some((head, rest)) if head == Self::PREPROCESSING => match &mut self.preprocessing {
                    Some(t) => t.set_param(rest, value)?,
                    None => return Err(unknown_parameter(self.pipeline_type.type_name(), key)),
                },
                _ => return Err(unknown_parameter(self.pipeline_type.type_name(), key)),
            }
        }
        Ok(())
    }

    fn fit(&mut self, sample: &Sample) -> RwResult<()> {
        match &mut self.preprocessing {
            Some(t) => {
                t.fit(sample.features())?;
                let features = t.transform(sample.features())?;
                self.learner.fit(&features, sample.target())
            }
            None => self.learner.fit(sample.features(), sample.target()),
        }
    }

    fn predict(&self, features: &Array2<f64>) -> RwResult<Array1<f64>> {
        if !self.learner.is_fitted() {
            return Err(RwError::NotFitted(format!(
                "{} must be fitted before predicting",
                self.learner.name()
            )));
        }
        match &self.preprocessing {
            Some(t) => self.learner.predict(&t.transform(features)?),
            None => self.learner.predict(features),
        }
    }

    fn is_fitted(&self) -> bool {
        self.learner.is_fitted()
    }

    fn clone_pipeline(&self) -> Box<dyn Pipeline> {
        Box::new(self.clone())
    }

    fn to_expression(&self) -> Expression {
        let expr = Expression::call(self.pipeline_type.type_name())
            .kwarg(self.step(), self.learner.to_expression());
        match &self.preprocessing {
            Some(t) => expr.kwarg(Self::PREPROCESSING, t.to_expression()),
            None => expr,
        }
    }
}

// ---------------------------------------------------------------------------
// Named step pipeline
// ---------------------------------------------------------------------------

/// A generic pipeline with exactly one named step.
///
/// Setting the parameter named after the step replaces the wrapped pipeline,
/// which is how a parameter grid switches between candidate pipelines.
/// `step__*` parameters are forwarded to the wrapped pipeline.
#[derive(Debug, Clone)]
pub struct NamedStepPipeline {
    step: String,
    inner: Box<dyn Pipeline>,
}

impl NamedStepPipeline {
    pub fn new(step: impl Into<String>, inner: Box<dyn Pipeline>) -> Self {
        Self {
            step: step.into(),
            inner,
        }
    }

    pub fn from_ref(step: impl Into<String>, inner: &PipelineRef) -> Self {
        Self::new(step, inner.clone_pipeline())
    }

    pub fn step_name(&self) -> &str {
        &self.step
    }

    pub fn inner(&self) -> &dyn Pipeline {
        self.inner.as_ref()
    }

    pub fn steps(&self) -> Vec<(&str, &dyn Pipeline)> {
        vec![(self.step.as_str(), self.inner.as_ref())]
    }
}

impl Pipeline for NamedStepPipeline {
    fn pipeline_type(&self) -> PipelineType {
        PipelineType::Pipeline
    }

    fn final_pipeline_type(&self) -> PipelineType {
        self.inner.final_pipeline_type()
    }

    fn final_estimator_name(&self) -> String {
        self.inner.final_estimator_name()
    }

    fn final_estimator_param(&self) -> Option<&str> {
        Some(&self.step)
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(PipelineType::Pipeline.type_name())
            .param(self.step.clone(), ValueKind::Pipeline)
            .group(self.step.clone(), self.inner.parameter_schema())
    }

    fn get_params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert(
            self.step.clone(),
            ParameterValue::Pipeline(Arc::from(self.inner.clone_pipeline())),
        );
        for (name, value) in self.inner.get_params() {
            params.insert(join_param_path(&[self.step.as_str(), name.as_str()]), value);
        }
        params
    }

    fn set_params(&mut self, params: &ParamMap) -> RwResult<()> {
        // the step replacement must happen before its nested parameters apply
        if let Some(value) = params.get(&self.step) {
            let pipeline = value
                .as_pipeline()
                .ok_or_else(|| kind_mismatch(ValueKind::Pipeline, &self.step, value))?;
            self.inner = pipeline.clone_pipeline();
        }

        let mut nested = ParamMap::new();
        for (key, value) in params {
            if *key == self.step {
                continue;
            }
            match split_param_path(key) {
                Some((head, rest)) if head == self.step => {
                    nested.insert(rest.to_string(), value.clone());
                }
                _ => return Err(unknown_parameter(PipelineType::Pipeline.type_name(), key)),
            }
        }
        self.inner.set_params(&nested)
    }

    fn fit(&mut self, sample: &Sample) -> RwResult<()> {
        self.inner.fit(sample)
    }

    fn predict(&self, features: &Array2<f64>) -> RwResult<Array1<f64>> {
        self.inner.predict(features)
    }

    fn is_fitted(&self) -> bool {
        self.inner.is_fitted()
    }

    fn clone_pipeline(&self) -> Box<dyn Pipeline> {
        Box::new(self.clone())
    }

    fn to_expression(&self) -> Expression {
        Expression::call(PipelineType::Pipeline.type_name()).kwarg(
            "steps",
            Expression::List(vec![Expression::Tuple(vec![
                Expression::Str(self.step.clone()),
                self.inner.to_expression(),
            ])]),
        )
    }
}
