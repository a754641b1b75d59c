//! Parameter spaces: tunable values bound to a pipeline template.

use rw_types::{
    config_error, join_param_path, kind_mismatch, Distribution, Expression, ParameterSchema,
    ParameterValue, Pipeline, PipelineRef, RwResult,
};
use std::sync::Arc;

/// What a tuned parameter ranges over.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSpec {
    /// An ordered list of concrete values.
    Values(Vec<ParameterValue>),
    Distribution(Distribution),
}

impl ValueSpec {
    pub fn is_discrete(&self) -> bool {
        matches!(self, Self::Values(_))
    }

    pub fn to_expression(&self) -> Expression {
        match self {
            Self::Values(values) => {
                Expression::List(values.iter().map(ParameterValue::to_expression).collect())
            }
            Self::Distribution(dist) => dist.to_expression(),
        }
    }
}

/// The right-hand side of a parameter assignment.
///
/// Only lists and distributions are valid; a bare scalar is rejected with a
/// configuration error that echoes the value.
#[derive(Debug, Clone)]
pub enum ParameterArg {
    Scalar(ParameterValue),
    Values(Vec<ParameterValue>),
    Distribution(Distribution),
}

macro_rules! scalar_arg {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParameterArg {
                fn from(v: $ty) -> Self {
                    Self::Scalar(v.into())
                }
            }
        )*
    };
}

scalar_arg!(bool, i64, i32, usize, f64, &str, String, PipelineRef);

impl From<ParameterValue> for ParameterArg {
    fn from(v: ParameterValue) -> Self {
        Self::Scalar(v)
    }
}

impl<T: Into<ParameterValue>> From<Vec<T>> for ParameterArg {
    fn from(values: Vec<T>) -> Self {
        Self::Values(values.into_iter().map(Into::into).collect())
    }
}

impl From<Distribution> for ParameterArg {
    fn from(dist: Distribution) -> Self {
        Self::Distribution(dist)
    }
}

impl From<ValueSpec> for ParameterArg {
    fn from(spec: ValueSpec) -> Self {
        match spec {
            ValueSpec::Values(values) => Self::Values(values),
            ValueSpec::Distribution(dist) => Self::Distribution(dist),
        }
    }
}

/// Tunable parameters of one pipeline template.
///
/// Assignments are validated against the pipeline's [`ParameterSchema`]:
/// the path must exist, and every listed value (or the distribution's output)
/// must have the parameter's kind. The template itself is never modified.
///
/// ```ignore
/// let mut space = ParameterSpace::new(pipeline);
/// space
///     .group("regressor")?
///     .set("alpha", vec![0.1, 1.0, 10.0])?
///     .set("fit_intercept", vec![true, false])?;
/// ```
#[derive(Debug, Clone)]
pub struct ParameterSpace {
    estimator: PipelineRef,
    schema: ParameterSchema,
    specs: Vec<(Vec<String>, ValueSpec)>,
}

impl ParameterSpace {
    pub fn new(estimator: impl Pipeline + 'static) -> Self {
        Self::from_ref(Arc::new(estimator))
    }

    pub fn from_ref(estimator: PipelineRef) -> Self {
        let schema = estimator.parameter_schema();
        Self {
            estimator,
            schema,
            specs: Vec::new(),
        }
    }

    pub fn estimator(&self) -> &PipelineRef {
        &self.estimator
    }

    /// A builder for the parameters under `name`, e.g. `regressor`.
    pub fn group(&mut self, name: &str) -> RwResult<ParameterGroup<'_>> {
        self.schema.group_at(&[name])?;
        Ok(ParameterGroup {
            space: self,
            prefix: vec![name.to_string()],
        })
    }

    /// Assign a dotted path such as `regressor.alpha`.
    pub fn set(&mut self, path: &str, arg: impl Into<ParameterArg>) -> RwResult<&mut Self> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        self.assign(segments, arg.into())?;
        Ok(self)
    }

    /// The value spec assigned to a dotted path, if any.
    pub fn get(&self, path: &str) -> Option<&ValueSpec> {
        self.specs
            .iter()
            .find(|(segments, _)| segments.join(".") == path)
            .map(|(_, spec)| spec)
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// True if every tuned parameter is a list of values.
    pub fn is_discrete(&self) -> bool {
        self.specs.iter().all(|(_, spec)| spec.is_discrete())
    }

    /// Tuned parameters keyed by their `__`-joined pipeline parameter name,
    /// in assignment order. Reassigning a path keeps its original position.
    pub fn parameters(&self) -> Vec<(String, ValueSpec)> {
        self.prefixed_specs(None)
    }

    /// Tuned parameters in assignment order, `__`-joined and prefixed.
    pub(crate) fn prefixed_specs(&self, prefix: Option<&str>) -> Vec<(String, ValueSpec)> {
        self.specs
            .iter()
            .map(|(segments, spec)| {
                let name = match prefix {
                    Some(prefix) => join_param_path(
                        &std::iter::once(prefix)
                            .chain(segments.iter().map(String::as_str))
                            .collect::<Vec<_>>(),
                    ),
                    None => join_param_path(segments),
                };
                (name, spec.clone())
            })
            .collect()
    }

    pub fn to_expression(&self) -> Expression {
        self.expression_with("estimator", None)
    }

    /// The expression of this space embedded as a candidate under `step`.
    pub(crate) fn candidate_expression(&self, step: &str) -> Expression {
        self.expression_with(step, Some(step))
    }

    fn expression_with(&self, estimator_key: &str, prefix: Option<&str>) -> Expression {
        let base = Expression::call("ParameterSpace")
            .kwarg(estimator_key, self.estimator.to_expression());
        self.specs.iter().fold(base, |expr, (segments, spec)| {
            let path = segments.join(".");
            let name = match prefix {
                Some(prefix) => format!("{prefix}.{path}"),
                None => path,
            };
            expr.kwarg(name, spec.to_expression())
        })
    }

    fn assign(&mut self, segments: Vec<String>, arg: ParameterArg) -> RwResult<()> {
        let kind = self.schema.lookup(segments.as_slice())?;
        let leaf = segments.last().map(String::as_str).unwrap_or_default();

        let spec = match arg {
            ParameterArg::Scalar(value) => {
                return Err(config_error!(
                    "expected list or distribution for parameter {} but got: {}",
                    leaf,
                    value
                ));
            }
            ParameterArg::Values(values) => {
                if let Some(bad) = values.iter().find(|v| !kind.accepts(v)) {
                    return Err(kind_mismatch(kind, leaf, bad));
                }
                ValueSpec::Values(values)
            }
            ParameterArg::Distribution(dist) => {
                if !kind.covers(dist.value_kind()) {
                    return Err(config_error!(
                        "expected values of kind {} for parameter {} but got: {}",
                        kind,
                        leaf,
                        dist.to_expression()
                    ));
                }
                dist.validate()?;
                ValueSpec::Distribution(dist)
            }
        };

        match self.specs.iter_mut().find(|(existing, _)| *existing == segments) {
            Some((_, existing)) => *existing = spec,
            None => self.specs.push((segments, spec)),
        }
        Ok(())
    }
}

/// Assigns parameters under a fixed path prefix of a [`ParameterSpace`].
#[derive(Debug)]
pub struct ParameterGroup<'a> {
    space: &'a mut ParameterSpace,
    prefix: Vec<String>,
}

impl ParameterGroup<'_> {
    /// Dotted path of this group.
    pub fn path(&self) -> String {
        self.prefix.join(".")
    }

    pub fn set(&mut self, name: &str, arg: impl Into<ParameterArg>) -> RwResult<&mut Self> {
        let mut segments = self.prefix.clone();
        segments.push(name.to_string());
        self.space.assign(segments, arg.into())?;
        Ok(self)
    }

    /// A nested group below this one.
    pub fn group(&mut self, name: &str) -> RwResult<ParameterGroup<'_>> {
        let mut prefix = self.prefix.clone();
        prefix.push(name.to_string());
        self.space.schema.group_at(prefix.as_slice())?;
        Ok(ParameterGroup {
            space: &mut *self.space,
            prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_learners::{KNeighborsRegressor, RidgeRegressor, StandardScaler};
    use rw_types::LearnerPipeline;

    fn ridge_space() -> ParameterSpace {
        ParameterSpace::new(
            LearnerPipeline::new(RidgeRegressor::new()).with_preprocessing(StandardScaler::new()),
        )
    }

    #[test]
    fn group_assignment_is_recorded_in_order() {
        let mut space = ridge_space();
        space
            .group("regressor")
            .unwrap()
            .set("alpha", Distribution::loguniform(0.01, 0.1))
            .unwrap()
            .set("fit_intercept", vec![true, false])
            .unwrap();
        space.set("preprocessing.with_std", vec![true]).unwrap();

        let params = space.parameters();
        assert_eq!(
            params.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
            vec![
                "regressor__alpha",
                "regressor__fit_intercept",
                "preprocessing__with_std"
            ]
        );
        assert_eq!(
            params[1].1,
            ValueSpec::Values(vec![ParameterValue::Bool(true), ParameterValue::Bool(false)])
        );
        assert!(!space.is_discrete());
        assert_eq!(
            space.get("regressor.alpha"),
            Some(&ValueSpec::Distribution(Distribution::loguniform(0.01, 0.1)))
        );
    }

    #[test]
    fn reassignment_replaces_in_place() {
        let mut space = ridge_space();
        space.set("regressor.alpha", vec![1.0]).unwrap();
        space.set("regressor.fit_intercept", vec![true]).unwrap();
        space.set("regressor.alpha", vec![2.0, 3.0]).unwrap();
        assert_eq!(
            space.to_expression().to_string(),
            format!(
                "ParameterSpace(estimator={}, **{{\"regressor.alpha\": [2.0, 3.0]}}, \
                 **{{\"regressor.fit_intercept\": [True]}})",
                space.estimator().to_expression()
            )
        );
    }

    #[test]
    fn unknown_names_are_rejected() {
        let mut space = ridge_space();
        let err = space
            .group("regressor")
            .unwrap()
            .set("unknown", 1)
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown parameter name for RidgeRegressor: unknown");

        let err = space.group("classifier").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown parameter name for RegressorPipelineDF: classifier"
        );
        assert!(space.is_empty());
    }

    #[test]
    fn scalars_are_rejected() {
        let mut space = ParameterSpace::new(LearnerPipeline::new(KNeighborsRegressor::new()));
        let err = space
            .group("regressor")
            .unwrap()
            .set("n_neighbors", 1)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected list or distribution for parameter n_neighbors but got: 1"
        );
    }

    #[test]
    fn value_kinds_are_checked() {
        let mut space = ParameterSpace::new(LearnerPipeline::new(KNeighborsRegressor::new()));
        let mut group = space.group("regressor").unwrap();
        assert_eq!(
            group.set("weights", vec![1, 2]).unwrap_err().to_string(),
            "expected values of kind str for parameter weights but got: 1"
        );
        assert_eq!(
            group
                .set("n_neighbors", Distribution::uniform(1.0, 5.0))
                .unwrap_err()
                .to_string(),
            "expected values of kind int for parameter n_neighbors but got: uniform(1.0, 5.0)"
        );
        group.set("n_neighbors", Distribution::randint(1, 8)).unwrap();
        assert_eq!(group.path(), "regressor");
    }

    #[test]
    fn float_parameters_accept_integer_values() {
        let mut space = ridge_space();
        space.set("regressor.alpha", vec![1, 10]).unwrap();
        space
            .set("regressor.alpha", Distribution::randint(1, 10))
            .unwrap();
    }

    #[test]
    fn reassignment_keeps_parameter_position() {
        let mut space = ridge_space();
        space.set("regressor.alpha", vec![1.0]).unwrap();
        space.set("regressor.fit_intercept", vec![true]).unwrap();
        space.set("regressor.alpha", vec![2.0]).unwrap();
        assert_eq!(
            space.parameters(),
            vec![
                (
                    "regressor__alpha".to_string(),
                    ValueSpec::Values(vec![ParameterValue::Float(2.0)])
                ),
                (
                    "regressor__fit_intercept".to_string(),
                    ValueSpec::Values(vec![ParameterValue::Bool(true)])
                ),
            ]
        );
    }

    #[test]
    fn invalid_distributions_are_rejected() {
        let mut space = ridge_space();
        let err = space
            .set("regressor.alpha", Distribution::uniform(-1e308, 1e308))
            .unwrap_err();
        assert!(err.to_string().contains("too wide"), "{err}");
        let err = space
            .set("regressor.alpha", Distribution::loguniform(f64::NAN, 1.0))
            .unwrap_err();
        assert!(err.to_string().starts_with("loguniform bounds must be finite"), "{err}");
        assert!(space
            .set("regressor.alpha", Distribution::loguniform(0.0, 1.0))
            .is_err());
        assert!(space.is_empty());

        let mut knn = ParameterSpace::new(LearnerPipeline::new(KNeighborsRegressor::new()));
        assert!(knn
            .set("regressor.n_neighbors", Distribution::randint(5, 5))
            .is_err());
        assert!(knn
            .set("regressor.n_neighbors", Distribution::zipfian(1.0, 0))
            .is_err());
        knn.set("regressor.n_neighbors", Distribution::zipfian(1.2, 20))
            .unwrap();
    }

    #[test]
    fn nested_groups_resolve_through_the_schema() {
        let mut space = ridge_space();
        let mut group = space.group("regressor").unwrap();
        assert_eq!(
            group.group("inner").unwrap_err().to_string(),
            "unknown parameter name for RidgeRegressor: inner"
        );
        assert_eq!(
            space.set("regressor", vec![1.0]).unwrap_err().to_string(),
            "unknown parameter name for RegressorPipelineDF: regressor"
        );
    }
}
