//! Choosing among several candidate pipelines of one capability.

use rw_types::{
    config_error, Expression, NamedStepPipeline, ParameterValue, PipelineRef, PipelineType,
    RwResult,
};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::space::{ParameterSpace, ValueSpec};

/// The capability every candidate of a multi-space must have.
pub trait CandidateCapability: fmt::Debug + Send + Sync + 'static {
    const PIPELINE_TYPE: PipelineType;

    /// Type name used in structural expressions.
    const SPACE_NAME: &'static str;
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifierCandidates;

impl CandidateCapability for ClassifierCandidates {
    const PIPELINE_TYPE: PipelineType = PipelineType::Classifier;
    const SPACE_NAME: &'static str = "MultiClassifierParameterSpace";
}

#[derive(Debug, Clone, Copy)]
pub struct RegressorCandidates;

impl CandidateCapability for RegressorCandidates {
    const PIPELINE_TYPE: PipelineType = PipelineType::Regressor;
    const SPACE_NAME: &'static str = "MultiRegressorParameterSpace";
}

pub type MultiClassifierParameterSpace = MultiParameterSpace<ClassifierCandidates>;
pub type MultiRegressorParameterSpace = MultiParameterSpace<RegressorCandidates>;

/// Several candidate [`ParameterSpace`]s searched as one problem.
///
/// The search runs over a single-step pipeline whose `candidate` step is
/// itself a tuned parameter: each candidate contributes one parameter map
/// that pins `candidate` to its pipeline and re-prefixes its own tuned
/// parameters with `candidate__`.
#[derive(Debug, Clone)]
pub struct MultiParameterSpace<C: CandidateCapability> {
    candidates: Vec<ParameterSpace>,
    estimator_type: PipelineType,
    estimator: PipelineRef,
    _capability: PhantomData<C>,
}

impl<C: CandidateCapability> MultiParameterSpace<C> {
    /// Step name of the composite pipeline.
    pub const STEP: &'static str = "candidate";

    pub fn new(candidates: Vec<ParameterSpace>) -> RwResult<Self> {
        Self::with_estimator_type(candidates, None)
    }

    /// Like [`new`](Self::new), narrowing the required capability to
    /// `estimator_type`, which must itself be a subtype of the space's
    /// capability.
    pub fn with_estimator_type(
        candidates: Vec<ParameterSpace>,
        estimator_type: Option<PipelineType>,
    ) -> RwResult<Self> {
        let expected = C::PIPELINE_TYPE;
        let estimator_type = estimator_type.unwrap_or(expected);
        if !estimator_type.is_subtype_of(expected) {
            return Err(config_error!(
                "arg estimator_type must be a subclass of {} but is: {}",
                expected,
                estimator_type
            ));
        }

        let mut offending: Vec<&'static str> = Vec::new();
        for candidate in &candidates {
            let actual = candidate.estimator().pipeline_type();
            if !actual.is_subtype_of(estimator_type) && !offending.contains(&actual.type_name()) {
                offending.push(actual.type_name());
            }
        }
        if !offending.is_empty() {
            return Err(config_error!(
                "all candidate estimators must be instances of {}, but candidate estimators \
                 include: {}",
                estimator_type,
                offending.join(", ")
            ));
        }

        let first = candidates
            .first()
            .ok_or_else(|| config_error!("at least one candidate parameter space is required"))?;
        let estimator: PipelineRef =
            Arc::new(NamedStepPipeline::from_ref(Self::STEP, first.estimator()));

        Ok(Self {
            candidates,
            estimator_type,
            estimator,
            _capability: PhantomData,
        })
    }

    pub fn candidates(&self) -> &[ParameterSpace] {
        &self.candidates
    }

    pub fn estimator_type(&self) -> PipelineType {
        self.estimator_type
    }

    /// The composite pipeline, bound to the first candidate.
    pub fn estimator(&self) -> &PipelineRef {
        &self.estimator
    }

    /// Per candidate, in candidate order: `candidate` pinned to its pipeline,
    /// followed by its tuned parameters in assignment order.
    pub fn parameters(&self) -> Vec<Vec<(String, ValueSpec)>> {
        self.candidates
            .iter()
            .map(|candidate| {
                let pin = (
                    Self::STEP.to_string(),
                    ValueSpec::Values(vec![ParameterValue::Pipeline(candidate.estimator().clone())]),
                );
                std::iter::once(pin)
                    .chain(candidate.prefixed_specs(Some(Self::STEP)))
                    .collect()
            })
            .collect()
    }

    pub fn to_expression(&self) -> Expression {
        Expression::call(C::SPACE_NAME)
            .arg(self.estimator.to_expression())
            .arg(Expression::List(
                self.candidates
                    .iter()
                    .map(|c| c.candidate_expression(Self::STEP))
                    .collect(),
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_learners::{KNeighborsRegressor, KernelRidgeClassifier, RidgeRegressor, StandardScaler};
    use rw_types::{Distribution, LearnerPipeline, Pipeline};

    fn ridge_space() -> ParameterSpace {
        let mut space = ParameterSpace::new(
            LearnerPipeline::new(RidgeRegressor::new()).with_preprocessing(StandardScaler::new()),
        );
        space
            .group("regressor")
            .unwrap()
            .set("alpha", Distribution::loguniform(0.01, 0.1))
            .unwrap()
            .set("fit_intercept", vec![true, false])
            .unwrap();
        space
    }

    fn knn_space() -> ParameterSpace {
        let mut space = ParameterSpace::new(
            LearnerPipeline::new(KNeighborsRegressor::new()).with_preprocessing(StandardScaler::new()),
        );
        space
            .group("regressor")
            .unwrap()
            .set("n_neighbors", Distribution::randint(3, 10))
            .unwrap()
            .set("weights", vec!["uniform", "distance"])
            .unwrap();
        space
    }

    #[test]
    fn parameters_pin_each_candidate() {
        let (ridge, knn) = (ridge_space(), knn_space());
        let mps = MultiRegressorParameterSpace::new(vec![ridge.clone(), knn.clone()]).unwrap();

        let parameters = mps.parameters();
        assert_eq!(parameters.len(), 2);

        let expected_first = vec![
            (
                "candidate".to_string(),
                ValueSpec::Values(vec![ParameterValue::Pipeline(ridge.estimator().clone())]),
            ),
            (
                "candidate__regressor__alpha".to_string(),
                ValueSpec::Distribution(Distribution::loguniform(0.01, 0.1)),
            ),
            (
                "candidate__regressor__fit_intercept".to_string(),
                ValueSpec::Values(vec![true.into(), false.into()]),
            ),
        ];
        assert_eq!(parameters[0], expected_first);

        let expected_second = vec![
            (
                "candidate".to_string(),
                ValueSpec::Values(vec![ParameterValue::Pipeline(knn.estimator().clone())]),
            ),
            (
                "candidate__regressor__n_neighbors".to_string(),
                ValueSpec::Distribution(Distribution::randint(3, 10)),
            ),
            (
                "candidate__regressor__weights".to_string(),
                ValueSpec::Values(vec!["uniform".into(), "distance".into()]),
            ),
        ];
        assert_eq!(parameters[1], expected_second);
    }

    #[test]
    fn estimator_is_bound_to_first_candidate() {
        let ridge = ridge_space();
        let mps = MultiRegressorParameterSpace::new(vec![ridge.clone(), knn_space()]).unwrap();
        let estimator = mps.estimator();
        assert_eq!(estimator.pipeline_type(), PipelineType::Pipeline);
        assert_eq!(estimator.final_pipeline_type(), PipelineType::Regressor);
        assert_eq!(
            estimator.to_expression(),
            Expression::call("PipelineDF").kwarg(
                "steps",
                Expression::List(vec![Expression::Tuple(vec![
                    Expression::Str("candidate".into()),
                    ridge.estimator().to_expression(),
                ])]),
            )
        );
    }

    #[test]
    fn expression_nests_candidate_spaces() {
        let (ridge, knn) = (ridge_space(), knn_space());
        let mps = MultiRegressorParameterSpace::new(vec![ridge.clone(), knn.clone()]).unwrap();
        let ridge_expr = ridge.estimator().to_expression();
        let knn_expr = knn.estimator().to_expression();

        let expected = Expression::call("MultiRegressorParameterSpace")
            .arg(
                Expression::call("PipelineDF").kwarg(
                    "steps",
                    Expression::List(vec![Expression::Tuple(vec![
                        Expression::Str("candidate".into()),
                        ridge_expr.clone(),
                    ])]),
                ),
            )
            .arg(Expression::List(vec![
                Expression::call("ParameterSpace")
                    .kwarg("candidate", ridge_expr)
                    .kwarg(
                        "candidate.regressor.alpha",
                        Expression::call("loguniform")
                            .arg(Expression::Float(0.01))
                            .arg(Expression::Float(0.1)),
                    )
                    .kwarg(
                        "candidate.regressor.fit_intercept",
                        Expression::List(vec![Expression::Bool(true), Expression::Bool(false)]),
                    ),
                Expression::call("ParameterSpace")
                    .kwarg("candidate", knn_expr)
                    .kwarg(
                        "candidate.regressor.n_neighbors",
                        Expression::call("randint")
                            .arg(Expression::Int(3))
                            .arg(Expression::Int(10)),
                    )
                    .kwarg(
                        "candidate.regressor.weights",
                        Expression::List(vec![
                            Expression::Str("uniform".into()),
                            Expression::Str("distance".into()),
                        ]),
                    ),
            ]));
        assert_eq!(mps.to_expression(), expected);
    }

    #[test]
    fn capability_tag_must_narrow_the_space() {
        let err = MultiClassifierParameterSpace::with_estimator_type(
            vec![ridge_space(), knn_space()],
            Some(PipelineType::Regressor),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "arg estimator_type must be a subclass of ClassifierPipelineDF but is: \
             RegressorPipelineDF"
        );
    }

    #[test]
    fn candidates_must_match_capability() {
        let err = MultiClassifierParameterSpace::new(vec![ridge_space(), knn_space()]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "all candidate estimators must be instances of ClassifierPipelineDF, but candidate \
             estimators include: RegressorPipelineDF"
        );

        let classifier = ParameterSpace::new(LearnerPipeline::new(KernelRidgeClassifier::new()));
        let err = MultiRegressorParameterSpace::new(vec![ridge_space(), classifier]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "all candidate estimators must be instances of RegressorPipelineDF, but candidate \
             estimators include: ClassifierPipelineDF"
        );
    }

    #[test]
    fn at_least_one_candidate() {
        assert!(MultiRegressorParameterSpace::new(Vec::new()).is_err());
    }
}
