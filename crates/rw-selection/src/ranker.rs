//! Cross-validated ranking of pipeline configurations.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rw_crossfit::{
    configure, mean_and_std, score_split, CustomScorer, CvSplitter, LearnerCrossfit, Scoring,
};
use rw_types::{
    validation_error, FitError, ParamMap, Pipeline, PipelineRef, RankingError, RwError, RwResult,
    Sample,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RankerConfig;
use crate::pool::WorkerPool;
use crate::source::ParameterSource;

/// Unique ranker run identifier.
pub type RankerId = Uuid;

/// Lifecycle of a ranker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankerState {
    Unfit,
    Fitting,
    Fitted,
    Failed,
}

/// Progress and outcome of the latest `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankerStatus {
    pub id: RankerId,
    pub state: RankerState,
    pub combinations: usize,
    pub evaluations_completed: usize,
    pub evaluations_failed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl RankerStatus {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: RankerState::Unfit,
            combinations: 0,
            evaluations_completed: 0,
            evaluations_failed: 0,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_fitting(&mut self) {
        *self = Self {
            id: self.id,
            ..Self::new()
        };
        self.state = RankerState::Fitting;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_fitted(&mut self, completed: usize, failed: usize) {
        self.state = RankerState::Fitted;
        self.evaluations_completed = completed;
        self.evaluations_failed = failed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = RankerState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    /// Wall-clock duration in seconds, if the run has finished.
    pub fn duration_secs(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

impl Default for RankerStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// One ranked configuration: the configured pipeline, the assignment that
/// produced it, its per-split scores and its ranking score.
#[derive(Debug, Clone)]
pub struct LearnerEvaluation {
    pub pipeline: PipelineRef,
    pub parameters: ParamMap,
    pub scores: Vec<f64>,
    pub ranking_score: f64,
}

impl LearnerEvaluation {
    pub fn mean_score(&self) -> f64 {
        mean_and_std(&self.scores).0
    }

    pub fn std_score(&self) -> f64 {
        mean_and_std(&self.scores).1
    }

    pub fn estimator_name(&self) -> String {
        self.pipeline.final_estimator_name()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let parameters: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        serde_json::json!({
            "estimator": self.estimator_name(),
            "parameters": parameters,
            "scores": self.scores,
            "mean_score": self.mean_score(),
            "std_score": self.std_score(),
            "ranking_score": self.ranking_score,
        })
    }
}

/// A combination whose configuration or fit-and-score failed. It takes no
/// part in the ranking.
#[derive(Debug, Clone)]
pub struct FailedEvaluation {
    /// Position of the combination in generation order.
    pub index: usize,
    pub pipeline: PipelineRef,
    pub parameters: ParamMap,
    pub error: FitError,
}

#[derive(Debug)]
struct RankerResults {
    ranking: Vec<LearnerEvaluation>,
    failures: Vec<FailedEvaluation>,
    best_crossfit: LearnerCrossfit,
    best_model: PipelineRef,
}

/// A pipeline template with one concrete assignment, in generation order.
struct Combination {
    template: PipelineRef,
    parameters: ParamMap,
}

/// Cross-validates every combination of its sources and ranks them by
/// `mean - std_penalty * std` of the split scores.
///
/// Ranking is a stable descending sort, so ties keep generation order:
/// source order, then grid or candidate order, then draw order. Output is
/// independent of `n_jobs`.
#[derive(Debug)]
pub struct LearnerRanker {
    sources: Vec<Box<dyn ParameterSource>>,
    cv: Box<dyn CvSplitter>,
    config: RankerConfig,
    scoring: Scoring,
    status: RankerStatus,
    results: Option<RankerResults>,
}

impl LearnerRanker {
    /// Fails on an invalid config, e.g. an unknown scorer name.
    pub fn new<S: ParameterSource + 'static>(
        sources: Vec<S>,
        cv: impl CvSplitter + 'static,
        config: RankerConfig,
    ) -> RwResult<Self> {
        config.validate()?;
        let scoring = Scoring::from_name(config.scoring.as_deref())?;
        Ok(Self {
            sources: sources
                .into_iter()
                .map(|s| Box::new(s) as Box<dyn ParameterSource>)
                .collect(),
            cv: Box::new(cv),
            config,
            scoring,
            status: RankerStatus::new(),
            results: None,
        })
    }

    /// Append another source, possibly of a different kind.
    pub fn with_source(mut self, source: impl ParameterSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Score with a custom callable instead of the configured scorer.
    pub fn with_scorer(mut self, scorer: CustomScorer) -> Self {
        self.scoring = Scoring::Custom(scorer);
        self
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    pub fn status(&self) -> &RankerStatus {
        &self.status
    }

    pub fn state(&self) -> RankerState {
        self.status.state
    }

    /// Rank every combination of every source on `sample`.
    ///
    /// Individual fit failures are absorbed into [`failures`](Self::failures);
    /// the run itself fails if there is nothing to rank.
    pub fn fit(&mut self, sample: &Sample) -> RwResult<&mut Self> {
        self.results = None;
        self.status.mark_fitting();
        match self.run(sample) {
            Ok(results) => {
                self.status
                    .mark_fitted(results.ranking.len(), results.failures.len());
                self.results = Some(results);
                Ok(self)
            }
            Err(e) => {
                self.status.mark_failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Evaluations sorted best first.
    pub fn ranking(&self) -> RwResult<&[LearnerEvaluation]> {
        Ok(&self.results()?.ranking)
    }

    /// The crossfit behind `ranking()[0]`, with its fitted per-split models.
    pub fn best_model_crossfit(&self) -> RwResult<&LearnerCrossfit> {
        Ok(&self.results()?.best_crossfit)
    }

    /// The best configuration refit on the whole sample.
    pub fn best_model(&self) -> RwResult<&PipelineRef> {
        Ok(&self.results()?.best_model)
    }

    /// Combinations that failed, in generation order.
    pub fn failures(&self) -> RwResult<&[FailedEvaluation]> {
        Ok(&self.results()?.failures)
    }

    /// A plain-text table of the ranking in ranking order, followed by the
    /// number of failed evaluations if there were any.
    pub fn summary_report(&self) -> RwResult<String> {
        let results = self.results()?;
        let scoring = results
            .ranking
            .first()
            .map(|e| self.scoring.name(e.pipeline.final_pipeline_type()))
            .unwrap_or_default();

        let mut report = String::new();
        let _ = writeln!(report, "Ranking by {scoring}, penalized by {} std", self.config.std_penalty);
        let _ = writeln!(
            report,
            "{:>4}  {:>9}  {:>9}  {:>9}  {:<28}  parameters",
            "rank", "score", "mean", "std", "estimator"
        );
        for (rank, evaluation) in results.ranking.iter().enumerate() {
            let parameters = evaluation
                .parameters
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                report,
                "{:>4}  {:>9.4}  {:>9.4}  {:>9.4}  {:<28}  {}",
                rank + 1,
                evaluation.ranking_score,
                evaluation.mean_score(),
                evaluation.std_score(),
                evaluation.estimator_name(),
                parameters
            );
        }
        if !results.failures.is_empty() {
            let _ = writeln!(
                report,
                "{} of {} evaluations failed",
                results.failures.len(),
                results.failures.len() + results.ranking.len()
            );
        }
        Ok(report)
    }

    fn results(&self) -> RwResult<&RankerResults> {
        self.results
            .as_ref()
            .ok_or_else(|| RwError::NotFitted("LearnerRanker has not been fitted".to_string()))
    }

    fn expand_sources(&self) -> RwResult<Vec<Combination>> {
        let mut combinations = Vec::new();
        for (position, source) in self.sources.iter().enumerate() {
            let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
            rng.set_stream(position as u64);
            for spec in source.search_specs() {
                let assignments = spec.expand(self.config.n_iter, &mut rng)?;
                debug!(
                    source = position,
                    estimator = %spec.estimator.final_estimator_name(),
                    combinations = assignments.len(),
                    "Expanded search spec"
                );
                combinations.extend(assignments.into_iter().map(|parameters| Combination {
                    template: spec.estimator.clone(),
                    parameters,
                }));
            }
        }
        Ok(combinations)
    }

    fn run(&self, sample: &Sample) -> RwResult<RankerResults> {
        if self.sources.is_empty() {
            return Err(RankingError::NoSources.into());
        }
        let combinations = self.expand_sources()?;
        if combinations.is_empty() {
            return Err(RankingError::NoCombinations.into());
        }

        let splits = self.cv.split(sample)?;
        let n_splits = splits.len();
        if n_splits == 0 {
            return Err(validation_error!("cross-validator produced no splits"));
        }

        // configuration failures are per combination, like fit failures
        let configured: Vec<Result<Box<dyn Pipeline>, FitError>> = combinations
            .iter()
            .map(|c| {
                configure(c.template.as_ref(), &c.parameters)
                    .map_err(|e| FitError::new(e.to_string()))
            })
            .collect();

        let units = combinations.len() * n_splits;
        let pool = WorkerPool::new(self.config.n_jobs, units)?;
        info!(
            sources = self.sources.len(),
            combinations = combinations.len(),
            splits = n_splits,
            workers = pool.num_workers(),
            "Ranking started"
        );

        let scoring = &self.scoring;
        let unit_results = pool.run(units, |unit| {
            let (combination, split) = (unit / n_splits, unit % n_splits);
            configured[combination]
                .as_ref()
                .ok()
                .map(|pipeline| score_split(pipeline.as_ref(), &splits[split], sample, scoring))
        })?;

        let mut unit_results = unit_results.into_iter();
        let mut ranked: Vec<LearnerEvaluation> = Vec::new();
        let mut failures = Vec::new();

        for (index, (combination, pipeline)) in combinations.into_iter().zip(configured).enumerate() {
            let split_results: Vec<_> = unit_results.by_ref().take(n_splits).collect();
            let outcome = pipeline.and_then(|pipeline| {
                let scores = split_results
                    .into_iter()
                    .flatten()
                    .collect::<Result<Vec<f64>, FitError>>()?;
                let (mean, std) = mean_and_std(&scores);
                let ranking_score = mean - self.config.std_penalty * std;
                if !ranking_score.is_finite() {
                    return Err(FitError::new(format!(
                        "ranking score is not finite: {ranking_score}"
                    )));
                }
                Ok((pipeline, scores, ranking_score))
            });

            match outcome {
                Ok((pipeline, scores, ranking_score)) => {
                    debug!(index, ranking_score, "Evaluated combination");
                    let evaluation = LearnerEvaluation {
                        pipeline: Arc::from(pipeline),
                        parameters: combination.parameters,
                        scores,
                        ranking_score,
                    };
                    ranked.push(evaluation);
                }
                Err(error) => {
                    warn!(index, error = %error, "Evaluation failed");
                    failures.push(FailedEvaluation {
                        index,
                        pipeline: combination.template,
                        parameters: combination.parameters,
                        error,
                    });
                }
            }
        }

        if ranked.is_empty() {
            let first_error = failures
                .first()
                .map(|f| f.error.to_string())
                .unwrap_or_default();
            return Err(RankingError::AllFailed {
                attempted: failures.len(),
                first_error,
            }
            .into());
        }

        // stable: ties keep generation order
        ranked.sort_by(|a, b| b.ranking_score.total_cmp(&a.ranking_score));

        // per-split models are only kept for the winner, refit on the same splits
        let best = &ranked[0];
        let mut best_crossfit =
            LearnerCrossfit::new(best.pipeline.clone_pipeline(), best.parameters.clone(), splits);
        best_crossfit.fit_score(sample, &self.scoring)?;
        let mut best_model = best.pipeline.clone_pipeline();
        best_model.fit(sample)?;

        info!(
            evaluated = ranked.len(),
            failed = failures.len(),
            best_score = best.ranking_score,
            best_estimator = %best.estimator_name(),
            "Ranking finished"
        );

        Ok(RankerResults {
            ranking: ranked,
            failures,
            best_crossfit,
            best_model: Arc::from(best_model),
        })
    }
}
