//! Fitting and scoring one pipeline configuration across CV splits.

use rw_types::{FitError, ParamMap, Pipeline, RwError, RwResult, Sample};
use tracing::debug;

use crate::cv::CvSplit;
use crate::scoring::Scoring;

/// Clone `template` and apply `parameters` to the copy.
pub fn configure(template: &dyn Pipeline, parameters: &ParamMap) -> RwResult<Box<dyn Pipeline>> {
    let mut pipeline = template.clone_pipeline();
    pipeline.set_params(parameters)?;
    Ok(pipeline)
}

/// The evaluation unit: fit a fresh copy of `pipeline` on the split's training
/// rows and score it on the test rows.
///
/// Every failure is reported as a [`FitError`] tagged with the split's fold so
/// callers can absorb it. Non-finite scores are failures too.
pub fn fit_score_split(
    pipeline: &dyn Pipeline,
    split: &CvSplit,
    sample: &Sample,
    scoring: &Scoring,
) -> Result<(Box<dyn Pipeline>, f64), FitError> {
    let at_split = |e: RwError| FitError::at_split(split.fold, e.to_string());

    let train = sample.subset(&split.train).map_err(at_split)?;
    let test = sample.subset(&split.test).map_err(at_split)?;

    let mut model = pipeline.clone_pipeline();
    model.fit(&train).map_err(at_split)?;
    let predictions = model.predict(test.features()).map_err(at_split)?;
    let score = scoring
        .score(model.final_pipeline_type(), test.target(), &predictions)
        .map_err(at_split)?;

    if !score.is_finite() {
        return Err(FitError::at_split(
            split.fold,
            format!("score is not finite: {score}"),
        ));
    }
    debug!(fold = split.fold, score, "Scored split");
    Ok((model, score))
}

/// [`fit_score_split`] without keeping the fitted model.
pub fn score_split(
    pipeline: &dyn Pipeline,
    split: &CvSplit,
    sample: &Sample,
    scoring: &Scoring,
) -> Result<f64, FitError> {
    fit_score_split(pipeline, split, sample, scoring).map(|(_, score)| score)
}

/// Population mean and standard deviation; `(NaN, NaN)` for no scores.
pub fn mean_and_std(scores: &[f64]) -> (f64, f64) {
    if scores.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// One configured pipeline fitted and scored on every split.
#[derive(Debug, Clone)]
pub struct LearnerCrossfit {
    pipeline: Box<dyn Pipeline>,
    parameters: ParamMap,
    splits: Vec<CvSplit>,
    models: Vec<Box<dyn Pipeline>>,
    scores: Vec<f64>,
}

impl LearnerCrossfit {
    /// An unfitted crossfit of `pipeline`, which is expected to carry
    /// `parameters` already.
    pub fn new(pipeline: Box<dyn Pipeline>, parameters: ParamMap, splits: Vec<CvSplit>) -> Self {
        Self {
            pipeline,
            parameters,
            splits,
            models: Vec::new(),
            scores: Vec::new(),
        }
    }

    /// Fit and score every split in order, stopping at the first failure.
    pub fn fit_score(&mut self, sample: &Sample, scoring: &Scoring) -> RwResult<&[f64]> {
        self.models.clear();
        self.scores.clear();
        for split in &self.splits {
            let (model, score) = fit_score_split(self.pipeline.as_ref(), split, sample, scoring)?;
            self.models.push(model);
            self.scores.push(score);
        }
        Ok(&self.scores)
    }

    pub fn pipeline(&self) -> &dyn Pipeline {
        self.pipeline.as_ref()
    }

    pub fn parameters(&self) -> &ParamMap {
        &self.parameters
    }

    pub fn splits(&self) -> &[CvSplit] {
        &self.splits
    }

    pub fn n_splits(&self) -> usize {
        self.splits.len()
    }

    /// Fitted models in split order.
    pub fn models(&self) -> &[Box<dyn Pipeline>] {
        &self.models
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn is_fitted(&self) -> bool {
        !self.splits.is_empty() && self.models.len() == self.splits.len()
    }

    pub fn mean_score(&self) -> f64 {
        mean_and_std(&self.scores).0
    }

    pub fn std_score(&self) -> f64 {
        mean_and_std(&self.scores).1
    }
}
