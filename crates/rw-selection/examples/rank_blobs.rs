//! Rank classifier and regressor configurations on synthetic data.
//!
//! Run with `RUST_LOG=rw_selection=debug` to see per-combination progress.

use rw_crossfit::{BootstrapCV, KFoldCV};
use rw_learners::datasets::{make_blobs, make_regression};
use rw_learners::{
    KNeighborsRegressor, KernelRidgeClassifier, NearestCentroidClassifier, RidgeRegressor,
    StandardScaler,
};
use rw_selection::{
    LearnerGrid, LearnerRanker, MultiRegressorParameterSpace, ParameterSpace, RankerConfig,
};
use rw_types::{Distribution, LearnerPipeline};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rw_selection=info".into()),
        )
        .init();

    // Classification: an exhaustive grid plus a sampled space
    let blobs = make_blobs(150, 3, 7)?;
    let kernel_grid = LearnerGrid::builder(
        LearnerPipeline::new(KernelRidgeClassifier::new()).with_preprocessing(StandardScaler::new()),
    )
    .param("kernel", ["linear", "rbf"])
    .param("C", [0.1, 1.0, 10.0])
    .build()?;

    let mut centroid_space = ParameterSpace::new(LearnerPipeline::new(NearestCentroidClassifier::new()));
    centroid_space.set("classifier.metric", vec!["euclidean", "manhattan"])?;

    let mut ranker = LearnerRanker::new(
        vec![kernel_grid],
        KFoldCV::shuffled(5, 42),
        RankerConfig::default().with_n_jobs(0),
    )?
    .with_source(centroid_space);
    ranker.fit(&blobs)?;
    println!("{}", ranker.summary_report()?);

    // Regression: choose between candidate estimators
    let regression = make_regression(200, 4, 0.3, 11)?;
    let mut ridge = ParameterSpace::new(
        LearnerPipeline::new(RidgeRegressor::new()).with_preprocessing(StandardScaler::new()),
    );
    ridge
        .group("regressor")?
        .set("alpha", Distribution::loguniform(0.001, 100.0))?
        .set("fit_intercept", vec![true, false])?;
    let mut knn = ParameterSpace::new(LearnerPipeline::new(KNeighborsRegressor::new()));
    knn.group("regressor")?
        .set("n_neighbors", Distribution::randint(2, 20))?
        .set("weights", vec!["uniform", "distance"])?;
    let candidates = MultiRegressorParameterSpace::new(vec![ridge, knn])?;
    println!("{}", candidates.to_expression());

    let mut ranker = LearnerRanker::new(
        vec![candidates],
        BootstrapCV::new(10, 7),
        RankerConfig::default()
            .with_n_jobs(0)
            .with_n_iter(8)
            .with_scoring("neg_mean_squared_error"),
    )?;
    ranker.fit(&regression)?;
    println!("{}", ranker.summary_report()?);

    let best = &ranker.ranking()?[0];
    println!("{}", serde_json::to_string_pretty(&best.to_json())?);
    Ok(())
}
