//! Expansion of grids and parameter spaces into concrete assignments.

use rand::Rng;
use rw_types::{ParamMap, PipelineRef, RwResult};
use std::fmt;

use crate::grid::LearnerGrid;
use crate::multi::{CandidateCapability, MultiParameterSpace};
use crate::space::{ParameterSpace, ValueSpec};

/// A pipeline template with the value specs to search over it, keyed by
/// fully qualified parameter name in declaration order.
#[derive(Debug, Clone)]
pub struct SearchSpec {
    pub estimator: PipelineRef,
    pub parameters: Vec<(String, ValueSpec)>,
}

impl SearchSpec {
    pub fn is_discrete(&self) -> bool {
        self.parameters.iter().all(|(_, spec)| spec.is_discrete())
    }

    /// Concrete assignments in generation order.
    ///
    /// An all-list spec expands to its full grid. Otherwise `n_iter`
    /// assignments are drawn from `rng`: list parameters pick one value
    /// uniformly, distributions are sampled. A spec with an empty list yields
    /// nothing either way.
    pub fn expand<R: Rng>(&self, n_iter: usize, rng: &mut R) -> RwResult<Vec<ParamMap>> {
        if self.is_discrete() {
            let axes = self
                .parameters
                .iter()
                .filter_map(|(name, spec)| match spec {
                    ValueSpec::Values(values) => Some((name.clone(), values.clone())),
                    ValueSpec::Distribution(_) => None,
                })
                .collect();
            let grid = LearnerGrid::from_prefixed(self.estimator.clone(), axes)?;
            return Ok(grid.iter().collect());
        }

        let has_empty_list = self
            .parameters
            .iter()
            .any(|(_, spec)| matches!(spec, ValueSpec::Values(values) if values.is_empty()));
        if has_empty_list {
            return Ok(Vec::new());
        }

        Ok((0..n_iter)
            .map(|_| {
                self.parameters
                    .iter()
                    .map(|(name, spec)| {
                        let value = match spec {
                            ValueSpec::Values(values) => {
                                values[rng.gen_range(0..values.len())].clone()
                            }
                            ValueSpec::Distribution(dist) => dist.sample(rng),
                        };
                        (name.clone(), value)
                    })
                    .collect()
            })
            .collect())
    }
}

/// Anything the ranker can search: grids, parameter spaces and multi-spaces.
pub trait ParameterSource: fmt::Debug + Send + Sync {
    /// Search specs in generation order.
    fn search_specs(&self) -> Vec<SearchSpec>;
}

impl ParameterSource for LearnerGrid {
    fn search_specs(&self) -> Vec<SearchSpec> {
        vec![SearchSpec {
            estimator: self.pipeline().clone(),
            parameters: self
                .parameter_names()
                .iter()
                .cloned()
                .zip(self.parameter_values().iter().cloned().map(ValueSpec::Values))
                .collect(),
        }]
    }
}

impl ParameterSource for ParameterSpace {
    fn search_specs(&self) -> Vec<SearchSpec> {
        vec![SearchSpec {
            estimator: self.estimator().clone(),
            parameters: self.prefixed_specs(None),
        }]
    }
}

impl<C: CandidateCapability> ParameterSource for MultiParameterSpace<C> {
    fn search_specs(&self) -> Vec<SearchSpec> {
        self.parameters()
            .into_iter()
            .map(|parameters| SearchSpec {
                estimator: self.estimator().clone(),
                parameters,
            })
            .collect()
    }
}

impl<S: ParameterSource + ?Sized> ParameterSource for Box<S> {
    fn search_specs(&self) -> Vec<SearchSpec> {
        (**self).search_specs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multi::MultiRegressorParameterSpace;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rw_learners::{KNeighborsRegressor, KernelRidgeClassifier, RidgeRegressor};
    use rw_types::{Distribution, LearnerPipeline, ParameterValue};

    #[test]
    fn grid_source_expands_in_index_order() {
        let grid = LearnerGrid::builder(LearnerPipeline::new(KernelRidgeClassifier::new()))
            .param("kernel", ["linear", "rbf"])
            .param("C", [1.0, 10.0])
            .build()
            .unwrap();
        let specs = grid.search_specs();
        assert_eq!(specs.len(), 1);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let combos = specs[0].expand(10, &mut rng).unwrap();
        assert_eq!(combos, grid.iter().collect::<Vec<_>>());
        assert_eq!(combos[1]["classifier__kernel"], ParameterValue::from("rbf"));
    }

    #[test]
    fn discrete_space_expands_to_full_grid() {
        let mut space = ParameterSpace::new(LearnerPipeline::new(RidgeRegressor::new()));
        space
            .set("regressor.alpha", vec![0.1, 1.0, 10.0])
            .unwrap()
            .set("regressor.fit_intercept", vec![true, false])
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let combos = space.search_specs()[0].expand(2, &mut rng).unwrap();
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[1]["regressor__alpha"], ParameterValue::Float(1.0));
        assert_eq!(combos[3]["regressor__fit_intercept"], ParameterValue::Bool(false));
    }

    #[test]
    fn distributions_are_sampled_reproducibly() {
        let mut space = ParameterSpace::new(LearnerPipeline::new(KNeighborsRegressor::new()));
        space
            .set("regressor.n_neighbors", Distribution::randint(1, 8))
            .unwrap()
            .set("regressor.weights", vec!["uniform", "distance"])
            .unwrap();
        let specs = space.search_specs();
        let spec = &specs[0];

        let draw = |seed| spec.expand(7, &mut ChaCha8Rng::seed_from_u64(seed)).unwrap();
        let combos = draw(5);
        assert_eq!(combos.len(), 7);
        assert_eq!(combos, draw(5));
        for combo in &combos {
            let k = combo["regressor__n_neighbors"].as_i64().unwrap();
            assert!((1..8).contains(&k));
            assert!(matches!(
                combo["regressor__weights"].as_str(),
                Some("uniform" | "distance")
            ));
        }
    }

    #[test]
    fn multi_space_yields_one_spec_per_candidate() {
        let mut ridge = ParameterSpace::new(LearnerPipeline::new(RidgeRegressor::new()));
        ridge.set("regressor.alpha", vec![0.1, 1.0]).unwrap();
        let knn = ParameterSpace::new(LearnerPipeline::new(KNeighborsRegressor::new()));
        let mps = MultiRegressorParameterSpace::new(vec![ridge.clone(), knn.clone()]).unwrap();

        let specs = mps.search_specs();
        assert_eq!(specs.len(), 2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let first = specs[0].expand(3, &mut rng).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(
            first[0]["candidate"],
            ParameterValue::Pipeline(ridge.estimator().clone())
        );
        assert_eq!(first[1]["candidate__regressor__alpha"], ParameterValue::Float(1.0));

        let second = specs[1].expand(3, &mut rng).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].len(), 1);
    }

    #[test]
    fn empty_lists_expand_to_nothing() {
        let mut space = ParameterSpace::new(LearnerPipeline::new(KNeighborsRegressor::new()));
        space
            .set("regressor.n_neighbors", Distribution::randint(1, 8))
            .unwrap()
            .set("regressor.weights", Vec::<String>::new())
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(space.search_specs()[0].expand(5, &mut rng).unwrap().is_empty());
    }
}
