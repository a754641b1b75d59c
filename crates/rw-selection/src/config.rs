//! Ranker configuration.

use rw_crossfit::Scorer;
use rw_types::{config_error, RwResult};
use serde::{Deserialize, Serialize};

/// Settings for a [`LearnerRanker`](crate::LearnerRanker) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    /// Worker threads; 0 uses every logical CPU.
    pub n_jobs: usize,

    /// sklearn-style scorer name. `None` scores classifiers by accuracy and
    /// regressors by r2.
    pub scoring: Option<String>,

    /// Random draws per parameter space that contains a distribution.
    pub n_iter: usize,

    /// Seed for those draws.
    pub random_state: u64,

    /// `k` in `ranking_score = mean - k * std`.
    pub std_penalty: f64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            n_jobs: 1,
            scoring: None,
            n_iter: 10,
            random_state: 42,
            std_penalty: 1.0,
        }
    }
}

impl RankerConfig {
    pub fn from_json(json: &str) -> RwResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn with_scoring(mut self, scoring: impl Into<String>) -> Self {
        self.scoring = Some(scoring.into());
        self
    }

    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn with_std_penalty(mut self, std_penalty: f64) -> Self {
        self.std_penalty = std_penalty;
        self
    }

    pub fn validate(&self) -> RwResult<()> {
        if !self.std_penalty.is_finite() {
            return Err(config_error!(
                "std_penalty must be finite but got: {}",
                self.std_penalty
            ));
        }
        if let Some(name) = &self.scoring {
            name.parse::<Scorer>()?;
        }
        Ok(())
    }
}
