//! Cross-validation splitters.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rw_types::{validation_error, RwResult, Sample};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One train/test partition of a sample's row indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvSplit {
    pub fold: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Produces an ordered sequence of train/test splits.
///
/// Implementations must be deterministic: the same splitter applied to the
/// same sample yields the same splits.
pub trait CvSplitter: fmt::Debug + Send + Sync {
    fn n_splits(&self) -> usize;

    fn split(&self, sample: &Sample) -> RwResult<Vec<CvSplit>>;
}

/// K consecutive folds, optionally over a seeded shuffle of the rows.
///
/// The first `n % k` folds receive one extra row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KFoldCV {
    pub n_splits: usize,
    pub shuffle: bool,
    pub random_state: u64,
}

impl KFoldCV {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: 0,
        }
    }

    /// K folds over rows shuffled with `random_state`.
    pub fn shuffled(n_splits: usize, random_state: u64) -> Self {
        Self {
            n_splits,
            shuffle: true,
            random_state,
        }
    }
}

impl Default for KFoldCV {
    fn default() -> Self {
        Self::shuffled(5, 42)
    }
}

impl CvSplitter for KFoldCV {
    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn split(&self, sample: &Sample) -> RwResult<Vec<CvSplit>> {
        let n_samples = sample.len();
        if self.n_splits < 2 {
            return Err(validation_error!(
                "n_splits must be at least 2 but got: {}",
                self.n_splits
            ));
        }
        if n_samples < self.n_splits {
            return Err(validation_error!(
                "cannot split {} rows into {} folds",
                n_samples,
                self.n_splits
            ));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let end = start + base + usize::from(fold < remainder);
            splits.push(CvSplit {
                fold,
                train: indices[..start]
                    .iter()
                    .chain(&indices[end..])
                    .copied()
                    .collect(),
                test: indices[start..end].to_vec(),
            });
            start = end;
        }
        Ok(splits)
    }
}

/// Bootstrap resampling: each split trains on `n` rows drawn with replacement
/// and tests on the rows that were never drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapCV {
    pub n_splits: usize,
    pub random_state: u64,
}

impl BootstrapCV {
    pub fn new(n_splits: usize, random_state: u64) -> Self {
        Self {
            n_splits,
            random_state,
        }
    }
}

impl CvSplitter for BootstrapCV {
    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn split(&self, sample: &Sample) -> RwResult<Vec<CvSplit>> {
        let n_samples = sample.len();
        if self.n_splits == 0 {
            return Err(validation_error!("n_splits must be at least 1"));
        }
        if n_samples < 2 {
            return Err(validation_error!(
                "bootstrapping needs at least 2 rows but got: {}",
                n_samples
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut splits = Vec::with_capacity(self.n_splits);
        for fold in 0..self.n_splits {
            let mut drawn = vec![false; n_samples];
            let train: Vec<usize> = (0..n_samples)
                .map(|_| {
                    let row = rng.gen_range(0..n_samples);
                    drawn[row] = true;
                    row
                })
                .collect();
            let test: Vec<usize> = (0..n_samples).filter(|row| !drawn[*row]).collect();
            if test.is_empty() {
                return Err(validation_error!(
                    "bootstrap split {} has no out-of-bag rows",
                    fold
                ));
            }
            splits.push(CvSplit { fold, train, test });
        }
        Ok(splits)
    }
}
