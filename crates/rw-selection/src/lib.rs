//! # rw-selection
//!
//! Model selection for rankwise:
//!
//! - [`ParameterSpace`]: tunable values and distributions bound to one
//!   pipeline template, validated against its parameter schema
//! - [`LearnerGrid`]: a lazy cartesian product with exact index and slice
//!   semantics
//! - [`MultiClassifierParameterSpace`] / [`MultiRegressorParameterSpace`]:
//!   choose among several candidate pipelines
//! - [`LearnerRanker`]: cross-validates every combination on a worker pool and
//!   ranks them by `mean - std_penalty * std`

pub mod config;
pub mod grid;
pub mod multi;
pub mod pool;
pub mod ranker;
pub mod source;
pub mod space;

pub use config::RankerConfig;
pub use grid::{mixed_radix_decode, slice_indices, wrap_index, GridBuilder, GridIter, LearnerGrid};
pub use multi::{
    CandidateCapability, ClassifierCandidates, MultiClassifierParameterSpace,
    MultiParameterSpace, MultiRegressorParameterSpace, RegressorCandidates,
};
pub use pool::WorkerPool;
pub use ranker::{
    FailedEvaluation, LearnerEvaluation, LearnerRanker, RankerId, RankerState, RankerStatus,
};
pub use source::{ParameterSource, SearchSpec};
pub use space::{ParameterArg, ParameterGroup, ParameterSpace, ValueSpec};
