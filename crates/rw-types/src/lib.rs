//! # rw-types
//!
//! Core types shared by the rankwise crates: errors, parameter values and
//! schemas, distributions, structural expressions, the tabular [`Sample`] and
//! the [`Learner`]/[`Transformer`]/[`Pipeline`] traits.

pub mod distribution;
pub mod errors;
pub mod expression;
pub mod params;
pub mod pipeline;
pub mod sample;

pub use distribution::*;
pub use errors::*;
pub use expression::*;
pub use params::*;
pub use pipeline::*;
pub use sample::*;
