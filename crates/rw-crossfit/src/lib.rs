//! # rw-crossfit
//!
//! The fit-and-score layer underneath model ranking:
//!
//! - [`cv`]: deterministic train/test splitters ([`KFoldCV`], [`BootstrapCV`])
//! - [`scoring`]: named and custom scorers
//! - [`crossfit`]: the per-split evaluation unit and [`LearnerCrossfit`], the
//!   fitted result of one pipeline across all splits

pub mod crossfit;
pub mod cv;
pub mod scoring;

pub use crossfit::*;
pub use cv::*;
pub use scoring::*;
