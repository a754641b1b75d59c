use thiserror::Error;

/// Main error type for rankwise
#[derive(Error, Debug)]
pub enum RwError {
    /// Invalid parameter names, value kinds or capability tags. The message is
    /// reported verbatim.
    #[error("{0}")]
    Config(String),

    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    #[error("Fit error: {0}")]
    Fit(#[from] FitError),

    #[error("Ranking error: {0}")]
    Ranking(#[from] RankingError),

    #[error("Not fitted: {0}")]
    NotFitted(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Grid index and slice errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("index {index} out of range for grid of length {len}")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("slice step cannot be zero")]
    ZeroStep,
}

/// Failure of a single fit-and-score unit
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}{message}", split_prefix(.split))]
pub struct FitError {
    pub split: Option<usize>,
    pub message: String,
}

fn split_prefix(split: &Option<usize>) -> String {
    split.map(|s| format!("split {s}: ")).unwrap_or_default()
}

impl FitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            split: None,
            message: message.into(),
        }
    }

    pub fn at_split(split: usize, message: impl Into<String>) -> Self {
        Self {
            split: Some(split),
            message: message.into(),
        }
    }
}

/// Fatal ranking errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RankingError {
    #[error("no grids or parameter spaces were supplied")]
    NoSources,

    #[error("the supplied sources expand to zero parameter combinations")]
    NoCombinations,

    #[error("all {attempted} evaluations failed; first error: {first_error}")]
    AllFailed {
        attempted: usize,
        first_error: String,
    },
}

/// Result type alias for rankwise operations
pub type RwResult<T> = Result<T, RwError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::RwError::Config(format!($($arg)*))
    };
}

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::RwError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::RwError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_is_reported_verbatim() {
        let err = config_error!("unknown parameter name for {}: {}", "RidgeRegressor", "beta");
        assert_eq!(err.to_string(), "unknown parameter name for RidgeRegressor: beta");
    }

    #[test]
    fn fit_error_mentions_split() {
        assert_eq!(FitError::at_split(3, "singular matrix").to_string(), "split 3: singular matrix");
        assert_eq!(FitError::new("boom").to_string(), "boom");
    }

    #[test]
    fn error_conversion() {
        let err: RwError = RangeError::IndexOutOfRange { index: 12, len: 12 }.into();
        match err {
            RwError::Range(RangeError::IndexOutOfRange { index: 12, len: 12 }) => (),
            other => panic!("Expected range error, got {other:?}"),
        }

        let err: RwError = RankingError::NoSources.into();
        assert!(err.to_string().contains("no grids"));
    }

    #[test]
    fn test_macros() {
        let _validation_err = validation_error!("ragged row {}", 4);
        let _internal_err = internal_error!("worker vanished");
    }
}
