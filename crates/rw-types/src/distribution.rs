//! Parameter distributions for randomized search.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config_error;
use crate::errors::RwResult;
use crate::expression::Expression;
use crate::params::{ParameterValue, ValueKind};

/// Largest support accepted for a Zipfian distribution.
pub const MAX_ZIPFIAN_SUPPORT: u64 = 1_000_000;

/// A distribution that produces one sampled parameter value at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Distribution {
    /// Continuous uniform on [low, high).
    Uniform { low: f64, high: f64 },
    /// Log-uniform on [low, high) (sampled in log-space then exponentiated).
    LogUniform { low: f64, high: f64 },
    /// Integers in [low, high).
    RandInt { low: i64, high: i64 },
    /// Zipf distribution on 1..=n with exponent `a`.
    Zipfian { a: f64, n: u64 },
    /// Uniform choice among categorical values.
    Choice { values: Vec<ChoiceValue> },
}

/// A categorical choice value. Pipelines cannot be sampled from a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<ChoiceValue> for ParameterValue {
    fn from(c: ChoiceValue) -> Self {
        match c {
            ChoiceValue::Bool(v) => ParameterValue::Bool(v),
            ChoiceValue::Int(v) => ParameterValue::Int(v),
            ChoiceValue::Float(v) => ParameterValue::Float(v),
            ChoiceValue::Str(v) => ParameterValue::Str(v),
        }
    }
}

impl Distribution {
    pub fn uniform(low: f64, high: f64) -> Self {
        Self::Uniform { low, high }
    }

    pub fn loguniform(low: f64, high: f64) -> Self {
        Self::LogUniform { low, high }
    }

    pub fn randint(low: i64, high: i64) -> Self {
        Self::RandInt { low, high }
    }

    pub fn zipfian(a: f64, n: u64) -> Self {
        Self::Zipfian { a, n }
    }

    pub fn choice(values: Vec<ChoiceValue>) -> Self {
        Self::Choice { values }
    }

    /// Short lower-case name, as used in expressions (`loguniform`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uniform { .. } => "uniform",
            Self::LogUniform { .. } => "loguniform",
            Self::RandInt { .. } => "randint",
            Self::Zipfian { .. } => "zipfian",
            Self::Choice { .. } => "choice",
        }
    }

    /// Kind of the values this distribution produces.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            Self::Uniform { .. } | Self::LogUniform { .. } => ValueKind::Float,
            Self::RandInt { .. } | Self::Zipfian { .. } => ValueKind::Int,
            Self::Choice { values } => {
                let mut kinds = values.iter().map(|v| match v {
                    ChoiceValue::Bool(_) => ValueKind::Bool,
                    ChoiceValue::Int(_) => ValueKind::Int,
                    ChoiceValue::Float(_) => ValueKind::Float,
                    ChoiceValue::Str(_) => ValueKind::Str,
                });
                match kinds.next() {
                    Some(first) if kinds.all(|k| k == first) => first,
                    _ => ValueKind::Any,
                }
            }
        }
    }

    /// Check that the distribution can be sampled.
    ///
    /// Float bounds must be finite with `low < high` and a finite width.
    /// Log-uniform bounds must also be positive. Integer ranges must be
    /// non-empty. A Zipfian needs a finite positive exponent and a support of
    /// at most [`MAX_ZIPFIAN_SUPPORT`]. A choice needs at least one value.
    pub fn validate(&self) -> RwResult<()> {
        match self {
            Self::Uniform { low, high } | Self::LogUniform { low, high } => {
                if !low.is_finite() || !high.is_finite() {
                    return Err(config_error!(
                        "{} bounds must be finite, got [{}, {})",
                        self.name(),
                        low,
                        high
                    ));
                }
                if low >= high {
                    return Err(config_error!(
                        "{} requires low < high, got [{}, {})",
                        self.name(),
                        low,
                        high
                    ));
                }
                if !(high - low).is_finite() {
                    return Err(config_error!(
                        "{} range [{}, {}) is too wide",
                        self.name(),
                        low,
                        high
                    ));
                }
                if matches!(self, Self::LogUniform { .. }) && *low <= 0.0 {
                    return Err(config_error!(
                        "loguniform requires a positive lower bound, got {}",
                        low
                    ));
                }
            }
            Self::RandInt { low, high } => {
                if low >= high {
                    return Err(config_error!(
                        "randint requires low < high, got [{}, {})",
                        low,
                        high
                    ));
                }
            }
            Self::Zipfian { a, n } => {
                if !a.is_finite() || *a <= 0.0 {
                    return Err(config_error!(
                        "zipfian exponent must be finite and positive, got {}",
                        a
                    ));
                }
                if *n == 0 || *n > MAX_ZIPFIAN_SUPPORT {
                    return Err(config_error!(
                        "zipfian support must be in 1..={}, got {}",
                        MAX_ZIPFIAN_SUPPORT,
                        n
                    ));
                }
            }
            Self::Choice { values } => {
                if values.is_empty() {
                    return Err(config_error!("choice requires at least one value"));
                }
            }
        }
        Ok(())
    }

    /// Draw one value.
    ///
    /// Distributions that fail [`Distribution::validate`] collapse to the
    /// lower bound, or `None` for an empty choice.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParameterValue {
        match self {
            Self::Uniform { low, high } => {
                if !(high > low && (high - low).is_finite()) {
                    return ParameterValue::Float(*low);
                }
                ParameterValue::Float(rng.gen_range(*low..*high))
            }
            Self::LogUniform { low, high } => {
                if !(high > low && *low > 0.0 && high.is_finite()) {
                    return ParameterValue::Float(*low);
                }
                let log_val: f64 = rng.gen_range(low.ln()..high.ln());
                ParameterValue::Float(log_val.exp())
            }
            Self::RandInt { low, high } => {
                if high <= low {
                    return ParameterValue::Int(*low);
                }
                ParameterValue::Int(rng.gen_range(*low..*high))
            }
            Self::Zipfian { a, n } => {
                if *n == 0 || *n > MAX_ZIPFIAN_SUPPORT || !a.is_finite() {
                    return ParameterValue::Int(1);
                }
                // inverse CDF over the normalized weights 1/k^a
                let norm: f64 = (1..=*n).map(|k| (k as f64).powf(-a)).sum();
                let target = rng.gen::<f64>() * norm;
                let mut acc = 0.0;
                for k in 1..=*n {
                    acc += (k as f64).powf(-a);
                    if acc >= target {
                        return ParameterValue::Int(k as i64);
                    }
                }
                ParameterValue::Int(*n as i64)
            }
            Self::Choice { values } => {
                if values.is_empty() {
                    return ParameterValue::None;
                }
                let idx = rng.gen_range(0..values.len());
                values[idx].clone().into()
            }
        }
    }

    pub fn to_expression(&self) -> Expression {
        let call = Expression::call(self.name());
        match self {
            Self::Uniform { low, high } | Self::LogUniform { low, high } => {
                call.arg(Expression::Float(*low)).arg(Expression::Float(*high))
            }
            Self::RandInt { low, high } => call.arg(Expression::Int(*low)).arg(Expression::Int(*high)),
            Self::Zipfian { a, n } => call.arg(Expression::Float(*a)).arg(Expression::Int(*n as i64)),
            Self::Choice { values } => call.arg(Expression::List(
                values
                    .iter()
                    .map(|v| ParameterValue::from(v.clone()).to_expression())
                    .collect(),
            )),
        }
    }
}
