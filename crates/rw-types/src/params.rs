//! Parameter values, parameter maps and the parameter schema registry.

use std::collections::BTreeMap;
use std::fmt;

use crate::config_error;
use crate::errors::{RwError, RwResult};
use crate::expression::Expression;
use crate::pipeline::PipelineRef;

/// Delimiter joining nested step names in parameter keys (`regressor__alpha`).
pub const PARAM_DELIMITER: &str = "__";

/// A concrete parameter value.
#[derive(Debug, Clone)]
pub enum ParameterValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A whole pipeline, used to select among candidate pipelines.
    Pipeline(PipelineRef),
}

/// Concrete parameter assignment keyed by `__`-joined parameter name.
pub type ParamMap = BTreeMap<String, ParameterValue>;

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_pipeline(&self) -> Option<&PipelineRef> {
        match self {
            Self::Pipeline(p) => Some(p),
            _ => None,
        }
    }

    /// Read as a float or fail with a configuration error naming `param`.
    pub fn expect_f64(&self, param: &str) -> RwResult<f64> {
        self.as_f64()
            .ok_or_else(|| kind_mismatch(ValueKind::Float, param, self))
    }

    pub fn expect_i64(&self, param: &str) -> RwResult<i64> {
        self.as_i64().ok_or_else(|| kind_mismatch(ValueKind::Int, param, self))
    }

    pub fn expect_bool(&self, param: &str) -> RwResult<bool> {
        self.as_bool()
            .ok_or_else(|| kind_mismatch(ValueKind::Bool, param, self))
    }

    pub fn expect_str(&self, param: &str) -> RwResult<&str> {
        self.as_str().ok_or_else(|| kind_mismatch(ValueKind::Str, param, self))
    }

    pub fn to_expression(&self) -> Expression {
        match self {
            Self::None => Expression::None,
            Self::Bool(v) => Expression::Bool(*v),
            Self::Int(v) => Expression::Int(*v),
            Self::Float(v) => Expression::Float(*v),
            Self::Str(v) => Expression::Str(v.clone()),
            Self::Pipeline(p) => p.to_expression(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::None => serde_json::Value::Null,
            Self::Bool(v) => serde_json::json!(v),
            Self::Int(v) => serde_json::json!(v),
            Self::Float(v) => serde_json::json!(v),
            Self::Str(v) => serde_json::json!(v),
            Self::Pipeline(p) => serde_json::json!(p.to_expression().to_string()),
        }
    }
}

impl PartialEq for ParameterValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Pipeline(a), Self::Pipeline(b)) => a.to_expression() == b.to_expression(),
            _ => false,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
            Self::Pipeline(p) => write!(f, "{}", p.to_expression()),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<usize> for ParameterValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<PipelineRef> for ParameterValue {
    fn from(v: PipelineRef) -> Self {
        Self::Pipeline(v)
    }
}

/// Configuration error for a value of the wrong kind.
pub fn kind_mismatch(expected: ValueKind, param: &str, value: &ParameterValue) -> RwError {
    config_error!(
        "expected values of kind {} for parameter {} but got: {}",
        expected,
        param,
        value
    )
}

/// Configuration error for a parameter name the owner does not declare.
pub fn unknown_parameter(owner: &str, name: &str) -> RwError {
    config_error!("unknown parameter name for {}: {}", owner, name)
}

/// Join parameter path segments with [`PARAM_DELIMITER`].
pub fn join_param_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(PARAM_DELIMITER)
}

/// Split `prefix__rest` into `(prefix, rest)`; `None` if there is no delimiter.
pub fn split_param_path(name: &str) -> Option<(&str, &str)> {
    name.split_once(PARAM_DELIMITER)
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The kind of value a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    /// Floats; integers are accepted too.
    Float,
    Str,
    Pipeline,
    Any,
}

impl ValueKind {
    pub fn accepts(&self, value: &ParameterValue) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (_, ParameterValue::None) => true,
            (Self::Bool, ParameterValue::Bool(_)) => true,
            (Self::Int, ParameterValue::Int(_)) => true,
            (Self::Float, ParameterValue::Int(_) | ParameterValue::Float(_)) => true,
            (Self::Str, ParameterValue::Str(_)) => true,
            (Self::Pipeline, ParameterValue::Pipeline(_)) => true,
            _ => false,
        }
    }

    /// Whether every value of `other` is accepted by `self`.
    pub fn covers(&self, other: ValueKind) -> bool {
        matches!(
            (self, other),
            (Self::Any, _) | (Self::Float, Self::Int)
        ) || *self == other
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Pipeline => "pipeline",
            Self::Any => "any",
        };
        write!(f, "{name}")
    }
}

/// Explicit registry of the parameters an estimator accepts.
///
/// Each level names its owner type (used in error messages), lists its leaf
/// parameters in declaration order and nests named sub-groups such as the
/// `regressor` step of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSchema {
    owner: String,
    params: Vec<(String, ValueKind)>,
    groups: Vec<(String, ParameterSchema)>,
}

impl ParameterSchema {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            params: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.params.push((name.into(), kind));
        self
    }

    pub fn group(mut self, name: impl Into<String>, schema: ParameterSchema) -> Self {
        self.groups.push((name.into(), schema));
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn param_kind(&self, name: &str) -> Option<ValueKind> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn sub_group(&self, name: &str) -> Option<&ParameterSchema> {
        self.groups.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Walk nested groups by name, failing at the first group the current
    /// owner does not declare.
    pub fn group_at<S: AsRef<str>>(&self, groups: &[S]) -> RwResult<&ParameterSchema> {
        groups.iter().try_fold(self, |schema, name| {
            schema
                .sub_group(name.as_ref())
                .ok_or_else(|| unknown_parameter(schema.owner(), name.as_ref()))
        })
    }

    /// Resolve a path of group names followed by a leaf parameter name.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> RwResult<ValueKind> {
        let (leaf, groups) = path
            .split_last()
            .ok_or_else(|| config_error!("parameter path must not be empty"))?;
        let schema = self.group_at(groups)?;
        schema
            .param_kind(leaf.as_ref())
            .ok_or_else(|| unknown_parameter(schema.owner(), leaf.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline_schema() -> ParameterSchema {
        ParameterSchema::new("RegressorPipelineDF")
            .group(
                "regressor",
                ParameterSchema::new("RidgeRegressor")
                    .param("alpha", ValueKind::Float)
                    .param("fit_intercept", ValueKind::Bool),
            )
            .group(
                "preprocessing",
                ParameterSchema::new("StandardScaler").param("with_mean", ValueKind::Bool),
            )
    }

    #[test]
    fn schema_lookup_by_path() {
        let schema = pipeline_schema();
        assert_eq!(schema.lookup(&["regressor", "alpha"]).unwrap(), ValueKind::Float);
        assert_eq!(schema.lookup(&["preprocessing", "with_mean"]).unwrap(), ValueKind::Bool);
        assert_eq!(
            schema.lookup(&["regressor", "beta"]).unwrap_err().to_string(),
            "unknown parameter name for RidgeRegressor: beta"
        );
        assert_eq!(
            schema.lookup(&["regressor"]).unwrap_err().to_string(),
            "unknown parameter name for RegressorPipelineDF: regressor"
        );
        assert!(schema.lookup::<&str>(&[]).is_err());
    }

    #[test]
    fn group_walk_names_the_failing_owner() {
        let schema = pipeline_schema();
        assert_eq!(schema.group_at(&["regressor"]).unwrap().owner(), "RidgeRegressor");
        assert_eq!(schema.group_at::<&str>(&[]).unwrap().owner(), "RegressorPipelineDF");
        assert_eq!(
            schema.group_at(&["regressor", "inner"]).unwrap_err().to_string(),
            "unknown parameter name for RidgeRegressor: inner"
        );
    }

    #[test]
    fn param_path_helpers() {
        assert_eq!(join_param_path(&["candidate", "regressor", "alpha"]), "candidate__regressor__alpha");
        assert_eq!(split_param_path("regressor__alpha"), Some(("regressor", "alpha")));
        assert_eq!(split_param_path("alpha"), None);
    }

    #[test]
    fn value_accessors_and_display() {
        assert_eq!(ParameterValue::Int(4).as_f64(), Some(4.0));
        assert_eq!(ParameterValue::Float(4.0).as_i64(), Some(4));
        assert_eq!(ParameterValue::Float(4.5).as_i64(), None);
        assert_eq!(ParameterValue::from("rbf").to_string(), "rbf");
        assert_eq!(ParameterValue::from(10).to_json(), serde_json::json!(10));
        assert_ne!(ParameterValue::Int(1), ParameterValue::Float(1.0));
    }

    #[test]
    fn expect_reports_kind_mismatch() {
        assert_eq!(ParameterValue::Int(2).expect_f64("alpha").unwrap(), 2.0);
        let err = ParameterValue::from("two").expect_i64("n_neighbors").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected values of kind int for parameter n_neighbors but got: two"
        );
        assert_eq!(
            unknown_parameter("RidgeRegressor", "beta").to_string(),
            "unknown parameter name for RidgeRegressor: beta"
        );
    }
}
