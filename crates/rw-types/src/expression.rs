//! Structural expressions.
//!
//! An [`Expression`] is a comparable, printable snapshot of how an object was
//! built: which type, which positional and keyword arguments. Pipelines,
//! distributions and parameter spaces render themselves as expressions so two
//! independently built values can be checked for structural equality. They are
//! never parsed back or persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A bare identifier.
    Id(String),
    List(Vec<Expression>),
    Tuple(Vec<Expression>),
    Call {
        callee: String,
        args: Vec<Expression>,
        kwargs: Vec<(String, Expression)>,
    },
}

impl Expression {
    /// Start a call expression `callee(...)`.
    pub fn call(callee: impl Into<String>) -> Self {
        Self::Call {
            callee: callee.into(),
            args: Vec::new(),
            kwargs: Vec::new(),
        }
    }

    /// Append a positional argument. No-op on anything but a call.
    pub fn arg(mut self, value: Expression) -> Self {
        if let Self::Call { args, .. } = &mut self {
            args.push(value);
        }
        self
    }

    /// Append a keyword argument. No-op on anything but a call.
    pub fn kwarg(mut self, name: impl Into<String>, value: Expression) -> Self {
        if let Self::Call { kwargs, .. } = &mut self {
            kwargs.push((name.into(), value));
        }
        self
    }

    pub fn callee(&self) -> Option<&str> {
        match self {
            Self::Call { callee, .. } => Some(callee),
            _ => None,
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Id(id) => write!(f, "{id}"),
            Self::List(items) => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            Self::Tuple(items) => {
                write!(f, "(")?;
                write_joined(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::Call {
                callee,
                args,
                kwargs,
            } => {
                write!(f, "{callee}(")?;
                write_joined(f, args)?;
                for (i, (name, value)) in kwargs.iter().enumerate() {
                    if i > 0 || !args.is_empty() {
                        write!(f, ", ")?;
                    }
                    if is_identifier(name) {
                        write!(f, "{name}={value}")?;
                    } else {
                        write!(f, "**{{{name:?}: {value}}}")?;
                    }
                }
                write!(f, ")")
            }
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_renders_args_then_kwargs() {
        let expr = Expression::call("loguniform")
            .arg(Expression::Float(0.01))
            .arg(Expression::Float(0.1));
        assert_eq!(expr.to_string(), "loguniform(0.01, 0.1)");

        let expr = Expression::call("RidgeRegressor")
            .kwarg("alpha", Expression::Float(1.0))
            .kwarg("fit_intercept", Expression::Bool(true));
        assert_eq!(expr.to_string(), "RidgeRegressor(alpha=1.0, fit_intercept=True)");
    }

    #[test]
    fn dotted_kwargs_render_as_mapping() {
        let expr = Expression::call("ParameterSpace")
            .kwarg("candidate.regressor.alpha", Expression::List(vec![Expression::Int(1)]));
        assert_eq!(
            expr.to_string(),
            "ParameterSpace(**{\"candidate.regressor.alpha\": [1]})"
        );
    }

    #[test]
    fn single_tuple_has_trailing_comma() {
        let expr = Expression::Tuple(vec![Expression::Str("candidate".into())]);
        assert_eq!(expr.to_string(), "(\"candidate\",)");
    }

    #[test]
    fn structural_equality() {
        let a = Expression::call("randint").arg(Expression::Int(3)).arg(Expression::Int(10));
        let b = Expression::call("randint").arg(Expression::Int(3)).arg(Expression::Int(10));
        let c = Expression::call("randint").arg(Expression::Int(3)).arg(Expression::Int(11));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.callee(), Some("randint"));
    }
}
