//! Condition expressions gating files, dependencies, hooks and template blocks.
//!
//! A condition is parsed once, when the blueprint is loaded, and evaluated
//! against the template context as many times as needed. Evaluation is pure:
//! the same expression and context always give the same answer.

pub mod eval;
pub mod lexer;
pub mod parser;

use serde::Deserialize;
use std::fmt::{self, Display};

use crate::error::{Error, Result};
use crate::value::Value;

pub use eval::Lookup;
pub use parser::{CompareOp, Expr};

/// A parsed boolean expression together with its source text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// Parses an expression. A blank expression always holds.
    pub fn parse(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Ok(Self { source: String::new(), expr: Expr::Literal(Value::Bool(true)) });
        }
        let syntax_error =
            |reason: String| Error::ConditionSyntax { expression: source.to_string(), reason };
        let tokens = lexer::tokenize(source).map_err(syntax_error)?;
        let expr = parser::parse(&tokens).map_err(syntax_error)?;
        Ok(Self { source: source.to_string(), expr })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluates the condition and returns its truthiness.
    pub fn evaluate(&self, scope: &dyn Lookup) -> Result<bool> {
        self.value(scope).map(|value| value.is_truthy())
    }

    /// Evaluates the condition to the underlying value.
    pub fn value(&self, scope: &dyn Lookup) -> Result<Value> {
        eval::evaluate(&self.expr, scope).map_err(|reason| Error::ConditionEvaluation {
            expression: self.source.clone(),
            reason,
        })
    }

    /// Names referenced by the expression, in source order.
    pub fn references(&self) -> Vec<String> {
        let mut refs = Vec::new();
        self.expr.collect_references(&mut refs);
        refs
    }

    /// Fails if any referenced name is absent from the scope, regardless of
    /// whether short-circuiting would reach it.
    pub fn check_references(&self, scope: &dyn Lookup) -> Result<()> {
        match self.references().into_iter().find(|name| scope.lookup(name).is_none()) {
            Some(name) => Err(Error::ConditionEvaluation {
                expression: self.source.clone(),
                reason: format!("'{name}' is not defined"),
            }),
            None => Ok(()),
        }
    }
}

impl TryFrom<String> for Condition {
    type Error = Error;

    fn try_from(source: String) -> Result<Self> {
        Condition::parse(&source)
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Evaluates an optional condition; an absent condition always holds.
pub fn is_satisfied(condition: Option<&Condition>, scope: &dyn Lookup) -> Result<bool> {
    match condition {
        Some(condition) => condition.evaluate(scope),
        None => Ok(true),
    }
}

/// Same as [`is_satisfied`], naming `owner` (like `file 'auth.go.tmpl'`) in
/// evaluation errors.
pub fn is_satisfied_for(
    owner: &str,
    condition: Option<&Condition>,
    scope: &dyn Lookup,
) -> Result<bool> {
    is_satisfied(condition, scope).map_err(|err| blame(owner, err))
}

/// Attaches the owning item to a condition evaluation error.
pub fn blame(owner: &str, err: Error) -> Error {
    match err {
        Error::ConditionEvaluation { expression, reason } => Error::ConditionEvaluation {
            expression,
            reason: format!("{reason} (in {owner})"),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn scope() -> IndexMap<String, Value> {
        let mut scope = IndexMap::new();
        scope.insert("orm".to_string(), Value::from("gorm"));
        scope.insert("driver".to_string(), Value::from("postgres"));
        scope
    }

    #[test]
    fn blank_condition_always_holds() {
        let condition = Condition::parse("  ").unwrap();
        assert!(condition.evaluate(&scope()).unwrap());
        assert!(is_satisfied(None, &scope()).unwrap());
    }

    #[test]
    fn syntax_errors_name_the_expression() {
        let err = Condition::parse("orm ==").unwrap_err();
        match err {
            Error::ConditionSyntax { expression, .. } => assert_eq!(expression, "orm =="),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn evaluation_is_repeatable() {
        let condition = Condition::parse(r#"orm == "gorm" and driver == "postgres""#).unwrap();
        let scope = scope();
        let first = condition.evaluate(&scope).unwrap();
        for _ in 0..10 {
            assert_eq!(condition.evaluate(&scope).unwrap(), first);
        }
        assert!(first);
    }

    #[test]
    fn static_check_sees_past_short_circuit() {
        let condition = Condition::parse(r#"orm == "ent" and cache == "redis""#).unwrap();
        assert!(!condition.evaluate(&scope()).unwrap());
        let err = condition.check_references(&scope()).unwrap_err();
        assert!(matches!(err, Error::ConditionEvaluation { ref reason, .. } if reason.contains("cache")));
    }

    #[test]
    fn deserializes_from_string() {
        let condition: Condition = serde_json::from_str(r#""orm == 'gorm'""#).unwrap();
        assert_eq!(condition.source(), "orm == 'gorm'");
        assert!(serde_json::from_str::<Condition>(r#""orm =""#).is_err());
    }

    #[test]
    fn evaluation_errors_name_their_owner() {
        let condition = Condition::parse("cache == 'redis'").unwrap();
        let err = is_satisfied_for("hook 'warm'", Some(&condition), &scope()).unwrap_err();
        assert!(err.to_string().contains("hook 'warm'"));
        assert!(is_satisfied_for("file 'a'", None, &scope()).unwrap());
    }
}
