use indexmap::IndexMap;

use super::parser::{CompareOp, Expr};
use crate::value::Value;

/// Read access to named values during evaluation.
pub trait Lookup {
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl Lookup for IndexMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Evaluates an expression to a value. `and`, `or` and `not` short-circuit and
/// always produce booleans; comparisons produce booleans; operands produce
/// themselves.
pub fn evaluate(expr: &Expr, scope: &dyn Lookup) -> Result<Value, String> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ref(name) => scope
            .lookup(name)
            .cloned()
            .ok_or_else(|| format!("'{name}' is not defined")),
        Expr::List(items) => {
            let values = items
                .iter()
                .map(|item| evaluate(item, scope).map(|value| value.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(values))
        }
        Expr::Not(inner) => Ok(Value::Bool(!evaluate(inner, scope)?.is_truthy())),
        Expr::And(left, right) => {
            if !evaluate(left, scope)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(evaluate(right, scope)?.is_truthy()))
        }
        Expr::Or(left, right) => {
            if evaluate(left, scope)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(evaluate(right, scope)?.is_truthy()))
        }
        Expr::Compare { op, left, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            let result = match op {
                CompareOp::Eq => left.loosely_eq(&right),
                CompareOp::Ne => !left.loosely_eq(&right),
                CompareOp::In | CompareOp::NotIn => {
                    if !matches!(right, Value::List(_) | Value::Str(_)) {
                        return Err(format!(
                            "membership test needs a list or string, found {}",
                            right.type_name()
                        ));
                    }
                    let found = right.contains(&left);
                    if *op == CompareOp::In {
                        found
                    } else {
                        !found
                    }
                }
            };
            Ok(Value::Bool(result))
        }
    }
}
