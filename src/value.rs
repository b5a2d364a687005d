//! Typed values stored in resolved parameters and the template context.

use serde::Serialize;
use std::fmt::{self, Display};

/// A concrete value held by the template context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl Value {
    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
        }
    }

    /// Truthiness used by bare references in conditions: non-empty strings and
    /// lists, non-zero integers and `true`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(n) => *n != 0,
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
        }
    }

    /// Whether the value is empty in the sense of a missing answer.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Str(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Int(_) | Value::Bool(_) => false,
        }
    }

    /// Equality used by `==` and `!=`. Values of the same variant compare
    /// directly; mixed variants compare their string forms.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }

    /// Membership used by `in`: element of a list, or substring of a string.
    pub fn contains(&self, needle: &Value) -> bool {
        match self {
            Value::List(items) => {
                let needle = needle.to_string();
                items.iter().any(|item| *item == needle)
            }
            Value::Str(haystack) => haystack.contains(&needle.to_string()),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => write!(f, "{}", items.join(",")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_emptiness() {
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("jwt").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(Value::List(vec!["postgres".into()]).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
    }

    #[test]
    fn mixed_variants_compare_string_forms() {
        assert!(Value::from("true").loosely_eq(&Value::from(true)));
        assert!(Value::from("8080").loosely_eq(&Value::from(8080)));
        assert!(!Value::from("false").loosely_eq(&Value::from(true)));
    }

    #[test]
    fn membership_in_lists_and_strings() {
        let drivers = Value::List(vec!["postgres".into(), "redis".into()]);
        assert!(drivers.contains(&Value::from("redis")));
        assert!(!drivers.contains(&Value::from("mysql")));
        assert!(Value::from("postgres,redis").contains(&Value::from("redis")));
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&Value::List(vec!["a".into()])).unwrap();
        assert_eq!(json, r#"["a"]"#);
        assert_eq!(serde_json::to_string(&Value::from(3)).unwrap(), "3");
    }
}
