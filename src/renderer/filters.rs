//! Inline text transforms applied with `{{ name | filter }}`.

pub use cruet::{
    case::{
        camel::to_camel_case, kebab::to_kebab_case, pascal::to_pascal_case,
        screaming_snake::to_screaming_snake_case, snake::to_snake_case, table::to_table_case,
        train::to_train_case,
    },
    string::{pluralize::to_plural, singularize::to_singular},
    suffix::foreign_key::to_foreign_key,
};

use crate::value::Value;

/// Filters that take no arguments and map text to text.
const TEXT_FILTERS: &[(&str, fn(&str) -> String)] = &[
    ("camel_case", to_camel_case),
    ("kebab_case", to_kebab_case),
    ("pascal_case", to_pascal_case),
    ("screaming_snake_case", to_screaming_snake_case),
    ("snake_case", to_snake_case),
    ("table_case", to_table_case),
    ("train_case", to_train_case),
    ("plural", to_plural),
    ("singular", to_singular),
    ("foreign_key", to_foreign_key),
    ("upper", upper),
    ("lower", lower),
    ("trim", trim),
];

fn upper(s: &str) -> String {
    s.to_uppercase()
}

fn lower(s: &str) -> String {
    s.to_lowercase()
}

fn trim(s: &str) -> String {
    s.trim().to_string()
}

/// Number of arguments each known filter takes.
pub fn arity(name: &str) -> Option<usize> {
    if TEXT_FILTERS.iter().any(|(known, _)| *known == name) {
        return Some(0);
    }
    match name {
        "first" => Some(0),
        "join" => Some(1),
        "replace" => Some(2),
        _ => None,
    }
}

/// Applies a filter. Argument counts are checked when the template is parsed.
pub fn apply(name: &str, value: Value, args: &[String]) -> Result<Value, String> {
    if let Some((_, transform)) = TEXT_FILTERS.iter().find(|(known, _)| *known == name) {
        return Ok(Value::Str(transform(&value.to_string())));
    }
    match (name, args) {
        ("first", []) => Ok(match value {
            Value::List(items) => Value::Str(items.into_iter().next().unwrap_or_default()),
            other => other,
        }),
        ("join", [separator]) => Ok(match value {
            Value::List(items) => Value::Str(items.join(separator.as_str())),
            other => other,
        }),
        ("replace", [from, to]) => Ok(Value::Str(value.to_string().replace(from, to))),
        _ => Err(format!("unknown filter '{name}' with {} argument(s)", args.len())),
    }
}
