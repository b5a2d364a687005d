//! Typed parsing and validation of variable values against their declaration.

use crate::{
    blueprint::{VarType, Variable},
    constants::rules,
    error::{Error, Result},
    value::Value,
};

fn invalid(variable: &Variable, rule: &str, message: String) -> Error {
    Error::ConfigValidation { variable: variable.name.clone(), rule: rule.to_string(), message }
}

/// Parses textual booleans the way prompts and `--var` supply them.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
}

/// Converts text (from `--var`, the environment or a prompt) to the variable's type.
pub fn parse_input(variable: &Variable, raw: &str) -> Result<Value> {
    match variable.r#type {
        VarType::String => Ok(Value::Str(raw.to_string())),
        VarType::Enum => Ok(Value::Str(raw.trim().to_string())),
        VarType::Int => raw.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            invalid(variable, rules::TYPE, format!("'{raw}' is not an integer"))
        }),
        VarType::Bool => parse_bool(raw).map(Value::Bool).ok_or_else(|| {
            invalid(variable, rules::TYPE, format!("'{raw}' is not a boolean"))
        }),
        VarType::List => Ok(Value::List(split_list(raw))),
    }
}

/// Converts a JSON/YAML value (declared default or answers file) to the variable's type.
/// Returns `None` for null.
pub fn from_json(variable: &Variable, value: &serde_json::Value) -> Result<Option<Value>> {
    use serde_json::Value as Json;

    let converted = match (variable.r#type, value) {
        (_, Json::Null) => return Ok(None),
        (VarType::Int, Json::Number(n)) => n.as_i64().map(Value::Int).ok_or_else(|| {
            invalid(variable, rules::TYPE, format!("{n} is not an integer"))
        })?,
        (VarType::Bool, Json::Bool(b)) => Value::Bool(*b),
        (VarType::List, Json::Array(items)) => Value::List(
            items
                .iter()
                .map(|item| match item {
                    Json::String(s) => Ok(s.clone()),
                    Json::Number(_) | Json::Bool(_) => Ok(item.to_string()),
                    _ => Err(invalid(
                        variable,
                        rules::TYPE,
                        format!("list items must be scalars, found {item}"),
                    )),
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        (_, Json::String(s)) => parse_input(variable, s)?,
        (VarType::String | VarType::Enum, Json::Number(_) | Json::Bool(_)) => {
            Value::Str(value.to_string())
        }
        (_, other) => {
            return Err(invalid(
                variable,
                rules::TYPE,
                format!("{other} does not fit type {:?}", variable.r#type),
            ))
        }
    };
    Ok(Some(converted))
}

fn canonical_choice<'a>(variable: &'a Variable, candidate: &str) -> Option<&'a str> {
    variable
        .choices
        .iter()
        .find(|choice| choice.eq_ignore_ascii_case(candidate.trim()))
        .map(String::as_str)
}

fn check_pattern(variable: &Variable, text: &str) -> Result<()> {
    if let Some(pattern) = &variable.validation {
        if !pattern.is_match(text) {
            return Err(invalid(
                variable,
                rules::PATTERN,
                format!("'{text}' does not match /{}/", pattern.as_str()),
            ));
        }
    }
    Ok(())
}

fn choices_error(variable: &Variable, text: &str) -> Error {
    invalid(
        variable,
        rules::CHOICES,
        format!("'{text}' is not one of [{}]", variable.choices.join(", ")),
    )
}

/// Checks a typed value against type, choice set and pattern. Enum and list
/// items are case-normalized to the declared spelling of the matching choice.
pub fn validate(variable: &Variable, value: Value) -> Result<Value> {
    match (variable.r#type, value) {
        (VarType::Enum, Value::Str(text)) => {
            let choice =
                canonical_choice(variable, &text).ok_or_else(|| choices_error(variable, &text))?;
            check_pattern(variable, choice)?;
            Ok(Value::Str(choice.to_string()))
        }
        (VarType::List, Value::List(items)) => {
            let mut normalized: Vec<String> = Vec::with_capacity(items.len());
            for item in items {
                let item = if variable.choices.is_empty() {
                    item
                } else {
                    canonical_choice(variable, &item)
                        .ok_or_else(|| choices_error(variable, &item))?
                        .to_string()
                };
                check_pattern(variable, &item)?;
                if !normalized.contains(&item) {
                    normalized.push(item);
                }
            }
            Ok(Value::List(normalized))
        }
        (VarType::String, Value::Str(text)) => {
            if !variable.choices.is_empty() && !variable.choices.contains(&text) {
                return Err(choices_error(variable, &text));
            }
            check_pattern(variable, &text)?;
            Ok(Value::Str(text))
        }
        (VarType::Int, Value::Int(n)) => {
            let text = n.to_string();
            if !variable.choices.is_empty() && !variable.choices.contains(&text) {
                return Err(choices_error(variable, &text));
            }
            check_pattern(variable, &text)?;
            Ok(Value::Int(n))
        }
        (VarType::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
        (declared, other) => Err(invalid(
            variable,
            rules::TYPE,
            format!("expected {declared:?} but got {} '{other}'", other.type_name()),
        )),
    }
}

/// The declared default converted and validated, if one is declared.
pub fn declared_default(variable: &Variable) -> Result<Option<Value>> {
    match from_json(variable, &variable.default)? {
        Some(value) => validate(variable, value).map(Some),
        None => Ok(None),
    }
}

/// Value given to optional variables nobody supplied.
pub fn zero_value(variable: &Variable) -> Value {
    match variable.r#type {
        VarType::String | VarType::Enum => Value::Str(String::new()),
        VarType::Int => Value::Int(0),
        VarType::Bool => Value::Bool(false),
        VarType::List => Value::List(Vec::new()),
    }
}
