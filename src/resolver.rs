//! Configuration resolution: explicit values, prompts, environment and
//! declared defaults merged into one validated parameter set.
//!
//! Variables are visited in declaration order, which is also the order of the
//! interactive steps. A step is shown only when interactivity is on, its level
//! is enabled and its `ask_if` guard holds against the answers so far.

use indexmap::IndexMap;
use log::{debug, info};

use crate::{
    blueprint::{Blueprint, Level, VarType, Variable},
    condition::{self, Lookup},
    constants::{rules, MAX_PROMPT_ATTEMPTS, VAR_ENV_PREFIX},
    error::{Error, Result},
    prompt::{
        AnswerSource, ConfirmationConfig, MultipleChoiceConfig, SingleChoiceConfig,
        TextPromptConfig,
    },
    validation,
    value::Value,
};

/// Validated variable values, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedParameters {
    values: IndexMap<String, Value>,
}

impl ResolvedParameters {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Lookup for ResolvedParameters {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl FromIterator<(String, Value)> for ResolvedParameters {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

/// Name of the environment variable that supplies a default for `variable`.
pub fn env_var_name(variable: &str) -> String {
    let suffix: String = variable
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("{VAR_ENV_PREFIX}{suffix}")
}

/// Picks the `KILN_VAR_*` entries out of an environment listing.
pub fn collect_env_defaults<I>(vars: I) -> IndexMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter().filter(|(key, _)| key.starts_with(VAR_ENV_PREFIX)).collect()
}

pub struct ConfigurationResolver<'a> {
    answers: &'a dyn AnswerSource,
    interactive: bool,
    advanced: bool,
    env_defaults: IndexMap<String, String>,
}

impl<'a> ConfigurationResolver<'a> {
    pub fn new(answers: &'a dyn AnswerSource) -> Self {
        Self { answers, interactive: false, advanced: false, env_defaults: IndexMap::new() }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Also asks `advanced` level variables when interactive.
    pub fn advanced(mut self, advanced: bool) -> Self {
        self.advanced = advanced;
        self
    }

    /// Environment entries keyed like `KILN_VAR_PROJECTNAME`.
    pub fn env_defaults(mut self, env_defaults: IndexMap<String, String>) -> Self {
        self.env_defaults = env_defaults;
        self
    }

    /// Resolves every variable of `blueprint`. `explicit` holds caller-supplied
    /// values; a null entry counts as not supplied.
    pub fn resolve(
        &self,
        blueprint: &Blueprint,
        explicit: &IndexMap<String, serde_json::Value>,
    ) -> Result<ResolvedParameters> {
        if let Some(unknown) = explicit.keys().find(|key| blueprint.variable(key).is_none()) {
            return Err(Error::ConfigValidation {
                variable: unknown.clone(),
                rule: rules::UNKNOWN.to_string(),
                message: format!("blueprint '{}' declares no such variable", blueprint.name),
            });
        }

        info!("Resolving {} variable(s) of '{}'", blueprint.variables.len(), blueprint.name);
        let mut resolved: IndexMap<String, Value> = IndexMap::new();

        for variable in &blueprint.variables {
            let value = self.resolve_one(variable, explicit.get(&variable.name), &resolved)?;
            debug!("{} = {value:?}", variable.name);
            resolved.insert(variable.name.clone(), value);
        }

        Ok(ResolvedParameters { values: resolved })
    }

    fn resolve_one(
        &self,
        variable: &Variable,
        explicit: Option<&serde_json::Value>,
        resolved: &IndexMap<String, Value>,
    ) -> Result<Value> {
        if let Some(raw) = explicit {
            if let Some(value) = validation::from_json(variable, raw)? {
                return accept(variable, value);
            }
        }

        let fallback = self.fallback(variable)?;

        if self.should_ask(variable, resolved)? {
            return self.ask(variable, fallback.as_ref());
        }

        match fallback {
            Some(value) => check_required(variable, value),
            None if variable.required => Err(Error::ConfigValidation {
                variable: variable.name.clone(),
                rule: rules::REQUIRED.to_string(),
                message: "no value was supplied".to_string(),
            }),
            None => Ok(validation::zero_value(variable)),
        }
    }

    /// Environment default first, then the declared default.
    fn fallback(&self, variable: &Variable) -> Result<Option<Value>> {
        if let Some(raw) = self.env_defaults.get(&env_var_name(&variable.name)) {
            let value = validation::parse_input(variable, raw)?;
            return validation::validate(variable, value).map(Some);
        }
        validation::declared_default(variable)
    }

    fn should_ask(&self, variable: &Variable, resolved: &IndexMap<String, Value>) -> Result<bool> {
        if !self.interactive {
            return Ok(false);
        }
        if variable.level == Level::Advanced && !self.advanced {
            return Ok(false);
        }
        condition::is_satisfied(variable.ask_if.as_ref(), resolved)
    }

    fn ask(&self, variable: &Variable, fallback: Option<&Value>) -> Result<Value> {
        let mut attempt = 1;
        loop {
            let outcome = self
                .prompt(variable, fallback)
                .and_then(|value| accept(variable, value));
            match outcome {
                Ok(value) => return Ok(value),
                Err(err @ Error::ConfigValidation { .. }) if attempt < MAX_PROMPT_ATTEMPTS => {
                    println!("{err}");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn prompt(&self, variable: &Variable, fallback: Option<&Value>) -> Result<Value> {
        let key = variable.name.clone();
        let prompt = variable.prompt_text().to_string();

        match variable.r#type {
            VarType::Bool => {
                let default = matches!(fallback, Some(Value::Bool(true)));
                let answer =
                    self.answers.prompt_confirmation(&ConfirmationConfig { key, prompt, default })?;
                Ok(Value::Bool(answer))
            }
            VarType::Enum | VarType::String | VarType::Int if !variable.choices.is_empty() => {
                let current = fallback.map(Value::to_string);
                let default_index = current
                    .and_then(|current| variable.choices.iter().position(|c| *c == current));
                let index = self.answers.prompt_single_choice(&SingleChoiceConfig {
                    key,
                    prompt,
                    choices: variable.choices.clone(),
                    default_index,
                })?;
                let choice = variable.choices.get(index).cloned().ok_or_else(|| {
                    Error::Other(anyhow::anyhow!("Choice index {index} is out of range"))
                })?;
                validation::parse_input(variable, &choice)
            }
            VarType::List if !variable.choices.is_empty() => {
                let selected = fallback.and_then(Value::as_list).unwrap_or_default();
                let defaults =
                    variable.choices.iter().map(|choice| selected.contains(choice)).collect();
                let indices = self.answers.prompt_multiple_choice(&MultipleChoiceConfig {
                    key,
                    prompt,
                    choices: variable.choices.clone(),
                    defaults,
                })?;
                Ok(Value::List(
                    indices
                        .into_iter()
                        .filter_map(|index| variable.choices.get(index).cloned())
                        .collect(),
                ))
            }
            _ => {
                let default = fallback.map(Value::to_string);
                let answer =
                    self.answers.prompt_text(&TextPromptConfig { key, prompt, default })?;
                validation::parse_input(variable, &answer)
            }
        }
    }
}

/// Required check first, then type, choice and pattern rules.
fn accept(variable: &Variable, value: Value) -> Result<Value> {
    let value = check_required(variable, value)?;
    validation::validate(variable, value)
}

fn check_required(variable: &Variable, value: Value) -> Result<Value> {
    if variable.required && value.is_empty() {
        return Err(Error::ConfigValidation {
            variable: variable.name.clone(),
            rule: rules::REQUIRED.to_string(),
            message: "value must not be empty".to_string(),
        });
    }
    Ok(value)
}
