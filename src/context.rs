//! The read-only snapshot conditions and templates are evaluated against.

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::blueprint::Blueprint;
use crate::condition::Lookup;
use crate::error::Result;
use crate::renderer::TemplateRenderer;
use crate::resolver::ResolvedParameters;
use crate::value::Value;

/// Resolved parameters plus the blueprint's computed entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TemplateContext {
    values: IndexMap<String, Value>,
}

impl TemplateContext {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl Lookup for TemplateContext {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Builds the context from resolved parameters. Computed entries are added in
/// declaration order, so each one can use the entries before it.
pub fn build_context(
    blueprint: &Blueprint,
    parameters: &ResolvedParameters,
    renderer: &dyn TemplateRenderer,
) -> Result<TemplateContext> {
    let mut values: IndexMap<String, Value> =
        parameters.iter().map(|(name, value)| (name.clone(), value.clone())).collect();

    for computed in &blueprint.computed {
        let value = match (&computed.condition, &computed.template) {
            (Some(condition), _) => Value::Bool(condition.evaluate(&values)?),
            (None, Some(template)) => Value::Str(renderer.render(
                template,
                &values,
                &format!("computed '{}'", computed.name),
            )?),
            (None, None) => Value::Bool(false),
        };
        debug!("Computed {} = {value:?}", computed.name);
        values.insert(computed.name.clone(), value);
    }

    Ok(TemplateContext { values })
}
