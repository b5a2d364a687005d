//! Template rendering against the resolved context.
//!
//! The template language is small and explicit: value output with filters,
//! `if`/`elif`/`else` blocks using the condition language, comments and raw
//! blocks. Rendering fails closed: a reference to a name missing from the
//! context is an error, never an empty string.

pub mod filters;
pub mod parser;

use log::trace;

use crate::condition::{Condition, Lookup};
use crate::error::{Error, Result};
use crate::renderer::parser::{Node, Operand};
use crate::value::Value;

/// Trait for template rendering engines.
pub trait TemplateRenderer: Send + Sync {
    /// Renders `template` against `context`. `name` identifies the template in errors.
    fn render(&self, template: &str, context: &dyn Lookup, name: &str) -> Result<String>;
}

/// The built-in renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }
}

struct Render<'a> {
    name: &'a str,
    context: &'a dyn Lookup,
    out: String,
}

impl Render<'_> {
    fn error(&self, line: usize, reason: impl Into<String>) -> Error {
        Error::RenderError { template: self.name.to_string(), line, reason: reason.into() }
    }

    fn condition(&self, condition: &Condition, line: usize) -> Result<bool> {
        condition.evaluate(self.context).map_err(|err| match err {
            Error::ConditionEvaluation { expression, reason } => {
                self.error(line, format!("condition '{expression}': {reason}"))
            }
            other => other,
        })
    }

    fn nodes(&mut self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.push_str(text),
                Node::Output { operand, filters, line } => {
                    let mut value = match operand {
                        Operand::Literal(text) => Value::Str(text.clone()),
                        Operand::Ref(reference) => self
                            .context
                            .lookup(reference)
                            .cloned()
                            .ok_or_else(|| self.error(*line, format!("'{reference}' is not defined")))?,
                    };
                    for filter in filters {
                        value = filters::apply(&filter.name, value, &filter.args)
                            .map_err(|reason| self.error(*line, reason))?;
                    }
                    self.out.push_str(&value.to_string());
                }
                Node::If { branches, otherwise, line } => {
                    let mut taken = None;
                    for (condition, body) in branches {
                        if self.condition(condition, *line)? {
                            taken = Some(body);
                            break;
                        }
                    }
                    if let Some(body) = taken.or(otherwise.as_ref()) {
                        self.nodes(body)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl TemplateRenderer for Renderer {
    fn render(&self, template: &str, context: &dyn Lookup, name: &str) -> Result<String> {
        trace!("Rendering template '{name}'");
        let nodes = parser::parse(template, name)?;
        let mut render = Render { name, context, out: String::with_capacity(template.len()) };
        render.nodes(&nodes)?;
        Ok(render.out)
    }
}
