//! Blueprint loading, selector resolution and load-time checks

use indexmap::IndexSet;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::blueprint::types::{
    Computed, Dependency, FileMapping, Hook, ManifestConfig, MergePolicy, VarType, Variable,
};
use crate::condition::Condition;
use crate::constants::{BLUEPRINT_FILENAMES, TEMPLATES_DIR};
use crate::error::{Error, Result};
use crate::validation;

/// Immutable descriptor of one generatable project archetype
#[derive(Debug, Deserialize)]
pub struct Blueprint {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub computed: Vec<Computed>,
    #[serde(default)]
    pub files: Vec<FileMapping>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub hooks: Vec<Hook>,
    #[serde(default)]
    pub merge_policy: MergePolicy,
    #[serde(default)]
    pub manifest: Option<ManifestConfig>,
    /// Directory holding the descriptor
    #[serde(skip)]
    root: PathBuf,
}

impl Blueprint {
    /// Parses a descriptor; `is_yaml` selects the format.
    pub fn parse(content: &str, is_yaml: bool) -> Result<Self> {
        let blueprint: Blueprint = if is_yaml {
            serde_yaml::from_str(content)?
        } else {
            serde_json::from_str(content)?
        };
        blueprint.validate()?;
        Ok(blueprint)
    }

    /// Loads a blueprint from a directory containing a descriptor, or from the descriptor file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let descriptor = if path.is_dir() {
            BLUEPRINT_FILENAMES
                .iter()
                .map(|name| path.join(name))
                .find(|candidate| candidate.is_file())
                .ok_or_else(|| Error::BlueprintNotFound {
                    selector: path.display().to_string(),
                    tried: BLUEPRINT_FILENAMES.join(", "),
                })?
        } else {
            path.to_path_buf()
        };

        debug!("Loading blueprint from {}", descriptor.display());
        let content =
            std::fs::read_to_string(&descriptor).map_err(|e| Error::filesystem(&descriptor, e))?;
        let is_yaml = descriptor
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");

        let mut blueprint = Self::parse(&content, is_yaml)?;
        blueprint.root = descriptor.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(blueprint)
    }

    /// Sets the directory template sources are resolved against.
    pub fn with_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|variable| variable.name == name)
    }

    /// The manifest settings, falling back to defaults.
    pub fn manifest_config(&self) -> ManifestConfig {
        self.manifest.clone().unwrap_or_default()
    }

    /// Every condition in the blueprint labelled by its owner, in declaration order.
    pub fn conditions(&self) -> Vec<(String, &Condition)> {
        let files = self
            .files
            .iter()
            .filter_map(|f| f.condition.as_ref().map(|c| (format!("file '{}'", f.source), c)));
        let dependencies = self.dependencies.iter().filter_map(|d| {
            d.condition.as_ref().map(|c| (format!("dependency '{}'", d.module), c))
        });
        let hooks = self
            .hooks
            .iter()
            .filter_map(|h| h.condition.as_ref().map(|c| (format!("hook '{}'", h.name), c)));
        files.chain(dependencies).chain(hooks).collect()
    }

    fn invalid(&self, reason: String) -> Error {
        Error::BlueprintInvalid { blueprint: self.name.clone(), reason }
    }

    /// Structural checks run right after parsing.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("name must not be empty".into()));
        }

        let mut names = IndexSet::new();
        for variable in &self.variables {
            if variable.name.trim().is_empty() {
                return Err(self.invalid("a variable has an empty name".into()));
            }
            if !names.insert(variable.name.as_str()) {
                return Err(self.invalid(format!("variable '{}' is declared twice", variable.name)));
            }
            if variable.r#type == VarType::Enum && variable.choices.is_empty() {
                return Err(self.invalid(format!(
                    "enum variable '{}' declares no choices",
                    variable.name
                )));
            }
            if variable.r#type == VarType::Int {
                if let Some(choice) = variable.choices.iter().find(|c| c.parse::<i64>().is_err()) {
                    return Err(self.invalid(format!(
                        "int variable '{}' has non-integer choice '{choice}'",
                        variable.name
                    )));
                }
            }
            if let Some(guard) = &variable.ask_if {
                let position = names.len() - 1;
                let undeclared = guard.references().into_iter().find(|reference| {
                    names.get_index_of(&reference.as_str()).map_or(true, |index| index >= position)
                });
                if let Some(name) = undeclared {
                    return Err(self.invalid(format!(
                        "ask_if of variable '{}' refers to '{name}', which is not declared before it",
                        variable.name
                    )));
                }
            }
            validation::declared_default(variable).map_err(|e| {
                self.invalid(format!("default of variable '{}' is invalid: {e}", variable.name))
            })?;
        }

        for computed in &self.computed {
            if !names.insert(computed.name.as_str()) {
                return Err(self.invalid(format!(
                    "computed entry '{}' clashes with another name",
                    computed.name
                )));
            }
            if computed.condition.is_some() == computed.template.is_some() {
                return Err(self.invalid(format!(
                    "computed entry '{}' needs exactly one of 'condition' or 'template'",
                    computed.name
                )));
            }
        }

        for file in &self.files {
            if file.source.trim().is_empty() || file.destination.trim().is_empty() {
                return Err(self.invalid("file mappings need a source and a destination".into()));
            }
        }

        for dependency in &self.dependencies {
            if dependency.module.trim().is_empty() {
                return Err(self.invalid("a dependency has an empty module".into()));
            }
        }

        let mut hook_names = IndexSet::new();
        for hook in &self.hooks {
            if !hook_names.insert(hook.name.as_str()) {
                return Err(self.invalid(format!("hook '{}' is declared twice", hook.name)));
            }
            if hook.command.trim().is_empty() {
                return Err(self.invalid(format!("hook '{}' has an empty command", hook.name)));
            }
        }

        Ok(())
    }
}

/// Resolves a blueprint selector to a path: an existing path is used as is,
/// otherwise the name is looked up in each search directory.
pub fn resolve_selector(selector: &str, search_dirs: &[PathBuf]) -> Result<PathBuf> {
    let direct = PathBuf::from(selector);
    if direct.exists() {
        return Ok(direct);
    }

    let mut tried = vec![direct.display().to_string()];
    for dir in search_dirs {
        let candidate = dir.join(selector);
        if candidate.is_dir() {
            debug!("Resolved blueprint '{selector}' to {}", candidate.display());
            return Ok(candidate);
        }
        tried.push(candidate.display().to_string());
    }

    Err(Error::BlueprintNotFound { selector: selector.to_string(), tried: tried.join(", ") })
}
