//! Dependency aggregation into one merged manifest.
//!
//! Declarations whose condition holds are grouped by module. Distinct modules
//! keep the order in which they were first seen; conflicting versions are
//! settled by the blueprint's [`MergePolicy`].

use indexmap::{map::Entry, IndexMap};
use log::{debug, info};
use serde::Serialize;

use crate::blueprint::{Dependency, ManifestConfig, ManifestFormat, MergePolicy};
use crate::condition::{self, Lookup};
use crate::error::{Error, Result};
use crate::renderer::TemplateRenderer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub module: String,
    pub version: String,
}

/// The merged, deduplicated dependency list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub dependencies: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn version_of(&self, module: &str) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|entry| entry.module == module)
            .map(|entry| entry.version.as_str())
    }

    /// Serializes the manifest in the configured format. The `require` format
    /// renders the optional header against `context` first.
    pub fn render(
        &self,
        config: &ManifestConfig,
        context: &dyn Lookup,
        renderer: &dyn TemplateRenderer,
    ) -> Result<String> {
        match config.format {
            ManifestFormat::Json => {
                let mut text = serde_json::to_string_pretty(self)?;
                text.push('\n');
                Ok(text)
            }
            ManifestFormat::Yaml => Ok(serde_yaml::to_string(self)?),
            ManifestFormat::Require => {
                let mut text = match &config.header {
                    Some(header) => renderer.render(header, context, "manifest header")?,
                    None => String::new(),
                };
                if !self.is_empty() {
                    if !text.is_empty() && !text.ends_with("\n\n") {
                        text.push_str(if text.ends_with('\n') { "\n" } else { "\n\n" });
                    }
                    text.push_str("require (\n");
                    for entry in &self.dependencies {
                        text.push_str(&format!("\t{} {}\n", entry.module, entry.version));
                    }
                    text.push_str(")\n");
                }
                Ok(text)
            }
        }
    }
}

/// Evaluates, renders and merges the declarations in blueprint order.
pub fn aggregate(
    dependencies: &[Dependency],
    policy: MergePolicy,
    context: &dyn Lookup,
    renderer: &dyn TemplateRenderer,
) -> Result<Manifest> {
    let mut merged: IndexMap<String, String> = IndexMap::new();

    for dependency in dependencies {
        let owner = format!("dependency '{}'", dependency.module);
        if !condition::is_satisfied_for(&owner, dependency.condition.as_ref(), context)? {
            debug!("Skipping {owner}: condition '{}' is false", display_condition(dependency));
            continue;
        }

        let module = renderer.render(&dependency.module, context, &owner)?;
        let version = renderer.render(&dependency.version, context, &owner)?;

        match merged.entry(module) {
            Entry::Vacant(slot) => {
                slot.insert(version);
            }
            Entry::Occupied(mut slot) if *slot.get() != version => match policy {
                MergePolicy::LastWins => {
                    info!("Dependency '{}' {} overrides {}", slot.key(), version, slot.get());
                    slot.insert(version);
                }
                MergePolicy::FirstWins => {
                    info!("Dependency '{}' keeps {} over {}", slot.key(), slot.get(), version);
                }
                MergePolicy::Strict => {
                    return Err(Error::DependencyConflict {
                        module: slot.key().clone(),
                        first: slot.get().clone(),
                        second: version,
                    });
                }
            },
            Entry::Occupied(_) => {}
        }
    }

    Ok(Manifest {
        dependencies: merged
            .into_iter()
            .map(|(module, version)| ManifestEntry { module, version })
            .collect(),
    })
}

fn display_condition(dependency: &Dependency) -> &str {
    dependency.condition.as_ref().map(|c| c.source()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Renderer;
    use crate::value::Value;

    fn context(orm: &str, driver: &str) -> IndexMap<String, Value> {
        let mut context = IndexMap::new();
        context.insert("orm".to_string(), Value::from(orm));
        context.insert("driver".to_string(), Value::from(driver));
        context.insert("goVersion".to_string(), Value::from("1.22"));
        context.insert("module".to_string(), Value::from("github.com/acme/api"));
        context
    }

    fn declarations() -> Vec<Dependency> {
        serde_yaml::from_str(
            r#"
- module: github.com/gin-gonic/gin
  version: v1.10.0
- module: gorm.io/gorm
  version: v1.25.0
  condition: orm == "gorm"
- module: gorm.io/driver/postgres
  version: v1.5.9
  condition: orm == "gorm" and driver == "postgres"
- module: gorm.io/gorm
  version: v1.25.4
  condition: orm == "gorm" and driver == "postgres"
"#,
        )
        .unwrap()
    }

    #[test]
    fn later_declaration_wins_and_keeps_first_position() {
        let manifest =
            aggregate(&declarations(), MergePolicy::LastWins, &context("gorm", "postgres"), &Renderer)
                .unwrap();
        let modules: Vec<&str> = manifest.dependencies.iter().map(|e| e.module.as_str()).collect();
        assert_eq!(modules, vec!["github.com/gin-gonic/gin", "gorm.io/gorm", "gorm.io/driver/postgres"]);
        assert_eq!(manifest.version_of("gorm.io/gorm"), Some("v1.25.4"));
    }

    #[test]
    fn false_conditions_are_dropped() {
        let manifest =
            aggregate(&declarations(), MergePolicy::LastWins, &context("gorm", "mysql"), &Renderer)
                .unwrap();
        assert_eq!(manifest.version_of("gorm.io/gorm"), Some("v1.25.0"));
        assert_eq!(manifest.version_of("gorm.io/driver/postgres"), None);
    }

    #[test]
    fn first_wins_and_strict_policies() {
        let ctx = context("gorm", "postgres");
        let manifest = aggregate(&declarations(), MergePolicy::FirstWins, &ctx, &Renderer).unwrap();
        assert_eq!(manifest.version_of("gorm.io/gorm"), Some("v1.25.0"));

        let err = aggregate(&declarations(), MergePolicy::Strict, &ctx, &Renderer).unwrap_err();
        assert!(matches!(err, Error::DependencyConflict { ref module, .. } if module == "gorm.io/gorm"));
    }

    #[test]
    fn identical_duplicates_collapse_even_when_strict() {
        let mut twice = declarations();
        twice.truncate(2);
        twice.extend(twice.clone());
        let manifest =
            aggregate(&twice, MergePolicy::Strict, &context("gorm", "mysql"), &Renderer).unwrap();
        assert_eq!(manifest.dependencies.len(), 2);
    }

    #[test]
    fn renders_require_block_with_header() {
        let ctx = context("gorm", "postgres");
        let manifest = aggregate(&declarations(), MergePolicy::LastWins, &ctx, &Renderer).unwrap();
        let config = ManifestConfig {
            path: "go.mod".into(),
            format: ManifestFormat::Require,
            header: Some("module {{ module }}\n\ngo {{ goVersion }}\n".into()),
        };
        let text = manifest.render(&config, &ctx, &Renderer).unwrap();
        assert_eq!(
            text,
            "module github.com/acme/api\n\ngo 1.22\n\nrequire (\n\tgithub.com/gin-gonic/gin v1.10.0\n\tgorm.io/gorm v1.25.4\n\tgorm.io/driver/postgres v1.5.9\n)\n"
        );
    }

    #[test]
    fn renders_json() {
        let ctx = context("none", "none");
        let manifest = aggregate(&declarations(), MergePolicy::LastWins, &ctx, &Renderer).unwrap();
        let text = manifest.render(&ManifestConfig::default(), &ctx, &Renderer).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["dependencies"][0]["module"], "github.com/gin-gonic/gin");
        assert_eq!(parsed["dependencies"].as_array().unwrap().len(), 1);
    }
}
