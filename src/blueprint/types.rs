//! Declarations making up a blueprint descriptor

use regex::Regex;
use serde::Deserialize;

use crate::condition::Condition;
use crate::constants::DEFAULT_MANIFEST_PATH;

/// Declared type of a variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    /// Free text
    #[default]
    String,
    /// Signed integer
    Int,
    /// Yes/no
    Bool,
    /// One value out of `choices`
    Enum,
    /// Any number of values, out of `choices` when given
    List,
}

/// Interactive disclosure level of a variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Basic,
    Advanced,
}

/// A compiled validation regex.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Pattern(Regex);

impl Pattern {
    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Pattern {
    type Error = regex::Error;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Regex::new(&source).map(Pattern)
    }
}

/// A typed variable the user supplies a value for
#[derive(Debug, Clone, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type", default)]
    pub r#type: VarType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: serde_json::Value,
    #[serde(default)]
    pub choices: Vec<String>,
    /// Regex every textual value must match
    #[serde(default)]
    pub validation: Option<Pattern>,
    /// Question shown when prompting; the name is used when absent
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub level: Level,
    /// Guard deciding whether the interactive step is shown
    #[serde(default)]
    pub ask_if: Option<Condition>,
}

impl Variable {
    pub fn prompt_text(&self) -> &str {
        self.prompt.as_deref().unwrap_or(&self.name)
    }
}

/// A derived context entry: either a boolean flag or a rendered string.
#[derive(Debug, Clone, Deserialize)]
pub struct Computed {
    pub name: String,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub template: Option<String>,
}

/// One template file and where it lands in the output tree
#[derive(Debug, Clone, Deserialize)]
pub struct FileMapping {
    /// Path relative to the blueprint's templates directory
    pub source: String,
    /// Output path relative to the destination root; rendered as a template
    pub destination: String,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub executable: bool,
    /// Copy bytes verbatim instead of rendering
    #[serde(default)]
    pub raw: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dependency {
    pub module: String,
    pub version: String,
    #[serde(default)]
    pub condition: Option<Condition>,
}

/// What a failing hook does to the rest of the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookPolicy {
    /// Abort the remaining hooks and fail the run
    #[default]
    Critical,
    /// Log the failure and continue
    BestEffort,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hook {
    pub name: String,
    pub command: String,
    /// Relative to the destination root when set
    #[serde(default)]
    pub workdir: Option<String>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub policy: HookPolicy,
}

/// How conflicting versions of the same module are merged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    #[default]
    LastWins,
    FirstWins,
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    #[default]
    Json,
    Yaml,
    /// Rendered header followed by a go.mod style `require ( ... )` block
    Require,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestConfig {
    #[serde(default = "get_default_manifest_path")]
    pub path: String,
    #[serde(default)]
    pub format: ManifestFormat,
    /// Template placed above the require block
    #[serde(default)]
    pub header: Option<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self { path: get_default_manifest_path(), format: ManifestFormat::default(), header: None }
    }
}

fn get_default_manifest_path() -> String {
    DEFAULT_MANIFEST_PATH.to_string()
}
