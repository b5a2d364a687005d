use thiserror::Error;

use crate::constants::exit_codes;
use crate::hooks::HookOutcome;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}.")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON. Original error: {0}")]
    JSONParseError(#[from] serde_json::Error),

    #[error("Failed to parse YAML. Original error: {0}")]
    YAMLParseError(#[from] serde_yaml::Error),

    #[error("Prompt failed. Original error: {0}")]
    PromptError(#[from] dialoguer::Error),

    #[error("No blueprint found for '{selector}'. Tried: {tried}.")]
    BlueprintNotFound { selector: String, tried: String },

    /// The descriptor loaded but breaks a structural rule.
    #[error("Invalid blueprint '{blueprint}': {reason}.")]
    BlueprintInvalid { blueprint: String, reason: String },

    #[error("Invalid condition '{expression}': {reason}.")]
    ConditionSyntax { expression: String, reason: String },

    /// A resolved value is missing or fails its type, choice or pattern rule.
    #[error("Variable '{variable}' failed the {rule} check: {message}.")]
    ConfigValidation { variable: String, rule: String, message: String },

    #[error("Cannot evaluate condition '{expression}': {reason}.")]
    ConditionEvaluation { expression: String, reason: String },

    #[error("Failed to render '{template}' at line {line}: {reason}.")]
    RenderError { template: String, line: usize, reason: String },

    /// Only raised under the `strict` merge policy.
    #[error("Conflicting versions for dependency '{module}': '{first}' and '{second}'.")]
    DependencyConflict { module: String, first: String, second: String },

    /// A critical hook failed. Files written before it are kept, and
    /// `completed` holds the outcomes of the hooks that ran before it.
    #[error("Hook '{hook}' failed ({status}). Generated files were left in '{destination}'.{}", stderr_suffix(.stderr))]
    HookExecutionError {
        hook: String,
        status: String,
        stderr: String,
        destination: String,
        completed: Vec<HookOutcome>,
    },

    #[error("Filesystem error at '{path}': {source}.")]
    FilesystemError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot proceed: output directory '{output_dir}' already exists and is not empty. Use --force to write into it.")]
    OutputDirectoryExistsError { output_dir: String },

    #[error("Files '{first}' and '{second}' both render to destination '{destination}'.")]
    DuplicateDestination { first: String, second: String, destination: String },

    #[error("Destination '{destination}' of '{template}' is not a safe relative path.")]
    UnsafeDestination { template: String, destination: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(" Stderr: {stderr}")
    }
}

impl Error {
    /// Wraps an IO error with the path it happened on.
    pub fn filesystem<P: AsRef<std::path::Path>>(path: P, source: std::io::Error) -> Self {
        Error::FilesystemError { path: path.as_ref().display().to_string(), source }
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ConfigValidation { .. } => exit_codes::CONFIG_VALIDATION,
            Error::BlueprintNotFound { .. }
            | Error::BlueprintInvalid { .. }
            | Error::ConditionSyntax { .. }
            | Error::ConditionEvaluation { .. }
            | Error::RenderError { .. }
            | Error::DependencyConflict { .. }
            | Error::DuplicateDestination { .. }
            | Error::UnsafeDestination { .. } => exit_codes::BLUEPRINT,
            Error::HookExecutionError { .. } => exit_codes::HOOK,
            Error::FilesystemError { .. }
            | Error::IoError(_)
            | Error::OutputDirectoryExistsError { .. } => exit_codes::FILESYSTEM,
            _ => exit_codes::FAILURE,
        }
    }
}

/// Convenience type alias for Results with kiln's Error as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Default error handler that prints the error and exits the program.
///
/// # Behavior
/// Prints the error message to stderr and exits with the category's exit code
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(err.exit_code());
}
