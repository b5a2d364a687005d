//! kiln turns a declarative project blueprint and a set of answers into a
//! complete source tree.
//!
//! A run resolves the blueprint's variables, derives the template context,
//! renders every file whose condition holds, merges the dependency
//! declarations into one manifest, writes everything atomically and finally
//! runs the post-generation hooks in order.

/// Blueprint descriptors and their loading.
pub mod blueprint;

/// Handles argument parsing.
pub mod cli;

/// The boolean expression language shared by conditions and templates.
pub mod condition;

/// Constants used throughout the crate.
pub mod constants;

/// The template context derived from resolved parameters.
pub mod context;

/// Dependency aggregation and manifest output.
pub mod dependencies;

/// Defines custom error types.
pub mod error;

/// Extension traits for std types.
pub mod ext;

/// The end-to-end generation pipeline.
pub mod generator;

/// Post-generation hook execution.
pub mod hooks;

/// Writing rendered files to disk.
pub mod materializer;

/// Answer sources: terminal prompts and scripted answers.
pub mod prompt;

/// Template parsing and rendering functionality.
pub mod renderer;

/// Merging explicit input, prompts and defaults into validated parameters.
pub mod resolver;

/// Answer validators
pub mod validation;

/// Typed context values.
pub mod value;
