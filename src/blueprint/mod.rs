//! Blueprint descriptors
//!
//! - `types`: variable, file, dependency and hook declarations
//! - `loader`: descriptor loading, selector resolution and load-time checks

pub mod loader;
pub mod types;

pub use loader::{resolve_selector, Blueprint};
pub use types::{
    Computed, Dependency, FileMapping, Hook, HookPolicy, Level, ManifestConfig, ManifestFormat,
    MergePolicy, Pattern, VarType, Variable,
};
