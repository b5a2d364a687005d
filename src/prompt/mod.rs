//! Answer sources used by the configuration resolver
//!
//! The module is structured in layers:
//! - `interface`: Pure abstract interfaces independent of any UI library
//! - `dialoguer`: Concrete implementation using the dialoguer library
//! - `scripted`: Predefined answers keyed by variable name, for automation and tests

pub mod dialoguer;
pub mod interface;
pub mod scripted;

pub use dialoguer::DialoguerPrompter;
pub use interface::*;
pub use scripted::ScriptedAnswers;
