//! Constants used throughout the kiln application

/// Blueprint descriptor file names in order of preference
pub const BLUEPRINT_FILENAMES: &[&str] = &["blueprint.json", "blueprint.yaml", "blueprint.yml"];

/// Directory next to the descriptor that holds template sources
pub const TEMPLATES_DIR: &str = "templates";

/// Default path of the merged dependency manifest inside the output root
pub const DEFAULT_MANIFEST_PATH: &str = "dependencies.json";

/// Environment variable listing directories searched for named blueprints
pub const BLUEPRINT_PATH_ENV: &str = "KILN_BLUEPRINT_PATH";

/// Prefix of environment variables that supply variable defaults
pub const VAR_ENV_PREFIX: &str = "KILN_VAR_";

/// How many times an interactive answer is re-asked after failing validation
pub const MAX_PROMPT_ATTEMPTS: usize = 3;

/// Validation rule names reported in configuration errors
pub mod rules {
    pub const REQUIRED: &str = "required";
    pub const TYPE: &str = "type";
    pub const CHOICES: &str = "choices";
    pub const PATTERN: &str = "pattern";
    pub const UNKNOWN: &str = "unknown variable";
}

/// Exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const CONFIG_VALIDATION: i32 = 2;
    pub const BLUEPRINT: i32 = 3;
    pub const HOOK: i32 = 4;
    pub const FILESYSTEM: i32 = 5;
}

/// Verbosity levels
pub mod verbosity {
    pub const OFF: u8 = 0;
    pub const INFO: u8 = 1;
    pub const DEBUG: u8 = 2;
    pub const TRACE: u8 = 3;
}
