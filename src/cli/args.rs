use crate::constants::{exit_codes, verbosity, BLUEPRINT_PATH_ENV};
use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#;

/// Blueprint-driven project generator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a project tree from a blueprint.
    Generate(GenerateArgs),
}

/// Arguments of `kiln generate`.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Blueprint directory, descriptor file, or name looked up in the blueprint directories.
    #[arg(value_name = "BLUEPRINT")]
    pub blueprint: String,

    /// Destination directory for generated files.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Variable value as `key=value`; repeatable.
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// JSON or YAML file mapping variable names to values. `--var` wins over it.
    #[arg(long = "vars-file", value_name = "FILE")]
    pub vars_file: Option<PathBuf>,

    /// Ask for values that were not given explicitly.
    #[arg(short, long)]
    pub interactive: bool,

    /// Also ask advanced questions in interactive mode.
    #[arg(long)]
    pub advanced: bool,

    /// Write into an existing, non-empty output directory.
    #[arg(short, long)]
    pub force: bool,

    /// Do not run any hooks.
    #[arg(long = "no-hooks")]
    pub no_hooks: bool,

    /// Run hooks without asking for confirmation.
    #[arg(short, long)]
    pub yes: bool,

    /// Worker threads for rendering and writing (default: available parallelism).
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Resolve and render, but write nothing and run no hooks.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Directory searched for named blueprints; repeatable.
    #[arg(long = "blueprints-dir", value_name = "DIR")]
    pub blueprints_dir: Vec<PathBuf>,

    /// Increase logging verbosity (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GenerateArgs {
    /// `--blueprints-dir` entries followed by the `KILN_BLUEPRINT_PATH` list.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.blueprints_dir.clone();
        if let Some(paths) = std::env::var_os(BLUEPRINT_PATH_ENV) {
            dirs.extend(std::env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()));
        }
        dirs
    }
}

/// Splits `key=value`; the value may itself contain `=`.
pub fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Parse command line arguments, printing help when required inputs are missing.
pub fn parse_cli() -> Cli {
    Cli::try_parse().unwrap_or_else(|e| {
        if e.kind() == ErrorKind::MissingRequiredArgument
            || e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        {
            let mut command = Cli::command().help_template(HELP_TEMPLATE);
            if let Err(print_err) = command.print_help() {
                eprintln!("Failed to display help information: {print_err}");
            } else {
                println!();
            }
            std::process::exit(exit_codes::FAILURE);
        } else {
            e.exit();
        }
    })
}

/// Map `-v` counts to the appropriate log level.
pub fn get_log_level_from_verbose(verbose_count: u8) -> LevelFilter {
    match verbose_count {
        verbosity::OFF => LevelFilter::Error,
        verbosity::INFO => LevelFilter::Info,
        verbosity::DEBUG => LevelFilter::Debug,
        verbosity::TRACE.. => LevelFilter::Trace,
    }
}
