use indexmap::IndexMap;
use log::{info, warn};
use std::path::Path;

use crate::{
    blueprint::{resolve_selector, Blueprint},
    cli::GenerateArgs,
    error::{Error, Result},
    generator::{GenerateOptions, GenerationResult, GenerationStatus, Generator},
    hooks::{HookStatus, ShellRunner},
    prompt::DialoguerPrompter,
    renderer::Renderer,
    resolver::{collect_env_defaults, ConfigurationResolver},
};

/// Runs `kiln generate` end to end and prints a summary.
pub fn run(args: GenerateArgs) -> Result<GenerationResult> {
    let blueprint_path = resolve_selector(&args.blueprint, &args.search_dirs())?;
    let blueprint = Blueprint::load(&blueprint_path)?;
    info!("Using blueprint '{}' from {}", blueprint.name, blueprint.root().display());

    let explicit = explicit_values(&args)?;
    let prompter = DialoguerPrompter::new();
    let parameters = ConfigurationResolver::new(&prompter)
        .interactive(args.interactive)
        .advanced(args.advanced)
        .env_defaults(collect_env_defaults(std::env::vars()))
        .resolve(&blueprint, &explicit)?;

    let options = GenerateOptions {
        force: args.force,
        skip_hooks: args.no_hooks,
        dry_run: args.dry_run,
        jobs: args.jobs,
    };
    let renderer = Renderer::new();
    let runner = ShellRunner;
    let mut generator = Generator::new(&renderer, &runner).options(options);
    if args.interactive && !args.yes {
        generator = generator.confirm_hooks_with(&prompter);
    }

    let result = generator.generate(&blueprint, &parameters, &args.output_dir)?;
    print_summary(&result);
    Ok(result)
}

/// Values from `--vars-file`, overridden by `--var` pairs.
pub fn explicit_values(args: &GenerateArgs) -> Result<IndexMap<String, serde_json::Value>> {
    let mut values = match &args.vars_file {
        Some(path) => read_vars_file(path)?,
        None => IndexMap::new(),
    };
    for (key, value) in &args.vars {
        values.insert(key.clone(), serde_json::Value::String(value.clone()));
    }
    Ok(values)
}

fn read_vars_file(path: &Path) -> Result<IndexMap<String, serde_json::Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "yaml" || ext == "yml");
    let values: IndexMap<String, serde_json::Value> = if is_yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(values)
}

fn print_summary(result: &GenerationResult) {
    if result.dry_run {
        println!("Dry run, would write to {}:", result.destination.display());
        for file in result.files.iter().chain(result.manifest_path.iter()) {
            println!("  {file}");
        }
        return;
    }

    for outcome in result.hooks.iter().filter(|o| o.status == HookStatus::Failed) {
        warn!(
            "Hook '{}' failed ({}): {}",
            outcome.name,
            outcome.describe_failure(),
            outcome.failure_output().trim()
        );
    }
    match result.status {
        GenerationStatus::Success => println!(
            "Generated {} file(s) in {}.",
            result.files.len() + result.manifest_path.iter().count(),
            result.destination.display()
        ),
        GenerationStatus::PartialSuccess => println!(
            "Generated {} file(s) in {}, but some best-effort hooks failed.",
            result.files.len() + result.manifest_path.iter().count(),
            result.destination.display()
        ),
    }
}
