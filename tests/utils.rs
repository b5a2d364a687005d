#![allow(dead_code)]

use indexmap::IndexMap;
use kiln::blueprint::Blueprint;
use kiln::cli::{run, GenerateArgs};
use kiln::error::Result;
use kiln::generator::{GenerateOptions, GenerationResult, Generator};
use kiln::hooks::ShellRunner;
use kiln::prompt::ScriptedAnswers;
use kiln::renderer::Renderer;
use kiln::resolver::ConfigurationResolver;
use log::debug;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const GO_API: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/blueprints/go-api");

fn relative_files(dir: &Path) -> BTreeSet<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.path().strip_prefix(dir).unwrap().to_path_buf())
        .collect()
}

/// Relative paths of every file under `dir`, with `/` separators, sorted.
pub fn tree(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = relative_files(dir)
        .into_iter()
        .map(|path| path.to_string_lossy().replace('\\', "/"))
        .collect();
    files.sort();
    files
}

/// Prints files present on only one side and content differences between
/// `actual` and `expected`.
pub fn print_dir_diff(actual: &Path, expected: &Path) {
    let actual_files = relative_files(actual);
    let expected_files = relative_files(expected);

    println!("\n=== Directory Comparison ===");
    println!("Actual output:   {actual:?}");
    println!("Expected output: {expected:?}");

    for file in actual_files.difference(&expected_files) {
        println!("  + {file:?}");
    }
    for file in expected_files.difference(&actual_files) {
        println!("  - {file:?}");
    }
    for file in actual_files.intersection(&expected_files) {
        let left = fs::read(actual.join(file)).unwrap();
        let right = fs::read(expected.join(file)).unwrap();
        if left != right {
            println!("\n  File: {file:?}");
            println!("  --- Actual content:\n{}", String::from_utf8_lossy(&left));
            println!("  --- Expected content:\n{}", String::from_utf8_lossy(&right));
        }
    }
    println!("=== End of Comparison ===\n");
}

/// Asserts two directory trees hold the same files with the same contents.
pub fn assert_same_tree(actual: &Path, expected: &Path) {
    match dir_diff::is_different(actual, expected) {
        Ok(true) => {
            print_dir_diff(actual, expected);
            panic!("Directories differ. See above for details.");
        }
        Ok(false) => {}
        Err(e) => debug!("Error comparing directories: {e:?}"),
    }
    assert!(!dir_diff::is_different(actual, expected).unwrap());
}

/// `--var` style values for a run.
pub fn vars(pairs: &[(&str, &str)]) -> IndexMap<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), serde_json::Value::String(value.to_string())))
        .collect()
}

/// The values every go-api run needs.
pub fn go_api_vars(extra: &[(&str, &str)]) -> IndexMap<String, serde_json::Value> {
    let mut values = vars(&[("projectName", "my-api"), ("module", "github.com/acme/my-api")]);
    values.extend(vars(extra));
    values
}

/// Resolves `explicit` non-interactively and generates into `destination`.
pub fn generate(
    blueprint: &Blueprint,
    explicit: &IndexMap<String, serde_json::Value>,
    destination: &Path,
    options: GenerateOptions,
) -> Result<GenerationResult> {
    let answers = ScriptedAnswers::new();
    let parameters = ConfigurationResolver::new(&answers).resolve(blueprint, explicit)?;
    let renderer = Renderer::new();
    let runner = ShellRunner;
    Generator::new(&renderer, &runner).options(options).generate(blueprint, &parameters, destination)
}

/// Generates go-api without hooks.
pub fn generate_go_api(extra: &[(&str, &str)], destination: &Path) -> Result<GenerationResult> {
    let blueprint = Blueprint::load(GO_API)?;
    let options = GenerateOptions { skip_hooks: true, ..Default::default() };
    generate(&blueprint, &go_api_vars(extra), destination, options)
}

/// Runs `kiln generate` through the CLI entry point and compares the output
/// with `expected_dir`.
pub fn run_and_assert(blueprint: &str, expected_dir: &str, pairs: &[(&str, &str)]) {
    let tmp_dir = tempfile::tempdir().unwrap();
    let args = GenerateArgs {
        blueprint: blueprint.to_string(),
        output_dir: tmp_dir.path().to_path_buf(),
        vars: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        vars_file: None,
        interactive: false,
        advanced: false,
        force: true,
        no_hooks: true,
        yes: true,
        jobs: None,
        dry_run: false,
        blueprints_dir: Vec::new(),
        verbose: 2,
    };
    run(args).unwrap();
    assert_same_tree(tmp_dir.path(), Path::new(expected_dir));
}
