//! The generation pipeline.
//!
//! Context → static reference check → file selection → parallel rendering →
//! dependency aggregation → parallel writes → manifest → hooks.
//!
//! Everything that can fail on blueprint content (conditions, templates,
//! destinations, merge conflicts) is settled in memory before the first
//! byte is written.

use log::{debug, info};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::blueprint::{Blueprint, FileMapping};
use crate::condition;
use crate::context::{build_context, TemplateContext};
use crate::dependencies::{aggregate, Manifest};
use crate::error::{Error, Result};
use crate::ext::PathExt;
use crate::hooks::{HookExecutor, HookOutcome, HookStatus, ProcessRunner};
use crate::materializer::{self, RenderedFile};
use crate::prompt::{ConfirmationConfig, ConfirmationPrompter};
use crate::renderer::TemplateRenderer;
use crate::resolver::ResolvedParameters;

/// Label the manifest uses in destination errors
const MANIFEST_ORIGIN: &str = "dependency manifest";

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Write into a non-empty destination
    pub force: bool,
    /// Skip hook execution entirely
    pub skip_hooks: bool,
    /// Resolve and render but write nothing
    pub dry_run: bool,
    /// Worker threads for rendering and writing; `None` uses available parallelism
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    Success,
    /// Best-effort hooks failed; the tree is complete
    PartialSuccess,
}

/// Summary of one run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub destination: PathBuf,
    /// Materialized files relative to `destination`, in blueprint order
    pub files: Vec<String>,
    pub manifest: Option<Manifest>,
    pub manifest_path: Option<String>,
    pub hooks: Vec<HookOutcome>,
    pub status: GenerationStatus,
    /// SHA-256 over the sorted (path, contents) pairs of everything written
    pub fingerprint: String,
    pub dry_run: bool,
}

impl GenerationResult {
    /// Absolute paths of the materialized files.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|file| self.destination.join(file)).collect()
    }
}

pub struct Generator<'a> {
    renderer: &'a dyn TemplateRenderer,
    runner: &'a dyn ProcessRunner,
    confirm: Option<&'a dyn ConfirmationPrompter>,
    options: GenerateOptions,
}

impl<'a> Generator<'a> {
    pub fn new(renderer: &'a dyn TemplateRenderer, runner: &'a dyn ProcessRunner) -> Self {
        Self { renderer, runner, confirm: None, options: GenerateOptions::default() }
    }

    pub fn options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Asks once through `prompter` before the first hook runs.
    pub fn confirm_hooks_with(mut self, prompter: &'a dyn ConfirmationPrompter) -> Self {
        self.confirm = Some(prompter);
        self
    }

    pub fn generate(
        &self,
        blueprint: &Blueprint,
        parameters: &ResolvedParameters,
        destination: &Path,
    ) -> Result<GenerationResult> {
        let context = build_context(blueprint, parameters, self.renderer)?;
        check_references(blueprint, &context)?;

        let destination = if self.options.dry_run {
            destination.to_path_buf()
        } else {
            materializer::get_output_dir(destination, self.options.force)?
        };

        let included = select_files(blueprint, &context)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs.unwrap_or(0))
            .build()
            .map_err(|e| Error::Other(anyhow::anyhow!("Failed to start worker pool: {e}")))?;

        info!("Rendering {} of {} file(s)", included.len(), blueprint.files.len());
        let renderer = self.renderer;
        let templates_dir = blueprint.templates_dir();
        let files = pool.install(|| {
            included
                .par_iter()
                .map(|mapping| render_file(renderer, &templates_dir, mapping, &context))
                .collect::<Result<Vec<_>>>()
        })?;
        materializer::check_duplicates(&files)?;

        let manifest = self.build_manifest(blueprint, &context, &files)?;
        let fingerprint = fingerprint(&files, manifest.as_ref().map(|(_, file)| file));
        let file_names: Vec<String> = files.iter().map(|file| file.destination.clone()).collect();

        let mut result = GenerationResult {
            destination: destination.clone(),
            files: file_names,
            manifest_path: manifest.as_ref().map(|(_, file)| file.destination.clone()),
            manifest: manifest.as_ref().map(|(manifest, _)| manifest.clone()),
            hooks: HookExecutor::skip_all(&blueprint.hooks),
            status: GenerationStatus::Success,
            fingerprint,
            dry_run: self.options.dry_run,
        };

        if self.options.dry_run {
            info!("Dry run: nothing written to {}", destination.display());
            return Ok(result);
        }

        materializer::write_all(&destination, &files, &pool)?;
        if let Some((_, file)) = &manifest {
            materializer::write_atomic(&destination, &file.destination, &file.contents, false)?;
        }
        info!("Materialized {} file(s) in {}", files.len(), destination.display());

        result.hooks = self.run_hooks(blueprint, &context, &destination)?;
        if result.hooks.iter().any(|outcome| outcome.status == HookStatus::Failed) {
            result.status = GenerationStatus::PartialSuccess;
        }
        Ok(result)
    }

    fn build_manifest(
        &self,
        blueprint: &Blueprint,
        context: &TemplateContext,
        files: &[RenderedFile],
    ) -> Result<Option<(Manifest, RenderedFile)>> {
        if blueprint.dependencies.is_empty() {
            return Ok(None);
        }
        let manifest =
            aggregate(&blueprint.dependencies, blueprint.merge_policy, context, self.renderer)?;
        let config = blueprint.manifest_config();
        let path = materializer::check_destination(MANIFEST_ORIGIN, &config.path)?;
        if let Some(clash) = files.iter().find(|file| file.destination == path) {
            return Err(Error::DuplicateDestination {
                first: clash.origin.clone(),
                second: MANIFEST_ORIGIN.to_string(),
                destination: path,
            });
        }
        let text = manifest.render(&config, context, self.renderer)?;
        debug!("Manifest {path} lists {} module(s)", manifest.dependencies.len());
        let file = RenderedFile {
            origin: MANIFEST_ORIGIN.to_string(),
            destination: path,
            contents: text.into_bytes(),
            executable: false,
        };
        Ok(Some((manifest, file)))
    }

    fn run_hooks(
        &self,
        blueprint: &Blueprint,
        context: &TemplateContext,
        destination: &Path,
    ) -> Result<Vec<HookOutcome>> {
        if self.options.skip_hooks {
            info!("Hooks disabled, skipping {}", blueprint.hooks.len());
            return Ok(HookExecutor::skip_all(&blueprint.hooks));
        }

        let selected = HookExecutor::select(&blueprint.hooks, context)?;
        if selected.is_empty() {
            return Ok(HookExecutor::skip_all(&blueprint.hooks));
        }

        if let Some(prompter) = self.confirm {
            let names: Vec<&str> = selected.iter().map(|hook| hook.name.as_str()).collect();
            let approved = prompter.prompt_confirmation(&ConfirmationConfig {
                key: "run_hooks".to_string(),
                prompt: format!("Run {} hook(s): {}?", names.len(), names.join(", ")),
                default: true,
            })?;
            if !approved {
                info!("Hooks declined");
                return Ok(HookExecutor::skip_all(&blueprint.hooks));
            }
        }

        HookExecutor::new(self.runner, self.renderer).run(
            &blueprint.hooks,
            context,
            blueprint.root(),
            destination,
        )
    }
}

/// Every condition in the blueprint must only name context entries, even in
/// branches short-circuiting would never reach.
fn check_references(blueprint: &Blueprint, context: &TemplateContext) -> Result<()> {
    for (owner, condition) in blueprint.conditions() {
        condition.check_references(context).map_err(|err| condition::blame(&owner, err))?;
    }
    Ok(())
}

fn select_files<'b>(blueprint: &'b Blueprint, context: &TemplateContext) -> Result<Vec<&'b FileMapping>> {
    let mut included = Vec::new();
    for mapping in &blueprint.files {
        let owner = format!("file '{}'", mapping.source);
        if condition::is_satisfied_for(&owner, mapping.condition.as_ref(), context)? {
            debug!("Including {owner}");
            included.push(mapping);
        } else {
            let source = mapping.condition.as_ref().map(|c| c.source()).unwrap_or_default();
            debug!("Skipping {owner}: '{source}' is false");
        }
    }
    Ok(included)
}

fn render_file(
    renderer: &dyn TemplateRenderer,
    templates_dir: &Path,
    mapping: &FileMapping,
    context: &TemplateContext,
) -> Result<RenderedFile> {
    let destination = renderer.render(
        &mapping.destination,
        context,
        &format!("destination of '{}'", mapping.source),
    )?;
    let destination = materializer::check_destination(&mapping.source, &destination)?;

    if !Path::new(&mapping.source).is_contained_relative() {
        return Err(Error::UnsafeDestination {
            template: mapping.source.clone(),
            destination: mapping.source.clone(),
        });
    }
    let source = templates_dir.join(&mapping.source);
    let bytes = std::fs::read(&source).map_err(|e| Error::filesystem(&source, e))?;

    let contents = if mapping.raw {
        bytes
    } else {
        let text = String::from_utf8(bytes).map_err(|_| Error::RenderError {
            template: mapping.source.clone(),
            line: 0,
            reason: "content is not valid UTF-8; mark the file as raw".to_string(),
        })?;
        renderer.render(&text, context, &mapping.source)?.into_bytes()
    };

    Ok(RenderedFile {
        origin: mapping.source.clone(),
        destination,
        contents,
        executable: mapping.executable,
    })
}

fn fingerprint(files: &[RenderedFile], manifest: Option<&RenderedFile>) -> String {
    let mut entries: Vec<&RenderedFile> = files.iter().chain(manifest).collect();
    entries.sort_by(|a, b| a.destination.cmp(&b.destination));

    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.destination.as_bytes());
        hasher.update([0u8]);
        hasher.update((entry.contents.len() as u64).to_le_bytes());
        hasher.update(&entry.contents);
    }
    hex::encode(hasher.finalize())
}
