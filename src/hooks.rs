use log::{debug, info, warn};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::blueprint::{Hook, HookPolicy};
use crate::condition;
use crate::context::TemplateContext;
use crate::error::{Error, Result};
use crate::ext::PathExt;
use crate::renderer::TemplateRenderer;

/// Structure representing data passed to hook commands.
///
/// This data is serialized to JSON and passed to hooks via stdin.
#[derive(Serialize)]
struct Payload<'a> {
    /// Directory holding the blueprint descriptor
    blueprint_dir: &'a str,
    /// Root of the generated tree
    output_dir: &'a str,
    /// The template context of the run
    context: &'a TemplateContext,
}

/// What an external command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// One command to run on behalf of a hook.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub hook: &'a str,
    pub command: &'a str,
    pub workdir: &'a Path,
    pub stdin: &'a [u8],
}

/// Capability to run external commands. Errors mean the command could not be
/// started at all.
pub trait ProcessRunner {
    fn run(&self, invocation: &Invocation<'_>) -> std::io::Result<ProcessOutput>;
}

/// Runs hook commands through the platform shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl ShellRunner {
    fn command(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

impl ProcessRunner for ShellRunner {
    fn run(&self, invocation: &Invocation<'_>) -> std::io::Result<ProcessOutput> {
        let mut child = Self::command(invocation.command)
            .current_dir(invocation.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from its own thread so a hook that writes a lot before
        // reading cannot block on a full pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let data = invocation.stdin.to_vec();
            std::thread::spawn(move || {
                if let Err(e) = stdin.write_all(&data).and_then(|_| stdin.write_all(b"\n")) {
                    if e.kind() == std::io::ErrorKind::BrokenPipe {
                        debug!("Hook closed stdin before reading the payload (broken pipe)");
                    } else {
                        warn!("Failed to write payload to hook stdin: {e}");
                    }
                }
            })
        });

        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            let _ = writer.join();
        }

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookStatus {
    Succeeded,
    Failed,
    Skipped,
}

/// Result of one hook, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookOutcome {
    pub name: String,
    pub status: HookStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Why the process could not be spawned at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_error: Option<String>,
}

impl HookOutcome {
    fn skipped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: HookStatus::Skipped,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            spawn_error: None,
        }
    }

    pub fn describe_failure(&self) -> String {
        match (&self.spawn_error, self.exit_code) {
            (Some(_), _) => "could not be started".to_string(),
            (None, None) => "terminated by a signal".to_string(),
            (None, Some(code)) => format!("exit code {code}"),
        }
    }

    /// The spawn error if there was one, otherwise the captured stderr.
    pub fn failure_output(&self) -> &str {
        self.spawn_error.as_deref().unwrap_or(&self.stderr)
    }
}

/// Runs hooks strictly in declaration order.
pub struct HookExecutor<'a> {
    runner: &'a dyn ProcessRunner,
    renderer: &'a dyn TemplateRenderer,
}

impl<'a> HookExecutor<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, renderer: &'a dyn TemplateRenderer) -> Self {
        Self { runner, renderer }
    }

    /// Every hook whose condition holds, in order.
    pub fn select<'h>(hooks: &'h [Hook], context: &TemplateContext) -> Result<Vec<&'h Hook>> {
        let mut selected = Vec::new();
        for hook in hooks {
            let owner = format!("hook '{}'", hook.name);
            if condition::is_satisfied_for(&owner, hook.condition.as_ref(), context)? {
                selected.push(hook);
            }
        }
        Ok(selected)
    }

    /// Reports every hook as skipped without running anything.
    pub fn skip_all(hooks: &[Hook]) -> Vec<HookOutcome> {
        hooks.iter().map(|hook| HookOutcome::skipped(&hook.name)).collect()
    }

    /// Runs the hooks against the materialized tree at `destination`.
    ///
    /// A failing critical hook stops the run with [`Error::HookExecutionError`],
    /// which carries the outcomes of the hooks before it; hooks after it never
    /// start. Best-effort failures are recorded and the
    /// run continues.
    pub fn run(
        &self,
        hooks: &[Hook],
        context: &TemplateContext,
        blueprint_dir: &Path,
        destination: &Path,
    ) -> Result<Vec<HookOutcome>> {
        let payload = serde_json::to_vec(&Payload {
            blueprint_dir: blueprint_dir.to_str_checked()?,
            output_dir: destination.to_str_checked()?,
            context,
        })?;

        let mut outcomes = Vec::with_capacity(hooks.len());
        for hook in hooks {
            let owner = format!("hook '{}'", hook.name);
            if !condition::is_satisfied_for(&owner, hook.condition.as_ref(), context)? {
                debug!("Skipping {owner}: condition is false");
                outcomes.push(HookOutcome::skipped(&hook.name));
                continue;
            }

            let command = self.renderer.render(&hook.command, context, &owner)?;
            let workdir = self.workdir(hook, context, destination)?;
            info!("Running {owner}: {command}");

            let invocation =
                Invocation { hook: &hook.name, command: &command, workdir: &workdir, stdin: &payload };
            let outcome = match self.runner.run(&invocation) {
                Ok(output) => HookOutcome {
                    name: hook.name.clone(),
                    status: if output.exit_code == Some(0) {
                        HookStatus::Succeeded
                    } else {
                        HookStatus::Failed
                    },
                    exit_code: output.exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                    spawn_error: None,
                },
                Err(e) => HookOutcome {
                    name: hook.name.clone(),
                    status: HookStatus::Failed,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: String::new(),
                    spawn_error: Some(e.to_string()),
                },
            };

            if outcome.status == HookStatus::Failed {
                match hook.policy {
                    HookPolicy::Critical => {
                        return Err(Error::HookExecutionError {
                            hook: hook.name.clone(),
                            status: outcome.describe_failure(),
                            stderr: outcome.failure_output().to_string(),
                            destination: destination.display().to_string(),
                            completed: outcomes,
                        });
                    }
                    HookPolicy::BestEffort => {
                        warn!("Best-effort {owner} failed ({})", outcome.describe_failure());
                    }
                }
            } else {
                debug!("{owner} succeeded");
            }
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn workdir(&self, hook: &Hook, context: &TemplateContext, destination: &Path) -> Result<PathBuf> {
        let Some(workdir) = &hook.workdir else {
            return Ok(destination.to_path_buf());
        };
        let rendered =
            self.renderer.render(workdir, context, &format!("workdir of hook '{}'", hook.name))?;
        if rendered.trim().is_empty() {
            return Ok(destination.to_path_buf());
        }
        if !Path::new(&rendered).is_contained_relative() {
            return Err(Error::UnsafeDestination {
                template: format!("hook '{}'", hook.name),
                destination: rendered,
            });
        }
        Ok(destination.join(rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::Blueprint;
    use crate::context::build_context;
    use crate::renderer::Renderer;
    use crate::resolver::ResolvedParameters;
    use crate::value::Value;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records invocations and answers with scripted exit codes.
    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<(String, String, PathBuf)>>,
        exit_codes: Vec<(&'static str, i32)>,
    }

    impl ProcessRunner for RecordingRunner {
        fn run(&self, invocation: &Invocation<'_>) -> std::io::Result<ProcessOutput> {
            self.calls.borrow_mut().push((
                invocation.hook.to_string(),
                invocation.command.to_string(),
                invocation.workdir.to_path_buf(),
            ));
            let code = self
                .exit_codes
                .iter()
                .find(|(hook, _)| *hook == invocation.hook)
                .map(|(_, code)| *code)
                .unwrap_or(0);
            Ok(ProcessOutput { exit_code: Some(code), stdout: String::new(), stderr: "boom".into() })
        }
    }

    const HOOKS: &str = r#"
name: hooks
variables:
  - name: module
  - name: orm
computed: []
hooks:
  - name: init
    command: go mod init {{ module }}
  - name: generate
    command: sqlc generate
    condition: orm == "sqlc"
  - name: fmt
    command: gofmt -w .
    policy: best-effort
  - name: tidy
    command: go mod tidy
    workdir: api
  - name: vet
    command: go vet ./...
"#;

    fn setup() -> (Blueprint, TemplateContext) {
        let blueprint = Blueprint::parse(HOOKS, true).unwrap();
        let params: ResolvedParameters = [
            ("module".to_string(), Value::from("github.com/acme/api")),
            ("orm".to_string(), Value::from("gorm")),
        ]
        .into_iter()
        .collect();
        let context = build_context(&blueprint, &params, &Renderer).unwrap();
        (blueprint, context)
    }

    #[test]
    fn runs_in_order_and_skips_false_conditions() {
        let (blueprint, context) = setup();
        let runner = RecordingRunner::default();
        let out = TempDir::new().unwrap();
        let outcomes = HookExecutor::new(&runner, &Renderer)
            .run(&blueprint.hooks, &context, Path::new("/bp"), out.path())
            .unwrap();

        let calls = runner.calls.borrow();
        let names: Vec<&str> = calls.iter().map(|(name, _, _)| name.as_str()).collect();
        assert_eq!(names, vec!["init", "fmt", "tidy", "vet"]);
        assert_eq!(calls[0].1, "go mod init github.com/acme/api");
        assert_eq!(calls[0].2, out.path());
        assert_eq!(calls[2].2, out.path().join("api"));
        assert_eq!(outcomes[1].status, HookStatus::Skipped);
        assert!(outcomes.iter().all(|o| o.status != HookStatus::Failed));
    }

    #[test]
    fn critical_failure_stops_later_hooks() {
        let (blueprint, context) = setup();
        let runner = RecordingRunner { exit_codes: vec![("tidy", 1)], ..Default::default() };
        let out = TempDir::new().unwrap();
        let err = HookExecutor::new(&runner, &Renderer)
            .run(&blueprint.hooks, &context, Path::new("/bp"), out.path())
            .unwrap_err();

        match err {
            Error::HookExecutionError { hook, status, stderr, completed, .. } => {
                assert_eq!(hook, "tidy");
                assert_eq!(status, "exit code 1");
                assert_eq!(stderr, "boom");
                let done: Vec<(&str, HookStatus)> =
                    completed.iter().map(|o| (o.name.as_str(), o.status)).collect();
                assert_eq!(
                    done,
                    vec![
                        ("init", HookStatus::Succeeded),
                        ("generate", HookStatus::Skipped),
                        ("fmt", HookStatus::Succeeded)
                    ]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
        let names: Vec<String> = runner.calls.borrow().iter().map(|c| c.0.clone()).collect();
        assert_eq!(names, vec!["init", "fmt", "tidy"]);
    }

    #[test]
    fn best_effort_failure_continues() {
        let (blueprint, context) = setup();
        let runner = RecordingRunner { exit_codes: vec![("fmt", 2)], ..Default::default() };
        let out = TempDir::new().unwrap();
        let outcomes = HookExecutor::new(&runner, &Renderer)
            .run(&blueprint.hooks, &context, Path::new("/bp"), out.path())
            .unwrap();
        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes[2].status, HookStatus::Failed);
        assert_eq!(outcomes[2].exit_code, Some(2));
        assert_eq!(outcomes[4].status, HookStatus::Succeeded);
    }

    #[test]
    fn selection_and_skip_all() {
        let (blueprint, context) = setup();
        let selected = HookExecutor::select(&blueprint.hooks, &context).unwrap();
        assert_eq!(selected.len(), 4);
        let skipped = HookExecutor::skip_all(&blueprint.hooks);
        assert!(skipped.iter().all(|o| o.status == HookStatus::Skipped));
    }

    #[cfg(unix)]
    #[test]
    fn shell_runner_captures_output_and_payload() {
        let dir = TempDir::new().unwrap();
        let invocation = Invocation {
            hook: "echo",
            command: "cat; echo err >&2; exit 3",
            workdir: dir.path(),
            stdin: br#"{"ok":true}"#,
        };
        let output = ShellRunner.run(&invocation).unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), r#"{"ok":true}"#);
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn killed_hook_is_reported_as_signalled() {
        let blueprint = Blueprint::parse(
            r#"
name: killed
hooks:
  - name: dies
    command: echo dying >&2; kill -9 $$
"#,
            true,
        )
        .unwrap();
        let context = build_context(&blueprint, &ResolvedParameters::default(), &Renderer).unwrap();
        let out = TempDir::new().unwrap();
        let err = HookExecutor::new(&ShellRunner, &Renderer)
            .run(&blueprint.hooks, &context, Path::new("/bp"), out.path())
            .unwrap_err();
        match err {
            Error::HookExecutionError { status, stderr, completed, .. } => {
                assert_eq!(status, "terminated by a signal");
                assert_eq!(stderr.trim(), "dying");
                assert!(completed.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn spawn_failure_is_a_failed_outcome() {
        struct Unstartable;
        impl ProcessRunner for Unstartable {
            fn run(&self, _: &Invocation<'_>) -> std::io::Result<ProcessOutput> {
                Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no shell"))
            }
        }
        let (blueprint, context) = setup();
        let out = TempDir::new().unwrap();
        let err = HookExecutor::new(&Unstartable, &Renderer)
            .run(&blueprint.hooks, &context, Path::new("/bp"), out.path())
            .unwrap_err();
        match err {
            Error::HookExecutionError { status, stderr, .. } => {
                assert_eq!(status, "could not be started");
                assert_eq!(stderr, "no shell");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
